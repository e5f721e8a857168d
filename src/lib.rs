//! # fsw_psp: Platform Support Package
//!
//! Board glue between a flight-software core and an RTOS-hosted
//! microcontroller, built around a CPU load monitor exposed as a virtual
//! analog device.
//!
//! ## Overview
//!
//! The PSP gives the flight software a uniform view of the board:
//!
//! - **CPU load**: a background task samples the RTOS run-time counters
//!   and publishes the load as a 12-bit-fraction ADC code
//! - **I/O drivers**: every device, real or virtual, answers the same
//!   `(command, subsystem, subchannel, argument)` protocol
//! - **Time, watchdog, reset**: tick-based time base, health-services
//!   watchdog, reset classification and restart
//! - **Startup**: RAM-disk setup, startup script install and hand-off to
//!   the flight-software main entry
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                 Flight-software core                    │
//! ├────────────────────────────────────────────────────────┤
//! │        I/O Driver Protocol (iodriver.rs)                │
//! │   Command · Arg · NameTable · DeviceRegistry            │
//! ├──────────────────────────┬─────────────────────────────┤
//! │  CPU Load Monitor        │  Board services             │
//! │  sysmon/                 │  timer.rs · watchdog.rs     │
//! │  ─ mod.rs  (lifecycle)   │  reset.rs · support.rs      │
//! │  ─ sampler.rs            │  start.rs                   │
//! │  ─ codec.rs              │                             │
//! │  ─ dispatch.rs           │                             │
//! ├──────────────────────────┴─────────────────────────────┤
//! │      RTOS seam (rtos.rs) · Sync Primitives (sync.rs)    │
//! ├────────────────────────────────────────────────────────┤
//! │            Arch Port (arch/cortex_m4.rs)                │
//! │   SysTick · run-time counters · IWDG · RCC reset flags  │
//! ├────────────────────────────────────────────────────────┤
//! │         ARM Cortex-M4 Hardware (Thumb-2)                │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Load Model
//!
//! Each sample compares the idle run time against the total run time
//! elapsed since the previous sample:
//!
//! ```text
//!   idle %  = idle_elapsed * 100 / total_elapsed      (floor)
//!   load %  = 100 - idle %
//!   f       = 0x1000 * load % / 100                   (12-bit fraction)
//!   code    = f | f << 12
//! ```
//!
//! The code fills a 24-bit ADC word with the fraction repeated in both
//! halves, so consumers expecting 12- or 24-bit converters read the same
//! ratio. 100 % saturates to `0x1001000`.
//!
//! ## Memory Model
//!
//! - **No heap**: All state is statically allocated
//! - **No `alloc`**: Pure `core` only
//! - **Const constructors**: the monitor and the board port live in `static`s
//! - **Critical sections**: `critical_section::with()` for shared state

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to every module.
mod fmt;

pub mod config;
pub mod error;
pub mod sync;
pub mod rtos;
pub mod iodriver;
pub mod sysmon;
pub mod timer;
pub mod watchdog;
pub mod reset;
pub mod support;
pub mod start;
pub mod arch;
