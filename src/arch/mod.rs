//! # Architecture Abstraction Layer
//!
//! Board ports implementing the PSP's hardware seams ([`crate::rtos::Rtos`],
//! [`crate::timer::TickSource`], [`crate::watchdog::WatchdogHal`],
//! [`crate::reset::ResetHal`]). Currently implements the Cortex-M4
//! (STM32F4) port; extensible to other boards by adding sibling modules.

pub mod stm32f4;

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod cortex_m4;
