//! # PSP Configuration
//!
//! Compile-time constants governing the load monitor, the board tick
//! source, the watchdog and the startup sequence.
//! All limits are fixed at compile time; nothing is allocated at run time.

// ---------------------------------------------------------------------------
// CPU load monitor
// ---------------------------------------------------------------------------

/// Interval between two load samples, in milliseconds.
/// Jitter on this period only widens or narrows the averaging window.
pub const SYSMON_SAMPLE_DELAY_MS: u32 = 1000;

/// Number of logical CPUs the monitor reports on. The idle-counter method
/// only works for a single core; SMP would need per-core idle tasks.
pub const SYSMON_MAX_CPUS: usize = 1;

/// Stack size of the sampling task, in bytes.
pub const SYSMON_STACK_SIZE: usize = 4096;

/// Priority of the sampling task, relative to the idle priority (0).
pub const SYSMON_TASK_PRIORITY: u8 = IDLE_PRIORITY + 5;

/// Full scale of the load percentage.
pub const SYSMON_MAX_SCALE: u32 = 100;

/// Task and driver name of the load monitor.
pub const SYSMON_TASK_NAME: &str = "freertos_sysmon";

/// Priority of the RTOS idle task.
pub const IDLE_PRIORITY: u8 = 0;

// ---------------------------------------------------------------------------
// Time base
// ---------------------------------------------------------------------------

/// SysTick frequency in Hz. One tick is the resolution of `delay_ms`,
/// of the run-time counters and of the PSP time base.
pub const TICK_HZ: u32 = 1000;

/// System clock frequency in Hz (default for STM32F4 at 16 MHz HSI).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// Value reported for the low 32-bit timer rollover. The tick counter is
/// a plain free-running `u32`, so no rollover point is advertised.
pub const TIMER_LOW32_ROLLOVER: u32 = 0;

// ---------------------------------------------------------------------------
// Watchdog
// ---------------------------------------------------------------------------

/// Largest watchdog timeout, in milliseconds. Also the power-on default.
pub const WATCHDOG_MAX: u32 = u32::MAX;

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

/// RAM disk device carrying the startup script.
pub const STARTUP_DEVICE: &str = "/ramdev1";

/// Volume label of the startup RAM disk. RAM disks must be labelled `RAM*`.
pub const STARTUP_VOLUME_LABEL: &str = "RAM1";

/// Mount point of the startup RAM disk. Shares its prefix with the
/// nonvolatile startup file path.
pub const STARTUP_MOUNT_POINT: &str = "/cf";

/// Sector size of the startup RAM disk in bytes.
pub const STARTUP_SECTOR_SIZE: usize = 128;

/// Number of sectors in the startup RAM disk.
pub const STARTUP_BLOCK_COUNT: usize = 26;

/// Path of the startup script handed to the flight-software main entry.
pub const NONVOL_STARTUP_FILE: &str = "/cf/cfe_es_startup.scr";

// ---------------------------------------------------------------------------
// Identity defaults
// ---------------------------------------------------------------------------

/// Default processor identifier.
pub const DEFAULT_CPU_ID: u32 = 1;

/// Default processor name.
pub const DEFAULT_CPU_NAME: &str = "cpu1";

/// Default spacecraft identifier.
pub const DEFAULT_SPACECRAFT_ID: u32 = 0x42;

/// Capacity of the I/O device registry.
pub const MAX_IODEVICES: usize = 4;
