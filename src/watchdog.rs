//! # Watchdog
//!
//! Health-services view of the board watchdog. The flight software calls,
//! in order: `init`, `set(timeout)`, one `service`, then `enable` once, and
//! `service` periodically afterwards. `set` may be called again at any
//! time; when the watchdog is already enabled the new timeout is applied by
//! re-enabling it.
//!
//! ```text
//!   init ──► Disabled ──enable (effective > 0)──► Enabled ──service──► feed
//!               ▲                                   │
//!               └──────────── disable ◄─────────────┘
//! ```

use crate::config::WATCHDOG_MAX;

/// Board watchdog hardware.
pub trait WatchdogHal {
    /// Stop the watchdog, if the hardware allows it.
    fn disable(&mut self);

    /// Arm the watchdog with a timeout of `timeout_ms`, clamped to what the
    /// hardware supports.
    ///
    /// Returns the effective timeout in ms, or 0 if the watchdog could not
    /// be armed.
    fn enable(&mut self, timeout_ms: u32) -> u32;

    /// Restart the countdown.
    fn feed(&mut self);
}

/// Boards without a usable watchdog. Never arms.
#[derive(Debug, Default)]
pub struct NullWatchdog;

impl WatchdogHal for NullWatchdog {
    fn disable(&mut self) {}

    fn enable(&mut self, _timeout_ms: u32) -> u32 {
        0
    }

    fn feed(&mut self) {}
}

pub struct Watchdog<H: WatchdogHal> {
    hal: H,
    /// Requested timeout in milliseconds.
    value_ms: u32,
    enabled: bool,
}

impl<H: WatchdogHal> Watchdog<H> {
    pub const fn new(hal: H) -> Self {
        Self {
            hal,
            value_ms: WATCHDOG_MAX,
            enabled: false,
        }
    }

    /// Put the hardware in a known, disabled state.
    pub fn init(&mut self) {
        self.hal.disable();
        self.value_ms = WATCHDOG_MAX;
        self.enabled = false;
        debug!("watchdog: init");
    }

    pub fn enable(&mut self) {
        let effective = self.hal.enable(self.value_ms);
        self.enabled = effective != 0;
        if self.enabled {
            info!("watchdog: enabled, {} ms", effective);
        } else {
            warn!("watchdog: could not be armed");
        }
    }

    pub fn disable(&mut self) {
        self.hal.disable();
        self.enabled = false;
        info!("watchdog: disabled");
    }

    /// Feed the watchdog. Ignored while disabled.
    pub fn service(&mut self) {
        if self.enabled {
            self.hal.feed();
        }
    }

    /// Requested timeout in milliseconds.
    pub fn get(&self) -> u32 {
        self.value_ms
    }

    /// Change the timeout. Takes effect immediately when enabled.
    pub fn set(&mut self, value_ms: u32) {
        self.value_ms = value_ms;
        if self.enabled {
            self.enable();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
