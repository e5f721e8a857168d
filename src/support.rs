//! # Platform identity and restart

use crate::config::{DEFAULT_CPU_ID, DEFAULT_CPU_NAME, DEFAULT_SPACECRAFT_ID};
use crate::reset::{HardwareReset, ResetCause, ResetHal, ResetType};

/// Build-time identity of the target, handed to the PSP by the mission
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetConfig {
    pub cpu_id: u32,
    pub cpu_name: &'static str,
    pub spacecraft_id: u32,
    /// Startup script embedded in the image, installed at boot.
    pub startup_script: &'static [u8],
}

impl TargetConfig {
    pub const fn new(startup_script: &'static [u8]) -> Self {
        Self {
            cpu_id: DEFAULT_CPU_ID,
            cpu_name: DEFAULT_CPU_NAME,
            spacecraft_id: DEFAULT_SPACECRAFT_ID,
            startup_script,
        }
    }
}

pub struct Support<'a, H: ResetHal> {
    target: &'a TargetConfig,
    hal: H,
}

impl<'a, H: ResetHal> Support<'a, H> {
    pub const fn new(target: &'a TargetConfig, hal: H) -> Self {
        Self { target, hal }
    }

    pub fn processor_id(&self) -> u32 {
        self.target.cpu_id
    }

    pub fn spacecraft_id(&self) -> u32 {
        self.target.spacecraft_id
    }

    pub fn processor_name(&self) -> &'static str {
        self.target.cpu_name
    }

    pub fn reset_cause(&self) -> ResetCause {
        self.hal.reset_cause()
    }

    /// Restart the board. A power-on restart is requested from the hardware
    /// as such; every other type becomes a software reset.
    pub fn restart(&self, reset_type: ResetType) -> ! {
        let kind = HardwareReset::from(reset_type);
        warn!("psp: restart requested ({})", kind);
        self.hal.system_restart(kind)
    }
}
