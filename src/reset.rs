//! # Reset classification
//!
//! The flight software distinguishes power-on resets (all memory is
//! cleared) from processor resets (preserved memory areas survive), plus a
//! subtype telling what triggered the reset. Boards report a raw
//! [`ResetCause`] read from their reset controller; this module maps it to
//! the flight-software view.

/// Flight-software reset type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum ResetType {
    PowerOn = 1,
    Processor = 2,
}

/// Flight-software reset subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum ResetSubtype {
    PowerCycle = 1,
    PushButton = 2,
    HwSpecialCommand = 3,
    HwWatchdog = 4,
    ResetCommand = 5,
    Exception = 6,
    UndefinedReset = 7,
    HwDebugReset = 8,
    BankSwitchReset = 9,
}

/// Cause of the last reset as reported by the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResetCause {
    PowerOn,
    Brownout,
    /// External reset pin.
    Pin,
    Watchdog,
    /// Reset requested by software (restart command).
    Software,
    /// Reset requested by an attached debugger.
    Debug,
    /// The board could not tell.
    Unknown,
}

impl ResetCause {
    /// Map the board cause to the flight-software reset type and subtype.
    ///
    /// Supply-related resets lose memory contents and count as power-on;
    /// everything else is a processor reset.
    pub const fn classify(self) -> (ResetType, ResetSubtype) {
        match self {
            ResetCause::PowerOn | ResetCause::Brownout => (ResetType::PowerOn, ResetSubtype::PowerCycle),
            ResetCause::Pin => (ResetType::Processor, ResetSubtype::PushButton),
            ResetCause::Watchdog => (ResetType::Processor, ResetSubtype::HwWatchdog),
            ResetCause::Software => (ResetType::Processor, ResetSubtype::ResetCommand),
            ResetCause::Debug => (ResetType::Processor, ResetSubtype::HwDebugReset),
            ResetCause::Unknown => (ResetType::Processor, ResetSubtype::UndefinedReset),
        }
    }
}

/// Kind of reset the board can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HardwareReset {
    PowerOn,
    Software,
}

impl From<ResetType> for HardwareReset {
    fn from(reset_type: ResetType) -> Self {
        match reset_type {
            ResetType::PowerOn => HardwareReset::PowerOn,
            ResetType::Processor => HardwareReset::Software,
        }
    }
}

/// Board reset controller.
pub trait ResetHal {
    /// Cause of the last reset.
    fn reset_cause(&self) -> ResetCause;

    /// Reset the board. Does not return.
    fn system_restart(&self, kind: HardwareReset) -> !;
}
