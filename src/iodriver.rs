//! # I/O Driver Protocol
//!
//! Generic device-driver calling convention of the flight-software core.
//! A driver exposes one entry point taking `(command, subsystem, subchannel,
//! argument)` and returning a signed status word. Software-only devices
//! (like the CPU load monitor) use the same convention as real hardware so
//! consumers cannot tell them apart.
//!
//! ## Addressing
//!
//! ```text
//!   registry ── "freertos_sysmon" ──► device
//!                                      ├── subsystem 0 "aggregate"
//!                                      │     └── subchannel 0 "cpu-load"
//!                                      └── subsystem 1 "per-cpu"
//!                                            └── subchannel n (cpu n)
//! ```
//!
//! Names are resolved to numbers once, through the driver's own
//! `LookupSubsystem` / `LookupSubchannel` commands, and the numeric
//! [`Location`] is used afterwards.

use crate::error::{self, PspError};

// ---------------------------------------------------------------------------
// Command codes
// ---------------------------------------------------------------------------

/// First command code of the analog-I/O class.
pub const ANALOG_IO_CLASS_BASE: u32 = 0x0001_0000;

/// Commands understood by the dispatch protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum Command {
    Noop = 0,
    /// `U32` argument: non-zero starts the device, zero stops it.
    SetRunning = 1,
    /// Returns the running flag as the status word.
    GetRunning = 2,
    SetConfiguration = 3,
    GetConfiguration = 4,
    /// `Str` argument: returns the subsystem number for a name.
    LookupSubsystem = 5,
    /// `Str` argument: returns the subchannel number for a name.
    LookupSubchannel = 6,
    /// `Direction` argument: receives the channel direction.
    QueryDirection = 7,
    AnalogIoNoop = ANALOG_IO_CLASS_BASE,
    /// `AnalogRdWr` argument: fills `samples` with ADC codes.
    AnalogIoReadChannels = ANALOG_IO_CLASS_BASE + 1,
    /// `AnalogRdWr` argument: writes DAC codes from `samples`.
    AnalogIoWriteChannels = ANALOG_IO_CLASS_BASE + 2,
}

impl Command {
    /// Decode a raw command word. Unknown codes yield `None`.
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Command::Noop),
            1 => Some(Command::SetRunning),
            2 => Some(Command::GetRunning),
            3 => Some(Command::SetConfiguration),
            4 => Some(Command::GetConfiguration),
            5 => Some(Command::LookupSubsystem),
            6 => Some(Command::LookupSubchannel),
            7 => Some(Command::QueryDirection),
            ANALOG_IO_CLASS_BASE => Some(Command::AnalogIoNoop),
            c if c == ANALOG_IO_CLASS_BASE + 1 => Some(Command::AnalogIoReadChannels),
            c if c == ANALOG_IO_CLASS_BASE + 2 => Some(Command::AnalogIoWriteChannels),
            _ => None,
        }
    }

    #[inline]
    pub const fn code(self) -> u32 {
        self as u32
    }
}

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// Direction of a channel, reported through `QueryDirection`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Disabled,
    InputOnly,
    OutputOnly,
    InputOrOutput,
    InputAndOutput,
}

/// Raw analog sample. Converters narrower than 24 bits left-align into the
/// low 24 bits.
pub type AdcCode = u32;

/// Channel count for a buffer of `len` slots, saturating at `u32::MAX`.
fn channel_count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Read/write descriptor for analog channels.
#[derive(Debug)]
pub struct AnalogRdWr<'a> {
    /// Number of consecutive channels, starting at the addressed subchannel.
    pub num_channels: u32,
    /// One slot per requested channel.
    pub samples: &'a mut [AdcCode],
}

impl<'a> AnalogRdWr<'a> {
    /// Descriptor covering the whole `samples` buffer.
    pub fn new(samples: &'a mut [AdcCode]) -> Self {
        Self {
            num_channels: channel_count(samples.len()),
            samples,
        }
    }

    /// The slots for the requested channels, or `None` when the buffer is
    /// shorter than `num_channels`.
    pub fn requested(&mut self) -> Option<&mut [AdcCode]> {
        let n = self.num_channels as usize;
        self.samples.get_mut(..n)
    }
}

/// Argument carried by a command.
#[derive(Debug)]
pub enum Arg<'a> {
    None,
    U32(u32),
    Str(&'a str),
    Direction(&'a mut Direction),
    AnalogRdWr(AnalogRdWr<'a>),
}

impl<'a> Arg<'a> {
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Arg::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            Arg::Str(s) => Some(*s),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Name tables
// ---------------------------------------------------------------------------

/// Ordered table of subsystem or subchannel names. The position of a name
/// is its number.
#[derive(Debug, Clone, Copy)]
pub struct NameTable(pub &'static [&'static str]);

impl NameTable {
    /// Linear scan; the first match wins.
    pub fn lookup(&self, name: &str) -> Option<u16> {
        self.0.iter().position(|n| *n == name).map(|i| i as u16)
    }

    /// Lookup in status form: the index, or `NotImplemented` for unknown
    /// names.
    pub fn lookup_status(&self, name: &str) -> Result<u32, PspError> {
        self.lookup(name).map(u32::from).ok_or(PspError::NotImplemented)
    }
}

// ---------------------------------------------------------------------------
// Driver trait
// ---------------------------------------------------------------------------

/// Device entry point.
///
/// Drivers live for the whole program. The receiver is `'static` so that a
/// command may hand the driver to a task it starts.
pub trait IoDriver: Sync {
    /// Execute `command` on `subsystem`/`subchannel`.
    ///
    /// Returns a non-negative value on success (0, a flag, or a lookup
    /// index) and a negative [`PspError`] code on failure.
    fn device_command(&'static self, command: u32, subsystem: u16, subchannel: u16, arg: Arg<'_>) -> i32;
}

// ---------------------------------------------------------------------------
// Device registry
// ---------------------------------------------------------------------------

/// Numeric address of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Location {
    pub device: u16,
    pub subsystem: u16,
    pub subchannel: u16,
}

#[derive(Clone, Copy)]
struct Entry {
    name: &'static str,
    driver: &'static dyn IoDriver,
}

/// Fixed-capacity table of named devices, filled once during module
/// initialization.
pub struct DeviceRegistry<const N: usize> {
    entries: [Option<Entry>; N],
    count: usize,
}

impl<const N: usize> DeviceRegistry<N> {
    pub const fn new() -> Self {
        Self {
            entries: [None; N],
            count: 0,
        }
    }

    /// Register `driver` under `name`, returning its device number.
    ///
    /// # Returns
    /// - `Err(Error)` if the table is full or the name is already taken.
    pub fn register(&mut self, name: &'static str, driver: &'static dyn IoDriver) -> Result<u16, PspError> {
        if self.count >= N || self.find_by_name(name).is_some() {
            return Err(PspError::Error);
        }

        let id = self.count;
        self.entries[id] = Some(Entry { name, driver });
        self.count += 1;
        debug!("iodriver: registered {} as device {}", name, id);
        Ok(id as u16)
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn find_by_name(&self, name: &str) -> Option<u16> {
        self.entries[..self.count]
            .iter()
            .position(|e| matches!(e, Some(e) if e.name == name))
            .map(|i| i as u16)
    }

    fn driver(&self, device: u16) -> Option<&'static dyn IoDriver> {
        self.entries
            .get(usize::from(device))
            .copied()
            .flatten()
            .map(|e| e.driver)
    }

    /// Resolve a channel by names.
    ///
    /// Both names are looked up through the device-wide commands of
    /// subsystem 0.
    pub fn resolve(&self, device: &str, subsystem: &str, subchannel: &str) -> Result<Location, PspError> {
        let dev = self.find_by_name(device).ok_or(PspError::Error)?;
        let driver = self.driver(dev).ok_or(PspError::Error)?;

        let sub = driver.device_command(Command::LookupSubsystem.code(), 0, 0, Arg::Str(subsystem));
        let sub = u16::try_from(sub).map_err(|_| PspError::Error)?;

        let ch = driver.device_command(Command::LookupSubchannel.code(), 0, 0, Arg::Str(subchannel));
        let ch = u16::try_from(ch).map_err(|_| PspError::Error)?;

        Ok(Location {
            device: dev,
            subsystem: sub,
            subchannel: ch,
        })
    }

    /// Send `command` to the channel at `location`.
    pub fn command(&self, location: Location, command: Command, arg: Arg<'_>) -> i32 {
        match self.driver(location.device) {
            Some(driver) => driver.device_command(command.code(), location.subsystem, location.subchannel, arg),
            None => PspError::Error.code(),
        }
    }

    /// Read `samples.len()` consecutive analog channels starting at `location`.
    pub fn analog_read(&self, location: Location, samples: &mut [AdcCode]) -> Result<(), PspError> {
        let status = self.command(location, Command::AnalogIoReadChannels, Arg::AnalogRdWr(AnalogRdWr::new(samples)));
        if status < error::SUCCESS {
            return Err(match status {
                s if s == PspError::NotImplemented.code() => PspError::NotImplemented,
                _ => PspError::Error,
            });
        }
        Ok(())
    }
}

impl<const N: usize> Default for DeviceRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}
