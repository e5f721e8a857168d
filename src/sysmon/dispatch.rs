//! # Load monitor driver dispatch
//!
//! Maps the generic I/O driver protocol onto the load monitor.
//!
//! | Subsystem | Name        | Channels                      |
//! |-----------|-------------|-------------------------------|
//! | 0         | `aggregate` | 0 `cpu-load`: whole-system load |
//! | 1         | `per-cpu`   | one per CPU (`SYSMON_MAX_CPUS`) |
//!
//! The aggregate subsystem also carries the device-wide commands
//! (running state, name lookups, direction). Every command not listed for
//! a subsystem answers `NotImplemented`.

use crate::config::SYSMON_MAX_CPUS;
use crate::error::{self, PspError};
use crate::iodriver::{AnalogRdWr, Arg, Command, Direction, IoDriver, NameTable};
use crate::rtos::Rtos;
use crate::sysmon::SysMon;

pub const AGGREGATE_SUBSYS: u16 = 0;
pub const CPULOAD_SUBSYS: u16 = 1;
pub const AGGR_CPULOAD_SUBCH: u16 = 0;

/// Subsystem names, indexed by subsystem number.
pub const SUBSYSTEM_NAMES: NameTable = NameTable(&["aggregate", "per-cpu"]);

/// Subchannel names, indexed by subchannel number.
pub const SUBCHANNEL_NAMES: NameTable = NameTable(&["cpu-load"]);

impl<R: Rtos + 'static> SysMon<R> {
    /// Whole-system view (subsystem 0).
    fn aggregate_dispatch(&'static self, command: Command, subchannel: u16, arg: Arg<'_>) -> Result<u32, PspError> {
        match command {
            Command::Noop | Command::AnalogIoNoop => {
                info!("sysmon: noop");
                Ok(0)
            }
            Command::SetRunning => match arg.as_u32() {
                Some(0) => self.stop().map(|_| 0),
                Some(_) => self.start().map(|_| 0),
                None => Err(PspError::NotImplemented),
            },
            Command::GetRunning => Ok(u32::from(self.is_running())),
            // Reserved
            Command::SetConfiguration | Command::GetConfiguration => Err(PspError::NotImplemented),
            Command::LookupSubsystem => match arg.as_str() {
                Some(name) => SUBSYSTEM_NAMES.lookup_status(name),
                None => Err(PspError::NotImplemented),
            },
            Command::LookupSubchannel => match arg.as_str() {
                Some(name) => SUBCHANNEL_NAMES.lookup_status(name),
                None => Err(PspError::NotImplemented),
            },
            Command::QueryDirection => match arg {
                Arg::Direction(dir) => {
                    *dir = Direction::InputOnly;
                    Ok(0)
                }
                _ => Err(PspError::NotImplemented),
            },
            Command::AnalogIoReadChannels => match arg {
                Arg::AnalogRdWr(rdwr) if rdwr.num_channels == 1 && subchannel == AGGR_CPULOAD_SUBCH => {
                    self.read_aggregate(rdwr)
                }
                _ => Err(PspError::NotImplemented),
            },
            Command::AnalogIoWriteChannels => Err(PspError::NotImplemented),
        }
    }

    /// Aggregate load over all CPUs. With a single CPU this is CPU 0's load.
    fn read_aggregate(&self, mut rdwr: AnalogRdWr<'_>) -> Result<u32, PspError> {
        let slot = rdwr
            .requested()
            .and_then(|s| s.first_mut())
            .ok_or(PspError::NotImplemented)?;

        *slot = self.average_load();
        info!("sysmon: aggregate CPU load={:#x}", *slot);
        Ok(0)
    }

    /// One channel per CPU (subsystem 1).
    fn cpu_load_dispatch(&self, command: Command, subchannel: u16, arg: Arg<'_>) -> Result<u32, PspError> {
        match command {
            Command::Noop | Command::AnalogIoNoop => Ok(0),
            Command::AnalogIoReadChannels => match arg {
                Arg::AnalogRdWr(rdwr) => self.read_per_cpu(subchannel, rdwr),
                _ => Err(PspError::Error),
            },
            _ => Err(PspError::NotImplemented),
        }
    }

    /// Fill the requested per-CPU slots. The whole range
    /// `subchannel..subchannel + num_channels` must name existing CPUs.
    fn read_per_cpu(&self, subchannel: u16, mut rdwr: AnalogRdWr<'_>) -> Result<u32, PspError> {
        let first = usize::from(subchannel);
        let end = first.checked_add(rdwr.num_channels as usize);
        let in_range = first < SYSMON_MAX_CPUS && matches!(end, Some(end) if end <= SYSMON_MAX_CPUS);
        if !in_range {
            return Err(PspError::Error);
        }

        let slots = rdwr.requested().ok_or(PspError::Error)?;
        let load = self.average_load();
        for slot in slots.iter_mut() {
            *slot = load;
        }
        Ok(0)
    }
}

impl<R: Rtos + 'static> IoDriver for SysMon<R> {
    fn device_command(&'static self, command: u32, subsystem: u16, subchannel: u16, arg: Arg<'_>) -> i32 {
        let result = match Command::from_code(command) {
            None => Err(PspError::NotImplemented),
            Some(command) => match subsystem {
                AGGREGATE_SUBSYS => self.aggregate_dispatch(command, subchannel, arg),
                CPULOAD_SUBSYS => self.cpu_load_dispatch(command, subchannel, arg),
                _ => Err(PspError::NotImplemented),
            },
        };
        error::status(result)
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iodriver::{DeviceRegistry, Location};
    use crate::rtos::mock::{MockRtos, SpawnMode};
    use crate::sysmon::codec;

    const NOT_IMPLEMENTED: i32 = -27;
    const ERROR: i32 = -1;

    fn driver() -> &'static SysMon<MockRtos> {
        MockRtos::leak(SysMon::new(MockRtos::new(SpawnMode::Deferred)))
    }

    /// Publish a 75 % load sample.
    fn publish_75(d: &SysMon<MockRtos>) {
        d.rtos().set_counters(400, 100);
        d.sample().unwrap();
    }

    fn cmd(d: &'static SysMon<MockRtos>, c: Command, subsys: u16, subch: u16, arg: Arg<'_>) -> i32 {
        d.device_command(c.code(), subsys, subch, arg)
    }

    #[test]
    fn test_unknown_command_and_subsystem() {
        let d = driver();
        assert_eq!(d.device_command(0xDEAD, 0, 0, Arg::None), NOT_IMPLEMENTED);
        assert_eq!(cmd(d, Command::Noop, 2, 0, Arg::None), NOT_IMPLEMENTED);
    }

    #[test]
    fn test_noop() {
        let d = driver();
        assert_eq!(cmd(d, Command::Noop, 0, 0, Arg::None), 0);
        assert_eq!(cmd(d, Command::AnalogIoNoop, 0, 0, Arg::None), 0);
        assert_eq!(cmd(d, Command::Noop, 1, 0, Arg::None), 0);
        assert_eq!(cmd(d, Command::AnalogIoNoop, 1, 0, Arg::None), 0);
    }

    #[test]
    fn test_set_and_get_running() {
        let d = driver();
        assert_eq!(cmd(d, Command::GetRunning, 0, 0, Arg::None), 0);
        assert_eq!(cmd(d, Command::SetRunning, 0, 0, Arg::U32(1)), 0);
        assert_eq!(cmd(d, Command::GetRunning, 0, 0, Arg::None), 1);
        assert_eq!(cmd(d, Command::SetRunning, 0, 0, Arg::U32(1)), 0);
        assert_eq!(cmd(d, Command::SetRunning, 0, 0, Arg::U32(0)), 0);
        assert_eq!(cmd(d, Command::GetRunning, 0, 0, Arg::None), 0);
        assert_eq!(cmd(d, Command::SetRunning, 0, 0, Arg::U32(0)), 0);
        // Missing argument
        assert_eq!(cmd(d, Command::SetRunning, 0, 0, Arg::None), NOT_IMPLEMENTED);
        // Not a per-cpu command
        assert_eq!(cmd(d, Command::SetRunning, 1, 0, Arg::U32(1)), NOT_IMPLEMENTED);
    }

    #[test]
    fn test_set_running_reports_spawn_failure() {
        let d = driver();
        d.rtos().set_mode(SpawnMode::Fail);
        assert_eq!(cmd(d, Command::SetRunning, 0, 0, Arg::U32(1)), ERROR);
        assert_eq!(cmd(d, Command::GetRunning, 0, 0, Arg::None), 0);
    }

    #[test]
    fn test_configuration_is_reserved() {
        let d = driver();
        assert_eq!(cmd(d, Command::SetConfiguration, 0, 0, Arg::U32(5)), NOT_IMPLEMENTED);
        assert_eq!(cmd(d, Command::GetConfiguration, 0, 0, Arg::None), NOT_IMPLEMENTED);
    }

    #[test]
    fn test_name_lookups() {
        let d = driver();
        assert_eq!(cmd(d, Command::LookupSubsystem, 0, 0, Arg::Str("aggregate")), 0);
        assert_eq!(cmd(d, Command::LookupSubsystem, 0, 0, Arg::Str("per-cpu")), 1);
        assert_eq!(cmd(d, Command::LookupSubsystem, 0, 0, Arg::Str("bogus")), NOT_IMPLEMENTED);
        assert_eq!(cmd(d, Command::LookupSubchannel, 0, 0, Arg::Str("cpu-load")), 0);
        assert_eq!(cmd(d, Command::LookupSubchannel, 0, 0, Arg::Str("cpu-temp")), NOT_IMPLEMENTED);
        assert_eq!(cmd(d, Command::LookupSubsystem, 0, 0, Arg::U32(1)), NOT_IMPLEMENTED);
    }

    #[test]
    fn test_query_direction() {
        let d = driver();
        let mut dir = Direction::Disabled;
        assert_eq!(cmd(d, Command::QueryDirection, 0, 0, Arg::Direction(&mut dir)), 0);
        assert_eq!(dir, Direction::InputOnly);
        assert_eq!(cmd(d, Command::QueryDirection, 0, 0, Arg::None), NOT_IMPLEMENTED);
    }

    #[test]
    fn test_aggregate_read() {
        let d = driver();
        publish_75(d);

        let mut samples = [0u32; 1];
        let arg = Arg::AnalogRdWr(AnalogRdWr::new(&mut samples));
        assert_eq!(cmd(d, Command::AnalogIoReadChannels, 0, 0, arg), 0);
        assert_eq!(samples[0], codec::encode_load(75));
    }

    #[test]
    fn test_aggregate_read_rejects_other_shapes() {
        let d = driver();
        publish_75(d);

        let mut samples = [7u32; 2];
        let arg = Arg::AnalogRdWr(AnalogRdWr::new(&mut samples));
        assert_eq!(cmd(d, Command::AnalogIoReadChannels, 0, 0, arg), NOT_IMPLEMENTED);
        assert_eq!(samples, [7, 7]);

        let mut samples = [7u32; 1];
        let arg = Arg::AnalogRdWr(AnalogRdWr::new(&mut samples));
        assert_eq!(cmd(d, Command::AnalogIoReadChannels, 0, 1, arg), NOT_IMPLEMENTED);
        assert_eq!(samples, [7]);

        // Descriptor claims one channel but carries no buffer
        let mut empty: [u32; 0] = [];
        let arg = Arg::AnalogRdWr(AnalogRdWr { num_channels: 1, samples: &mut empty });
        assert_eq!(cmd(d, Command::AnalogIoReadChannels, 0, 0, arg), NOT_IMPLEMENTED);

        assert_eq!(cmd(d, Command::AnalogIoWriteChannels, 0, 0, Arg::None), NOT_IMPLEMENTED);
    }

    #[test]
    fn test_per_cpu_read() {
        let d = driver();
        publish_75(d);

        let mut samples = [0u32; 1];
        let arg = Arg::AnalogRdWr(AnalogRdWr::new(&mut samples));
        assert_eq!(cmd(d, Command::AnalogIoReadChannels, 1, 0, arg), 0);
        assert_eq!(samples[0], codec::encode_load(75));

        // Zero channels at CPU 0 is in range and touches nothing
        let mut samples = [9u32; 1];
        let arg = Arg::AnalogRdWr(AnalogRdWr { num_channels: 0, samples: &mut samples });
        assert_eq!(cmd(d, Command::AnalogIoReadChannels, 1, 0, arg), 0);
        assert_eq!(samples, [9]);
    }

    #[test]
    fn test_per_cpu_read_out_of_range() {
        let d = driver();
        publish_75(d);

        let mut samples = [7u32; 2];
        let arg = Arg::AnalogRdWr(AnalogRdWr::new(&mut samples));
        assert_eq!(cmd(d, Command::AnalogIoReadChannels, 1, 0, arg), ERROR);
        assert_eq!(samples, [7, 7]);

        let mut samples = [7u32; 1];
        let arg = Arg::AnalogRdWr(AnalogRdWr::new(&mut samples));
        assert_eq!(cmd(d, Command::AnalogIoReadChannels, 1, 1, arg), ERROR);
        assert_eq!(samples, [7]);

        let mut samples = [7u32; 1];
        let arg = Arg::AnalogRdWr(AnalogRdWr { num_channels: u32::MAX, samples: &mut samples });
        assert_eq!(cmd(d, Command::AnalogIoReadChannels, 1, 0, arg), ERROR);
        assert_eq!(samples, [7]);

        assert_eq!(cmd(d, Command::AnalogIoReadChannels, 1, 0, Arg::None), ERROR);
    }

    #[test]
    fn test_per_cpu_other_commands() {
        let d = driver();
        assert_eq!(cmd(d, Command::GetRunning, 1, 0, Arg::None), NOT_IMPLEMENTED);
        assert_eq!(cmd(d, Command::LookupSubsystem, 1, 0, Arg::Str("per-cpu")), NOT_IMPLEMENTED);
        let mut dir = Direction::Disabled;
        assert_eq!(cmd(d, Command::QueryDirection, 1, 0, Arg::Direction(&mut dir)), NOT_IMPLEMENTED);
        assert_eq!(dir, Direction::Disabled);
    }

    #[test]
    fn test_reading_survives_stop() {
        let d = driver();
        assert_eq!(cmd(d, Command::SetRunning, 0, 0, Arg::U32(1)), 0);
        d.rtos().set_counters(1000, 0);
        d.sample().unwrap();
        assert_eq!(cmd(d, Command::SetRunning, 0, 0, Arg::U32(0)), 0);

        let mut samples = [0u32; 1];
        let arg = Arg::AnalogRdWr(AnalogRdWr::new(&mut samples));
        assert_eq!(cmd(d, Command::AnalogIoReadChannels, 1, 0, arg), 0);
        assert_eq!(samples[0], 0x1001000);
    }

    #[test]
    fn test_resolve_through_registry() {
        let d = driver();
        publish_75(d);

        let mut reg: DeviceRegistry<2> = DeviceRegistry::new();
        reg.register("freertos_sysmon", d).unwrap();

        let loc = reg.resolve("freertos_sysmon", "per-cpu", "cpu-load").unwrap();
        assert_eq!(loc, Location { device: 0, subsystem: 1, subchannel: 0 });

        let mut samples = [0u32; 1];
        reg.analog_read(loc, &mut samples).unwrap();
        assert_eq!(codec::decode_load(samples[0]), 75);

        let aggr = reg.resolve("freertos_sysmon", "aggregate", "cpu-load").unwrap();
        assert_eq!(reg.analog_read(aggr, &mut samples), Ok(()));
        let mut two = [0u32; 2];
        assert_eq!(reg.analog_read(aggr, &mut two), Err(PspError::NotImplemented));
    }
}
