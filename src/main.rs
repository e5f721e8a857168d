//! # PSP Board Firmware
//!
//! STM32F4 image running the PSP startup sequence with the CPU load
//! monitor registered as I/O device `freertos_sysmon`:
//!
//! | Stage | Board action |
//! |-------|--------------|
//! | mkfs / mount | RAM disk carved out of a static buffer |
//! | startup file | embedded script copied onto the RAM disk |
//! | module init | load monitor registered in the device registry |
//! | setup | watchdog initialised, timeout programmed |
//! | system main | monitor started through `SetRunning`, task run from the main loop |
//!
//! Hosted builds get an empty `main` so the library can be tested with
//! `cargo test` on the development machine.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
fn main() {}

#[cfg(all(target_arch = "arm", target_os = "none"))]
mod firmware {
    use cortex_m_rt::entry;
    use defmt_rtt as _;
    use panic_halt as _;

    use fsw_psp::arch::cortex_m4::{self, CortexM4Port, Iwdg, ScbReset};
    use fsw_psp::config::{MAX_IODEVICES, STARTUP_BLOCK_COUNT, STARTUP_SECTOR_SIZE, SYSMON_TASK_NAME};
    use fsw_psp::error::PspError;
    use fsw_psp::iodriver::{Arg, Command, DeviceRegistry};
    use fsw_psp::reset::{ResetCause, ResetSubtype, ResetType};
    use fsw_psp::start::{self, Osal};
    use fsw_psp::support::{Support, TargetConfig};
    use fsw_psp::sysmon::SysMon;
    use fsw_psp::timer::Timer;
    use fsw_psp::watchdog::Watchdog;

    /// Startup script installed on the RAM disk at boot.
    const STARTUP_SCRIPT: &[u8] = b"CFE_LIB, /cf/sample_lib.so, SAMPLE_LibInit, SAMPLE_LIB, 0, 0, 0x0, 0;\n\
CFE_APP, /cf/sample_app.so, SAMPLE_AppMain, SAMPLE_APP, 50, 16384, 0x0, 0;\n\
!\n";

    const DISK_SIZE: usize = STARTUP_SECTOR_SIZE * STARTUP_BLOCK_COUNT;

    /// Health-services timeout programmed at setup, in milliseconds.
    const WATCHDOG_TIMEOUT_MS: u32 = 10_000;

    static TARGET: TargetConfig = TargetConfig::new(STARTUP_SCRIPT);
    static SYSMON: SysMon<CortexM4Port> = SysMon::new(CortexM4Port::new());

    struct BoardOs {
        registry: DeviceRegistry<MAX_IODEVICES>,
        support: Support<'static, ScbReset>,
        watchdog: Watchdog<Iwdg>,
        disk: [u8; DISK_SIZE],
        formatted: bool,
        mounted: bool,
    }

    impl Osal for BoardOs {
        /// Write offset into the RAM disk.
        type File = usize;

        fn api_init(&mut self) -> Result<(), i32> {
            Ok(())
        }

        /// No memory survives a reset on this board.
        fn setup_reserved_memory_map(&mut self) -> Result<(), i32> {
            Ok(())
        }

        fn mkfs(&mut self, device: &str, volume: &str, sector_size: usize, block_count: usize) -> Result<(), i32> {
            if sector_size * block_count > self.disk.len() {
                return Err(PspError::Error.code());
            }
            self.disk.fill(0);
            self.formatted = true;
            defmt::debug!("board: mkfs {} ({}) {}x{}", device, volume, block_count, sector_size);
            Ok(())
        }

        fn mount(&mut self, _device: &str, mount_point: &str) -> Result<(), i32> {
            if !self.formatted {
                return Err(PspError::Error.code());
            }
            self.mounted = true;
            defmt::debug!("board: mounted at {}", mount_point);
            Ok(())
        }

        fn create(&mut self, _path: &str) -> Result<usize, i32> {
            if self.mounted {
                Ok(0)
            } else {
                Err(PspError::Error.code())
            }
        }

        fn write(&mut self, file: &mut usize, data: &[u8]) -> Result<usize, i32> {
            let free = &mut self.disk[*file..];
            let n = data.len().min(free.len());
            free[..n].copy_from_slice(&data[..n]);
            *file += n;
            Ok(n)
        }

        fn close(&mut self, _file: usize) -> Result<(), i32> {
            Ok(())
        }

        fn module_init(&mut self) -> Result<(), i32> {
            self.registry
                .register(SYSMON_TASK_NAME, &SYSMON)
                .map(|_| ())
                .map_err(PspError::code)
        }

        fn setup(&mut self) -> Result<(), i32> {
            self.watchdog.init();
            self.watchdog.set(WATCHDOG_TIMEOUT_MS);
            self.watchdog.service();
            Ok(())
        }

        fn reset_cause(&self) -> ResetCause {
            self.support.reset_cause()
        }

        fn init_reserved_memory(&mut self, _reset_type: ResetType) -> Result<(), i32> {
            Ok(())
        }

        fn system_main(&mut self, reset_type: ResetType, subtype: ResetSubtype, mode_id: u32, startup_file: &str) {
            let uptime = Timer::new(SYSMON.rtos()).get_time();
            defmt::info!(
                "board: {} (cpu {}, sc {:#x}) up {} ms, reset {}/{}, mode {}, script {}",
                self.support.processor_name(),
                self.support.processor_id(),
                self.support.spacecraft_id(),
                uptime.total_micros / 1000,
                reset_type,
                subtype,
                mode_id,
                startup_file
            );

            let status = match self.registry.resolve(SYSMON_TASK_NAME, "aggregate", "cpu-load") {
                Ok(location) => self.registry.command(location, Command::SetRunning, Arg::U32(1)),
                Err(err) => err.code(),
            };
            if status < 0 {
                defmt::error!("board: load monitor did not start ({})", status);
            }

            // The sampling task never returns while the monitor runs
            loop {
                if !SYSMON.rtos().run_spawned() {
                    cortex_m::asm::wfi();
                }
            }
        }

        fn application_exit(&mut self, code: i32) -> ! {
            defmt::error!("board: application exit ({})", code);
            self.support.restart(ResetType::Processor)
        }
    }

    #[entry]
    fn main() -> ! {
        let mut cp = cortex_m::Peripherals::take().unwrap();

        cortex_m4::set_interrupt_priorities();
        cortex_m4::configure_systick(&mut cp.SYST);

        let mut os = BoardOs {
            registry: DeviceRegistry::new(),
            support: Support::new(&TARGET, ScbReset::new()),
            watchdog: Watchdog::new(Iwdg::new()),
            disk: [0; DISK_SIZE],
            formatted: false,
            mounted: false,
        };

        start::application_startup(&mut os, &TARGET);

        // Only reached if the flight software returns
        os.application_exit(0)
    }
}
