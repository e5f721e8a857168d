//! # Application Startup
//!
//! Entry point handed to the OS abstraction layer. Brings the board from
//! reset to the flight-software main entry:
//!
//! ```text
//!   api_init ─► reserved memory map ─► mkfs /ramdev1 ─► mount /cf
//!       ─► install startup script ─► module init ─► setup
//!       ─► classify reset ─► init reserved memory ─► system_main
//! ```
//!
//! Every stage must succeed. The first failure is logged with its stage and
//! handed to [`Osal::application_exit`], which never returns.

use core::fmt;

use crate::config::{
    NONVOL_STARTUP_FILE, STARTUP_BLOCK_COUNT, STARTUP_DEVICE, STARTUP_MOUNT_POINT, STARTUP_SECTOR_SIZE,
    STARTUP_VOLUME_LABEL,
};
use crate::error::PspError;
use crate::reset::{ResetCause, ResetSubtype, ResetType};
use crate::support::TargetConfig;

/// Mode id passed to the flight-software main entry.
pub const STARTUP_MODE_ID: u32 = 1;

/// Operating system and board services used during startup.
///
/// Fallible calls return the layer's own negative status code on failure.
pub trait Osal {
    type File;

    fn api_init(&mut self) -> Result<(), i32>;

    /// Map the reserved (reset-surviving) memory areas.
    fn setup_reserved_memory_map(&mut self) -> Result<(), i32>;

    fn mkfs(&mut self, device: &str, volume: &str, sector_size: usize, block_count: usize) -> Result<(), i32>;

    fn mount(&mut self, device: &str, mount_point: &str) -> Result<(), i32>;

    fn create(&mut self, path: &str) -> Result<Self::File, i32>;

    /// Returns the number of bytes written.
    fn write(&mut self, file: &mut Self::File, data: &[u8]) -> Result<usize, i32>;

    fn close(&mut self, file: Self::File) -> Result<(), i32>;

    /// Register the PSP modules (I/O drivers).
    fn module_init(&mut self) -> Result<(), i32>;

    /// Board specific setup after the file system is ready.
    fn setup(&mut self) -> Result<(), i32>;

    fn reset_cause(&self) -> ResetCause;

    fn init_reserved_memory(&mut self, reset_type: ResetType) -> Result<(), i32>;

    /// Flight-software main entry.
    fn system_main(&mut self, reset_type: ResetType, subtype: ResetSubtype, mode_id: u32, startup_file: &str);

    /// Abort the application with `code`.
    fn application_exit(&mut self, code: i32) -> !;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartupStage {
    ApiInit,
    ReservedMemoryMap,
    Mkfs,
    Mount,
    CreateStartupFile,
    WriteStartupFile,
    CloseStartupFile,
    ModuleInit,
    Setup,
    ReservedMemoryInit,
}

impl fmt::Display for StartupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StartupStage::ApiInit => "OS API init",
            StartupStage::ReservedMemoryMap => "reserved memory map",
            StartupStage::Mkfs => "mkfs",
            StartupStage::Mount => "mount",
            StartupStage::CreateStartupFile => "create startup file",
            StartupStage::WriteStartupFile => "write startup file",
            StartupStage::CloseStartupFile => "close startup file",
            StartupStage::ModuleInit => "module init",
            StartupStage::Setup => "setup",
            StartupStage::ReservedMemoryInit => "reserved memory init",
        };
        f.write_str(name)
    }
}

/// Failing stage and the status it returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StartupError {
    pub stage: StartupStage,
    pub code: i32,
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed with status {}", self.stage, self.code)
    }
}

trait StageExt<T> {
    fn stage(self, stage: StartupStage) -> Result<T, StartupError>;
}

impl<T> StageExt<T> for Result<T, i32> {
    fn stage(self, stage: StartupStage) -> Result<T, StartupError> {
        self.map_err(|code| StartupError { stage, code })
    }
}

/// Write the embedded startup script to the nonvolatile startup file.
fn install_startup_script<O: Osal>(os: &mut O, script: &[u8]) -> Result<(), StartupError> {
    let mut file = os.create(NONVOL_STARTUP_FILE).stage(StartupStage::CreateStartupFile)?;

    let written = match os.write(&mut file, script) {
        Ok(n) if n == script.len() => Ok(()),
        Ok(n) => {
            warn!("psp: short write of startup file, {} of {} bytes", n, script.len());
            Err(PspError::Error.code())
        }
        Err(code) => Err(code),
    };
    let closed = os.close(file);

    written.stage(StartupStage::WriteStartupFile)?;
    closed.stage(StartupStage::CloseStartupFile)
}

/// Run the startup sequence up to and including the flight-software main
/// entry.
pub fn run_startup<O: Osal>(os: &mut O, target: &TargetConfig) -> Result<(), StartupError> {
    os.api_init().stage(StartupStage::ApiInit)?;
    os.setup_reserved_memory_map().stage(StartupStage::ReservedMemoryMap)?;

    os.mkfs(STARTUP_DEVICE, STARTUP_VOLUME_LABEL, STARTUP_SECTOR_SIZE, STARTUP_BLOCK_COUNT)
        .stage(StartupStage::Mkfs)?;
    os.mount(STARTUP_DEVICE, STARTUP_MOUNT_POINT).stage(StartupStage::Mount)?;
    install_startup_script(os, target.startup_script)?;
    debug!("psp: startup file installed");

    os.module_init().stage(StartupStage::ModuleInit)?;
    os.setup().stage(StartupStage::Setup)?;

    let cause = os.reset_cause();
    let (reset_type, subtype) = cause.classify();
    info!("psp: reset cause {}, type {}, subtype {}", cause, reset_type, subtype);

    os.init_reserved_memory(reset_type).stage(StartupStage::ReservedMemoryInit)?;

    info!("psp: starting flight software on {}", target.cpu_name);
    os.system_main(reset_type, subtype, STARTUP_MODE_ID, NONVOL_STARTUP_FILE);
    Ok(())
}

/// Application startup hook. On failure the application is aborted with the
/// failing stage's status.
pub fn application_startup<O: Osal>(os: &mut O, target: &TargetConfig) {
    if let Err(err) = run_startup(os, target) {
        error!("psp: startup aborted, {} failed ({})", err.stage, err.code);
        os.application_exit(err.code)
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
