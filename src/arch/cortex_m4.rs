//! # Cortex-M4 Port Layer
//!
//! Hardware-specific code for the ARM Cortex-M4 (Thumb-2) STM32F4 board:
//! SysTick time base, run-time accounting, the single-slot task port, the
//! independent watchdog and the reset controller.
//!
//! ## Run-time accounting
//!
//! ```text
//!   SysTick (TICK_HZ) ──► TICKS += 1
//!                     └─► IDLE_TICKS += 1   while IN_IDLE
//!
//!   delay_ms: IN_IDLE = true ─► WFI until deadline ─► IN_IDLE = false
//! ```
//!
//! The board has no preemptive scheduler. Time spent sleeping in
//! `delay_ms` is the idle time; everything else counts as load.
//!
//! ## Interrupt Priorities
//!
//! - SysTick: Priority 0xFF (lowest), so it never delays board interrupts.

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::SCB;

use crate::arch::stm32f4::{
    decode_reset_flags, iwdg_reload, IWDG_KEY_RELOAD, IWDG_KEY_START, IWDG_KEY_UNLOCK, IWDG_KR, IWDG_PR,
    IWDG_PR_DIV256, IWDG_RLR, IWDG_SR, RCC_CSR, RCC_CSR_RMVF,
};
use crate::config::{SYSTEM_CLOCK_HZ, TICK_HZ};
use crate::error::PspError;
use crate::reset::{HardwareReset, ResetCause, ResetHal};
use crate::rtos::{Rtos, Task, TaskSpec};
use crate::sync::{self, CriticalSection, Mutex};
use crate::timer::TickSource;
use crate::watchdog::WatchdogHal;

static TICKS: AtomicU32 = AtomicU32::new(0);
static IDLE_TICKS: AtomicU32 = AtomicU32::new(0);
static IN_IDLE: AtomicBool = AtomicBool::new(false);

// ---------------------------------------------------------------------------
// SysTick configuration
// ---------------------------------------------------------------------------

/// Configure the SysTick timer for the board tick.
///
/// Sets up SysTick to fire at `TICK_HZ` frequency using the processor
/// clock. Each tick triggers `SysTick` which updates the run-time counters.
///
/// # Parameters
/// - `syst`: Mutable reference to the SysTick peripheral
pub fn configure_systick(syst: &mut cortex_m::peripheral::SYST) {
    let reload = SYSTEM_CLOCK_HZ / TICK_HZ - 1;
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_counter();
    syst.enable_interrupt();
}

/// Set SysTick to the lowest interrupt priority.
pub fn set_interrupt_priorities() {
    unsafe {
        // System Handler Priority Register 3 (SHPR3): 0xE000_ED20
        // Bits [31:24] = SysTick priority
        let shpr3: *mut u32 = 0xE000_ED20 as *mut u32;
        let val = core::ptr::read_volatile(shpr3);
        core::ptr::write_volatile(shpr3, val | (0xFF << 24));
    }
}

// ---------------------------------------------------------------------------
// SysTick handler
// ---------------------------------------------------------------------------

/// SysTick exception handler. Called at `TICK_HZ` frequency.
#[no_mangle]
pub unsafe extern "C" fn SysTick() {
    TICKS.fetch_add(1, Ordering::Relaxed);
    if IN_IDLE.load(Ordering::Relaxed) {
        IDLE_TICKS.fetch_add(1, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Task port
// ---------------------------------------------------------------------------

/// RTOS port of the board.
///
/// Holds one spawned task, which the firmware's main loop runs through
/// [`CortexM4Port::run_spawned`]. Handles are generation numbers so a stale
/// handle never reaps a newer task.
pub struct CortexM4Port {
    slot: Mutex<Cell<Option<(u32, &'static dyn Task)>>>,
    generation: AtomicU32,
}

impl CortexM4Port {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(Cell::new(None)),
            generation: AtomicU32::new(0),
        }
    }

    /// Run the spawned task, if any, on the caller's context.
    ///
    /// Returns `false` when the slot is empty. The slot is released once the
    /// task returns.
    pub fn run_spawned(&self) -> bool {
        let Some((handle, task)) = sync::critical_section(|cs| self.slot.borrow(cs).get()) else {
            return false;
        };

        task.run();
        self.release(handle);
        true
    }

    fn release(&self, handle: u32) {
        sync::critical_section(|cs| {
            let slot = self.slot.borrow(cs);
            if matches!(slot.get(), Some((h, _)) if h == handle) {
                slot.set(None);
            }
        });
    }
}

impl Default for CortexM4Port {
    fn default() -> Self {
        Self::new()
    }
}

impl Rtos for CortexM4Port {
    type TaskHandle = u32;

    fn total_run_time(&self, _cs: CriticalSection<'_>) -> u32 {
        TICKS.load(Ordering::Relaxed)
    }

    fn idle_run_time(&self, _cs: CriticalSection<'_>) -> u32 {
        IDLE_TICKS.load(Ordering::Relaxed)
    }

    fn delay_ms(&self, ms: u32) {
        let ticks = ((u64::from(ms) * u64::from(TICK_HZ)) / 1000) as u32;
        let start = TICKS.load(Ordering::Relaxed);

        IN_IDLE.store(true, Ordering::Relaxed);
        while TICKS.load(Ordering::Relaxed).wrapping_sub(start) < ticks {
            cortex_m::asm::wfi();
        }
        IN_IDLE.store(false, Ordering::Relaxed);
    }

    fn spawn(&self, spec: &TaskSpec, task: &'static dyn Task) -> Result<u32, PspError> {
        let handle = self.generation.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let placed = sync::critical_section(|cs| {
            let slot = self.slot.borrow(cs);
            if slot.get().is_some() {
                false
            } else {
                slot.set(Some((handle, task)));
                true
            }
        });

        if placed {
            debug!("port: task {} placed in slot ({})", spec.name, handle);
            Ok(handle)
        } else {
            warn!("port: no free slot for task {}", spec.name);
            Err(PspError::Error)
        }
    }

    /// The task runs on the main loop's context, so this cannot wait for it.
    /// It frees the slot; the task ends at its next `should_run` check.
    fn reap(&self, handle: u32) {
        self.release(handle);
    }
}

impl TickSource for CortexM4Port {
    fn lo_res_tick(&self) -> u32 {
        TICKS.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Independent watchdog
// ---------------------------------------------------------------------------

/// STM32 independent watchdog, clocked from the 32 kHz LSI.
pub struct Iwdg {
    _private: (),
}

impl Iwdg {
    pub const fn new() -> Self {
        Self { _private: () }
    }

    #[inline]
    fn write(addr: usize, value: u32) {
        unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
    }
}

impl Default for Iwdg {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchdogHal for Iwdg {
    /// Once started the IWDG only stops on reset.
    fn disable(&mut self) {
        trace!("iwdg: cannot be stopped");
    }

    fn enable(&mut self, timeout_ms: u32) -> u32 {
        let Some((reload, effective)) = iwdg_reload(timeout_ms) else {
            return 0;
        };

        Self::write(IWDG_KR, IWDG_KEY_START);
        Self::write(IWDG_KR, IWDG_KEY_UNLOCK);
        Self::write(IWDG_PR, IWDG_PR_DIV256);
        Self::write(IWDG_RLR, reload);
        // PVU/RVU clear once the new values reached the LSI domain
        while unsafe { core::ptr::read_volatile(IWDG_SR as *const u32) } & 0b11 != 0 {}
        Self::write(IWDG_KR, IWDG_KEY_RELOAD);

        effective
    }

    fn feed(&mut self) {
        Self::write(IWDG_KR, IWDG_KEY_RELOAD);
    }
}

// ---------------------------------------------------------------------------
// Reset controller
// ---------------------------------------------------------------------------

/// Reset controller. Latches and clears the RCC reset flags when created,
/// so it must be created once per boot.
pub struct ScbReset {
    cause: ResetCause,
}

impl ScbReset {
    pub fn new() -> Self {
        let csr = unsafe { core::ptr::read_volatile(RCC_CSR as *const u32) };
        unsafe { core::ptr::write_volatile(RCC_CSR as *mut u32, csr | RCC_CSR_RMVF) };
        Self {
            cause: decode_reset_flags(csr),
        }
    }
}

impl ResetHal for ScbReset {
    fn reset_cause(&self) -> ResetCause {
        self.cause
    }

    /// The core can only request a system reset; a power-on reset request
    /// falls back to it.
    fn system_restart(&self, kind: HardwareReset) -> ! {
        if kind == HardwareReset::PowerOn {
            warn!("reset: power-on reset not available, using system reset");
        }
        SCB::sys_reset()
    }
}
