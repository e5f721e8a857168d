//! # Scheduler Introspection
//!
//! The PSP does not own a scheduler. It consumes the host RTOS through the
//! [`Rtos`] trait: run-time counters for load accounting, a blocking delay,
//! and creation/reaping of the background tasks the PSP runs.
//!
//! ```text
//!   SysMon ──spawn(spec, &'static dyn Task)──► Rtos port ──► task.run()
//!     │                                           ▲
//!     └──────────────reap(handle)─────────────────┘
//! ```

use crate::error::PspError;
use crate::sync::CriticalSection;

/// Body of a task created through [`Rtos::spawn`].
///
/// The port calls `run` once on the new task's context and tears the task
/// down when it returns.
pub trait Task: Sync {
    fn run(&self);
}

/// Static parameters of a task, fixed at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpec {
    /// Text name of the task, for the RTOS's own diagnostics.
    pub name: &'static str,
    /// Stack size in bytes. Ports counting in words divide by the word size.
    pub stack_size: usize,
    /// Priority relative to the idle task (higher = more important).
    pub priority: u8,
}

/// Scheduler introspection and task control offered by the board's RTOS.
pub trait Rtos: Sync {
    /// Ownership token of a created task.
    type TaskHandle: Copy + Send;

    /// Free-running counter of elapsed run time, in port units.
    ///
    /// The `CriticalSection` token ties the read to the caller's critical
    /// section so it can be paired with [`Rtos::idle_run_time`].
    fn total_run_time(&self, cs: CriticalSection<'_>) -> u32;

    /// Free-running counter of run time spent in the idle task, in the same
    /// units as [`Rtos::total_run_time`].
    fn idle_run_time(&self, cs: CriticalSection<'_>) -> u32;

    /// Block the calling task for at least `ms` milliseconds.
    fn delay_ms(&self, ms: u32);

    /// Create a task running `task`.
    fn spawn(&self, spec: &TaskSpec, task: &'static dyn Task) -> Result<Self::TaskHandle, PspError>;

    /// Release a task created by [`Rtos::spawn`].
    ///
    /// Ports that can wait for the task to leave its entry function do so.
    /// Ports that run the task on the caller's own context (or may be called
    /// from an interrupt) cannot wait; they only free the handle and rely on
    /// the task observing its stop flag before doing further work.
    fn reap(&self, handle: Self::TaskHandle);
}

// ---------------------------------------------------------------------------
// Host-side mock (tests only)
// ---------------------------------------------------------------------------
