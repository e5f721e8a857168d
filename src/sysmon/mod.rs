//! # CPU Load Monitor
//!
//! A background task samples the RTOS idle-time counters once per
//! `SYSMON_SAMPLE_DELAY_MS` and publishes the CPU load as an analog channel,
//! reachable through the generic I/O driver protocol like any ADC.
//!
//! ## Lifecycle
//!
//! ```text
//!                  start() / spawn ok
//!   ┌──────────┐ ─────────────────────► ┌─────────┐
//!   │ Stopped  │                        │ Running │
//!   └──────────┘ ◄───────────────────── └─────────┘
//!     ▲    │            stop()             │    ▲
//!     └────┘ start() / spawn failed        └────┘ start() (no-op)
//!       stop() (no-op)
//! ```
//!
//! Start zeroes the sampler state so that readings from a previous run
//! never leak into a new one. Stop clears `should_run` and reaps the task;
//! the last published load stays readable.
//!
//! ## Sharing
//!
//! The sampling task is the only writer of [`SamplerCore`]. Dispatch calls
//! read `average_load` from other tasks; each update is computed on a copy
//! and stored in one critical section, so readers see either the previous
//! or the new sample.
//!
//! Only one logical CPU is supported.

pub mod codec;
pub mod dispatch;
pub mod sampler;

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::config::{SYSMON_SAMPLE_DELAY_MS, SYSMON_STACK_SIZE, SYSMON_TASK_NAME, SYSMON_TASK_PRIORITY};
use crate::error::PspError;
use crate::rtos::{Rtos, Task, TaskSpec};
use crate::sync::{self, Mutex};

pub use sampler::{LoadSample, RunTimeCounters, SamplerCore};

/// Parameters of the sampling task.
pub const SYSMON_TASK: TaskSpec = TaskSpec {
    name: SYSMON_TASK_NAME,
    stack_size: SYSMON_STACK_SIZE,
    priority: SYSMON_TASK_PRIORITY,
};

/// CPU load monitor bound to one RTOS port.
///
/// Built in `const` context so the firmware can keep it in a `static` and
/// hand out `&'static` references to the task and the driver registry.
/// There must be one instance per system.
pub struct SysMon<R: Rtos> {
    rtos: R,
    is_running: AtomicBool,
    should_run: AtomicBool,
    task: Mutex<Cell<Option<R::TaskHandle>>>,
    core: Mutex<Cell<SamplerCore>>,
}

impl<R: Rtos> SysMon<R> {
    pub const fn new(rtos: R) -> Self {
        Self {
            rtos,
            is_running: AtomicBool::new(false),
            should_run: AtomicBool::new(false),
            task: Mutex::new(Cell::new(None)),
            core: Mutex::new(Cell::new(SamplerCore::new())),
        }
    }

    /// The RTOS port this monitor runs on.
    pub fn rtos(&self) -> &R {
        &self.rtos
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// Snapshot of the sampler state.
    pub fn core(&self) -> SamplerCore {
        sync::critical_section(|cs| self.core.borrow(cs).get())
    }

    /// Last published load code of CPU 0.
    pub fn average_load(&self) -> u32 {
        self.core().average_load
    }

    /// Start sampling. Does nothing if already running.
    ///
    /// # Returns
    /// - `Ok(())` once the sampling task exists.
    /// - `Err(Error)` if the task could not be created; the monitor is left
    ///   stopped.
    pub fn start(&'static self) -> Result<(), PspError>
    where
        R: 'static,
    {
        if self.is_running() {
            return Ok(());
        }

        sync::critical_section(|cs| self.core.borrow(cs).set(SamplerCore::new()));
        self.should_run.store(true, Ordering::Release);

        match self.rtos.spawn(&SYSMON_TASK, self) {
            Ok(handle) => {
                sync::critical_section(|cs| self.task.borrow(cs).set(Some(handle)));
                self.is_running.store(true, Ordering::Release);
                info!("sysmon: start monitoring");
                Ok(())
            }
            Err(err) => {
                error!("sysmon: failed to create monitor task: {}", err);
                self.is_running.store(false, Ordering::Release);
                self.should_run.store(false, Ordering::Release);
                Err(PspError::Error)
            }
        }
    }

    /// Stop sampling. Does nothing if not running.
    ///
    /// Returns only once the sampling task is no longer scheduled. The last
    /// published load remains readable.
    pub fn stop(&self) -> Result<(), PspError> {
        if self.is_running() {
            info!("sysmon: stop monitoring");
            self.should_run.store(false, Ordering::Release);

            if let Some(handle) = sync::critical_section(|cs| self.task.borrow(cs).take()) {
                self.rtos.reap(handle);
            }

            self.is_running.store(false, Ordering::Release);
        }

        Ok(())
    }

    /// Take one sample and publish it.
    pub fn sample(&self) -> Option<LoadSample> {
        self.take_sample(false)
    }

    /// With `while_running`, the sample is dropped unless `should_run` is
    /// still set when it is stored. The check and the store share one
    /// critical section, so a Stop from an interrupt lands either before the
    /// store (nothing published) or after it.
    fn take_sample(&self, while_running: bool) -> Option<LoadSample> {
        let now = sync::critical_section(|cs| RunTimeCounters {
            idle: self.rtos.idle_run_time(cs),
            total: self.rtos.total_run_time(cs),
        });

        let mut next = self.core();
        let sample = next.update(now);
        let published = sync::critical_section(|cs| {
            if while_running && !self.should_run.load(Ordering::Acquire) {
                return false;
            }
            self.core.borrow(cs).set(next);
            true
        });
        if !published {
            return None;
        }

        if let Some(s) = sample {
            debug!(
                "sysmon: idle {}%, ticks elapsed {}, idle ticks {}",
                s.idle_percent,
                s.total_elapsed,
                s.idle_elapsed
            );
        }
        sample
    }
}

impl<R: Rtos> Task for SysMon<R> {
    /// Sampling loop: delay, sample, until asked to stop. A stop request
    /// that arrives during the delay ends the loop without sampling.
    fn run(&self) {
        while self.should_run.load(Ordering::Acquire) {
            self.rtos.delay_ms(SYSMON_SAMPLE_DELAY_MS);
            if !self.should_run.load(Ordering::Acquire) {
                break;
            }
            self.take_sample(true);
        }
        trace!("sysmon: task exiting");
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtos::mock::{MockRtos, SpawnMode};

    fn monitor(rtos: MockRtos) -> &'static SysMon<MockRtos> {
        MockRtos::leak(SysMon::new(rtos))
    }

    #[test]
    fn test_initial_state() {
        let mon = monitor(MockRtos::new(SpawnMode::Deferred));
        assert!(!mon.is_running());
        assert_eq!(mon.core(), SamplerCore::new());
    }

    #[test]
    fn test_start_spawns_and_zeroes_core() {
        let mon = monitor(MockRtos::new(SpawnMode::Deferred));
        mon.rtos().set_counters(1000, 0);
        mon.sample();
        assert_ne!(mon.core(), SamplerCore::new());

        assert_eq!(mon.start(), Ok(()));
        assert!(mon.is_running());
        assert!(mon.should_run.load(Ordering::Acquire));
        assert_eq!(mon.core(), SamplerCore::new());
        assert_eq!(mon.rtos().pending_tasks(), 1);
    }

    #[test]
    fn test_second_start_is_noop() {
        let mon = monitor(MockRtos::new(SpawnMode::Deferred));
        mon.start().unwrap();

        mon.rtos().set_counters(400, 100);
        mon.sample();
        let published = mon.core();
        assert_eq!(published.average_load, codec::encode_load(75));

        assert_eq!(mon.start(), Ok(()));
        assert_eq!(mon.core(), published);
        assert_eq!(mon.rtos().pending_tasks(), 1);
    }

    #[test]
    fn test_spawn_failure_rolls_back() {
        let mon = monitor(MockRtos::new(SpawnMode::Fail));
        assert_eq!(mon.start(), Err(PspError::Error));
        assert!(!mon.is_running());
        assert!(!mon.should_run.load(Ordering::Acquire));

        // A later start can still succeed
        mon.rtos().set_mode(SpawnMode::Deferred);
        assert_eq!(mon.start(), Ok(()));
        assert!(mon.is_running());
    }

    #[test]
    fn test_stop_reaps_task_and_keeps_reading() {
        let mon = monitor(MockRtos::new(SpawnMode::Deferred));
        mon.start().unwrap();
        mon.rtos().set_counters(1000, 0);
        mon.sample();

        assert_eq!(mon.stop(), Ok(()));
        assert!(!mon.is_running());
        assert!(!mon.should_run.load(Ordering::Acquire));
        assert_eq!(mon.rtos().pending_tasks(), 0);
        assert_eq!(mon.rtos().reaped(), vec![1]);
        assert_eq!(mon.average_load(), 0x1001000);
    }

    #[test]
    fn test_stop_when_stopped_is_noop() {
        let mon = monitor(MockRtos::new(SpawnMode::Deferred));
        assert_eq!(mon.stop(), Ok(()));
        assert!(mon.rtos().reaped().is_empty());
    }

    #[test]
    fn test_zero_elapsed_sample() {
        let mon = monitor(MockRtos::new(SpawnMode::Deferred));
        mon.rtos().set_counters(100, 10);
        mon.sample();
        assert_ne!(mon.average_load(), 0);
        assert_eq!(mon.sample(), None);
        assert_eq!(mon.average_load(), 0);
    }

    #[test]
    fn test_sampling_task_runs_until_stopped() {
        // Every delay advances 100 ticks, 25 of them idle → 75 % load
        let mon = monitor(MockRtos::with_step(SpawnMode::Threaded, 100, 25));
        mon.start().unwrap();
        mon.rtos().wait_for_delays(3);

        assert_eq!(mon.stop(), Ok(()));
        assert!(!mon.is_running());
        assert_eq!(mon.rtos().live_threads(), 0);
        assert_eq!(mon.average_load(), codec::encode_load(75));

        // Nothing samples once stop has returned
        let delays = mon.rtos().delays();
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert_eq!(mon.rtos().delays(), delays);
    }

    #[test]
    fn test_stop_during_delay_publishes_nothing() {
        let mon = monitor(MockRtos::with_step(SpawnMode::Threaded, 100, 25));
        mon.start().unwrap();
        mon.rtos().wait_for_delays(2);

        mon.rtos().hold_delays();
        mon.rtos().wait_parked();
        let published = mon.average_load();
        assert_eq!(published, codec::encode_load(75));

        // Let the delay finish only once stop has cleared should_run, with
        // counters that would read as a 7 % load if sampled
        let waker = std::thread::spawn(move || {
            while mon.should_run.load(Ordering::Acquire) {
                std::thread::sleep(std::time::Duration::from_millis(1));
            }
            mon.rtos().advance(1000, 1000);
            mon.rtos().release_delays();
        });

        assert_eq!(mon.stop(), Ok(()));
        waker.join().unwrap();
        assert!(!mon.is_running());
        assert_eq!(mon.average_load(), published);
    }

    #[test]
    fn test_sample_after_stop_request_is_dropped() {
        let mon = monitor(MockRtos::new(SpawnMode::Deferred));
        mon.start().unwrap();
        mon.rtos().set_counters(400, 100);
        assert!(mon.take_sample(true).is_some());
        let published = mon.average_load();

        mon.should_run.store(false, Ordering::Release);
        mon.rtos().set_counters(800, 400);
        assert_eq!(mon.take_sample(true), None);
        assert_eq!(mon.average_load(), published);

        // Direct sampling is not gated
        assert!(mon.sample().is_some());
        assert_eq!(mon.average_load(), codec::encode_load(25));
        mon.stop().unwrap();
    }

    #[test]
    fn test_restart_after_stop() {
        let mon = monitor(MockRtos::with_step(SpawnMode::Threaded, 100, 50));
        mon.start().unwrap();
        mon.rtos().wait_for_delays(2);
        mon.stop().unwrap();
        assert_eq!(mon.average_load(), codec::encode_load(50));

        mon.rtos().set_mode(SpawnMode::Deferred);
        mon.start().unwrap();
        assert!(mon.is_running());
        assert_eq!(mon.core(), SamplerCore::new());
        mon.stop().unwrap();
    }
}
