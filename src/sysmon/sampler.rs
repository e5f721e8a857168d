//! # Load Sampler Core
//!
//! Utilization is derived from two free-running counters: total run time
//! and run time spent in the idle task. Between two samples:
//!
//! ```text
//!   idle%  = (idle_now - idle_prev) * 100 / (total_now - total_prev)
//!   load%  = 100 - idle%
//!   code   = codec::encode_load(load%)
//! ```
//!
//! Differences use wrapping arithmetic, so a counter rollover between two
//! samples still yields the true elapsed delta.

use crate::config::SYSMON_MAX_SCALE;
use crate::sysmon::codec;

/// One pair of run-time counters, read together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunTimeCounters {
    pub total: u32,
    pub idle: u32,
}

/// Figures of one sampling cycle, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSample {
    pub total_elapsed: u32,
    pub idle_elapsed: u32,
    pub idle_percent: u32,
    pub load_percent: u32,
}

/// Sampling state of one CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SamplerCore {
    /// Total run-time counter at the last sample.
    pub last_total_ticks: u32,
    /// Idle run-time counter at the last sample.
    pub last_idle_ticks: u32,
    /// Encoded load of the last sample (see [`codec`]).
    pub average_load: u32,
}

impl SamplerCore {
    pub const fn new() -> Self {
        Self {
            last_total_ticks: 0,
            last_idle_ticks: 0,
            average_load: 0,
        }
    }

    /// Fold the counters read at `now` into the state.
    ///
    /// Returns the figures of this cycle, or `None` when no run time elapsed
    /// since the last sample (the load is then published as 0).
    pub fn update(&mut self, now: RunTimeCounters) -> Option<LoadSample> {
        let idle_elapsed = now.idle.wrapping_sub(self.last_idle_ticks);
        let total_elapsed = now.total.wrapping_sub(self.last_total_ticks);

        let sample = if total_elapsed > 0 {
            let idle_percent =
                ((u64::from(idle_elapsed) * u64::from(SYSMON_MAX_SCALE)) / u64::from(total_elapsed)) as u32;
            // Idle can only exceed total with inconsistent counters; report 0 % then
            let load_percent = SYSMON_MAX_SCALE.saturating_sub(idle_percent);

            self.average_load = codec::encode_load(load_percent);

            Some(LoadSample {
                total_elapsed,
                idle_elapsed,
                idle_percent,
                load_percent,
            })
        } else {
            self.average_load = 0;
            None
        };

        self.last_idle_ticks = now.idle;
        self.last_total_ticks = now.total;

        sample
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(total: u32, idle: u32) -> RunTimeCounters {
        RunTimeCounters { total, idle }
    }

    #[test]
    fn test_no_elapsed_time_publishes_zero() {
        let mut core = SamplerCore {
            last_total_ticks: 500,
            last_idle_ticks: 100,
            average_load: 0xC00C00,
        };
        assert_eq!(core.update(counters(500, 100)), None);
        assert_eq!(core.average_load, 0);
    }

    #[test]
    fn test_fully_idle_is_zero_load() {
        let mut core = SamplerCore::new();
        let s = core.update(counters(1000, 1000)).unwrap();
        assert_eq!(s.idle_percent, 100);
        assert_eq!(s.load_percent, 0);
        assert_eq!(core.average_load, 0);
    }

    #[test]
    fn test_fully_busy_is_full_scale() {
        let mut core = SamplerCore::new();
        let s = core.update(counters(1000, 0)).unwrap();
        assert_eq!(s.load_percent, 100);
        assert_eq!(core.average_load, 0x1001000);
    }

    #[test]
    fn test_partial_load_and_state_carry() {
        let mut core = SamplerCore::new();
        core.update(counters(1000, 250)).unwrap();
        assert_eq!(core.average_load, codec::encode_load(75));
        assert_eq!(core.last_total_ticks, 1000);
        assert_eq!(core.last_idle_ticks, 250);

        // Second window: 1000 ticks, 900 idle → 10 % load
        let s = core.update(counters(2000, 1150)).unwrap();
        assert_eq!(s.total_elapsed, 1000);
        assert_eq!(s.idle_elapsed, 900);
        assert_eq!(s.load_percent, 10);
        assert_eq!(core.average_load, codec::encode_load(10));
    }

    #[test]
    fn test_idle_percent_is_floored() {
        let mut core = SamplerCore::new();
        // 2/3 idle → 66 % idle → 34 % load
        let s = core.update(counters(3, 2)).unwrap();
        assert_eq!(s.idle_percent, 66);
        assert_eq!(s.load_percent, 34);
    }

    #[test]
    fn test_counter_rollover() {
        let mut core = SamplerCore {
            last_total_ticks: u32::MAX - 99,
            last_idle_ticks: u32::MAX - 49,
            average_load: 0,
        };
        // 200 ticks elapsed across the wrap, 50 of them idle
        let s = core.update(counters(100, 0)).unwrap();
        assert_eq!(s.total_elapsed, 200);
        assert_eq!(s.idle_elapsed, 50);
        assert_eq!(s.load_percent, 75);
    }

    #[test]
    fn test_large_deltas_do_not_overflow() {
        let mut core = SamplerCore::new();
        let s = core.update(counters(u32::MAX, u32::MAX / 2)).unwrap();
        assert_eq!(s.idle_percent, 49);
        assert_eq!(s.load_percent, 51);
    }

    #[test]
    fn test_inconsistent_counters_clamp_to_zero_load() {
        let mut core = SamplerCore::new();
        let s = core.update(counters(100, 300)).unwrap();
        assert_eq!(s.load_percent, 0);
        assert_eq!(core.average_load, 0);
    }

    #[test]
    fn test_duplication_invariant_on_samples() {
        for idle in 1..=100u32 {
            let mut core = SamplerCore::new();
            core.update(counters(100, idle)).unwrap();
            let v = core.average_load;
            assert_eq!(v & 0xFFF, (v >> 12) & 0xFFF, "idle {}", idle);
        }
    }
}
