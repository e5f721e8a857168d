//! # Time base
//!
//! PSP view of the board's low-resolution tick: tick rate, current time
//! and the two-word timebase used by performance logging.

use crate::config::{TICK_HZ, TIMER_LOW32_ROLLOVER};

/// Free-running tick counter of the board, incremented at `TICK_HZ`.
pub trait TickSource {
    fn lo_res_tick(&self) -> u32;
}

impl<T: TickSource + ?Sized> TickSource for &T {
    fn lo_res_tick(&self) -> u32 {
        (**self).lo_res_tick()
    }
}

/// Time since boot with microsecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OsTime {
    pub total_micros: i64,
}

impl OsTime {
    pub const fn from_total_micros(total_micros: i64) -> Self {
        Self { total_micros }
    }

    pub const fn seconds(&self) -> i64 {
        self.total_micros / 1_000_000
    }

    pub const fn subsec_micros(&self) -> u32 {
        (self.total_micros % 1_000_000) as u32
    }
}

/// Timebase words: `upper` counts rollovers of `lower`, the raw counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timebase {
    pub upper: u32,
    pub lower: u32,
}

pub struct Timer<T: TickSource> {
    source: T,
}

impl<T: TickSource> Timer<T> {
    pub const fn new(source: T) -> Self {
        Self { source }
    }

    #[inline]
    pub const fn ticks_per_second(&self) -> u32 {
        TICK_HZ
    }

    #[inline]
    pub const fn low32_rollover(&self) -> u32 {
        TIMER_LOW32_ROLLOVER
    }

    /// Current time from the tick counter.
    pub fn get_time(&self) -> OsTime {
        let ticks = i64::from(self.source.lo_res_tick());
        OsTime::from_total_micros(ticks * 1_000_000 / i64::from(self.ticks_per_second()))
    }

    /// Rollovers are not tracked, so `upper` is always 0.
    pub fn timebase(&self) -> Timebase {
        Timebase {
            upper: 0,
            lower: self.source.lo_res_tick(),
        }
    }
}
