//! # Synchronization Primitives
//!
//! Critical section abstraction shared by the load monitor, the board port
//! and the drivers. On the Cortex-M4 board the implementation disables
//! interrupts (`cortex-m`'s single-core implementation); hosted builds use
//! the `critical-section` crate's std implementation.

pub use critical_section::{CriticalSection, Mutex};

/// Execute a closure within a critical section.
///
/// This is the mechanism for reading values that must be observed
/// together, such as the idle and total run-time counters of one sample.
///
/// # Usage
/// ```ignore
/// sync::critical_section(|cs| {
///     // Access shared state safely
/// });
/// ```
///
/// # Performance
/// Keep critical sections as short as possible to minimize interrupt latency.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(CriticalSection<'_>) -> R,
{
    critical_section::with(f)
}
