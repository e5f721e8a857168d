//! # PSP status codes
//!
//! Every PSP operation reports success or one of a small set of failure
//! codes. Internally operations return `Result<u32, PspError>`; the driver
//! dispatch boundary folds that into the signed status word callers expect
//! (non-negative = success or lookup result, negative = error).

use core::fmt;

/// Status word for a successful operation.
pub const SUCCESS: i32 = 0;

/// Failure of a PSP operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(i32)]
pub enum PspError {
    /// The operation was attempted and failed (task spawn failure,
    /// out-of-range channel request, ...).
    Error = -1,
    /// The command is unknown to the driver or reserved for future use.
    NotImplemented = -27,
}

impl PspError {
    /// Signed status word for this error.
    #[inline]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for PspError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PspError::Error => f.write_str("operation failed"),
            PspError::NotImplemented => f.write_str("not implemented"),
        }
    }
}

/// Fold an operation result into a status word.
///
/// `Ok(v)` becomes `v` (a lookup index, a flag, or `0` for plain success).
/// Values that would not fit a non-negative `i32` are reported as `Error`.
pub fn status(result: Result<u32, PspError>) -> i32 {
    match result {
        Ok(value) => i32::try_from(value).unwrap_or(PspError::Error.code()),
        Err(err) => err.code(),
    }
}
