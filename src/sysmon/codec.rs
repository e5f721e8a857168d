//! # Load channel codec
//!
//! The load is published as if it came from a 24-bit ADC. The real
//! resolution is 12 bits: the percentage is scaled to a fraction of
//! `0x1000` and that fraction is duplicated into bits [23:12] and [11:0],
//! so the low half is not misleadingly zero-padded.
//!
//! ```text
//!   percent ──► f = 0x1000 * percent / 100 ──► code = f | (f << 12)
//! ```
//!
//! The scaling is kept exactly as above: a full 100 % load yields
//! `f = 0x1000`, which carries into bit 24 (`0x1001000`).

use crate::config::SYSMON_MAX_SCALE;

/// Denominator of the 12-bit fraction.
pub const FRACTION_ONE: u32 = 0x1000;

/// Encode a load percentage (`0..=100`) into an analog channel code.
#[inline]
pub const fn encode_load(load_percent: u32) -> u32 {
    let fraction = (FRACTION_ONE * load_percent) / SYSMON_MAX_SCALE;
    fraction | (fraction << 12)
}

/// Recover the load percentage from a channel code produced by
/// [`encode_load`].
///
/// The upper half holds the fraction; for 100 % the fraction is `0x1000`
/// and overlaps the duplicated low half, hence the clamp. The fraction was
/// floored on the way in, so the percentage is rounded up on the way out.
#[inline]
pub const fn decode_load(code: u32) -> u32 {
    let mut fraction = code >> 12;
    if fraction > FRACTION_ONE {
        fraction = FRACTION_ONE;
    }
    (fraction * SYSMON_MAX_SCALE + (FRACTION_ONE - 1)) / FRACTION_ONE
}
