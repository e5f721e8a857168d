//! # STM32F4 Register Maps
//!
//! Register addresses and bit layouts of the STM32F4 peripherals used by
//! the board port, with the pure decoding helpers kept apart from the
//! volatile accesses so they can be checked on the host.

use crate::reset::ResetCause;

// ---------------------------------------------------------------------------
// RCC reset flags
// ---------------------------------------------------------------------------

/// RCC clock control & status register (RCC base 0x4002_3800 + 0x74).
pub const RCC_CSR: usize = 0x4002_3874;

/// Remove reset flags.
pub const RCC_CSR_RMVF: u32 = 1 << 24;
pub const RCC_CSR_BORRSTF: u32 = 1 << 25;
pub const RCC_CSR_PINRSTF: u32 = 1 << 26;
pub const RCC_CSR_PORRSTF: u32 = 1 << 27;
pub const RCC_CSR_SFTRSTF: u32 = 1 << 28;
pub const RCC_CSR_IWDGRSTF: u32 = 1 << 29;
pub const RCC_CSR_WWDGRSTF: u32 = 1 << 30;
pub const RCC_CSR_LPWRRSTF: u32 = 1 << 31;

/// Decode the reset flags latched in `RCC_CSR`.
///
/// Several flags are set at once: every internal reset also pulses NRST
/// (PINRSTF) and a power-on also trips the brownout detector. Flags are
/// therefore checked from the most to the least specific.
pub const fn decode_reset_flags(csr: u32) -> ResetCause {
    if csr & RCC_CSR_PORRSTF != 0 {
        ResetCause::PowerOn
    } else if csr & RCC_CSR_BORRSTF != 0 {
        ResetCause::Brownout
    } else if csr & (RCC_CSR_IWDGRSTF | RCC_CSR_WWDGRSTF) != 0 {
        ResetCause::Watchdog
    } else if csr & RCC_CSR_SFTRSTF != 0 {
        ResetCause::Software
    } else if csr & RCC_CSR_LPWRRSTF != 0 {
        ResetCause::Unknown
    } else if csr & RCC_CSR_PINRSTF != 0 {
        ResetCause::Pin
    } else {
        ResetCause::Unknown
    }
}

// ---------------------------------------------------------------------------
// Independent watchdog (IWDG)
// ---------------------------------------------------------------------------

pub const IWDG_KR: usize = 0x4000_3000;
pub const IWDG_PR: usize = 0x4000_3004;
pub const IWDG_RLR: usize = 0x4000_3008;
pub const IWDG_SR: usize = 0x4000_300C;

/// Key register values.
pub const IWDG_KEY_UNLOCK: u32 = 0x5555;
pub const IWDG_KEY_RELOAD: u32 = 0xAAAA;
pub const IWDG_KEY_START: u32 = 0xCCCC;

/// Prescaler setting for LSI / 256.
pub const IWDG_PR_DIV256: u32 = 6;

/// Milliseconds per counter step: LSI at 32 kHz divided by 256.
pub const IWDG_MS_PER_COUNT: u32 = 8;

/// The reload register is 12 bits wide.
pub const IWDG_RLR_MAX: u32 = 0x0FFF;

/// Reload value and effective timeout in ms for a requested timeout.
///
/// Returns `None` for a zero timeout, which cannot be armed.
pub const fn iwdg_reload(timeout_ms: u32) -> Option<(u32, u32)> {
    if timeout_ms == 0 {
        return None;
    }
    let mut reload = timeout_ms / IWDG_MS_PER_COUNT;
    if reload == 0 {
        reload = 1;
    } else if reload > IWDG_RLR_MAX {
        reload = IWDG_RLR_MAX;
    }
    Some((reload, reload * IWDG_MS_PER_COUNT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_on_flags() {
        // POR as latched by hardware: POR + BOR + PIN
        let csr = RCC_CSR_PORRSTF | RCC_CSR_BORRSTF | RCC_CSR_PINRSTF;
        assert_eq!(decode_reset_flags(csr), ResetCause::PowerOn);
        assert_eq!(decode_reset_flags(RCC_CSR_BORRSTF | RCC_CSR_PINRSTF), ResetCause::Brownout);
    }

    #[test]
    fn test_internal_resets_win_over_pin() {
        assert_eq!(decode_reset_flags(RCC_CSR_IWDGRSTF | RCC_CSR_PINRSTF), ResetCause::Watchdog);
        assert_eq!(decode_reset_flags(RCC_CSR_WWDGRSTF | RCC_CSR_PINRSTF), ResetCause::Watchdog);
        assert_eq!(decode_reset_flags(RCC_CSR_SFTRSTF | RCC_CSR_PINRSTF), ResetCause::Software);
        assert_eq!(decode_reset_flags(RCC_CSR_PINRSTF), ResetCause::Pin);
    }

    #[test]
    fn test_no_flags() {
        assert_eq!(decode_reset_flags(0), ResetCause::Unknown);
        assert_eq!(decode_reset_flags(RCC_CSR_LPWRRSTF), ResetCause::Unknown);
    }

    #[test]
    fn test_iwdg_reload() {
        assert_eq!(iwdg_reload(0), None);
        assert_eq!(iwdg_reload(1), Some((1, 8)));
        assert_eq!(iwdg_reload(1000), Some((125, 1000)));
        assert_eq!(iwdg_reload(u32::MAX), Some((0x0FFF, 32_760)));
    }
}
