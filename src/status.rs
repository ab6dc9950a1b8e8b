//! Status code translation.
//!
//! The compute service reports completion status as an HRESULT. Failures are
//! normalized to Win32 error codes before they reach the waiting caller.

use crate::error::{WaitError, WaitResult};

const FACILITY_WIN32_MASK: u32 = 0x1fff_0000;
const FACILITY_WIN32_BITS: u32 = 0x0007_0000;

/// Extracts the Win32 code from an HRESULT in the `FACILITY_WIN32` range.
///
/// Any other HRESULT is returned unchanged.
#[must_use]
pub const fn win32_from_hresult(hr: u32) -> u32 {
    if hr & FACILITY_WIN32_MASK == FACILITY_WIN32_BITS {
        hr & 0xffff
    } else {
        hr
    }
}

/// Returns true if the status denotes failure (negative as a signed 32-bit value).
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub const fn is_failure(status: usize) -> bool {
    (status as u32 as i32) < 0
}

/// Translates a raw status into the outcome delivered to a waiter.
///
/// Only the low 32 bits are significant; the native boundary passes a
/// pointer-wide value.
#[allow(clippy::cast_possible_truncation)]
pub fn translate(status: usize) -> WaitResult {
    if is_failure(status) {
        let hresult = status as u32;
        Err(WaitError::Status {
            hresult,
            code: win32_from_hresult(hresult),
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_statuses() {
        assert_eq!(translate(0), Ok(()));
        assert_eq!(translate(1), Ok(()));
        assert_eq!(translate(0x7fff_ffff), Ok(()));
    }

    #[test]
    fn test_win32_facility_is_unwrapped() {
        // E_ACCESSDENIED
        assert_eq!(win32_from_hresult(0x8007_0005), 5);
        assert_eq!(
            translate(0x8007_0005),
            Err(WaitError::Status {
                hresult: 0x8007_0005,
                code: 5
            })
        );
    }

    #[test]
    fn test_other_facility_passes_through() {
        // HCS_E_TERMINATED
        let hr = 0x8037_0101;
        assert_eq!(win32_from_hresult(hr), hr);
        assert_eq!(translate(hr as usize).unwrap_err().code(), Some(hr));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_only_low_word_is_inspected() {
        assert_eq!(translate(0x1_8007_0002).unwrap_err().code(), Some(2));
        assert_eq!(translate(0x1_0000_0000), Ok(()));
        assert_eq!(translate(0xffff_ffff_0000_0000), Ok(()));
    }
}
