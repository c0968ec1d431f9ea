//! # Fiscal Number Formatting
//!
//! A fiscal number is `prefix + zero-padded digits + suffix`:
//!
//! ```text
//!   prefix     number    padding   suffix        result
//!   ───────    ──────    ───────   ──────        ──────────────
//!   "B01-"     5         4         ""        →   "B01-0005"
//!   "B01-"     123       2         ""        →   "B01-123"      (never truncated)
//!   "FACT-"    42        6         "-A"      →   "FACT-000042-A"
//! ```
//!
//! Formatting is applied after the counter has been incremented, so it never
//! takes part in the atomic section.

use crate::MAX_PADDING_LENGTH;

/// Left-pads `number` with zeros to at least `width` digits.
///
/// Numbers wider than `width` are returned whole. A non-positive width
/// behaves like no padding and widths above [`MAX_PADDING_LENGTH`] are
/// clamped to it. Negative numbers keep their sign in front of the padded
/// magnitude.
pub fn zero_pad(number: i64, width: i64) -> String {
    let width = usize::try_from(width.clamp(0, MAX_PADDING_LENGTH)).unwrap_or(0);
    let (sign, digits) = if number < 0 {
        ("-", number.unsigned_abs().to_string())
    } else {
        ("", number.to_string())
    };
    let fill = width.saturating_sub(sign.len() + digits.len());

    format!("{}{}{}", sign, "0".repeat(fill), digits)
}

/// Builds the fiscal number shown on a document.
///
/// ## Example
/// ```rust
/// use factura_core::numbering::preview_fiscal_number;
///
/// assert_eq!(preview_fiscal_number("B01-", "", 5, 4), "B01-0005");
/// assert_eq!(preview_fiscal_number("", "-X", 7, 3), "007-X");
/// ```
pub fn preview_fiscal_number(prefix: &str, suffix: &str, number: i64, padding_length: i64) -> String {
    format!("{}{}{}", prefix, zero_pad(number, padding_length), suffix)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pads_to_width() {
        assert_eq!(preview_fiscal_number("B01-", "", 5, 4), "B01-0005");
        assert_eq!(zero_pad(1, 8), "00000001");
    }

    #[test]
    fn test_wider_number_is_not_truncated() {
        assert_eq!(preview_fiscal_number("B01-", "", 123, 2), "B01-123");
        assert_eq!(zero_pad(123456789, 3), "123456789");
    }

    #[test]
    fn test_suffix_and_empty_prefix() {
        assert_eq!(preview_fiscal_number("FACT-", "-A", 42, 6), "FACT-000042-A");
        assert_eq!(preview_fiscal_number("", "", 0, 1), "0");
    }

    #[test]
    fn test_degenerate_widths() {
        assert_eq!(zero_pad(7, 0), "7");
        assert_eq!(zero_pad(7, -3), "7");
        assert_eq!(zero_pad(-7, 3), "-07");
    }

    #[test]
    fn test_large_numbers() {
        assert_eq!(zero_pad(i64::MAX, 20), "09223372036854775807");
        assert_eq!(zero_pad(i64::MIN, 20), "-9223372036854775808");
    }

    #[test]
    fn test_oversized_width_is_clamped() {
        let expected = format!("{}1", "0".repeat(19));
        assert_eq!(zero_pad(1, 100_000), expected);
        assert_eq!(zero_pad(1, 1 << 28), expected);
        assert_eq!(zero_pad(1, i64::MAX), expected);
        assert_eq!(preview_fiscal_number("B01-", "", 5, 1 << 28), format!("B01-{}", expected));
    }
}
