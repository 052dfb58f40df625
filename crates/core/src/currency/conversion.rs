//! Currency conversion arithmetic.
//!
//! CRITICAL: Rounding strategy for multi-currency:
//! - Always round to the target precision
//! - Use banker's rounding (round half to even)
//! - Store both original and converted amounts

use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

/// Converts an amount using the given exchange rate.
///
/// Uses banker's rounding (round half to even) to minimize cumulative errors.
#[must_use]
pub fn convert_amount(amount: Decimal, rate: Decimal, decimal_places: u32) -> Decimal {
    let converted = amount * rate;
    converted.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointNearestEven)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_convert_amount() {
        // 100 EUR * 1.08 = 108 USD
        let result = convert_amount(dec!(100), dec!(1.08), 2);
        assert_eq!(result, dec!(108.00));
    }

    #[test]
    fn test_convert_with_rounding() {
        // 33.33 GBP * 1.2649 = 42.159... -> 42.16
        let result = convert_amount(dec!(33.33), dec!(1.2649), 2);
        assert_eq!(result, dec!(42.16));
    }

    #[test]
    fn test_bankers_rounding() {
        // Round half to even: 2.5 -> 2, 3.5 -> 4
        assert_eq!(convert_amount(dec!(1), dec!(2.5), 0), dec!(2));
        assert_eq!(convert_amount(dec!(1), dec!(3.5), 0), dec!(4));
    }

    #[test]
    fn test_identity_rate() {
        let result = convert_amount(dec!(500), Decimal::ONE, 2);
        assert_eq!(result, dec!(500.00));
    }
}
