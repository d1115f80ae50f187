use rust_decimal::prelude::*;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// VAT rate applied to commissions and invoices (percent)
pub const VAT_RATE: Decimal = Decimal::from_parts(19, 0, 0, false, 0);

/// Current UTC time as Unix milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Round a monetary value to 2 decimal places (midpoint away from zero)
#[inline]
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// `value × percent / 100`, rounded
#[inline]
pub fn percent_of(value: Decimal, percent: Decimal) -> Decimal {
    round2(value * percent / Decimal::ONE_HUNDRED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round2_half_up() {
        assert_eq!(round2(dec!(1.005)), dec!(1.01));
        assert_eq!(round2(dec!(1.004)), dec!(1.00));
        assert_eq!(round2(dec!(-1.005)), dec!(-1.01));
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(dec!(100), dec!(7)), dec!(7.00));
        assert_eq!(percent_of(dec!(33.33), dec!(5)), dec!(1.67));
    }

    #[test]
    fn test_vat_rate() {
        assert_eq!(VAT_RATE, dec!(19));
    }
}
