//! Billing calculations
//!
//! Pure computation over domain models. Lifetime charges live on the tariff
//! rule itself; this module adds the period-scoped billing used by the
//! monthly run.

pub mod period;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// Convert a physical quantity or day count into an exact decimal for money
/// arithmetic. Non-finite inputs collapse to zero.
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_to_decimal() {
        assert_eq!(to_decimal(2.5), dec!(2.5));
        assert_eq!(to_decimal(0.0), Decimal::ZERO);
        assert_eq!(to_decimal(f64::NAN), Decimal::ZERO);
    }
}
