use std::ops::Mul;

use crate::quantity::{cost::Cost, price::KilowattHourPrice};

quantity!(KilowattHours, suffix: "kWh", precision: 3);

impl Mul<KilowattHourPrice> for KilowattHours {
    type Output = Cost;

    fn mul(self, rhs: KilowattHourPrice) -> Self::Output {
        Cost(self.0 * rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_mul_price() {
        assert_abs_diff_eq!((KilowattHours(2.5) * KilowattHourPrice(2.0)).0, 5.0);
    }

    #[test]
    fn test_non_negative() {
        assert_eq!(KilowattHours(-1.0).non_negative(), KilowattHours::ZERO);
        assert_eq!(KilowattHours(1.5).non_negative(), KilowattHours(1.5));
    }

    #[test]
    fn test_ordering() {
        assert!(KilowattHours(10.0) > KilowattHours(9.999));
        assert_eq!(KilowattHours(1.0).max(KilowattHours(2.0)), KilowattHours(2.0));
    }
}
