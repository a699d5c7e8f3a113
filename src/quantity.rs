#[macro_use]
mod macros;

pub mod cost;
pub mod energy;
pub mod price;

/// Round the value half away from zero to the specified number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10.0_f64.powi(decimals);
    (value * factor).round() / factor
}

/// Parse a sensor state as a finite number.
///
/// Home Assistant reports missing values as `unknown` or `unavailable`, both are rejected here
/// together with `NaN` and infinities.
pub fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_round_to() {
        assert_abs_diff_eq!(round_to(13.166_666, 2), 13.17);
        assert_abs_diff_eq!(round_to(0.123_45, 4), 0.1235);
        assert_abs_diff_eq!(round_to(-1.005_1, 2), -1.01);
    }

    #[test]
    fn test_parse_finite() {
        assert_eq!(parse_finite(" 102.5 "), Some(102.5));
        assert_eq!(parse_finite("unavailable"), None);
        assert_eq!(parse_finite("NaN"), None);
        assert_eq!(parse_finite("inf"), None);
        assert_eq!(parse_finite(""), None);
    }
}
