//! Cyclical calendar encodings

use std::f64::consts::PI;

/// Period used for week-of-year encodings. ISO years have 52 or 53 weeks.
pub const WEEKS_PER_YEAR: f64 = 53.0;

/// Encode a position in a cycle as `(sin, cos)` so that the end of the cycle
/// sits next to its start.
pub fn cyclical_encoding(position: f64, period: f64) -> (f64, f64) {
    let angle = 2.0 * PI * position / period;
    (angle.sin(), angle.cos())
}

/// Encode an ISO week number (1..=53)
pub fn week_of_year_encoding(week: u32) -> (f64, f64) {
    cyclical_encoding(week as f64, WEEKS_PER_YEAR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_encoding_on_unit_circle() {
        for week in 1..=53 {
            let (s, c) = week_of_year_encoding(week);
            assert_abs_diff_eq!(s * s + c * c, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_year_boundary_is_continuous() {
        let (s53, c53) = week_of_year_encoding(53);
        let (s1, c1) = week_of_year_encoding(1);
        let (s26, c26) = week_of_year_encoding(26);

        let wrap = ((s53 - s1).powi(2) + (c53 - c1).powi(2)).sqrt();
        let mid = ((s26 - s1).powi(2) + (c26 - c1).powi(2)).sqrt();
        assert!(wrap < mid);
        // Week 53 lands where week 0 would be
        assert_abs_diff_eq!(s53, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c53, 1.0, epsilon = 1e-12);
    }
}
