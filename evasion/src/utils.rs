use std::f64::consts::PI;

// Normalize an angle to the range (-π, π]
pub fn normalize_angle(angle: f64) -> f64 {
    let mut normalized = angle % (2.0 * PI);
    if normalized > PI {
        normalized -= 2.0 * PI;
    } else if normalized <= -PI {
        normalized += 2.0 * PI;
    }
    normalized
}

// Signed difference from the current heading to the goal direction
pub fn heading_error(current_heading: f64, goal_direction: f64) -> f64 {
    normalize_angle(goal_direction - current_heading)
}

// Density of a zero-mean normal distribution with standard deviation sigma
pub fn normal_pdf(x: f64, sigma: f64) -> f64 {
    let z = x / sigma;
    (-0.5 * z * z).exp() / (sigma * (2.0 * PI).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(1.5 * PI) + PI / 2.0).abs() < 1e-12);
        assert!((normalize_angle(-PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((normalize_angle(2.0 * PI + 0.1) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_heading_error_wraps() {
        let e = heading_error(PI - 0.1, -PI + 0.1);
        assert!((e - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_normal_pdf_peak() {
        let peak = normal_pdf(0.0, 1.0);
        assert!((peak - 0.398_942_280_4).abs() < 1e-9);
        assert!(normal_pdf(1.0, 1.0) < peak);
        assert_eq!(normal_pdf(2.0, 3.0), normal_pdf(-2.0, 3.0));
    }
}
