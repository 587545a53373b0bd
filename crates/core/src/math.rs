//! Numerically stable helpers for log-space scores.

/// `ln(e^a + e^b)` without overflow.
///
/// Negative infinity is the identity element, so accumulating into
/// `f64::NEG_INFINITY` is the log-space equivalent of summing into zero.
pub fn log_sum_exp(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    let (max, min) = if a >= b { (a, b) } else { (b, a) };
    max + (min - max).exp().ln_1p()
}

/// Fold [`log_sum_exp`] over an iterator. Empty input yields negative infinity.
pub fn log_sum_exp_all<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    values.into_iter().fold(f64::NEG_INFINITY, log_sum_exp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_sum_exp_matches_direct_sum() {
        let a = 1.5_f64;
        let b = -0.25_f64;
        let direct = (a.exp() + b.exp()).ln();
        assert!((log_sum_exp(a, b) - direct).abs() < 1e-12);
    }

    #[test]
    fn test_log_sum_exp_identity() {
        assert_eq!(log_sum_exp(f64::NEG_INFINITY, 2.0), 2.0);
        assert_eq!(log_sum_exp(2.0, f64::NEG_INFINITY), 2.0);
        assert_eq!(log_sum_exp_all(Vec::new()), f64::NEG_INFINITY);
    }

    #[test]
    fn test_log_sum_exp_large_values() {
        let v = log_sum_exp(1000.0, 1000.0);
        assert!((v - (1000.0 + 2.0_f64.ln())).abs() < 1e-9);
    }
}
