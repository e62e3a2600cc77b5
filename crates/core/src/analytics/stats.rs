//! Small numeric helpers shared by the analyzers

/// Arithmetic mean, 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n, not n - 1)
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Pearson correlation over the common prefix of two series
///
/// Both series are truncated to the shorter length and paired by index.
/// Returns 0 when fewer than two pairs remain or when either side has no
/// variance relative to its magnitude, so the result is always finite.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let mean_a = mean(a);
    let mean_b = mean(b);

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let da = x - mean_a;
        let db = y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    if is_flat(var_a, a) || is_flat(var_b, b) {
        return 0.0;
    }
    let denom = var_a.sqrt() * var_b.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    (cov / denom).clamp(-1.0, 1.0)
}

/// Variance indistinguishable from rounding noise relative to the values' magnitude
fn is_flat(variance: f64, values: &[f64]) -> bool {
    let magnitude: f64 = values.iter().map(|v| v * v).sum();
    variance <= f64::EPSILON * magnitude
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_population_std_dev() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((population_std_dev(&values) - 2.0).abs() < 1e-12);
        assert_eq!(population_std_dev(&[]), 0.0);
        assert_eq!(population_std_dev(&[3.0]), 0.0);
    }

    #[test]
    fn test_pearson_self_is_one() {
        let a = vec![1.0, 3.0, 2.0, 8.0, 5.0];
        assert!((pearson(&a, &a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_is_symmetric() {
        let a = vec![1.0, 2.0, 4.0, 3.0, 9.0];
        let b = vec![7.0, 1.0, 3.0, 3.5, 2.0];
        assert_eq!(pearson(&a, &b), pearson(&b, &a));
    }

    #[test]
    fn test_pearson_inverse() {
        let a = vec![1.0, 2.0, 3.0, 4.0];
        let b = vec![8.0, 6.0, 4.0, 2.0];
        assert!((pearson(&a, &b) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_truncates_to_shorter() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![2.0, 4.0, 6.0, -100.0, 50.0];
        assert!((pearson(&a, &b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_is_scale_invariant() {
        let tiny = vec![1e-9, 2e-9, 3e-9, 5e-9];
        assert!((pearson(&tiny, &tiny) - 1.0).abs() < 1e-12);

        let huge: Vec<f64> = tiny.iter().map(|v| v * 1e18).collect();
        assert!((pearson(&tiny, &huge) - 1.0).abs() < 1e-12);

        let very_small = vec![1e-150, 3e-150, 2e-150];
        assert!((pearson(&very_small, &very_small) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_rounding_noise_is_flat() {
        let constant = vec![0.1; 7];
        let varying = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        assert_eq!(pearson(&constant, &varying), 0.0);
    }

    #[test]
    fn test_pearson_degenerate_inputs() {
        assert_eq!(pearson(&[1.0], &[2.0]), 0.0);
        assert_eq!(pearson(&[], &[]), 0.0);
        let constant = vec![5.0; 10];
        let result = pearson(&constant, &constant);
        assert_eq!(result, 0.0);
        assert!(!result.is_nan());
    }
}
