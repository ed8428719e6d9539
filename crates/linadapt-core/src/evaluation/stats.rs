//! Statistical significance testing for retrieval comparisons.
//!
//! Mean metric deltas between two embedding spaces can come from noise, so
//! the report backs them with a paired t-test and an effect size. Both
//! systems score the same queries, which makes the paired test the right
//! one.
//!
//! # References
//!
//! - Smucker et al. (2007). "A comparison of statistical significance tests for IR evaluation"

use crate::error::EvalError;

/// Result of a paired t-test.
#[derive(Debug, Clone, Copy)]
pub struct TTestResult {
    /// t-statistic (positive if system A > system B)
    pub t_statistic: f64,
    /// Two-tailed p-value
    pub p_value: f64,
    /// Degrees of freedom
    pub df: usize,
}

impl TTestResult {
    /// Returns true if the difference is significant at the given alpha level.
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }

    /// Formats the result for display.
    pub fn format(&self) -> String {
        let sig_marker = if self.is_significant(0.05) { "*" } else { "" };
        format!(
            "t({})={:.3}, p={:.4}{}",
            self.df, self.t_statistic, self.p_value, sig_marker
        )
    }
}

/// Performs a paired t-test comparing two systems on the same queries.
///
/// # Arguments
///
/// * `system_a` - Per-query scores from system A
/// * `system_b` - Scores from system B (same queries, same order)
///
/// # Returns
///
/// `TTestResult` with t-statistic, p-value, and degrees of freedom.
/// Positive t means system A > system B on average.
///
/// # Errors
///
/// Returns `EvalError::Stats` if the slices differ in length or hold fewer
/// than two observations.
pub fn paired_ttest(system_a: &[f64], system_b: &[f64]) -> Result<TTestResult, EvalError> {
    if system_a.len() != system_b.len() {
        return Err(EvalError::Stats(format!(
            "Paired t-test requires equal-length samples, got {} and {}",
            system_a.len(),
            system_b.len()
        )));
    }
    if system_a.len() < 2 {
        return Err(EvalError::Stats(
            "Paired t-test requires at least two observations".to_string(),
        ));
    }

    let n = system_a.len();
    let df = n - 1;

    let diffs: Vec<f64> = system_a
        .iter()
        .zip(system_b.iter())
        .map(|(a, b)| a - b)
        .collect();

    let mean_diff = diffs.iter().sum::<f64>() / n as f64;
    let var_diff = diffs.iter().map(|d| (d - mean_diff).powi(2)).sum::<f64>() / df as f64;
    let se = (var_diff / n as f64).sqrt();

    let t = if se > 0.0 { mean_diff / se } else { 0.0 };
    let p_value = t_distribution_p_value(t.abs(), df);

    Ok(TTestResult {
        t_statistic: t,
        p_value,
        df,
    })
}

/// Computes Cohen's d effect size for comparing two score distributions.
///
/// Cohen's d is the standardized difference between two means, useful for
/// judging practical significance beyond statistical significance.
///
/// # Interpretation (Cohen's conventions)
///
/// - |d| < 0.2: negligible effect
/// - 0.2 <= |d| < 0.5: small effect
/// - 0.5 <= |d| < 0.8: medium effect
/// - |d| >= 0.8: large effect
///
/// Returns 0.0 for empty or constant inputs (positive if group A > group B).
pub fn cohens_d(group_a: &[f64], group_b: &[f64]) -> f64 {
    if group_a.len() < 2 || group_b.len() < 2 {
        return 0.0;
    }

    let n_a = group_a.len();
    let n_b = group_b.len();

    let mean_a = group_a.iter().sum::<f64>() / n_a as f64;
    let mean_b = group_b.iter().sum::<f64>() / n_b as f64;

    let var_a: f64 = group_a.iter().map(|x| (x - mean_a).powi(2)).sum::<f64>() / (n_a - 1) as f64;
    let var_b: f64 = group_b.iter().map(|x| (x - mean_b).powi(2)).sum::<f64>() / (n_b - 1) as f64;

    let pooled_var = ((n_a - 1) as f64 * var_a + (n_b - 1) as f64 * var_b) / (n_a + n_b - 2) as f64;
    let pooled_std = pooled_var.sqrt();

    if pooled_std == 0.0 {
        return 0.0;
    }

    (mean_a - mean_b) / pooled_std
}

/// Interprets Cohen's d value.
pub fn interpret_cohens_d(d: f64) -> &'static str {
    let d_abs = d.abs();
    if d_abs < 0.2 {
        "negligible"
    } else if d_abs < 0.5 {
        "small"
    } else if d_abs < 0.8 {
        "medium"
    } else {
        "large"
    }
}

// ============================================================================
// Internal: t-distribution p-value approximation
// ============================================================================

/// Approximates the two-tailed p-value from the t-distribution.
///
/// Uses the incomplete beta function relationship
/// p = I_{df/(df+t²)}(df/2, 1/2), switching to the normal approximation for
/// large df.
fn t_distribution_p_value(t_abs: f64, df: usize) -> f64 {
    if df > 100 {
        return 2.0 * (1.0 - normal_cdf(t_abs));
    }

    let x = df as f64 / (df as f64 + t_abs * t_abs);
    incomplete_beta(df as f64 / 2.0, 0.5, x)
}

/// Normal CDF via the error function.
fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / 2.0_f64.sqrt()))
}

/// Error function approximation (Abramowitz and Stegun 7.1.26).
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

/// Regularized incomplete beta function I_x(a, b).
fn incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let bt =
        (ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln()).exp();

    // The continued fraction converges fastest below the switch point
    if x < (a + 1.0) / (a + b + 2.0) {
        bt * beta_cf(a, b, x) / a
    } else {
        1.0 - bt * beta_cf(b, a, 1.0 - x) / b
    }
}

/// Continued fraction for the incomplete beta function (Lentz's method).
fn beta_cf(a: f64, b: f64, x: f64) -> f64 {
    let max_iter = 100;
    let eps = 1e-10;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;

    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < 1e-30 {
        d = 1e-30;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=max_iter {
        let m = m as f64;
        let m2 = 2.0 * m;

        // Even step
        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < 1e-30 {
            d = 1e-30;
        }
        c = 1.0 + aa / c;
        if c.abs() < 1e-30 {
            c = 1e-30;
        }
        d = 1.0 / d;
        h *= d * c;

        // Odd step
        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < 1e-30 {
            d = 1e-30;
        }
        c = 1.0 + aa / c;
        if c.abs() < 1e-30 {
            c = 1e-30;
        }
        d = 1.0 / d;
        let del = d * c;
        h *= del;

        if (del - 1.0).abs() < eps {
            break;
        }
    }

    h
}

/// Log gamma via the Lanczos approximation.
fn ln_gamma(x: f64) -> f64 {
    let coeffs = [
        76.18009172947146,
        -86.50532032941677,
        24.01409824083091,
        -1.231739572450155,
        0.1208650973866179e-2,
        -0.5395239384953e-5,
    ];

    let y = x;
    let tmp = x + 5.5;
    let tmp = tmp - (x + 0.5) * tmp.ln();

    let mut ser = 1.000000000190015;
    for (i, &coeff) in coeffs.iter().enumerate() {
        ser += coeff / (y + 1.0 + i as f64);
    }

    -tmp + (2.5066282746310005 * ser / x).ln()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paired_ttest_significant() {
        // Clearly separated paired scores
        let system_a = vec![0.9, 0.92, 0.88, 0.91, 0.89, 0.93, 0.87, 0.90];
        let system_b = vec![0.7, 0.72, 0.68, 0.71, 0.69, 0.73, 0.67, 0.70];

        let result = paired_ttest(&system_a, &system_b).unwrap();
        assert!(result.is_significant(0.001));
        assert!(result.t_statistic > 0.0);
        assert_eq!(result.df, 7);
    }

    #[test]
    fn test_paired_ttest_not_significant() {
        let system_a = vec![0.85, 0.87, 0.86, 0.84, 0.85];
        let system_b = vec![0.84, 0.86, 0.87, 0.85, 0.86];

        let result = paired_ttest(&system_a, &system_b).unwrap();
        assert!(!result.is_significant(0.05));
    }

    #[test]
    fn test_paired_ttest_length_mismatch() {
        let result = paired_ttest(&[0.5, 0.6], &[0.5]);
        assert!(matches!(result, Err(EvalError::Stats(_))));
    }

    #[test]
    fn test_paired_ttest_too_few_observations() {
        let result = paired_ttest(&[0.5], &[0.6]);
        assert!(matches!(result, Err(EvalError::Stats(_))));
    }

    #[test]
    fn test_paired_ttest_identical_samples() {
        let scores = vec![0.5, 0.6, 0.7];
        let result = paired_ttest(&scores, &scores).unwrap();
        assert_eq!(result.t_statistic, 0.0);
    }

    #[test]
    fn test_cohens_d_large_effect() {
        let group_a = vec![0.9, 0.92, 0.88, 0.91, 0.89];
        let group_b = vec![0.5, 0.52, 0.48, 0.51, 0.49];

        let d = cohens_d(&group_a, &group_b);
        assert!(d > 2.0);
        assert_eq!(interpret_cohens_d(d), "large");
    }

    #[test]
    fn test_cohens_d_degenerate_inputs() {
        assert_eq!(cohens_d(&[], &[0.5, 0.6]), 0.0);
        // Zero pooled variance
        assert_eq!(cohens_d(&[0.5, 0.5], &[0.5, 0.5]), 0.0);
    }

    #[test]
    fn test_cohens_d_interpretation() {
        assert_eq!(interpret_cohens_d(0.1), "negligible");
        assert_eq!(interpret_cohens_d(0.3), "small");
        assert_eq!(interpret_cohens_d(0.6), "medium");
        assert_eq!(interpret_cohens_d(-0.9), "large");
    }

    #[test]
    fn test_normal_cdf() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 0.001);
        assert!((normal_cdf(1.96) - 0.975).abs() < 0.01);
        assert!((normal_cdf(-1.96) - 0.025).abs() < 0.01);
    }
}
