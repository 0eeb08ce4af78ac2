//! Descriptive statistics and bivariate hypothesis tests.

use crate::utils::quantile_sorted;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, StudentsT};

/// Significance level used for the `significant` flag.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Outcome of one hypothesis test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificanceTest {
    /// `t-test`, `anova` or `chi-square`
    pub test: String,
    /// The two columns tested, numeric first for mixed pairs
    pub variables: (String, String),
    pub statistic: f64,
    pub p_value: f64,
    pub significant: bool,
}

impl SignificanceTest {
    fn new(test: &str, variables: (&str, &str), statistic: f64, p_value: f64) -> Option<Self> {
        if !statistic.is_finite() || !p_value.is_finite() {
            return None;
        }
        let p_value = p_value.clamp(0.0, 1.0);
        Some(Self {
            test: test.to_string(),
            variables: (variables.0.to_string(), variables.1.to_string()),
            statistic,
            p_value,
            significant: p_value < SIGNIFICANCE_LEVEL,
        })
    }
}

/// Summary of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; absent below two values.
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
}

impl NumericSummary {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        Some(Self {
            count: values.len(),
            mean: mean(values),
            median: quantile_sorted(&sorted, 0.5),
            std: sample_variance(values).map(f64::sqrt),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        })
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some(ss / (values.len() - 1) as f64)
}

/// Pearson correlation coefficient of paired samples.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 3 {
        return None;
    }
    let mx = mean(x);
    let my = mean(y);
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (a, b) in x.iter().zip(y) {
        cov += (a - mx) * (b - my);
        vx += (a - mx).powi(2);
        vy += (b - my).powi(2);
    }
    let r = cov / (vx * vy).sqrt();
    r.is_finite().then_some(r)
}

/// Two-sample Student t-test with pooled variance.
pub fn students_t_test(
    variables: (&str, &str),
    group_a: &[f64],
    group_b: &[f64],
) -> Option<SignificanceTest> {
    let (n1, n2) = (group_a.len() as f64, group_b.len() as f64);
    let v1 = sample_variance(group_a)?;
    let v2 = sample_variance(group_b)?;

    let dof = n1 + n2 - 2.0;
    let pooled = ((n1 - 1.0) * v1 + (n2 - 1.0) * v2) / dof;
    let t = (mean(group_a) - mean(group_b)) / (pooled * (1.0 / n1 + 1.0 / n2)).sqrt();
    if !t.is_finite() {
        return None;
    }

    let dist = StudentsT::new(0.0, 1.0, dof).ok()?;
    let p_value = 2.0 * (1.0 - dist.cdf(t.abs()));
    SignificanceTest::new("t-test", variables, t, p_value)
}

/// One-way ANOVA F-test across groups.
pub fn one_way_anova(variables: (&str, &str), groups: &[Vec<f64>]) -> Option<SignificanceTest> {
    let k = groups.len();
    let n_total: usize = groups.iter().map(Vec::len).sum();
    if k < 2 || n_total <= k {
        return None;
    }

    let grand_mean = groups.iter().flatten().sum::<f64>() / n_total as f64;
    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for group in groups {
        let m = mean(group);
        ss_between += group.len() as f64 * (m - grand_mean).powi(2);
        ss_within += group.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    }

    let df1 = (k - 1) as f64;
    let df2 = (n_total - k) as f64;
    let f_stat = (ss_between / df1) / (ss_within / df2);
    if !f_stat.is_finite() {
        return None;
    }

    let dist = FisherSnedecor::new(df1, df2).ok()?;
    let p_value = 1.0 - dist.cdf(f_stat);
    SignificanceTest::new("anova", variables, f_stat, p_value)
}

/// Pearson chi-square test of independence.
///
/// Tables with one degree of freedom get Yates' continuity correction.
pub fn chi_square_test(variables: (&str, &str), table: &[Vec<usize>]) -> Option<SignificanceTest> {
    let rows = table.len();
    let cols = table.first().map(Vec::len).unwrap_or(0);
    if rows < 2 || cols < 2 {
        return None;
    }

    let row_totals: Vec<f64> = table.iter().map(|r| r.iter().sum::<usize>() as f64).collect();
    let col_totals: Vec<f64> = (0..cols)
        .map(|j| table.iter().map(|r| r[j]).sum::<usize>() as f64)
        .collect();
    let total: f64 = row_totals.iter().sum();
    if total == 0.0 {
        return None;
    }

    let dof = ((rows - 1) * (cols - 1)) as f64;
    let correction = if dof == 1.0 { 0.5 } else { 0.0 };

    let mut statistic = 0.0;
    for (i, row) in table.iter().enumerate() {
        for (j, observed) in row.iter().enumerate() {
            let expected = row_totals[i] * col_totals[j] / total;
            if expected > 0.0 {
                let deviation = ((*observed as f64 - expected).abs() - correction).max(0.0);
                statistic += deviation.powi(2) / expected;
            }
        }
    }

    let dist = ChiSquared::new(dof).ok()?;
    let p_value = 1.0 - dist.cdf(statistic);
    SignificanceTest::new("chi-square", variables, statistic, p_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_numeric_summary() {
        let summary = NumericSummary::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(summary.count, 8);
        assert!(approx(summary.mean, 5.0, 1e-12));
        assert!(approx(summary.median, 4.5, 1e-12));
        assert!(approx(summary.std.unwrap(), (32.0f64 / 7.0).sqrt(), 1e-12));
        assert_eq!(summary.min, 2.0);
        assert_eq!(summary.max, 9.0);
    }

    #[test]
    fn test_single_value_has_no_std() {
        let summary = NumericSummary::from_values(&[3.0]).unwrap();
        assert!(summary.std.is_none());
        assert!(NumericSummary::from_values(&[]).is_none());
    }

    #[test]
    fn test_pearson_perfect_and_inverse() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert!(approx(pearson(&x, &[2.0, 4.0, 6.0, 8.0]).unwrap(), 1.0, 1e-12));
        assert!(approx(pearson(&x, &[8.0, 6.0, 4.0, 2.0]).unwrap(), -1.0, 1e-12));
        assert!(pearson(&x, &[1.0, 1.0, 1.0, 1.0]).is_none());
        assert!(pearson(&[1.0, 2.0], &[1.0, 2.0]).is_none());
    }

    #[test]
    fn test_t_test_separated_groups_significant() {
        let result = students_t_test(
            ("score", "group"),
            &[10.0, 11.0, 12.0, 10.5, 11.5],
            &[20.0, 21.0, 22.0, 20.5, 21.5],
        )
        .unwrap();
        assert_eq!(result.test, "t-test");
        assert!(result.statistic < 0.0);
        assert!(result.p_value < 0.001);
        assert!(result.significant);
    }

    #[test]
    fn test_t_test_identical_groups_not_significant() {
        let result =
            students_t_test(("v", "g"), &[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
        assert!(approx(result.statistic, 0.0, 1e-12));
        assert!(approx(result.p_value, 1.0, 1e-9));
        assert!(!result.significant);
    }

    #[test]
    fn test_t_test_needs_two_values_per_group() {
        assert!(students_t_test(("v", "g"), &[1.0], &[1.0, 2.0]).is_none());
    }

    #[test]
    fn test_anova_known_value() {
        // SSB = 54, SSW = 6 -> F = (54/2) / (6/6) = 27
        let groups = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0], vec![7.0, 8.0, 9.0]];
        let result = one_way_anova(("v", "g"), &groups).unwrap();
        assert!(approx(result.statistic, 27.0, 1e-9));
        assert!(result.p_value < 0.01);
    }

    #[test]
    fn test_chi_square_two_by_two_uses_yates_correction() {
        // Expected counts are all 10, each cell contributes (5 - 0.5)^2 / 10
        let table = vec![vec![15, 5], vec![5, 15]];
        let result = chi_square_test(("a", "b"), &table).unwrap();
        assert!(approx(result.statistic, 8.1, 1e-9));
        assert!(result.p_value < 0.01);
        assert!(result.significant);
    }

    #[test]
    fn test_chi_square_correction_never_goes_negative() {
        let table = vec![vec![5, 5], vec![5, 5]];
        let result = chi_square_test(("a", "b"), &table).unwrap();
        assert_eq!(result.statistic, 0.0);
        assert!(approx(result.p_value, 1.0, 1e-12));
        assert!(!result.significant);
    }

    #[test]
    fn test_chi_square_larger_table_uncorrected() {
        // Expected counts are all 5; the first four cells contribute 25 / 5
        let table = vec![vec![10, 0], vec![0, 10], vec![5, 5]];
        let result = chi_square_test(("a", "b"), &table).unwrap();
        assert!(approx(result.statistic, 20.0, 1e-9));
        assert!(result.significant);
    }

    #[test]
    fn test_chi_square_needs_two_by_two() {
        assert!(chi_square_test(("a", "b"), &[vec![1, 2]]).is_none());
        assert!(chi_square_test(("a", "b"), &[vec![1], vec![2]]).is_none());
    }
}
