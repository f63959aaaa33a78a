//! Hypothesis test primitives.
//!
//! Pearson's chi-squared goodness-of-fit with a degrees-of-freedom
//! adjustment for parameters estimated from the data, and the
//! Shapiro-Wilk normality test.
//!
//! # Examples
//!
//! ```
//! use defect_fit::testing::chi_squared_test;
//!
//! let observed = [5.0, 5.0, 5.0];
//! let expected = [5.0, 5.0, 5.0];
//! // one parameter estimated: df = 3 - 1 - 1
//! let r = chi_squared_test(&observed, &expected, 1).unwrap();
//! assert_eq!(r.statistic, 0.0);
//! assert_eq!(r.df, 1.0);
//! assert!((r.p_value - 1.0).abs() < 1e-12);
//! ```

use u_numflow::special;

/// Result of a hypothesis test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestResult {
    /// Test statistic.
    pub statistic: f64,
    /// Degrees of freedom.
    pub df: f64,
    /// Upper-tail p-value.
    pub p_value: f64,
}

// ---------------------------------------------------------------------------
// Chi-squared
// ---------------------------------------------------------------------------

/// Pearson statistic χ² = Σ (Oᵢ - Eᵢ)² / Eᵢ.
///
/// # Returns
///
/// `None` if the slices are empty or differ in length, any expected
/// frequency is ≤ 0, or any value is non-finite.
pub fn chi_squared_statistic(observed: &[f64], expected: &[f64]) -> Option<f64> {
    if observed.is_empty() || observed.len() != expected.len() {
        return None;
    }
    if expected.iter().any(|&e| e <= 0.0 || !e.is_finite()) {
        return None;
    }
    if observed.iter().any(|&o| o < 0.0 || !o.is_finite()) {
        return None;
    }

    Some(
        observed
            .iter()
            .zip(expected)
            .map(|(&o, &e)| (o - e).powi(2) / e)
            .sum(),
    )
}

/// Upper tail of the χ² distribution: P(X ≥ statistic).
///
/// `None` when `df < 1`.
pub fn chi_squared_sf(statistic: f64, df: f64) -> Option<f64> {
    if !(df >= 1.0) || !statistic.is_finite() {
        return None;
    }
    Some((1.0 - special::chi_squared_cdf(statistic.max(0.0), df)).clamp(0.0, 1.0))
}

/// Chi-squared goodness-of-fit with `estimated` parameters fitted to the
/// same data.
///
/// # Algorithm
///
/// χ² = Σ (Oᵢ - Eᵢ)² / Eᵢ, df = k - 1 - estimated.
///
/// # Returns
///
/// `None` if [`chi_squared_statistic`] is undefined or df < 1.
pub fn chi_squared_test(observed: &[f64], expected: &[f64], estimated: usize) -> Option<TestResult> {
    let k = observed.len();
    if k < estimated + 2 {
        return None;
    }
    let statistic = chi_squared_statistic(observed, expected)?;
    let df = (k - 1 - estimated) as f64;
    let p_value = chi_squared_sf(statistic, df)?;

    Some(TestResult {
        statistic,
        df,
        p_value,
    })
}

// ---------------------------------------------------------------------------
// Shapiro-Wilk
// ---------------------------------------------------------------------------

/// Result of the Shapiro-Wilk normality test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapiroWilkResult {
    /// The W statistic (0 < W ≤ 1). Values close to 1 suggest normality.
    pub w: f64,
    /// Small values reject normality.
    pub p_value: f64,
}

/// Shapiro-Wilk normality test: H₀: data is normally distributed.
///
/// # Algorithm
///
/// Royston (1992, 1995), AS R94:
/// 1. Coefficients from Blom-approximated normal order statistics
/// 2. W = (Σ aᵢ x₍ᵢ₎)² / Σ (xᵢ - x̄)²
/// 3. W mapped to a z-score through a (log-)normal approximation
///
/// # Returns
///
/// `None` if n < 3, n > 5000, all values identical, or non-finite values.
///
/// # References
///
/// - Shapiro & Wilk (1965). Biometrika, 52(3–4), 591–611.
/// - Royston (1995). "Remark AS R94". Applied Statistics, 44(4), 547–551.
///
/// # Examples
///
/// ```
/// use defect_fit::testing::shapiro_wilk_test;
///
/// let rates = [0.040, 0.045, 0.050, 0.050, 0.055, 0.060, 0.048];
/// let r = shapiro_wilk_test(&rates).unwrap();
/// assert!(r.p_value > 0.05);
/// ```
pub fn shapiro_wilk_test(data: &[f64]) -> Option<ShapiroWilkResult> {
    let n = data.len();
    if !(3..=5000).contains(&n) || data.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let mut x = data.to_vec();
    x.sort_by(|a, b| a.total_cmp(b));

    if x[n - 1] - x[0] < 1e-300 {
        return None;
    }

    if n == 3 {
        return shapiro_wilk_n3(&x);
    }

    let half = n / 2;
    let a = sw_coefficients(n, half)?;
    let w = sw_statistic(&x, &a)?;
    if !(0.0..=1.0 + 1e-10).contains(&w) {
        return None;
    }
    let w = w.min(1.0);

    Some(ShapiroWilkResult {
        w,
        p_value: sw_p_value(w, n).clamp(0.0, 1.0),
    })
}

// Exact distribution for n = 3.
fn shapiro_wilk_n3(x: &[f64]) -> Option<ShapiroWilkResult> {
    let mean = (x[0] + x[1] + x[2]) / 3.0;
    let ss: f64 = x.iter().map(|&v| (v - mean).powi(2)).sum();
    if ss < 1e-300 {
        return None;
    }

    let num = std::f64::consts::FRAC_1_SQRT_2 * (x[2] - x[0]);
    let w = (num * num / ss).clamp(0.75, 1.0);
    let p = 1.0 - (6.0 / std::f64::consts::PI) * w.sqrt().acos();

    Some(ShapiroWilkResult {
        w,
        p_value: p.clamp(0.0, 1.0),
    })
}

// Royston polynomial coefficients (AS R94)
const SW_C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.07119, 4.434685, -2.706056];
const SW_C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const SW_C3: [f64; 4] = [0.544, -0.39978, 0.025054, -6.714e-4];
const SW_C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const SW_C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const SW_C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const SW_G: [f64; 2] = [-2.273, 0.459];

// c[0] + c[1]*x + c[2]*x^2 + ...
fn horner(c: &[f64], x: f64) -> f64 {
    c.iter().rev().fold(0.0, |acc, &ci| acc * x + ci)
}

fn sw_coefficients(n: usize, half: usize) -> Option<Vec<f64>> {
    let nf = n as f64;
    let m: Vec<f64> = (0..half)
        .map(|i| special::inverse_normal_cdf((i as f64 + 1.0 - 0.375) / (nf + 0.25)))
        .collect();
    let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / nf.sqrt();

    let a1 = horner(&SW_C1, rsn) - m[0] / ssumm2;

    // Small n corrects only the outermost coefficient.
    let corrected = if n <= 5 { 1 } else { 2 };
    let mut head = vec![a1];
    if corrected == 2 {
        head.push(-m[1] / ssumm2 + horner(&SW_C2, rsn));
    }

    let fac_sq = summ2 - 2.0 * m[..corrected].iter().map(|v| v * v).sum::<f64>();
    let one_minus = 1.0 - 2.0 * head.iter().map(|v| v * v).sum::<f64>();
    if fac_sq <= 0.0 || one_minus <= 0.0 {
        return None;
    }
    let fac = (fac_sq / one_minus).sqrt();

    let mut a = head;
    a.extend(m[corrected..].iter().map(|&mi| -mi / fac));
    Some(a)
}

fn sw_statistic(x: &[f64], a: &[f64]) -> Option<f64> {
    let n = x.len();
    let sa: f64 = a
        .iter()
        .enumerate()
        .map(|(i, &ai)| ai * (x[n - 1 - i] - x[i]))
        .sum();

    let mean = x.iter().sum::<f64>() / n as f64;
    let ss: f64 = x.iter().map(|&v| (v - mean).powi(2)).sum();
    if ss < 1e-300 {
        return None;
    }

    Some(sa * sa / ss)
}

fn sw_p_value(w: f64, n: usize) -> f64 {
    let nf = n as f64;
    let w1 = 1.0 - w;
    if w1 <= 0.0 {
        return 1.0;
    }
    let y = w1.ln();

    let (z_input, m, s) = if n <= 11 {
        let gamma = horner(&SW_G, nf);
        if y >= gamma {
            return 0.0;
        }
        (-(gamma - y).ln(), horner(&SW_C3, nf), horner(&SW_C4, nf).exp())
    } else {
        let ln_n = nf.ln();
        (y, horner(&SW_C5, ln_n), horner(&SW_C6, ln_n).exp())
    };

    if s < 1e-300 {
        return 0.0;
    }
    1.0 - special::standard_normal_cdf((z_input - m) / s)
}
