//! Statistical helpers for stopping rules

use crate::domain::VariantData;

/// Two-proportion z statistic of `treatment` against `control`, using the
/// pooled proportion for the standard error.
///
/// Positive when the treatment converts better. Successes above the sample
/// size count as the sample size. Returns 0 when either side is empty or the
/// pooled variance vanishes.
pub fn two_proportion_z(control: &VariantData, treatment: &VariantData) -> f64 {
    if control.sample_size == 0 || treatment.sample_size == 0 {
        return 0.0;
    }

    let n1 = control.sample_size as f64;
    let n2 = treatment.sample_size as f64;
    let successes = control.successes.min(control.sample_size)
        + treatment.successes.min(treatment.sample_size);
    let pooled = successes as f64 / (n1 + n2);
    let se = (pooled * (1.0 - pooled) * (1.0 / n1 + 1.0 / n2)).sqrt();

    if se == 0.0 {
        return 0.0;
    }

    (treatment.conversion_rate() - control.conversion_rate()) / se
}

/// Two-tailed p-value of a z statistic
pub fn two_tailed_p_value(z: f64) -> f64 {
    (2.0 * (1.0 - normal_cdf(z.abs()))).clamp(0.0, 1.0)
}

/// Standard normal cumulative distribution function
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Error function, Abramowitz and Stegun 7.1.26.
///
/// Maximum absolute error about 1.5e-7.
pub fn erf(x: f64) -> f64 {
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
