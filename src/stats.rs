//! Numerical helpers shared by the statistics and modelling modules.

use std::f64::consts::PI;

/// Integrates `y(x)` with the trapezoidal rule.
pub(crate) fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
        .sum()
}

/// `num` evenly spaced samples over `[start, stop]`, both ends included.
pub(crate) fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            (0..num)
                .map(|i| if i == num - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

pub(crate) fn cumsum(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    values
        .into_iter()
        .scan(0.0, |acc, v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

/// The mean of the non-NaN values, NaN if there are none.
pub(crate) fn nan_mean(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    sum / count as f64
}

/// The population standard deviation of the non-NaN values, NaN if there are none.
pub(crate) fn nan_std(values: &[f64]) -> f64 {
    let mean = nan_mean(values);
    let squares: Vec<f64> = values
        .iter()
        .filter(|v| !v.is_nan())
        .map(|v| (v - mean).powi(2))
        .collect();

    nan_mean(&squares).sqrt()
}

/// The natural logarithm of the gamma function, Lanczos approximation (g = 7, n = 9).
pub(crate) fn ln_gamma(x: f64) -> f64 {
    const COEFFICIENTS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        // Reflection formula.
        return (PI / (PI * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let t = x + 7.5;
    let series = COEFFICIENTS
        .iter()
        .enumerate()
        .skip(1)
        .fold(COEFFICIENTS[0], |acc, (i, c)| acc + c / (x + i as f64));

    0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + series.ln()
}

/// The probability of `k` successes in `n` Bernoulli trials of probability `p`.
pub(crate) fn binomial_pmf(k: u64, n: u64, p: f64) -> f64 {
    if k > n {
        return 0.0;
    }
    if p <= 0.0 {
        return if k == 0 { 1.0 } else { 0.0 };
    }
    if p >= 1.0 {
        return if k == n { 1.0 } else { 0.0 };
    }

    let (k, n) = (k as f64, n as f64);
    let ln_choose = ln_gamma(n + 1.0) - ln_gamma(k + 1.0) - ln_gamma(n - k + 1.0);

    (ln_choose + k * p.ln() + (n - k) * (1.0 - p).ln()).exp()
}

/// Mean and variance of the number of successes when drawing `draws` items without replacement
/// from a population of `population` items, `successes` of which count as successes.
pub(crate) fn hypergeometric_stats(population: f64, successes: f64, draws: f64) -> (f64, f64) {
    if population <= 0.0 {
        return (f64::NAN, f64::NAN);
    }

    let mean = draws * successes / population;
    let variance = draws * successes * (population - successes) * (population - draws)
        / (population * population * (population - 1.0));

    (mean, variance)
}
