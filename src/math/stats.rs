//! Descriptive statistics used by cleaning and the feature transform.
//!
//! Conventions (fixed, because fit and apply must agree):
//! - quantiles interpolate linearly between order statistics
//! - standard deviation and skewness use population moments
//! - the mode of a tied sample is its smallest value
//!
//! Non-finite inputs are ignored everywhere.

use std::collections::BTreeMap;

/// Linear-interpolated quantile, `q ∈ [0, 1]`.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    if v.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    v.sort_by(f64::total_cmp);
    Some(quantile_sorted(&v, q))
}

/// Quantile of an already sorted, finite slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Most frequent value; ties go to the smallest.
pub fn mode<T: Ord + Copy>(values: impl IntoIterator<Item = T>) -> Option<T> {
    let mut counts: BTreeMap<T, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    let mut best: Option<(T, usize)> = None;
    for (v, n) in counts {
        match best {
            Some((_, b)) if n <= b => {}
            _ => best = Some((v, n)),
        }
    }
    best.map(|(v, _)| v)
}

/// Mean and population standard deviation.
pub fn mean_std(values: &[f64]) -> Option<(f64, f64)> {
    let v: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    if v.is_empty() {
        return None;
    }
    let n = v.len() as f64;
    let mean = v.iter().sum::<f64>() / n;
    let var = v.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
    Some((mean, var.sqrt()))
}

/// Biased sample skewness `m3 / m2^1.5`; `0` for constant or empty samples.
pub fn skewness(values: &[f64]) -> f64 {
    let v: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    if v.len() < 2 {
        return 0.0;
    }
    let n = v.len() as f64;
    let mean = v.iter().sum::<f64>() / n;
    let (mut m2, mut m3) = (0.0, 0.0);
    for x in &v {
        let d = x - mean;
        m2 += d * d;
        m3 += d * d * d;
    }
    m2 /= n;
    m3 /= n;
    // Relative guard: a column of identical large values leaves rounding noise in m2.
    if m2 <= f64::EPSILON * mean.abs().max(1.0) {
        return 0.0;
    }
    m3 / m2.powf(1.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert!((quantile(&v, 0.25).unwrap() - 1.75).abs() < 1e-12);
        assert!((quantile(&v, 0.75).unwrap() - 3.25).abs() < 1e-12);
        assert!((median(&v).unwrap() - 2.5).abs() < 1e-12);
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn mode_prefers_smallest_on_tie() {
        assert_eq!(mode([3, 1, 3, 1, 2]), Some(1));
        assert_eq!(mode([5, 5, 2]), Some(5));
        assert_eq!(mode(Vec::<i64>::new()), None);
    }

    #[test]
    fn std_is_population() {
        let (m, s) = mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((m - 5.0).abs() < 1e-12);
        assert!((s - 2.0).abs() < 1e-12);
    }

    #[test]
    fn skewness_signs() {
        assert!(skewness(&[1.0, 1.0, 1.0, 1.0, 10.0]) > 1.0);
        assert!(skewness(&[1.0, 10.0, 10.0, 10.0, 10.0]) < -1.0);
        assert_eq!(skewness(&[3.0, 3.0, 3.0]), 0.0);
        // Symmetric sample.
        assert!(skewness(&[1.0, 2.0, 3.0]).abs() < 1e-12);
    }
}
