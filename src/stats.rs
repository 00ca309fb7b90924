//! Column statistics shared by the feature deriver and the ranker.
//!
//! Columns are slices of `Option<f64>`; `None` is a missing value and is
//! skipped by every aggregate. Element-wise transforms keep missing values
//! missing.

/// Arithmetic mean of the present values. `None` if nothing is present.
pub fn mean(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    Some(present.iter().sum::<f64>() / present.len() as f64)
}

/// Sample standard deviation (n - 1 denominator) of the present values.
///
/// Returns `None` with fewer than two present values.
pub fn sample_stddev(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.len() < 2 {
        return None;
    }
    let avg = present.iter().sum::<f64>() / present.len() as f64;
    let variance =
        present.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (present.len() - 1) as f64;

    Some(variance.sqrt())
}

/// Converts a column to z-scores: `(x - mean) / stddev`.
///
/// Uses the sample standard deviation. Missing inputs stay missing, and a
/// column with fewer than two present values comes back entirely missing.
/// A column whose present values are all equal maps every one of them to 0,
/// even when summation error leaves a nonzero deviation.
pub fn standardize(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let (Some(avg), Some(sd)) = (mean(values), sample_stddev(values)) else {
        return vec![None; values.len()];
    };
    let mut present = values.iter().flatten();
    let first = present.next().copied();
    if sd == 0.0 || present.all(|v| Some(*v) == first) {
        return values.iter().map(|v| v.map(|_| 0.0)).collect();
    }

    values.iter().map(|v| v.map(|x| (x - avg) / sd)).collect()
}

/// Rounds to two decimal places, halves away from zero (`f64::round`).
///
/// pandas' `round` goes half to even, so an exact tie such as `0.125` can
/// land one cent apart from it. Binary floats rarely hit exact ties.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Pearson correlation over rows where both columns are present.
pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let my = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in &pairs {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx).powi(2);
        syy += (y - my).powi(2);
    }

    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}
