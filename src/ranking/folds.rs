//! Seeded k-fold cross-validation.

use rand::SeedableRng as _;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;
use tracing::info;

use crate::ranking::model::{LinearModel, r_squared};

/// One train/test split. Both index lists are sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Splits `0..n` into `k` shuffled, non-overlapping test folds.
///
/// The first `n % k` folds hold one extra row. Each fold's training set is
/// every row outside its test set.
pub fn k_fold(n: usize, k: usize, seed: u64) -> Vec<Fold> {
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = Pcg32::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for i in 0..k {
        let size = n / k + usize::from(i < n % k);
        let mut test = order[start..start + size].to_vec();
        test.sort_unstable();

        let mut in_test = vec![false; n];
        for &t in &test {
            in_test[t] = true;
        }
        let train = (0..n).filter(|&r| !in_test[r]).collect();

        folds.push(Fold { train, test });
        start += size;
    }
    folds
}

/// Model fitted on one fold's training rows.
#[derive(Debug, Clone)]
pub struct FoldFit {
    pub index: usize,
    pub fold: Fold,
    pub model: LinearModel,
}

impl FoldFit {
    /// Pseudo-R² on the training and the held-out rows, each measured
    /// against its own mean.
    pub fn holdout_r_squared(&self, x: &[Vec<f64>], y: &[f64]) -> (Option<f64>, Option<f64>) {
        let score = |rows: &[usize]| {
            let actual: Vec<f64> = rows.iter().map(|&r| y[r]).collect();
            let predicted: Vec<f64> = rows.iter().map(|&r| self.model.predict(&x[r])).collect();
            r_squared(&actual, &predicted)
        };
        (score(&self.fold.train), score(&self.fold.test))
    }
}

/// Every fold's fit, in processing order.
#[derive(Debug, Clone)]
pub struct CrossValidation {
    pub fits: Vec<FoldFit>,
}

impl CrossValidation {
    /// Fits one model per fold, holding that fold out.
    pub fn run(
        columns: &[&'static str],
        x: &[Vec<f64>],
        y: &[f64],
        k: usize,
        seed: u64,
    ) -> Self {
        let fits = k_fold(y.len(), k, seed)
            .into_iter()
            .enumerate()
            .map(|(index, fold)| {
                let train_x: Vec<Vec<f64>> = fold.train.iter().map(|&r| x[r].clone()).collect();
                let train_y: Vec<f64> = fold.train.iter().map(|&r| y[r]).collect();

                let model = LinearModel::fit(columns, &train_x, &train_y);
                log_fit(index, &fold, &model);

                FoldFit { index, fold, model }
            })
            .collect();

        Self { fits }
    }

    /// The fit used for final predictions: the last fold processed.
    ///
    /// Which rows that fold trained on depends on the shuffle seed, so the
    /// final coefficients do too.
    pub fn final_fit(&self) -> Option<&FoldFit> {
        self.fits.last()
    }
}

fn log_fit(index: usize, fold: &Fold, model: &LinearModel) {
    let summary = model.summary();
    info!(
        fold = index,
        train_rows = fold.train.len(),
        test_rows = fold.test.len(),
        r_squared = summary.r_squared,
        adj_r_squared = summary.adj_r_squared,
        f_statistic = summary.f_statistic,
        "Fold fitted"
    );
    for c in &summary.coefficients {
        info!(
            fold = index,
            column = %c.column,
            estimate = c.estimate,
            std_error = c.std_error,
            p_value = c.p_value,
            "Fold coefficient"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_k_fold_partitions_rows() {
        let folds = k_fold(23, 5, 2001);
        assert_eq!(folds.len(), 5);

        let sizes: Vec<_> = folds.iter().map(|f| f.test.len()).collect();
        assert_eq!(sizes, vec![5, 5, 5, 4, 4]);

        let mut seen: Vec<usize> = folds.iter().flat_map(|f| f.test.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..23).collect::<Vec<_>>());

        for fold in &folds {
            assert_eq!(fold.train.len() + fold.test.len(), 23);
            assert!(fold.train.iter().all(|r| !fold.test.contains(r)));
        }
    }

    #[test]
    fn test_k_fold_is_seeded() {
        assert_eq!(k_fold(40, 5, 7), k_fold(40, 5, 7));
        assert_ne!(k_fold(40, 5, 7), k_fold(40, 5, 8));
    }

    #[test]
    fn test_final_fit_is_last_fold() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 1.0]).collect();
        let y: Vec<f64> = (0..10).map(|i| 1.0 + 0.5 * i as f64).collect();

        let cv = CrossValidation::run(&["x", "intercept"], &x, &y, 5, 2001);
        assert_eq!(cv.fits.len(), 5);

        let last = cv.final_fit().unwrap();
        assert_eq!(last.index, 4);
        assert!((last.model.coefficients[0] - 0.5).abs() < 1e-9);
        assert_eq!(last.model.observations, 8);

        let (train, test) = last.holdout_r_squared(&x, &y);
        assert!((train.unwrap() - 1.0).abs() < 1e-9);
        assert!((test.unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_final_fit_empty() {
        let cv = CrossValidation { fits: Vec::new() };
        assert!(cv.final_fit().is_none());
    }
}
