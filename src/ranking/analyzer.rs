use anyhow::{Context, Result, ensure};
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::output::{read_records, write_json, write_records};
use crate::prepare::types::CleanedRecord;
use crate::ranking::aggregate::{aggregate_by_rating, count_by_rating};
use crate::ranking::folds::CrossValidation;
use crate::ranking::grade::rating;
use crate::ranking::model::{CoefficientEstimate, variance_inflation_factors};
use crate::ranking::types::{
    CONTINUOUS, ColumnValue, DISCRETE, FoldSummary, INTERCEPT, ModelRecord, ModelSummary,
    RankingRecord, RatingAggregate,
};
use crate::stats::{mean, round2, sample_stddev, standardize};

/// VIF above which a regressor is reported as collinear.
const VIF_WARNING: f64 = 10.0;

/// Everything the ranker writes.
#[derive(Debug, Clone)]
pub struct RankingOutcome {
    pub rankings: Vec<RankingRecord>,
    pub means: Vec<RatingAggregate>,
    pub summary: ModelSummary,
}

/// Design matrix columns: continuous, then discrete, then the intercept.
fn design_columns() -> Vec<&'static str> {
    CONTINUOUS
        .iter()
        .chain(DISCRETE)
        .copied()
        .chain([INTERCEPT])
        .collect()
}

/// Builds the design matrix, standardizing each continuous regressor over
/// the model rows.
fn design_matrix(records: &[ModelRecord]) -> Vec<Vec<f64>> {
    let standardized: Vec<Vec<f64>> = (0..CONTINUOUS.len())
        .map(|j| {
            let column: Vec<Option<f64>> = records.iter().map(|r| Some(r.continuous[j])).collect();
            standardize(&column)
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect()
        })
        .collect();

    records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let mut row: Vec<f64> = standardized.iter().map(|col| col[i]).collect();
            row.extend(r.discrete);
            row.push(1.0);
            row
        })
        .collect()
}

/// Ranks cleaned institutions by how far their earnings beat the model's
/// prediction.
pub fn rank(cleaned: &[CleanedRecord], config: &PipelineConfig) -> Result<RankingOutcome> {
    let mut seen = HashSet::with_capacity(cleaned.len());
    for r in cleaned {
        ensure!(seen.insert(r.id), "duplicate id {} in cleaned table", r.id);
    }

    let records: Vec<ModelRecord> = cleaned.iter().filter_map(ModelRecord::from_cleaned).collect();
    let dropped = cleaned.len() - records.len();
    if dropped > 0 {
        warn!(
            dropped,
            kept = records.len(),
            "Dropped rows with a missing outcome or regressor"
        );
    }
    ensure!(
        records.len() >= 2,
        "need at least 2 complete rows to fit the model, got {}",
        records.len()
    );

    let columns = design_columns();
    let x = design_matrix(&records);
    let y: Vec<f64> = records.iter().map(|r| r.log_earnings_10yr).collect();

    let vifs = variance_inflation_factors(&x);
    for (column, vif) in columns.iter().zip(&vifs) {
        if *column == INTERCEPT {
            continue;
        }
        match vif {
            Some(v) if *v > VIF_WARNING => warn!(column, vif = round2(*v), "High VIF"),
            _ => debug!(column, vif = vif.map(round2), "VIF"),
        }
    }

    let k = config.folds.min(records.len());
    let cv = CrossValidation::run(&columns, &x, &y, k, config.seed);
    let final_fit = cv
        .final_fit()
        .context("cross-validation produced no fitted folds")?;

    let (train_r_squared, test_r_squared) = final_fit.holdout_r_squared(&x, &y);
    info!(
        fold = final_fit.index,
        train_r_squared,
        test_r_squared,
        "Final fit selected"
    );
    let fit = final_fit.model.summary();
    info!(
        observations = fit.observations,
        df_residual = fit.df_residual,
        r_squared = fit.r_squared,
        adj_r_squared = fit.adj_r_squared,
        f_statistic = fit.f_statistic,
        f_p_value = fit.f_p_value,
        "Final OLS fit"
    );
    for c in &fit.coefficients {
        info!(
            column = %c.column,
            estimate = c.estimate,
            std_error = c.std_error,
            t_value = c.t_value,
            p_value = c.p_value,
            "Coefficient"
        );
    }

    let predicted = final_fit.model.predict_all(&x);
    let residuals: Vec<Option<f64>> = y
        .iter()
        .zip(&predicted)
        .map(|(actual, p)| Some(actual - p))
        .collect();
    log_residuals(&residuals);

    let scores: Vec<f64> = standardize(&residuals)
        .into_iter()
        .map(|s| round2(s.unwrap_or(0.0)))
        .collect();

    let by_id: HashMap<u64, &CleanedRecord> = cleaned.iter().map(|r| (r.id, r)).collect();
    let mut rankings: Vec<RankingRecord> = records
        .iter()
        .zip(scores.iter().zip(&predicted))
        .map(|(record, (&score, &pred))| {
            let info = by_id[&record.id];
            RankingRecord {
                rank: 0,
                id: record.id,
                school_name: record.school_name.clone(),
                school_city: record.school_city.clone(),
                school_state: record.school_state.clone(),
                rating: rating(score),
                score,
                earnings_10yr: record.earnings_10yr,
                pred_earnings_10yr_ols: pred.exp().round(),
                public: record.public,
                score_sat_act: info.score_sat_act.map(round2),
                pell_grant_pct: info.pell_grant_pct.map(round2),
                born_in_usa_pct: info.born_in_usa_pct.map(round2),
                female_pct: info.female_pct.map(round2),
                region_high_inc: info.region_high_inc,
                urban_area: info.urban_area,
                enrollment: info.enrollment.map(round2),
                black_or_hispanic_pct: round2(info.black_or_hispanic_pct),
                overage23: info.overage23.map(round2),
                median_hh_income: info.median_hh_income.map(round2),
                avg_sat_2011: info.avg_sat_2011.map(round2),
                median_act_2011: info.median_act_2011.map(round2),
                avg_net_price_2011: info.avg_net_price_2011.map(round2),
                avg_net_price_lowinc_2011: info.avg_net_price_lowinc_2011.map(round2),
                admission_rate_2011: info.admission_rate_2011.map(round2),
                completion_rate_6yr_2011: info.completion_rate_6yr_2011.map(round2),
            }
        })
        .collect();

    // stable: ties keep input order
    rankings.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    for (position, r) in rankings.iter_mut().enumerate() {
        r.rank = position + 1;
    }

    let means = aggregate_by_rating(&rankings);
    let schools_by_rating = count_by_rating(&rankings);
    log_rating_tables(&rankings, &records, &schools_by_rating);

    let summary = ModelSummary {
        generated_at: Utc::now(),
        year: config.year,
        seed: config.seed,
        rows: records.len(),
        dropped_incomplete: dropped,
        folds: cv
            .fits
            .iter()
            .map(|fold_fit| FoldSummary {
                fold: fold_fit.index,
                train_rows: fold_fit.fold.train.len(),
                test_rows: fold_fit.fold.test.len(),
                r_squared: finite(fold_fit.model.r_squared),
                adj_r_squared: finite(fold_fit.model.summary().adj_r_squared),
            })
            .collect(),
        coefficients: fit
            .coefficients
            .into_iter()
            .map(|c| CoefficientEstimate {
                std_error: finite(c.std_error),
                t_value: finite(c.t_value),
                p_value: finite(c.p_value),
                ..c
            })
            .collect(),
        df_residual: fit.df_residual,
        adj_r_squared: finite(fit.adj_r_squared),
        f_statistic: finite(fit.f_statistic),
        f_p_value: finite(fit.f_p_value),
        train_r_squared: finite(train_r_squared),
        test_r_squared: finite(test_r_squared),
        variance_inflation: columns
            .iter()
            .zip(&vifs)
            .filter(|(column, _)| **column != INTERCEPT)
            .map(|(column, vif)| ColumnValue {
                column: column.to_string(),
                value: finite(*vif),
            })
            .collect(),
        schools_by_rating,
    };

    info!(
        ranked = rankings.len(),
        ratings = means.len(),
        "Ranking complete"
    );

    Ok(RankingOutcome {
        rankings,
        means,
        summary,
    })
}

/// Reads the cleaned table, ranks it and writes rankings, means and the
/// model summary.
#[tracing::instrument(skip(config), fields(data_dir = %data_dir.display()))]
pub fn run_rank(data_dir: &Path, config: &PipelineConfig) -> Result<RankingOutcome> {
    let cleaned: Vec<CleanedRecord> =
        read_records(config.resolve(data_dir, &config.cleaned_file))?;
    let outcome = rank(&cleaned, config)?;

    write_records(
        config.resolve(data_dir, &config.rankings_file),
        &outcome.rankings,
    )?;
    write_records(config.resolve(data_dir, &config.means_file), &outcome.means)?;
    write_json(
        config.resolve(data_dir, &config.summary_file),
        &outcome.summary,
    )?;

    Ok(outcome)
}

/// JSON has no encoding for NaN or infinity.
fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn log_residuals(residuals: &[Option<f64>]) {
    let present = residuals.iter().flatten();
    let min = present.clone().copied().fold(f64::INFINITY, f64::min);
    let max = present.copied().fold(f64::NEG_INFINITY, f64::max);

    info!(
        count = residuals.len(),
        mean = mean(residuals),
        std = sample_stddev(residuals),
        min,
        max,
        "Residual summary"
    );
}

fn log_rating_tables(
    rankings: &[RankingRecord],
    records: &[ModelRecord],
    counts: &BTreeMap<u8, usize>,
) {
    for (rating, schools) in counts {
        info!(rating, schools, "Schools by rating");
    }

    let regions: HashMap<u64, Option<i64>> = records.iter().map(|r| (r.id, r.region)).collect();
    let mut by_region: BTreeMap<(u8, Option<i64>), usize> = BTreeMap::new();
    let mut by_public: BTreeMap<(u8, u8), usize> = BTreeMap::new();
    for r in rankings {
        let region = regions.get(&r.id).copied().flatten();
        *by_region.entry((r.rating, region)).or_insert(0) += 1;
        *by_public.entry((r.rating, r.public)).or_insert(0) += 1;
    }

    for ((rating, region), schools) in by_region {
        debug!(rating, ?region, schools, "Schools by rating and region");
    }
    for ((rating, public), schools) in by_public {
        debug!(rating, public, schools, "Schools by rating and control");
    }

    let public_share: Vec<Option<f64>> = rankings
        .iter()
        .map(|r| Some(f64::from(r.public)))
        .collect();
    info!(
        public_share = mean(&public_share).map(round2),
        "Share of public schools"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn school(id: u64, earnings: f64, sat: Option<f64>) -> CleanedRecord {
        CleanedRecord {
            id,
            school_name: Some(format!("School {id}")),
            school_state: Some("TX".to_string()),
            earnings_10yr: Some(earnings),
            log_earnings_10yr: Some(earnings.ln()),
            score_sat_act: sat,
            female_pct: Some(0.5),
            born_in_usa_pct: Some(0.9),
            pell_grant_pct: Some(0.3),
            enrollment: Some(2000.0),
            region_high_inc: 1,
            urban_area: 1,
            black_or_hispanic_pct: 0.25,
            ..Default::default()
        }
    }

    #[test]
    fn test_design_columns_order() {
        assert_eq!(
            design_columns(),
            vec![
                "score_sat_act",
                "female_pct",
                "born_in_usa_pct",
                "pell_grant_pct",
                "enrollment",
                "region_high_inc",
                "urban_area",
                "intercept",
            ]
        );
    }

    #[test]
    fn test_rank_drops_incomplete_rows() {
        let cleaned = vec![
            school(1, 10000.0, Some(0.1)),
            school(2, 20000.0, None),
            school(3, 40000.0, Some(0.1)),
        ];

        let outcome = rank(&cleaned, &PipelineConfig::default()).unwrap();

        let ids: Vec<u64> = outcome.rankings.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(outcome.rankings[0].rank, 1);
        assert_eq!(outcome.rankings[1].rank, 2);
        assert!(outcome.rankings[0].score > outcome.rankings[1].score);
        assert_eq!(outcome.summary.dropped_incomplete, 1);
        assert_eq!(outcome.summary.folds.len(), 2);
    }

    #[test]
    fn test_rank_ties_keep_input_order() {
        let cleaned: Vec<CleanedRecord> = [9, 4, 7, 1]
            .into_iter()
            .map(|id| school(id, 20000.0, Some(0.1)))
            .collect();

        let outcome = rank(&cleaned, &PipelineConfig::default()).unwrap();

        let ids: Vec<u64> = outcome.rankings.iter().map(|r| r.id).collect();
        let ranks: Vec<usize> = outcome.rankings.iter().map(|r| r.rank).collect();
        assert_eq!(ids, vec![9, 4, 7, 1]);
        assert_eq!(ranks, vec![1, 2, 3, 4]);
        assert!(outcome.rankings.iter().all(|r| r.score == 0.0));
    }

    #[test]
    fn test_summary_carries_coefficient_table() {
        let cleaned: Vec<CleanedRecord> = (1..=12)
            .map(|id| {
                let sat = 0.1 * id as f64;
                let mut s = school(id, 20000.0 + 3000.0 * sat + 500.0 * (id % 3) as f64, Some(sat));
                s.female_pct = Some(0.4 + 0.02 * (id % 5) as f64);
                s
            })
            .collect();

        let summary = rank(&cleaned, &PipelineConfig::default()).unwrap().summary;

        let columns: Vec<&str> = summary.coefficients.iter().map(|c| c.column.as_str()).collect();
        assert_eq!(columns, design_columns());
        let sat = &summary.coefficients[0];
        assert!(sat.std_error.is_some_and(|se| se > 0.0));
        assert!(sat.p_value.is_some_and(|p| (0.0..=1.0).contains(&p)));
        assert!(summary.df_residual > 0);
        assert!(summary.f_statistic.is_some());
        assert!(summary.folds.iter().all(|f| f.adj_r_squared.is_some()));
    }

    #[test]
    fn test_rank_rejects_duplicate_ids() {
        let cleaned = vec![
            school(1, 10000.0, Some(0.1)),
            school(1, 20000.0, Some(0.2)),
            school(2, 30000.0, Some(0.3)),
        ];
        let err = rank(&cleaned, &PipelineConfig::default()).unwrap_err();
        assert!(err.to_string().contains("duplicate id 1"));
    }

    #[test]
    fn test_rank_needs_two_complete_rows() {
        let cleaned = vec![school(1, 10000.0, Some(0.1)), school(2, 20000.0, None)];
        assert!(rank(&cleaned, &PipelineConfig::default()).is_err());
    }

    #[test]
    fn test_finite() {
        assert_eq!(finite(Some(f64::INFINITY)), None);
        assert_eq!(finite(Some(f64::NAN)), None);
        assert_eq!(finite(Some(1.5)), Some(1.5));
        assert_eq!(finite(None), None);
    }
}
