//! Data types used by the ranking stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::prepare::types::CleanedRecord;
use crate::ranking::model::CoefficientEstimate;

/// Continuous regressors; standardized before fitting.
pub const CONTINUOUS: &[&str] = &[
    "score_sat_act",
    "female_pct",
    "born_in_usa_pct",
    "pell_grant_pct",
    "enrollment",
];

/// 0/1 regressors; used as-is.
pub const DISCRETE: &[&str] = &["region_high_inc", "urban_area"];

pub const INTERCEPT: &str = "intercept";

/// A cleaned record with everything the model needs present.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRecord {
    pub id: u64,
    pub school_name: Option<String>,
    pub school_city: Option<String>,
    pub school_state: Option<String>,
    pub region: Option<i64>,
    pub public: u8,
    pub earnings_10yr: Option<f64>,
    pub log_earnings_10yr: f64,
    /// Unstandardized, in [`CONTINUOUS`] order.
    pub continuous: [f64; 5],
    /// In [`DISCRETE`] order.
    pub discrete: [f64; 2],
}

impl ModelRecord {
    /// `None` if the outcome or any regressor is missing.
    pub fn from_cleaned(r: &CleanedRecord) -> Option<Self> {
        Some(Self {
            id: r.id,
            school_name: r.school_name.clone(),
            school_city: r.school_city.clone(),
            school_state: r.school_state.clone(),
            region: r.region,
            public: r.public,
            earnings_10yr: r.earnings_10yr,
            log_earnings_10yr: r.log_earnings_10yr?,
            continuous: [
                r.score_sat_act?,
                r.female_pct?,
                r.born_in_usa_pct?,
                r.pell_grant_pct?,
                r.enrollment?,
            ],
            discrete: [f64::from(r.region_high_inc), f64::from(r.urban_area)],
        })
    }
}

/// One row of the rankings table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRecord {
    pub rank: usize,
    pub id: u64,
    pub school_name: Option<String>,
    pub school_city: Option<String>,
    pub school_state: Option<String>,
    pub rating: u8,
    pub score: f64,
    pub earnings_10yr: Option<f64>,
    pub pred_earnings_10yr_ols: f64,
    pub public: u8,

    // informational, unstandardized
    pub score_sat_act: Option<f64>,
    pub pell_grant_pct: Option<f64>,
    pub born_in_usa_pct: Option<f64>,
    pub female_pct: Option<f64>,
    pub region_high_inc: u8,
    pub urban_area: u8,
    pub enrollment: Option<f64>,
    pub black_or_hispanic_pct: f64,
    pub overage23: Option<f64>,
    pub median_hh_income: Option<f64>,
    pub avg_sat_2011: Option<f64>,
    pub median_act_2011: Option<f64>,
    pub avg_net_price_2011: Option<f64>,
    pub avg_net_price_lowinc_2011: Option<f64>,
    pub admission_rate_2011: Option<f64>,
    pub completion_rate_6yr_2011: Option<f64>,
}

/// Column means over every ranked school sharing one rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingAggregate {
    pub rating: u8,
    pub rank: Option<f64>,
    pub score: Option<f64>,
    pub earnings_10yr: Option<f64>,
    pub pred_earnings_10yr_ols: Option<f64>,
    pub public: Option<f64>,
    pub score_sat_act: Option<f64>,
    pub pell_grant_pct: Option<f64>,
    pub born_in_usa_pct: Option<f64>,
    pub female_pct: Option<f64>,
    pub region_high_inc: Option<f64>,
    pub urban_area: Option<f64>,
    pub enrollment: Option<f64>,
    pub black_or_hispanic_pct: Option<f64>,
    pub overage23: Option<f64>,
    pub median_hh_income: Option<f64>,
    pub avg_sat_2011: Option<f64>,
    pub median_act_2011: Option<f64>,
    pub avg_net_price_2011: Option<f64>,
    pub avg_net_price_lowinc_2011: Option<f64>,
    pub admission_rate_2011: Option<f64>,
    pub completion_rate_6yr_2011: Option<f64>,
}

/// Training fit quality of one cross-validation fold.
#[derive(Debug, Clone, Serialize)]
pub struct FoldSummary {
    pub fold: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub r_squared: Option<f64>,
    pub adj_r_squared: Option<f64>,
}

/// A named per-column value.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnValue {
    pub column: String,
    pub value: Option<f64>,
}

/// Run summary written as `summary.json`.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub generated_at: DateTime<Utc>,
    pub year: i32,
    pub seed: u64,
    pub rows: usize,
    pub dropped_incomplete: usize,
    pub folds: Vec<FoldSummary>,
    /// Coefficient table of the final fit.
    pub coefficients: Vec<CoefficientEstimate>,
    pub df_residual: usize,
    pub adj_r_squared: Option<f64>,
    pub f_statistic: Option<f64>,
    pub f_p_value: Option<f64>,
    pub train_r_squared: Option<f64>,
    pub test_r_squared: Option<f64>,
    pub variance_inflation: Vec<ColumnValue>,
    pub schools_by_rating: BTreeMap<u8, usize>,
}
