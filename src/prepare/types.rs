//! Cleaned institution record written by the feature deriver.

use serde::{Deserialize, Serialize};

/// One institution after renaming, derivation, filtering and imputation.
///
/// Field names are the cleaned CSV column names and are read back by the
/// ranker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanedRecord {
    pub id: u64,
    pub school_name: Option<String>,
    pub school_city: Option<String>,
    pub school_state: Option<String>,
    pub school_ownership: Option<i64>,
    pub region: Option<i64>,
    pub locale: Option<i64>,
    pub locale2: Option<i64>,
    pub carnegie_basic: Option<i64>,
    pub hb_univ: Option<i64>,
    pub women_only: Option<i64>,

    // outcome
    pub earnings_10yr: Option<f64>,
    pub log_earnings_10yr: Option<f64>,

    // test scores
    pub sat_score: Option<f64>,
    pub act_score: Option<f64>,
    pub score_sat_act: Option<f64>,

    // price and completion
    pub avg_net_price_2011: Option<f64>,
    pub avg_net_price_lowinc_2011: Option<f64>,
    pub completion_rate_std_2011: Option<f64>,

    // earnings cohort
    pub total_cohort_n: f64,
    pub female_pct2: Option<f64>,

    // flags
    pub region_high_inc: u8,
    pub urban_area: u8,
    pub public: u8,

    // demographics
    pub pct_black: Option<f64>,
    pub pct_hispanic: Option<f64>,
    pub black_or_hispanic_pct: f64,
    pub born_in_usa_pct: Option<f64>,
    pub overage23: Option<f64>,
    pub pell_grant_pct: Option<f64>,
    pub female: Option<f64>,
    pub female_pct: Option<f64>,
    pub pct_college_degree: Option<f64>,
    pub median_family_income: Option<f64>,
    pub first_gen: Option<f64>,
    pub median_hh_income: Option<f64>,
    pub log_median_hh_income: Option<f64>,
    pub enrollment: Option<f64>,

    // outcome-year admissions
    pub avg_sat_2011: Option<f64>,
    pub median_act_2011: Option<f64>,
    pub completion_rate_6yr_2011: Option<f64>,
    pub admission_rate_2011: Option<f64>,
}
