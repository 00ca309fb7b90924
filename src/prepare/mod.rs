//! Feature derivation stage: raw Scorecard table in, cleaned table out.
//!
//! Derives standardized and recoded columns from the raw fields, drops
//! institutions that cannot be compared fairly, and imputes the remaining
//! gaps in the demographic shares.

pub mod derive;
pub mod filters;
pub mod types;

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use crate::fields::FieldKeys;
use crate::output::write_records;
use crate::prepare::types::CleanedRecord;
use crate::raw::{RawRecord, read_raw_table};
use crate::stats::{mean, pearson, round2};

/// Columns reported in the post-cleaning correlation table.
fn correlation_columns(records: &[CleanedRecord]) -> Vec<(&'static str, Vec<Option<f64>>)> {
    fn column(
        records: &[CleanedRecord],
        get: impl Fn(&CleanedRecord) -> Option<f64>,
    ) -> Vec<Option<f64>> {
        records.iter().map(get).collect()
    }

    vec![
        ("log_earnings_10yr", column(records, |r| r.log_earnings_10yr)),
        ("born_in_usa_pct", column(records, |r| r.born_in_usa_pct)),
        ("pct_college_degree", column(records, |r| r.pct_college_degree)),
        ("score_sat_act", column(records, |r| r.score_sat_act)),
        ("female_pct", column(records, |r| r.female_pct)),
        ("region_high_inc", column(records, |r| Some(f64::from(r.region_high_inc)))),
        ("median_hh_income", column(records, |r| r.median_hh_income)),
        ("pell_grant_pct", column(records, |r| r.pell_grant_pct)),
        ("locale", column(records, |r| r.locale.map(|v| v as f64))),
        ("enrollment", column(records, |r| r.enrollment)),
        ("urban_area", column(records, |r| Some(f64::from(r.urban_area)))),
    ]
}

/// Runs derivation, exclusion and imputation over a raw table.
pub fn prepare(raw: &[RawRecord], keys: &FieldKeys) -> Vec<CleanedRecord> {
    let derived = derive::derive_records(raw, keys);
    log_group_means("region", &derived, |r| r.region);
    log_group_means("locale", &derived, |r| r.locale);

    let mut kept = filters::apply_exclusions(derived);
    derive::impute_missing(&mut kept);

    info!(
        raw_rows = raw.len(),
        cleaned_rows = kept.len(),
        "Feature derivation complete"
    );
    kept
}

/// Reads the raw CSV, prepares it and writes the cleaned CSV.
#[tracing::instrument(skip_all, fields(
    raw = %raw_path.as_ref().display(),
    cleaned = %cleaned_path.as_ref().display(),
    year = keys.year,
))]
pub fn run_prepare(
    raw_path: impl AsRef<Path>,
    cleaned_path: impl AsRef<Path>,
    keys: &FieldKeys,
) -> Result<Vec<CleanedRecord>> {
    let raw = read_raw_table(raw_path)?;
    let cleaned = prepare(&raw, keys);

    log_correlations(&cleaned);
    write_records(cleaned_path, &cleaned)?;

    Ok(cleaned)
}

/// Logs mean earnings per category code, the evidence behind the fixed
/// region and locale flags.
fn log_group_means(
    group: &str,
    records: &[CleanedRecord],
    code: impl Fn(&CleanedRecord) -> Option<i64>,
) {
    let mut groups: BTreeMap<i64, Vec<Option<f64>>> = BTreeMap::new();
    for r in records {
        if let (Some(c), Some(e)) = (code(r), r.earnings_10yr) {
            groups.entry(c).or_default().push(Some(e));
        }
    }

    for (c, earnings) in groups {
        debug!(
            group,
            code = c,
            schools = earnings.len(),
            mean_earnings = mean(&earnings).map(round2),
            "Mean earnings by group"
        );
    }
}

fn log_correlations(records: &[CleanedRecord]) {
    let columns = correlation_columns(records);

    for (i, (a, xs)) in columns.iter().enumerate() {
        for (b, ys) in &columns[i + 1..] {
            debug!(a, b, r = pearson(xs, ys).map(round2), "Correlation");
        }
    }
}
