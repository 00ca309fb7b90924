//! Per-row feature derivation and post-filter imputation.

use tracing::{debug, warn};

use crate::fields::FieldKeys;
use crate::prepare::types::CleanedRecord;
use crate::raw::RawRecord;
use crate::stats::{mean, standardize};

/// Region codes with markedly higher median earnings (New England, Mid East,
/// Great Lakes, Far West). Fixed; not re-estimated per run.
pub const HIGH_INCOME_REGIONS: &[i64] = &[0, 1, 2, 8];

/// City and suburban locale codes.
pub const URBAN_LOCALES: &[i64] = &[11, 12, 13, 21, 22, 23, 31];

const PUBLIC: i64 = 1;
const PRIVATE: i64 = 2;

/// Derives a [`CleanedRecord`] for every raw row that carries an id.
///
/// Standardized columns use statistics over the whole raw table, before any
/// row is excluded.
pub fn derive_records(raw: &[RawRecord], keys: &FieldKeys) -> Vec<CleanedRecord> {
    let sat = standardize(&column(raw, &keys.sat_average_cohort));
    let act = standardize(&column(raw, &keys.act_midpoint_cohort));
    let completion = standardize(&column(raw, &keys.completion_rate));
    let renames = keys.renames();

    raw.iter()
        .enumerate()
        .filter_map(|(i, record)| {
            let Some(id) = record.id() else {
                warn!(row = i, "Raw row has no institution id, skipping");
                return None;
            };
            let row = record.renamed(&renames);

            let ownership = row.code("school_ownership");
            let region = row.code("region");
            let locale = row.code("locale");
            let earnings = row.number("earnings_10yr");

            let female_n = record.number(&keys.earnings_female_n);
            let male_n = record.number(&keys.earnings_male_n);
            let total_cohort_n = female_n.unwrap_or(0.0) + male_n.unwrap_or(0.0);

            let pct_black = record.number(&keys.share_black).map(|v| v / 100.0);
            let pct_hispanic = record.number(&keys.share_hispanic).map(|v| v / 100.0);

            Some(CleanedRecord {
                id,
                school_name: row.text("school_name"),
                school_city: row.text("school_city"),
                school_state: row.text("school_state"),
                school_ownership: ownership,
                region,
                locale,
                locale2: row.code("locale2"),
                carnegie_basic: row.code("carnegie_basic"),
                hb_univ: row.code("hb_univ"),
                women_only: row.code("women_only"),
                earnings_10yr: earnings,
                log_earnings_10yr: log_positive(earnings),
                sat_score: sat[i],
                act_score: act[i],
                score_sat_act: sat[i].or(act[i]),
                avg_net_price_2011: by_ownership(
                    ownership,
                    record.number(&keys.net_price_public),
                    record.number(&keys.net_price_private),
                ),
                avg_net_price_lowinc_2011: by_ownership(
                    ownership,
                    record.number(&keys.net_price_lowinc_public),
                    record.number(&keys.net_price_lowinc_private),
                ),
                completion_rate_std_2011: completion[i],
                total_cohort_n,
                female_pct2: female_n.and_then(|f| share(f, total_cohort_n)),
                region_high_inc: flag(region, HIGH_INCOME_REGIONS),
                urban_area: flag(locale, URBAN_LOCALES),
                public: u8::from(ownership == Some(PUBLIC)),
                pct_black,
                pct_hispanic,
                black_or_hispanic_pct: (pct_black.unwrap_or(0.0) + pct_hispanic.unwrap_or(0.0))
                    .min(1.0),
                born_in_usa_pct: record.number(&keys.share_born_us).map(|v| v / 100.0),
                overage23: row.number("overage23"),
                pell_grant_pct: row.number("pell_grant_pct"),
                female: row.number("female"),
                female_pct: None,
                pct_college_degree: row.number("pct_college_degree"),
                median_family_income: row.number("median_family_income"),
                first_gen: row.number("first_gen"),
                median_hh_income: row.number("median_hh_income"),
                log_median_hh_income: row.number("log_median_hh_income"),
                enrollment: row.number("enrollment"),
                avg_sat_2011: row.number("avg_sat_2011"),
                median_act_2011: row.number("median_act_2011"),
                completion_rate_6yr_2011: row.number("completion_rate_6yr_2011"),
                admission_rate_2011: row.number("admission_rate_2011"),
            })
        })
        .collect()
}

/// Fills `female_pct` from the reported share, falling back to the earnings
/// cohort share, then mean-imputes `female_pct` and `pell_grant_pct`.
///
/// Means are taken over `records` as given, so this must run after the
/// exclusion filters.
pub fn impute_missing(records: &mut [CleanedRecord]) {
    for r in records.iter_mut() {
        r.female_pct = r.female.or(r.female_pct2);
    }

    let female_mean = mean(&records.iter().map(|r| r.female_pct).collect::<Vec<_>>());
    let pell_mean = mean(&records.iter().map(|r| r.pell_grant_pct).collect::<Vec<_>>());
    debug!(?female_mean, ?pell_mean, "Imputation means");

    let mut imputed_female = 0;
    let mut imputed_pell = 0;
    for r in records.iter_mut() {
        if r.female_pct.is_none() {
            r.female_pct = female_mean;
            imputed_female += 1;
        }
        if r.pell_grant_pct.is_none() {
            r.pell_grant_pct = pell_mean;
            imputed_pell += 1;
        }
    }

    debug!(imputed_female, imputed_pell, "Missing shares imputed with column means");
}

fn column(raw: &[RawRecord], key: &str) -> Vec<Option<f64>> {
    raw.iter().map(|r| r.number(key)).collect()
}

fn by_ownership(ownership: Option<i64>, public: Option<f64>, private: Option<f64>) -> Option<f64> {
    match ownership {
        Some(PUBLIC) => public,
        Some(PRIVATE) => private,
        _ => None,
    }
}

fn log_positive(x: Option<f64>) -> Option<f64> {
    x.filter(|v| *v > 0.0).map(f64::ln)
}

fn share(part: f64, total: f64) -> Option<f64> {
    (total != 0.0).then(|| part / total)
}

fn flag(code: Option<i64>, set: &[i64]) -> u8 {
    u8::from(code.is_some_and(|c| set.contains(&c)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_row(id: &str, extra: &[(&str, &str)]) -> RawRecord {
        let mut pairs: Vec<(String, String)> = vec![("id".into(), id.into())];
        for (k, v) in extra {
            pairs.push((k.to_string(), v.to_string()));
        }
        RawRecord::from_pairs(pairs)
    }

    #[test]
    fn test_composite_prefers_sat_then_act() {
        let keys = FieldKeys::new(2011);
        let sat = keys.sat_average_cohort.as_str();
        let act = keys.act_midpoint_cohort.as_str();
        let raw = vec![
            raw_row("1", &[(sat, "1000"), (act, "20")]),
            raw_row("2", &[(sat, "1200"), (act, "30")]),
            raw_row("3", &[(act, "25")]),
            raw_row("4", &[]),
        ];

        let records = derive_records(&raw, &keys);

        assert_eq!(records[0].score_sat_act, records[0].sat_score);
        assert!(records[0].score_sat_act.unwrap() < 0.0);
        assert!(records[1].score_sat_act.unwrap() > 0.0);
        // act column is {20, 30, 25}: 25 is the mean
        assert_eq!(records[2].score_sat_act, Some(0.0));
        assert_eq!(records[3].score_sat_act, None);
    }

    #[test]
    fn test_net_price_follows_ownership() {
        let keys = FieldKeys::new(2011);
        let prices: [(&str, &str); 4] = [
            (keys.net_price_public.as_str(), "9000"),
            (keys.net_price_private.as_str(), "21000"),
            (keys.net_price_lowinc_public.as_str(), "7000"),
            (keys.net_price_lowinc_private.as_str(), "15000"),
        ];
        let mut public_row = prices.to_vec();
        public_row.push(("school.ownership", "1"));
        let mut private_row = prices.to_vec();
        private_row.push(("school.ownership", "2"));
        let mut other_row = prices.to_vec();
        other_row.push(("school.ownership", "3"));

        let raw = vec![
            raw_row("1", &public_row),
            raw_row("2", &private_row),
            raw_row("3", &other_row),
        ];
        let records = derive_records(&raw, &keys);

        assert_eq!(records[0].avg_net_price_2011, Some(9000.0));
        assert_eq!(records[0].avg_net_price_lowinc_2011, Some(7000.0));
        assert_eq!(records[0].public, 1);
        assert_eq!(records[1].avg_net_price_2011, Some(21000.0));
        assert_eq!(records[1].avg_net_price_lowinc_2011, Some(15000.0));
        assert_eq!(records[1].public, 0);
        assert_eq!(records[2].avg_net_price_2011, None);
        assert_eq!(records[2].public, 0);
    }

    #[test]
    fn test_log_earnings_undefined_for_non_positive() {
        let keys = FieldKeys::new(2011);
        let e = keys.earnings_median.as_str();
        let raw = vec![
            raw_row("1", &[(e, "40000")]),
            raw_row("2", &[(e, "0")]),
            raw_row("3", &[(e, "-5")]),
            raw_row("4", &[]),
        ];
        let records = derive_records(&raw, &keys);

        assert!((records[0].log_earnings_10yr.unwrap() - 40000f64.ln()).abs() < 1e-12);
        assert_eq!(records[1].log_earnings_10yr, None);
        assert_eq!(records[2].log_earnings_10yr, None);
        assert_eq!(records[3].log_earnings_10yr, None);
        assert_eq!(records[1].earnings_10yr, Some(0.0));
    }

    #[test]
    fn test_cohort_female_share() {
        let keys = FieldKeys::new(2011);
        let f = keys.earnings_female_n.as_str();
        let m = keys.earnings_male_n.as_str();
        let raw = vec![
            raw_row("1", &[(f, "30"), (m, "70")]),
            raw_row("2", &[(f, "30")]),
            raw_row("3", &[(m, "70")]),
            raw_row("4", &[(f, "0"), (m, "0")]),
        ];
        let records = derive_records(&raw, &keys);

        assert_eq!(records[0].total_cohort_n, 100.0);
        assert_eq!(records[0].female_pct2, Some(0.3));
        assert_eq!(records[1].female_pct2, Some(1.0));
        assert_eq!(records[2].total_cohort_n, 70.0);
        assert_eq!(records[2].female_pct2, None);
        assert_eq!(records[3].female_pct2, None);
    }

    #[test]
    fn test_region_and_urban_flags() {
        let keys = FieldKeys::new(2011);
        let raw = vec![
            raw_row("1", &[("school.region_id", "8"), ("school.locale", "31")]),
            raw_row("2", &[("school.region_id", "5"), ("school.locale", "41")]),
            raw_row("3", &[]),
        ];
        let records = derive_records(&raw, &keys);

        assert_eq!((records[0].region_high_inc, records[0].urban_area), (1, 1));
        assert_eq!((records[1].region_high_inc, records[1].urban_area), (0, 0));
        assert_eq!((records[2].region_high_inc, records[2].urban_area), (0, 0));
    }

    #[test]
    fn test_race_share_is_capped() {
        let keys = FieldKeys::new(2011);
        let b = keys.share_black.as_str();
        let h = keys.share_hispanic.as_str();
        let raw = vec![
            raw_row("1", &[(b, "70"), (h, "45")]),
            raw_row("2", &[(b, "10"), (h, "15")]),
            raw_row("3", &[(h, "15")]),
            raw_row("4", &[]),
        ];
        let records = derive_records(&raw, &keys);

        assert_eq!(records[0].black_or_hispanic_pct, 1.0);
        assert!((records[1].black_or_hispanic_pct - 0.25).abs() < 1e-12);
        assert!((records[2].black_or_hispanic_pct - 0.15).abs() < 1e-12);
        assert_eq!(records[3].black_or_hispanic_pct, 0.0);
        assert!(records.iter().all(|r| (0.0..=1.0).contains(&r.black_or_hispanic_pct)));
    }

    #[test]
    fn test_rows_without_id_are_skipped() {
        let keys = FieldKeys::new(2011);
        let raw = vec![
            RawRecord::from_pairs([("school.name", "No Id")]),
            raw_row("7", &[]),
        ];
        let records = derive_records(&raw, &keys);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 7);
    }

    #[test]
    fn test_renamed_columns_are_read() {
        let keys = FieldKeys::new(2011);
        let raw = vec![raw_row(
            "9",
            &[
                ("school.name", "Gamma University"),
                ("school.state", "OH"),
                ("school.carnegie_basic", "18.0"),
                (keys.size.as_str(), "5400"),
                (keys.sat_average.as_str(), "1130"),
                (keys.admission_rate.as_str(), "0.61"),
            ],
        )];
        let records = derive_records(&raw, &keys);

        assert_eq!(records[0].school_name.as_deref(), Some("Gamma University"));
        assert_eq!(records[0].school_state.as_deref(), Some("OH"));
        assert_eq!(records[0].carnegie_basic, Some(18));
        assert_eq!(records[0].enrollment, Some(5400.0));
        assert_eq!(records[0].avg_sat_2011, Some(1130.0));
        assert_eq!(records[0].admission_rate_2011, Some(0.61));
    }

    #[test]
    fn test_impute_missing() {
        let mut records = vec![
            CleanedRecord {
                id: 1,
                female: Some(0.6),
                pell_grant_pct: Some(0.2),
                ..Default::default()
            },
            CleanedRecord {
                id: 2,
                female_pct2: Some(0.4),
                pell_grant_pct: Some(0.4),
                ..Default::default()
            },
            CleanedRecord {
                id: 3,
                ..Default::default()
            },
        ];

        impute_missing(&mut records);

        assert_eq!(records[0].female_pct, Some(0.6));
        assert_eq!(records[1].female_pct, Some(0.4));
        assert!((records[2].female_pct.unwrap() - 0.5).abs() < 1e-12);
        assert!((records[2].pell_grant_pct.unwrap() - 0.3).abs() < 1e-12);
        assert!(records.iter().all(|r| r.female_pct.is_some() && r.pell_grant_pct.is_some()));
    }
}
