use std::collections::BTreeMap;

use crate::ranking::types::{RankingRecord, RatingAggregate};
use crate::stats::{mean, round2};

/// Per-rating column means, in ascending rating order.
///
/// Missing values are skipped; a column with no values in a group stays
/// empty.
pub fn aggregate_by_rating(rankings: &[RankingRecord]) -> Vec<RatingAggregate> {
    let mut groups: BTreeMap<u8, Vec<&RankingRecord>> = BTreeMap::new();
    for record in rankings {
        groups.entry(record.rating).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|(rating, group)| {
            let avg = |get: fn(&RankingRecord) -> Option<f64>| {
                let values: Vec<Option<f64>> = group.iter().map(|r| get(r)).collect();
                mean(&values).map(round2)
            };

            RatingAggregate {
                rating,
                rank: avg(|r| Some(r.rank as f64)),
                score: avg(|r| Some(r.score)),
                earnings_10yr: avg(|r| r.earnings_10yr),
                pred_earnings_10yr_ols: avg(|r| Some(r.pred_earnings_10yr_ols)),
                public: avg(|r| Some(f64::from(r.public))),
                score_sat_act: avg(|r| r.score_sat_act),
                pell_grant_pct: avg(|r| r.pell_grant_pct),
                born_in_usa_pct: avg(|r| r.born_in_usa_pct),
                female_pct: avg(|r| r.female_pct),
                region_high_inc: avg(|r| Some(f64::from(r.region_high_inc))),
                urban_area: avg(|r| Some(f64::from(r.urban_area))),
                enrollment: avg(|r| r.enrollment),
                black_or_hispanic_pct: avg(|r| Some(r.black_or_hispanic_pct)),
                overage23: avg(|r| r.overage23),
                median_hh_income: avg(|r| r.median_hh_income),
                avg_sat_2011: avg(|r| r.avg_sat_2011),
                median_act_2011: avg(|r| r.median_act_2011),
                avg_net_price_2011: avg(|r| r.avg_net_price_2011),
                avg_net_price_lowinc_2011: avg(|r| r.avg_net_price_lowinc_2011),
                admission_rate_2011: avg(|r| r.admission_rate_2011),
                completion_rate_6yr_2011: avg(|r| r.completion_rate_6yr_2011),
            }
        })
        .collect()
}

/// Number of ranked schools per rating.
pub fn count_by_rating(rankings: &[RankingRecord]) -> BTreeMap<u8, usize> {
    let mut counts = BTreeMap::new();
    for record in rankings {
        *counts.entry(record.rating).or_insert(0) += 1;
    }
    counts
}
