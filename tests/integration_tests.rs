use scorecard_rater::config::PipelineConfig;
use scorecard_rater::fields::FieldKeys;
use scorecard_rater::output::{read_records, write_records};
use scorecard_rater::prepare::filters::passes_all;
use scorecard_rater::prepare::run_prepare;
use scorecard_rater::prepare::types::CleanedRecord;
use scorecard_rater::ranking::analyzer::run_rank;
use scorecard_rater::ranking::grade::rating;
use scorecard_rater::ranking::types::{RankingRecord, RatingAggregate};
use scorecard_rater::raw::write_raw_table;
use std::collections::{HashMap, HashSet};
use std::env;
use std::fs;
use std::path::PathBuf;

fn temp_dir(name: &str) -> PathBuf {
    let dir = env::temp_dir().join(name);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn cleaned(id: u64, earnings: f64, score_sat_act: Option<f64>) -> CleanedRecord {
    CleanedRecord {
        id,
        school_name: Some(format!("College {id}")),
        school_city: Some("Springfield".to_string()),
        school_state: Some("IL".to_string()),
        earnings_10yr: Some(earnings),
        log_earnings_10yr: Some(earnings.ln()),
        score_sat_act,
        female_pct: Some(0.55),
        born_in_usa_pct: Some(0.92),
        pell_grant_pct: Some(0.35),
        enrollment: Some(3000.0),
        region_high_inc: 1,
        urban_area: 0,
        public: 1,
        ..Default::default()
    }
}

/// One synthetic institution as raw API cells.
fn raw_institution(keys: &FieldKeys, i: u64) -> HashMap<String, String> {
    let sat = 900 + (i * 37) % 400;
    let earnings = 30000 + 500 * ((i * 29) % 40) + 10 * sat;
    let name = match i {
        3 => "Great Lakes Maritime Academy".to_string(),
        _ => format!("Institution {i}"),
    };
    let state = if i == 5 { "PR" } else { "OH" };

    let mut row = HashMap::from([
        ("id".to_string(), (100000 + i).to_string()),
        ("school.name".to_string(), name),
        ("school.city".to_string(), "Columbus".to_string()),
        ("school.state".to_string(), state.to_string()),
        ("school.ownership".to_string(), (1 + i % 2).to_string()),
        ("school.region_id".to_string(), (i % 9).to_string()),
        ("school.locale".to_string(), [11, 21, 32, 41][(i % 4) as usize].to_string()),
        ("school.carnegie_basic".to_string(), "21".to_string()),
        (keys.sat_average_cohort.clone(), sat.to_string()),
        (keys.pell_grant.clone(), format!("{}", 0.2 + ((i * 13) % 50) as f64 / 100.0)),
        (keys.share_born_us.clone(), (80 + i % 15).to_string()),
        (keys.share_black.clone(), ((i * 7) % 60).to_string()),
        (keys.share_hispanic.clone(), ((i * 11) % 70).to_string()),
        (keys.size.clone(), (1000 + i * 97).to_string()),
        (keys.earnings_female_n.clone(), (200 + i).to_string()),
        (keys.earnings_male_n.clone(), (180 + 2 * i).to_string()),
        (keys.net_price_public.clone(), "14000".to_string()),
        (keys.net_price_private.clone(), "23000".to_string()),
    ]);
    // every fourth school reports no female share and falls back to the cohort
    if i % 4 != 0 {
        row.insert(
            keys.female_share.clone(),
            format!("{}", 0.4 + (i % 7) as f64 / 20.0),
        );
    }
    if i != 8 {
        row.insert(keys.earnings_median.clone(), earnings.to_string());
    }
    row
}

#[test]
fn test_three_school_pipeline() {
    let dir = temp_dir("scorecard_rater_it_three");
    let config = PipelineConfig::default();

    let schools = vec![
        cleaned(1, 10000.0, Some(0.2)),
        cleaned(2, 20000.0, None),
        cleaned(3, 40000.0, Some(0.2)),
    ];
    write_records(config.resolve(&dir, &config.cleaned_file), &schools).unwrap();

    let outcome = run_rank(&dir, &config).unwrap();
    assert_eq!(outcome.summary.dropped_incomplete, 1);

    let rankings: Vec<RankingRecord> =
        read_records(config.resolve(&dir, &config.rankings_file)).unwrap();
    let ids: Vec<u64> = rankings.iter().map(|r| r.id).collect();
    let ranks: Vec<usize> = rankings.iter().map(|r| r.rank).collect();

    assert_eq!(ids, vec![3, 1]);
    assert_eq!(ranks, vec![1, 2]);
    assert!(rankings[0].score > rankings[1].score);

    assert!(config.resolve(&dir, &config.summary_file).exists());
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_prepare_then_rank() {
    let dir = temp_dir("scorecard_rater_it_full");
    let config = PipelineConfig::default();
    let keys = FieldKeys::new(config.year);

    let rows: Vec<HashMap<String, String>> = (0..40).map(|i| raw_institution(&keys, i)).collect();
    write_raw_table(
        config.resolve(&dir, &config.raw_file),
        &keys.requested_fields(),
        &rows,
    )
    .unwrap();

    let prepared = run_prepare(
        config.resolve(&dir, &config.raw_file),
        config.resolve(&dir, &config.cleaned_file),
        &keys,
    )
    .unwrap();

    // maritime, territory and missing-earnings schools are gone
    assert_eq!(prepared.len(), 37);
    assert!(prepared.iter().all(passes_all));
    assert!(
        prepared
            .iter()
            .all(|r| (0.0..=1.0).contains(&r.black_or_hispanic_pct))
    );
    assert!(prepared.iter().all(|r| r.female_pct.is_some()));

    let outcome = run_rank(&dir, &config).unwrap();
    let rankings: Vec<RankingRecord> =
        read_records(config.resolve(&dir, &config.rankings_file)).unwrap();
    assert_eq!(rankings, outcome.rankings);
    assert_eq!(rankings.len(), 37);

    let unique: HashSet<u64> = rankings.iter().map(|r| r.id).collect();
    assert_eq!(unique.len(), rankings.len());

    for (position, r) in rankings.iter().enumerate() {
        assert_eq!(r.rank, position + 1);
        assert_eq!(r.rating, rating(r.score));
    }
    assert!(rankings.windows(2).all(|w| w[0].score >= w[1].score));

    let means: Vec<RatingAggregate> =
        read_records(config.resolve(&dir, &config.means_file)).unwrap();
    assert!(means.len() <= 5);
    assert!(means.windows(2).all(|w| w[0].rating < w[1].rating));
    for m in &means {
        let group: Vec<&RankingRecord> = rankings.iter().filter(|r| r.rating == m.rating).collect();
        let expected = group.iter().map(|r| r.score).sum::<f64>() / group.len() as f64;
        assert!((m.score.unwrap() - expected).abs() <= 0.005 + 1e-9);
    }

    let counted: usize = outcome.summary.schools_by_rating.values().sum();
    assert_eq!(counted, rankings.len());
    assert_eq!(outcome.summary.folds.len(), 5);

    fs::remove_dir_all(&dir).unwrap();
}
