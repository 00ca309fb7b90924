//! Row exclusion rules for the cleaned table.
//!
//! A record is kept only if every rule in [`EXCLUSIONS`] keeps it.

use tracing::debug;

use crate::prepare::types::CleanedRecord;

/// Branch campuses that all report the main campus's earnings.
pub const PENN_STATE_CAMPUS: &str = "Pennsylvania State University-Penn State";
pub const MARITIME_ACADEMY: &str = "Maritime";
pub const MEDICAL_CAMPUS: &str = "Anschutz";
pub const TERRITORY_STATE: &str = "PR";

/// Carnegie basic classifications of bachelor's-granting colleges and
/// universities. Excludes special-focus schools such as seminaries and
/// nursing schools.
pub const BACHELORS_CARNEGIE: &[i64] = &[15, 16, 17, 18, 19, 20, 21, 22, 27, 29, 32];

/// A named keep-predicate.
pub struct Exclusion {
    pub name: &'static str,
    pub keep: fn(&CleanedRecord) -> bool,
}

/// Exclusion rules, applied in this order.
pub static EXCLUSIONS: &[Exclusion] = &[
    Exclusion {
        name: "penn_state_campus",
        keep: |r| name_lacks(r, PENN_STATE_CAMPUS),
    },
    Exclusion {
        name: "carnegie_basic",
        keep: |r| r.carnegie_basic.is_some_and(|c| BACHELORS_CARNEGIE.contains(&c)),
    },
    Exclusion {
        name: "maritime_academy",
        keep: |r| name_lacks(r, MARITIME_ACADEMY),
    },
    Exclusion {
        name: "medical_campus",
        keep: |r| name_lacks(r, MEDICAL_CAMPUS),
    },
    Exclusion {
        name: "territory",
        keep: |r| r.school_state.as_deref() != Some(TERRITORY_STATE),
    },
    Exclusion {
        name: "missing_earnings",
        keep: |r| r.earnings_10yr.is_some(),
    },
    Exclusion {
        name: "missing_test_score",
        keep: |r| r.score_sat_act.is_some(),
    },
];

/// An unnamed record never passes a name rule.
fn name_lacks(record: &CleanedRecord, marker: &str) -> bool {
    record
        .school_name
        .as_deref()
        .is_some_and(|name| !name.contains(marker))
}

/// Returns `true` if the record passes every exclusion rule.
pub fn passes_all(record: &CleanedRecord) -> bool {
    EXCLUSIONS.iter().all(|rule| (rule.keep)(record))
}

/// Drops every record that fails a rule, logging how many each rule removed.
pub fn apply_exclusions(mut records: Vec<CleanedRecord>) -> Vec<CleanedRecord> {
    for rule in EXCLUSIONS {
        let before = records.len();
        records.retain(|r| (rule.keep)(r));
        debug!(
            rule = rule.name,
            removed = before - records.len(),
            remaining = records.len(),
            "Exclusion applied"
        );
    }
    records
}
