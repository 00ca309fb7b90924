//! Raw Scorecard column keys.
//!
//! Dated Scorecard fields are keyed as `"{year}.{dotted.path}"`. Outcome
//! fields (earnings, prices, admissions) use the outcome year; demographic
//! and school fields use the entering cohort, ten years earlier. [`FieldKeys`]
//! resolves every logical field to its raw key once so the rest of the
//! pipeline never formats keys itself.

/// Outcome year used when none is given.
pub const DEFAULT_YEAR: i32 = 2011;

/// Years between the entering cohort and the earnings measurement.
pub const COHORT_OFFSET: i32 = 10;

pub const ID: &str = "id";
pub const NAME: &str = "school.name";
pub const CITY: &str = "school.city";
pub const STATE: &str = "school.state";
pub const OWNERSHIP: &str = "school.ownership";
pub const REGION: &str = "school.region_id";
pub const LOCALE: &str = "school.locale";
pub const DEGREE_URBANIZATION: &str = "school.degree_urbanization";
pub const CARNEGIE_BASIC: &str = "school.carnegie_basic";
pub const HISTORICALLY_BLACK: &str = "school.minority_serving.historically_black";
pub const WOMEN_ONLY: &str = "school.women_only";

/// Undated identity and classification fields, in request order.
pub const STATIC_FIELDS: &[&str] = &[
    ID,
    NAME,
    CITY,
    STATE,
    "school.minority_serving.predominantly_black",
    HISTORICALLY_BLACK,
    WOMEN_ONLY,
    "school.degrees_awarded.predominant",
    OWNERSHIP,
    "school.operating",
    REGION,
    LOCALE,
    DEGREE_URBANIZATION,
    CARNEGIE_BASIC,
];

/// School fields requested for the cohort year.
pub const SCHOOL_COLUMNS: &[&str] = &[
    "admissions.act_scores.midpoint.cumulative",
    "admissions.sat_scores.average.overall",
    "cost.tuition.in_state",
    "cost.tuition.out_of_state",
    "completion.completion_rate_4yr_150nt",
    "admissions.admission_rate.overall",
    "cost.avg_net_price.public",
    "cost.avg_net_price.private",
    "admissions.sat_scores.midpoint.critical_reading",
    "admissions.sat_scores.midpoint.math",
    "admissions.act_scores.25th_percentile.cumulative",
    "admissions.act_scores.75th_percentile.cumulative",
];

/// Student demographic fields requested for the cohort year.
pub const STUDENT_COLUMNS: &[&str] = &[
    "student.demographics.share_black.home_ZIP",
    "student.demographics.share_hispanic.home_ZIP",
    "student.demographics.over_23_at_entry",
    "student.demographics.female_share",
    "student.students_with_pell_grant",
    "student.demographics.first_generation",
    "student.demographics.avg_family_income_log",
    "student.demographics.median_family_income",
    "student.demographics.median_hh_income",
    "student.demographics.share_born_US.home_ZIP",
    "student.demographics.share_bachelors_degree_age25.home_ZIP",
    "student.size",
    "student.demographics.median_hh_income_log",
];

/// Earnings, price and admissions fields requested for the outcome year.
pub const EARNINGS_COLUMNS: &[&str] = &[
    "admissions.act_scores.midpoint.cumulative",
    "admissions.sat_scores.average.overall",
    "cost.tuition.in_state",
    "cost.tuition.out_of_state",
    "completion.completion_rate_4yr_150nt",
    "admissions.admission_rate.overall",
    "earnings.10_yrs_after_entry.median",
    "earnings.10_yrs_after_entry.female_students",
    "earnings.10_yrs_after_entry.male_students",
    "cost.avg_net_price.public",
    "cost.avg_net_price.private",
    "cost.net_price.public.by_income_level.0-48000",
    "cost.net_price.private.by_income_level.0-48000",
];

/// Raw keys for every dated field the pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldKeys {
    pub year: i32,
    pub cohort_year: i32,

    // cohort year
    pub sat_average_cohort: String,
    pub act_midpoint_cohort: String,
    pub share_black: String,
    pub share_hispanic: String,
    pub share_born_us: String,
    pub over_23: String,
    pub pell_grant: String,
    pub female_share: String,
    pub bachelors_share: String,
    pub median_family_income: String,
    pub first_generation: String,
    pub median_hh_income: String,
    pub median_hh_income_log: String,
    pub size: String,

    // outcome year
    pub sat_average: String,
    pub act_midpoint: String,
    pub completion_rate: String,
    pub admission_rate: String,
    pub earnings_median: String,
    pub earnings_female_n: String,
    pub earnings_male_n: String,
    pub net_price_public: String,
    pub net_price_private: String,
    pub net_price_lowinc_public: String,
    pub net_price_lowinc_private: String,
}

impl FieldKeys {
    /// Builds the key table for an outcome year; the cohort is ten years earlier.
    pub fn new(year: i32) -> Self {
        let cohort_year = year - COHORT_OFFSET;
        let c = |path: &str| format!("{cohort_year}.{path}");
        let y = |path: &str| format!("{year}.{path}");

        Self {
            year,
            cohort_year,
            sat_average_cohort: c("admissions.sat_scores.average.overall"),
            act_midpoint_cohort: c("admissions.act_scores.midpoint.cumulative"),
            share_black: c("student.demographics.share_black.home_ZIP"),
            share_hispanic: c("student.demographics.share_hispanic.home_ZIP"),
            share_born_us: c("student.demographics.share_born_US.home_ZIP"),
            over_23: c("student.demographics.over_23_at_entry"),
            pell_grant: c("student.students_with_pell_grant"),
            female_share: c("student.demographics.female_share"),
            bachelors_share: c("student.demographics.share_bachelors_degree_age25.home_ZIP"),
            median_family_income: c("student.demographics.median_family_income"),
            first_generation: c("student.demographics.first_generation"),
            median_hh_income: c("student.demographics.median_hh_income"),
            median_hh_income_log: c("student.demographics.median_hh_income_log"),
            size: c("student.size"),
            sat_average: y("admissions.sat_scores.average.overall"),
            act_midpoint: y("admissions.act_scores.midpoint.cumulative"),
            completion_rate: y("completion.completion_rate_4yr_150nt"),
            admission_rate: y("admissions.admission_rate.overall"),
            earnings_median: y("earnings.10_yrs_after_entry.median"),
            earnings_female_n: y("earnings.10_yrs_after_entry.female_students"),
            earnings_male_n: y("earnings.10_yrs_after_entry.male_students"),
            net_price_public: y("cost.avg_net_price.public"),
            net_price_private: y("cost.avg_net_price.private"),
            net_price_lowinc_public: y("cost.net_price.public.by_income_level.0-48000"),
            net_price_lowinc_private: y("cost.net_price.private.by_income_level.0-48000"),
        }
    }

    /// Every column requested from the API, in the order it is written to
    /// the raw table.
    pub fn requested_fields(&self) -> Vec<String> {
        let cohort = SCHOOL_COLUMNS
            .iter()
            .chain(STUDENT_COLUMNS)
            .map(|path| format!("{}.{path}", self.cohort_year));
        let outcome = EARNINGS_COLUMNS
            .iter()
            .map(|path| format!("{}.{path}", self.year));

        STATIC_FIELDS
            .iter()
            .map(|s| s.to_string())
            .chain(cohort)
            .chain(outcome)
            .collect()
    }

    /// Source key to cleaned column name, for every renamed column.
    ///
    /// Target names keep the `_2011` suffix for every year so downstream
    /// readers see one stable schema.
    pub fn renames(&self) -> Vec<(&str, &'static str)> {
        vec![
            (NAME, "school_name"),
            (OWNERSHIP, "school_ownership"),
            (STATE, "school_state"),
            (CITY, "school_city"),
            (REGION, "region"),
            (&self.earnings_median, "earnings_10yr"),
            (&self.over_23, "overage23"),
            (&self.pell_grant, "pell_grant_pct"),
            (&self.female_share, "female"),
            (HISTORICALLY_BLACK, "hb_univ"),
            (WOMEN_ONLY, "women_only"),
            (&self.bachelors_share, "pct_college_degree"),
            (&self.median_family_income, "median_family_income"),
            (&self.sat_average, "avg_sat_2011"),
            (&self.act_midpoint, "median_act_2011"),
            (&self.completion_rate, "completion_rate_6yr_2011"),
            (&self.admission_rate, "admission_rate_2011"),
            (&self.first_generation, "first_gen"),
            (&self.median_hh_income, "median_hh_income"),
            (&self.median_hh_income_log, "log_median_hh_income"),
            (LOCALE, "locale"),
            (DEGREE_URBANIZATION, "locale2"),
            (&self.size, "enrollment"),
            (CARNEGIE_BASIC, "carnegie_basic"),
        ]
    }
}

impl Default for FieldKeys {
    fn default() -> Self {
        Self::new(DEFAULT_YEAR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cohort_is_ten_years_earlier() {
        let keys = FieldKeys::new(2013);
        assert_eq!(keys.cohort_year, 2003);
        assert_eq!(keys.earnings_median, "2013.earnings.10_yrs_after_entry.median");
        assert_eq!(keys.sat_average_cohort, "2003.admissions.sat_scores.average.overall");
        assert_eq!(keys.sat_average, "2013.admissions.sat_scores.average.overall");
    }

    #[test]
    fn test_requested_fields_order_and_count() {
        let keys = FieldKeys::default();
        let fields = keys.requested_fields();

        assert_eq!(
            fields.len(),
            STATIC_FIELDS.len() + SCHOOL_COLUMNS.len() + STUDENT_COLUMNS.len() + EARNINGS_COLUMNS.len()
        );
        assert_eq!(fields[0], "id");
        assert!(fields.contains(&"2001.student.size".to_string()));
        assert_eq!(
            fields.last().map(String::as_str),
            Some("2011.cost.net_price.private.by_income_level.0-48000")
        );
    }

    #[test]
    fn test_renames_are_unique_and_stable() {
        let keys = FieldKeys::new(2015);
        let renames = keys.renames();
        assert_eq!(renames.len(), 24);

        let mut targets: Vec<_> = renames.iter().map(|(_, t)| *t).collect();
        targets.sort_unstable();
        targets.dedup();
        assert_eq!(targets.len(), 24);

        assert!(renames.contains(&("2015.admissions.sat_scores.average.overall", "avg_sat_2011")));
        assert!(renames.contains(&("2005.student.size", "enrollment")));
    }
}
