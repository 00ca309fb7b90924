/// A score band that assigns `rating` when `applies` holds.
pub struct RatingRule {
    pub applies: fn(f64) -> bool,
    pub rating: u8,
}

/// Rating when no rule matches (including a NaN score).
pub const DEFAULT_RATING: u8 = 3;

/// Evaluated top to bottom; every matching rule overwrites the rating, so
/// the last match wins.
///
/// | Score              | Rating |
/// |--------------------|--------|
/// | >= 1.5             | 5      |
/// | >= 0.5, < 1.5      | 4      |
/// | > -0.5, < 0.5      | 3      |
/// | > -1.5, <= -0.5    | 2      |
/// | <= -1.5            | 1      |
pub static RATING_RULES: &[RatingRule] = &[
    RatingRule {
        applies: |s| s >= 0.5,
        rating: 4,
    },
    RatingRule {
        applies: |s| s >= 1.5,
        rating: 5,
    },
    RatingRule {
        applies: |s| s < 0.5,
        rating: 3,
    },
    RatingRule {
        applies: |s| s <= -0.5,
        rating: 2,
    },
    RatingRule {
        applies: |s| s <= -1.5,
        rating: 1,
    },
];

/// Converts a standardized score into a 1–5 rating.
pub fn rating(score: f64) -> u8 {
    RATING_RULES
        .iter()
        .fold(DEFAULT_RATING, |current, rule| {
            if (rule.applies)(score) {
                rule.rating
            } else {
                current
            }
        })
}
