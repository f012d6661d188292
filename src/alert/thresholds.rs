//! Drainage threshold checking.
//!
//! Derives `DrainageState` and `BlockageState` from a single sample. The
//! evaluator is stateless: the same sample always yields the same states,
//! with no memory of earlier ticks. Deduplication of repeated alerts is the
//! dispatcher's job (see `alert::dispatch`).

use tracing::warn;

use crate::model::{BlockageState, DrainageState, Evaluation, TelemetrySample};

/// How a water-level reading is judged to be an overflow.
#[derive(Debug, Clone, PartialEq)]
pub enum OverflowRule {
    /// Overflow iff the reading text equals this literal exactly.
    ///
    /// `"99.91%"` and `"100.00%"` are *not* overflows under this rule. The
    /// firmware saturates at `99.90%`, so on stock devices the literal is
    /// the only full-scale reading.
    ExactMatch(String),
    /// Overflow iff the reading, parsed as a percentage, is at least
    /// `threshold_percent - tolerance`.
    Numeric { threshold_percent: f64, tolerance: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdEvaluator {
    overflow_rule: OverflowRule,
    blockage_distance_cm: i64,
}

impl ThresholdEvaluator {
    pub fn new(overflow_rule: OverflowRule, blockage_distance_cm: i64) -> Self {
        Self {
            overflow_rule,
            blockage_distance_cm,
        }
    }

    pub fn overflow_rule(&self) -> &OverflowRule {
        &self.overflow_rule
    }

    pub fn blockage_distance_cm(&self) -> i64 {
        self.blockage_distance_cm
    }

    /// Computes both states for `sample`, independently of each other.
    pub fn evaluate(&self, sample: &TelemetrySample) -> Evaluation {
        Evaluation {
            drainage: self.drainage_state(&sample.water_level),
            blockage: self.blockage_state(sample.distance_cm),
        }
    }

    pub fn drainage_state(&self, water_level: &str) -> DrainageState {
        let overflow = match &self.overflow_rule {
            OverflowRule::ExactMatch(literal) => water_level == literal,
            OverflowRule::Numeric { threshold_percent, tolerance } => match parse_percent(water_level) {
                Some(value) => value >= threshold_percent - tolerance,
                None => {
                    warn!(water_level, "water level is not a percentage, treating as normal");
                    false
                }
            },
        };

        if overflow {
            DrainageState::Overflow
        } else {
            DrainageState::Normal
        }
    }

    /// Detected at or below the threshold distance.
    pub fn blockage_state(&self, distance_cm: i64) -> BlockageState {
        if distance_cm <= self.blockage_distance_cm {
            BlockageState::Detected
        } else {
            BlockageState::Clear
        }
    }
}

impl Default for ThresholdEvaluator {
    fn default() -> Self {
        Self::new(
            OverflowRule::ExactMatch(crate::config::DEFAULT_OVERFLOW_READING.to_string()),
            crate::config::DEFAULT_BLOCKAGE_DISTANCE_CM,
        )
    }
}

/// Parses `"99.90%"` or `"99.90"` into `99.9`. Returns `None` for anything
/// that is not a finite number.
pub fn parse_percent(reading: &str) -> Option<f64> {
    let trimmed = reading.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    number.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample(water_level: &str, distance_cm: i64) -> TelemetrySample {
        TelemetrySample {
            water_level: water_level.to_string(),
            distance_cm,
            observed_at: Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap(),
        }
    }

    fn numeric() -> ThresholdEvaluator {
        ThresholdEvaluator::new(
            OverflowRule::Numeric {
                threshold_percent: 99.90,
                tolerance: 0.005,
            },
            20,
        )
    }

    // --- Exact match --------------------------------------------------------

    #[test]
    fn test_exact_rule_overflow_only_for_literal() {
        let evaluator = ThresholdEvaluator::default();
        assert_eq!(evaluator.evaluate(&sample("99.90%", 50)).drainage, DrainageState::Overflow);
    }

    #[test]
    fn test_exact_rule_higher_readings_are_normal() {
        let evaluator = ThresholdEvaluator::default();
        assert_eq!(evaluator.evaluate(&sample("99.91%", 50)).drainage, DrainageState::Normal);
        assert_eq!(evaluator.evaluate(&sample("100.00%", 50)).drainage, DrainageState::Normal);
    }

    #[test]
    fn test_exact_rule_is_textual() {
        let evaluator = ThresholdEvaluator::default();
        assert_eq!(evaluator.drainage_state("99.9%"), DrainageState::Normal);
        assert_eq!(evaluator.drainage_state("99.90"), DrainageState::Normal);
    }

    // --- Numeric ------------------------------------------------------------

    #[test]
    fn test_numeric_rule_at_and_above_threshold() {
        let evaluator = numeric();
        assert_eq!(evaluator.drainage_state("99.90%"), DrainageState::Overflow);
        assert_eq!(evaluator.drainage_state("99.91%"), DrainageState::Overflow);
        assert_eq!(evaluator.drainage_state("100.00%"), DrainageState::Overflow);
        assert_eq!(evaluator.drainage_state("99.9"), DrainageState::Overflow);
    }

    #[test]
    fn test_numeric_rule_tolerance_boundary() {
        let evaluator = numeric();
        assert_eq!(evaluator.drainage_state("99.896%"), DrainageState::Overflow);
        assert_eq!(evaluator.drainage_state("99.89%"), DrainageState::Normal);
        assert_eq!(evaluator.drainage_state("99.80%"), DrainageState::Normal);
    }

    #[test]
    fn test_numeric_rule_unparseable_reading_is_normal() {
        let evaluator = numeric();
        assert_eq!(evaluator.drainage_state("full"), DrainageState::Normal);
        assert_eq!(evaluator.drainage_state("NaN%"), DrainageState::Normal);
    }

    #[test]
    fn test_parse_percent() {
        assert_eq!(parse_percent("50.00%"), Some(50.0));
        assert_eq!(parse_percent(" 12 % "), Some(12.0));
        assert_eq!(parse_percent("inf"), None);
        assert_eq!(parse_percent(""), None);
    }

    // --- Blockage -----------------------------------------------------------

    #[test]
    fn test_blockage_at_and_below_threshold() {
        let evaluator = ThresholdEvaluator::default();
        assert_eq!(evaluator.evaluate(&sample("50.00%", 20)).blockage, BlockageState::Detected);
        assert_eq!(evaluator.evaluate(&sample("50.00%", 5)).blockage, BlockageState::Detected);
    }

    #[test]
    fn test_blockage_clear_above_threshold() {
        let evaluator = ThresholdEvaluator::default();
        assert_eq!(evaluator.evaluate(&sample("50.00%", 21)).blockage, BlockageState::Clear);
    }

    #[test]
    fn test_states_are_independent() {
        let evaluator = ThresholdEvaluator::default();
        let both = evaluator.evaluate(&sample("99.90%", 5));
        assert_eq!(both.drainage, DrainageState::Overflow);
        assert_eq!(both.blockage, BlockageState::Detected);

        let neither = evaluator.evaluate(&sample("50.00%", 30));
        assert_eq!(neither, Evaluation::default());
    }
}
