use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EaselError;
use crate::geometry::BoundingBox;

/// One independently scored quality dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Character,
    Pose,
    Style,
    Location,
    Shot,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Character,
        Metric::Pose,
        Metric::Style,
        Metric::Location,
        Metric::Shot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Character => "character",
            Metric::Pose => "pose",
            Metric::Style => "style",
            Metric::Location => "location",
            Metric::Shot => "shot",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a score fell short, localized to a region of the asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reason {
    pub text: String,
    pub bbox: BoundingBox,
}

impl Reason {
    pub fn new(text: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// Outcome of one metric evaluation. `reasons` is populated only when the
/// value fell below the acceptance threshold supplied for that call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub value: f64,
    #[serde(default)]
    pub reasons: Vec<Reason>,
}

impl Score {
    pub fn new(value: f64, reasons: Vec<Reason>) -> Result<Self, EaselError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(EaselError::InvalidArgument(format!(
                "score value must be within [0, 1], got {value}"
            )));
        }
        Ok(Self { value, reasons })
    }

    pub fn passing(value: f64) -> Result<Self, EaselError> {
        Self::new(value, Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub metric: Metric,
    pub score: Score,
}

/// Acceptance bands for one refinement run. Scores at or above `fix` pass;
/// scores in `[regen, fix)` are patchable; anything below `regen` forces a
/// full regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RefinementThresholds {
    fix: f64,
    regen: f64,
}

impl RefinementThresholds {
    pub fn new(fix: f64, regen: f64) -> Result<Self, EaselError> {
        if !(0.0..=1.0).contains(&fix) || !(0.0..=1.0).contains(&regen) || regen > fix {
            return Err(EaselError::InvalidArgument(format!(
                "thresholds must satisfy 0 <= regen ({regen}) <= fix ({fix}) <= 1"
            )));
        }
        Ok(Self { fix, regen })
    }

    pub fn fix(&self) -> f64 {
        self.fix
    }

    pub fn regen(&self) -> f64 {
        self.regen
    }
}

/// What the policy tells the orchestrator to do with the current candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    Proceed,
    Fix {
        region: BoundingBox,
        reasons: Vec<Reason>,
    },
    Redo {
        reason: String,
    },
    GiveUp,
}

impl Decision {
    pub fn kind(&self) -> &'static str {
        match self {
            Decision::Proceed => "proceed",
            Decision::Fix { .. } => "fix",
            Decision::Redo { .. } => "redo",
            Decision::GiveUp => "give_up",
        }
    }
}

/// Arithmetic mean of all metric values. Informational only; the decision
/// bands above are what actually steer the loop.
pub fn aggregate_score(results: &[MetricResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let sum: f64 = results.iter().map(|result| result.score.value).sum();
    sum / results.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_enforce_ordering_and_range() -> anyhow::Result<()> {
        let thresholds = RefinementThresholds::new(0.95, 0.70)?;
        assert_eq!(thresholds.fix(), 0.95);
        assert_eq!(thresholds.regen(), 0.70);

        assert!(matches!(
            RefinementThresholds::new(0.70, 0.95),
            Err(EaselError::InvalidArgument(_))
        ));
        assert!(matches!(
            RefinementThresholds::new(1.2, 0.5),
            Err(EaselError::InvalidArgument(_))
        ));
        assert!(matches!(
            RefinementThresholds::new(0.9, -0.1),
            Err(EaselError::InvalidArgument(_))
        ));
        Ok(())
    }

    #[test]
    fn score_rejects_out_of_range_values() {
        assert!(Score::passing(0.0).is_ok());
        assert!(Score::passing(1.0).is_ok());
        assert!(matches!(
            Score::passing(1.01),
            Err(EaselError::InvalidArgument(_))
        ));
        assert!(matches!(
            Score::passing(-0.5),
            Err(EaselError::InvalidArgument(_))
        ));
    }

    #[test]
    fn aggregate_score_is_the_arithmetic_mean() -> anyhow::Result<()> {
        let results = vec![
            MetricResult {
                metric: Metric::Character,
                score: Score::passing(0.9)?,
            },
            MetricResult {
                metric: Metric::Pose,
                score: Score::passing(0.6)?,
            },
        ];
        assert!((aggregate_score(&results) - 0.75).abs() < 1e-9);
        assert_eq!(aggregate_score(&[]), 0.0);
        Ok(())
    }

    #[test]
    fn decision_kind_labels_match_serialization() -> anyhow::Result<()> {
        let decision = Decision::Redo {
            reason: "face does not match the reference".to_string(),
        };
        assert_eq!(decision.kind(), "redo");
        let value = serde_json::to_value(&decision)?;
        assert_eq!(value["kind"], "redo");
        Ok(())
    }
}
