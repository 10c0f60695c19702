use std::fmt;

use serde::{Deserialize, Serialize};

use crate::asset::AssetRef;
use crate::score::{Decision, MetricResult, RefinementThresholds};

/// How an iteration's candidate was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationAction {
    Create,
    Edit,
}

impl IterationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            IterationAction::Create => "create",
            IterationAction::Edit => "edit",
        }
    }
}

impl fmt::Display for IterationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One completed turn of the loop. Appended once, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct IterationRecord {
    pub index: u32,
    pub action: IterationAction,
    pub asset: AssetRef,
    pub metric_results: Vec<MetricResult>,
    pub decision: Decision,
    pub aggregate_score: f64,
}

/// Per-run state owned by the orchestrator: the append-only iteration
/// history, the current candidate, and the thresholds fixed at run start.
#[derive(Debug)]
pub struct RefinementState {
    thresholds: RefinementThresholds,
    history: Vec<IterationRecord>,
    current_asset: Option<AssetRef>,
}

impl RefinementState {
    pub fn new(thresholds: RefinementThresholds) -> Self {
        Self {
            thresholds,
            history: Vec::new(),
            current_asset: None,
        }
    }

    pub fn thresholds(&self) -> &RefinementThresholds {
        &self.thresholds
    }

    pub fn iterations(&self) -> u32 {
        self.history.len() as u32
    }

    pub fn current_asset(&self) -> Option<&AssetRef> {
        self.current_asset.as_ref()
    }

    pub fn history(&self) -> &[IterationRecord] {
        &self.history
    }

    pub fn record(&mut self, record: IterationRecord) {
        self.current_asset = Some(record.asset.clone());
        self.history.push(record);
    }

    /// Highest aggregate score across the whole history; the earliest record
    /// wins ties. This is the best-of-N fallback for give-up and cancel.
    pub fn best_record(&self) -> Option<&IterationRecord> {
        self.history.iter().fold(None, |best, record| match best {
            Some(current) if current.aggregate_score >= record.aggregate_score => Some(current),
            _ => Some(record),
        })
    }

    pub fn into_history(self) -> Vec<IterationRecord> {
        self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::Decision;

    fn record(index: u32, aggregate_score: f64) -> IterationRecord {
        IterationRecord {
            index,
            action: IterationAction::Create,
            asset: AssetRef::new(format!("asset-{index}")),
            metric_results: Vec::new(),
            decision: Decision::Proceed,
            aggregate_score,
        }
    }

    #[test]
    fn record_appends_and_tracks_the_current_asset() -> anyhow::Result<()> {
        let mut state = RefinementState::new(RefinementThresholds::new(0.95, 0.70)?);
        assert!(state.current_asset().is_none());
        assert_eq!(state.iterations(), 0);

        state.record(record(1, 0.8));
        state.record(record(2, 0.9));
        assert_eq!(state.iterations(), 2);
        assert_eq!(state.current_asset().map(AssetRef::as_str), Some("asset-2"));
        assert_eq!(state.history()[0].index, 1);
        Ok(())
    }

    #[test]
    fn best_record_prefers_highest_then_earliest() -> anyhow::Result<()> {
        let mut state = RefinementState::new(RefinementThresholds::new(0.95, 0.70)?);
        assert!(state.best_record().is_none());

        state.record(record(1, 0.80));
        state.record(record(2, 0.92));
        state.record(record(3, 0.92));
        state.record(record(4, 0.85));

        let best = state.best_record().unwrap();
        assert_eq!(best.index, 2);
        Ok(())
    }
}
