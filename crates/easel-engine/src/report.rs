use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

use easel_contracts::error::EaselError;

use crate::refine::RefinementOutcome;

/// Persists a pretty-printed JSON report of a finished run
/// (`refinement_report.json`): identity, timestamps, the outcome, and the
/// full iteration history.
pub fn write_report(
    path: &Path,
    run_id: &str,
    started_at: &str,
    outcome: &RefinementOutcome,
) -> Result<(), EaselError> {
    let mut payload = Map::new();
    payload.insert("run_id".to_string(), Value::String(run_id.to_string()));
    payload.insert(
        "started_at".to_string(),
        Value::String(started_at.to_string()),
    );
    payload.insert("finished_at".to_string(), Value::String(now_utc_iso()));
    let outcome_value =
        serde_json::to_value(outcome).map_err(|cause| EaselError::IoFailure {
            path: path.to_path_buf(),
            cause: cause.into(),
        })?;
    payload.insert("outcome".to_string(), outcome_value);

    let io_failure = |cause: std::io::Error| EaselError::IoFailure {
        path: path.to_path_buf(),
        cause: cause.into(),
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_failure)?;
    }
    let text = serde_json::to_string_pretty(&Value::Object(payload)).map_err(|cause| {
        EaselError::IoFailure {
            path: path.to_path_buf(),
            cause: cause.into(),
        }
    })?;
    std::fs::write(path, text).map_err(io_failure)?;
    Ok(())
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
