use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

pub type EventPayload = Map<String, Value>;

/// Append-only log of refinement run events (`refinement_events.jsonl`).
///
/// Every event gets default fields `type`, `run_id`, `ts`; the caller payload
/// is merged last and can override them. One compact JSON object per line.
#[derive(Debug, Clone)]
pub struct RunLog {
    inner: Arc<RunLogInner>,
}

#[derive(Debug)]
struct RunLogInner {
    path: PathBuf,
    run_id: String,
    lock: Mutex<()>,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RunLogInner {
                path: path.into(),
                run_id: run_id.into(),
                lock: Mutex::new(()),
            }),
        }
    }

    /// Log with a fresh v4 run id, for callers that do not track their own.
    pub fn with_generated_run_id(path: impl Into<PathBuf>) -> Self {
        Self::new(path, format!("run-{}", uuid::Uuid::new_v4()))
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn run_id(&self) -> &str {
        &self.inner.run_id
    }

    pub fn emit(&self, event_type: &str, payload: EventPayload) -> anyhow::Result<Value> {
        self.write_event(event_type, None, payload)
    }

    /// Emits an event stamped with the loop iteration it belongs to.
    pub fn emit_iteration(
        &self,
        event_type: &str,
        iteration: u32,
        payload: EventPayload,
    ) -> anyhow::Result<Value> {
        self.write_event(event_type, Some(iteration), payload)
    }

    fn write_event(
        &self,
        event_type: &str,
        iteration: Option<u32>,
        payload: EventPayload,
    ) -> anyhow::Result<Value> {
        let mut event = Map::new();
        event.insert("type".to_string(), Value::String(event_type.to_string()));
        event.insert(
            "run_id".to_string(),
            Value::String(self.inner.run_id.clone()),
        );
        if let Some(iteration) = iteration {
            event.insert("iteration".to_string(), Value::Number(iteration.into()));
        }
        event.insert("ts".to_string(), Value::String(now_utc_iso()));
        event.extend(payload);

        self.append_line(&serde_json::to_string(&event)?)?;
        Ok(Value::Object(event))
    }

    fn append_line(&self, line: &str) -> anyhow::Result<()> {
        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("run log lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
