use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use easel_contracts::asset::{AssetContext, AssetRef};
use easel_contracts::error::EaselError;
use easel_contracts::events::{EventPayload, RunLog};
use easel_contracts::geometry::BoundingBox;
use easel_contracts::score::{aggregate_score, Decision, Metric, Reason, RefinementThresholds};
use easel_contracts::state::{IterationAction, IterationRecord, RefinementState};

use crate::evaluate::{evaluate_metrics, ScoringRegistry};
use crate::mask::write_mask;
use crate::policy::decide;
use crate::report::write_report;

/// Produces a brand-new candidate from descriptive context.
pub trait ImageSynthesisService: Send + Sync {
    fn create(&self, ctx: &AssetContext) -> anyhow::Result<AssetRef>;
}

/// Produces a locally-edited candidate, constrained to the mask's opaque
/// region.
pub trait ImageEditService: Send + Sync {
    fn edit(&self, asset: &AssetRef, mask: &Path, instruction: &str) -> anyhow::Result<AssetRef>;
}

/// Turns a list of defect descriptions into one instruction that asks for
/// fixing exactly those defects while preserving everything else.
pub trait EditInstructionSynthesizer: Send + Sync {
    fn synthesize(&self, reasons: &[Reason]) -> anyhow::Result<String>;
}

/// External cancellation handle. Checked between iterations only; a
/// cancelled run returns the best result so far instead of failing.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }
}

/// Per-run settings, fixed for the duration of the run.
#[derive(Debug, Clone, Serialize)]
pub struct RefinementConfig {
    pub thresholds: RefinementThresholds,
    pub max_iterations: u32,
    pub defect_margin: u32,
    pub asset_width: u32,
    pub asset_height: u32,
    pub mask_dir: PathBuf,
}

impl RefinementConfig {
    fn validate(&self) -> Result<(), EaselError> {
        if self.max_iterations == 0 {
            return Err(EaselError::InvalidArgument(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.asset_width == 0 || self.asset_height == 0 {
            return Err(EaselError::InvalidArgument(format!(
                "asset dimensions must be positive, got {}x{}",
                self.asset_width, self.asset_height
            )));
        }
        Ok(())
    }
}

/// What a refinement run hands back: the chosen candidate, how it scored,
/// and the full iteration history. `converged == false` means the budget ran
/// out (or the run was cancelled) and `asset` is the best-of-N fallback.
#[derive(Debug, Clone, Serialize)]
pub struct RefinementOutcome {
    pub asset: AssetRef,
    pub score: f64,
    pub iterations: u32,
    pub converged: bool,
    pub cancelled: bool,
    pub history: Vec<IterationRecord>,
}

/// What the next iteration should do, decided by the previous one.
enum NextStep {
    Create,
    Edit {
        asset: AssetRef,
        region: BoundingBox,
        reasons: Vec<Reason>,
    },
}

/// Drives the bounded generate -> evaluate -> decide -> correct loop.
///
/// Iterations are strictly sequential; within one iteration all metric
/// oracles run concurrently against the same immutable candidate. Every
/// iteration appends a record regardless of outcome.
pub struct RefinementEngine<'a> {
    synthesis: &'a dyn ImageSynthesisService,
    editor: &'a dyn ImageEditService,
    instructions: &'a dyn EditInstructionSynthesizer,
    scoring: &'a ScoringRegistry,
    metrics: Vec<Metric>,
    log: RunLog,
    report_path: Option<PathBuf>,
}

impl<'a> RefinementEngine<'a> {
    pub fn new(
        synthesis: &'a dyn ImageSynthesisService,
        editor: &'a dyn ImageEditService,
        instructions: &'a dyn EditInstructionSynthesizer,
        scoring: &'a ScoringRegistry,
        log: RunLog,
    ) -> Self {
        let metrics = scoring.metrics();
        Self {
            synthesis,
            editor,
            instructions,
            scoring,
            metrics,
            log,
            report_path: None,
        }
    }

    /// Restricts the run to a subset of the registered metrics.
    pub fn with_metrics(mut self, metrics: Vec<Metric>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Also persist a `refinement_report.json` when the run finishes.
    pub fn with_report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(path.into());
        self
    }

    pub fn refine(
        &self,
        ctx: &AssetContext,
        config: &RefinementConfig,
        cancel: &CancelFlag,
    ) -> Result<RefinementOutcome, EaselError> {
        config.validate()?;
        let started_at = now_utc_iso();
        let mut state = RefinementState::new(config.thresholds);
        self.emit(
            "run_started",
            payload(json!({
                "max_iterations": config.max_iterations,
                "fix_threshold": config.thresholds.fix(),
                "regen_threshold": config.thresholds.regen(),
                "asset_size": format!("{}x{}", config.asset_width, config.asset_height),
            })),
        )?;

        let mut next = NextStep::Create;
        for index in 1..=config.max_iterations {
            if cancel.is_cancelled() {
                if state.history().is_empty() {
                    return Err(EaselError::InvalidArgument(
                        "run was cancelled before producing any candidate".to_string(),
                    ));
                }
                return self.finish(state, &started_at, false, true);
            }

            let (action, asset) = match std::mem::replace(&mut next, NextStep::Create) {
                NextStep::Create => {
                    self.emit_iteration(
                        "iteration_started",
                        index,
                        payload(json!({ "action": IterationAction::Create.as_str() })),
                    )?;
                    let asset = self.synthesis.create(ctx).map_err(|cause| {
                        EaselError::SynthesisFailure(cause)
                            .at_iteration(index, IterationAction::Create)
                    })?;
                    (IterationAction::Create, asset)
                }
                NextStep::Edit {
                    asset,
                    region,
                    reasons,
                } => {
                    self.emit_iteration(
                        "iteration_started",
                        index,
                        payload(json!({ "action": IterationAction::Edit.as_str() })),
                    )?;
                    let mask = write_mask(
                        &region,
                        config.asset_width,
                        config.asset_height,
                        &config.mask_dir,
                        &format!("mask-iter-{index:02}"),
                    )
                    .map_err(|err| err.at_iteration(index, IterationAction::Edit))?;
                    let instruction =
                        self.instructions.synthesize(&reasons).map_err(|cause| {
                            EaselError::SynthesisFailure(cause)
                                .at_iteration(index, IterationAction::Edit)
                        })?;
                    let edited = self
                        .editor
                        .edit(&asset, &mask, &instruction)
                        .map_err(|cause| {
                            EaselError::EditFailure(cause)
                                .at_iteration(index, IterationAction::Edit)
                        })?;
                    (IterationAction::Edit, edited)
                }
            };
            self.emit_iteration(
                "candidate_produced",
                index,
                payload(json!({
                    "action": action.as_str(),
                    "asset": asset.as_str(),
                })),
            )?;

            let results = evaluate_metrics(
                &asset,
                &self.metrics,
                ctx,
                config.thresholds.fix(),
                self.scoring,
            )
            .map_err(|err| err.at_iteration(index, action))?;
            let decision = decide(
                &results,
                &config.thresholds,
                config.defect_margin,
                config.asset_width,
                config.asset_height,
            )
            .map_err(|err| err.at_iteration(index, action))?;
            let aggregate = aggregate_score(&results);
            self.emit_iteration(
                "decision",
                index,
                payload(json!({
                    "decision": decision.kind(),
                    "aggregate_score": aggregate,
                })),
            )?;

            state.record(IterationRecord {
                index,
                action,
                asset: asset.clone(),
                metric_results: results,
                decision: decision.clone(),
                aggregate_score: aggregate,
            });

            match decision {
                Decision::Proceed => return self.finish(state, &started_at, true, false),
                Decision::Fix { region, reasons } => {
                    next = NextStep::Edit {
                        asset,
                        region,
                        reasons,
                    };
                }
                Decision::Redo { .. } => next = NextStep::Create,
                Decision::GiveUp => break,
            }
        }

        // Budget exhausted without Proceed: a normal terminal state, not an
        // error. The caller decides whether the best candidate is usable.
        self.finish(state, &started_at, false, false)
    }

    fn finish(
        &self,
        state: RefinementState,
        started_at: &str,
        converged: bool,
        cancelled: bool,
    ) -> Result<RefinementOutcome, EaselError> {
        let chosen = if converged {
            state.history().last()
        } else {
            state.best_record()
        }
        .ok_or_else(|| {
            EaselError::InvalidArgument("refinement run produced no candidates".to_string())
        })?;
        let asset = chosen.asset.clone();
        let score = chosen.aggregate_score;
        let iterations = state.iterations();

        let event_type = if converged {
            "run_converged"
        } else if cancelled {
            "run_cancelled"
        } else {
            "run_gave_up"
        };
        self.emit(
            event_type,
            payload(json!({
                "iterations": iterations,
                "score": score,
                "asset": asset.as_str(),
            })),
        )?;

        let outcome = RefinementOutcome {
            asset,
            score,
            iterations,
            converged,
            cancelled,
            history: state.into_history(),
        };
        if let Some(path) = &self.report_path {
            write_report(path, self.log.run_id(), started_at, &outcome)?;
        }
        Ok(outcome)
    }

    fn emit(&self, event_type: &str, payload: EventPayload) -> Result<(), EaselError> {
        self.log
            .emit(event_type, payload)
            .map(|_| ())
            .map_err(|cause| EaselError::IoFailure {
                path: self.log.path().to_path_buf(),
                cause,
            })
    }

    fn emit_iteration(
        &self,
        event_type: &str,
        iteration: u32,
        payload: EventPayload,
    ) -> Result<(), EaselError> {
        self.log
            .emit_iteration(event_type, iteration, payload)
            .map(|_| ())
            .map_err(|cause| EaselError::IoFailure {
                path: self.log.path().to_path_buf(),
                cause,
            })
    }
}

fn payload(value: Value) -> EventPayload {
    value.as_object().cloned().unwrap_or_default()
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
