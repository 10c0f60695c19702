use std::thread;

use indexmap::IndexMap;

use easel_contracts::asset::{AssetContext, AssetRef};
use easel_contracts::error::EaselError;
use easel_contracts::score::{Metric, MetricResult, Score};

/// Scoring oracle for one quality metric. Implementations judge a candidate
/// asset against the descriptive context and return a value in [0, 1], with
/// localized reasons only when the value falls below `threshold`.
pub trait VisualScoringService: Send + Sync {
    fn score(
        &self,
        asset: &AssetRef,
        ctx: &AssetContext,
        threshold: f64,
    ) -> anyhow::Result<Score>;
}

/// Static mapping from metric to its scoring oracle. Registration order is
/// the default evaluation order.
#[derive(Default)]
pub struct ScoringRegistry {
    oracles: IndexMap<Metric, Box<dyn VisualScoringService>>,
}

impl ScoringRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: VisualScoringService + 'static>(&mut self, metric: Metric, oracle: S) {
        self.oracles.insert(metric, Box::new(oracle));
    }

    pub fn get(&self, metric: Metric) -> Option<&dyn VisualScoringService> {
        self.oracles.get(&metric).map(|oracle| oracle.as_ref())
    }

    pub fn metrics(&self) -> Vec<Metric> {
        self.oracles.keys().copied().collect()
    }
}

/// Scores one candidate against every configured metric concurrently and
/// joins all oracles before returning. Results come back in `metrics` order.
///
/// Any oracle failure (missing registration, error, panic, out-of-range
/// value) aborts the whole pass: a decision made on partial metric coverage
/// could ship a defective asset.
pub fn evaluate_metrics(
    asset: &AssetRef,
    metrics: &[Metric],
    ctx: &AssetContext,
    threshold: f64,
    registry: &ScoringRegistry,
) -> Result<Vec<MetricResult>, EaselError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(EaselError::InvalidArgument(format!(
            "acceptance threshold must be within [0, 1], got {threshold}"
        )));
    }
    if metrics.is_empty() {
        return Err(EaselError::InvalidArgument(
            "at least one metric must be configured".to_string(),
        ));
    }

    let mut oracles = Vec::with_capacity(metrics.len());
    for &metric in metrics {
        let oracle = registry.get(metric).ok_or_else(|| EaselError::EvaluationFailure {
            metric,
            cause: anyhow::anyhow!("no scoring oracle registered"),
        })?;
        oracles.push((metric, oracle));
    }

    let outcomes: Vec<(Metric, thread::Result<anyhow::Result<Score>>)> =
        thread::scope(|scope| {
            let handles: Vec<_> = oracles
                .iter()
                .map(|&(metric, oracle)| {
                    let handle = scope.spawn(move || oracle.score(asset, ctx, threshold));
                    (metric, handle)
                })
                .collect();
            handles
                .into_iter()
                .map(|(metric, handle)| (metric, handle.join()))
                .collect()
        });

    let mut results = Vec::with_capacity(outcomes.len());
    for (metric, outcome) in outcomes {
        let score = match outcome {
            Ok(Ok(score)) => score,
            Ok(Err(cause)) => return Err(EaselError::EvaluationFailure { metric, cause }),
            Err(_) => {
                return Err(EaselError::EvaluationFailure {
                    metric,
                    cause: anyhow::anyhow!("scoring oracle panicked"),
                })
            }
        };
        if !(0.0..=1.0).contains(&score.value) {
            return Err(EaselError::EvaluationFailure {
                metric,
                cause: anyhow::anyhow!(
                    "oracle returned out-of-range score {}",
                    score.value
                ),
            });
        }
        // Reasons are only meaningful below the threshold; a passing score
        // that still carries them is normalized rather than trusted.
        let score = if score.value >= threshold && !score.reasons.is_empty() {
            Score {
                value: score.value,
                reasons: Vec::new(),
            }
        } else {
            score
        };
        results.push(MetricResult { metric, score });
    }
    Ok(results)
}
