use easel_contracts::error::EaselError;
use easel_contracts::geometry::BoundingBox;
use easel_contracts::score::{Decision, Metric, MetricResult, Reason, RefinementThresholds};

/// Merges every defect region into one editable rectangle:
/// `clamp(expand(union(boxes), margin), w, h)`. One edit against one merged
/// region keeps the correction coherent; N sequential partial edits drift
/// from each other and from the untouched remainder.
///
/// If no reason carries a box (malformed oracle output), the merge falls
/// back to the full asset frame so the edit still targets a valid region.
pub fn merge_defects(
    reasons: &[Reason],
    margin: u32,
    asset_w: u32,
    asset_h: u32,
) -> Result<BoundingBox, EaselError> {
    let boxes: Vec<BoundingBox> = reasons.iter().map(|reason| reason.bbox).collect();
    let merged = if boxes.is_empty() {
        BoundingBox::new(0, 0, asset_w, asset_h)
    } else {
        BoundingBox::union_all(&boxes)?
    };
    merged.expand(i64::from(margin))?.clamp(asset_w, asset_h)
}

/// Aggregates per-metric scores against the two thresholds.
///
/// A score below the regeneration threshold forces `Redo` no matter how well
/// the other metrics did; otherwise any score below the fix threshold yields
/// `Fix` over the merged defect region; otherwise `Proceed`.
pub fn decide(
    results: &[MetricResult],
    thresholds: &RefinementThresholds,
    margin: u32,
    asset_w: u32,
    asset_h: u32,
) -> Result<Decision, EaselError> {
    if results.is_empty() {
        return Err(EaselError::InvalidArgument(
            "cannot decide on zero metric results".to_string(),
        ));
    }

    let failing_redo: Vec<&MetricResult> = results
        .iter()
        .filter(|result| result.score.value < thresholds.regen())
        .collect();
    if !failing_redo.is_empty() {
        let mut parts = Vec::new();
        for result in &failing_redo {
            if result.score.reasons.is_empty() {
                parts.push(fallback_reason_text(
                    result.metric,
                    result.score.value,
                    "regeneration",
                ));
            } else {
                parts.extend(
                    result
                        .score
                        .reasons
                        .iter()
                        .map(|reason| reason.text.clone()),
                );
            }
        }
        return Ok(Decision::Redo {
            reason: parts.join(". "),
        });
    }

    let failing_fix: Vec<&MetricResult> = results
        .iter()
        .filter(|result| result.score.value < thresholds.fix())
        .collect();
    if failing_fix.is_empty() {
        return Ok(Decision::Proceed);
    }

    // A sub-threshold metric with no reasons still fails. It cannot steer
    // the visual merge, but it must leave a clause for the instruction
    // synthesizer, so a fallback reason is attached to the merged region.
    let mut reasons: Vec<Reason> = failing_fix
        .iter()
        .flat_map(|result| result.score.reasons.iter().cloned())
        .collect();
    let region = merge_defects(&reasons, margin, asset_w, asset_h)?;
    for result in &failing_fix {
        if result.score.reasons.is_empty() {
            reasons.push(Reason::new(
                fallback_reason_text(result.metric, result.score.value, "fix"),
                region,
            ));
        }
    }
    Ok(Decision::Fix { region, reasons })
}

fn fallback_reason_text(metric: Metric, value: f64, band: &str) -> String {
    format!("{metric} scored {value:.2}, below the {band} threshold")
}
