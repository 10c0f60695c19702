pub mod evaluate;
pub mod mask;
pub mod policy;
pub mod refine;
pub mod report;

pub use evaluate::{evaluate_metrics, ScoringRegistry, VisualScoringService};
pub use mask::write_mask;
pub use policy::{decide, merge_defects};
pub use refine::{
    CancelFlag, EditInstructionSynthesizer, ImageEditService, ImageSynthesisService,
    RefinementConfig, RefinementEngine, RefinementOutcome,
};
pub use report::write_report;
