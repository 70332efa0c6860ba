//! Lesson Composition & Gate Engine
//!
//! One [`PathState`] per curriculum track. Each day the host:
//! 1. calls [`evaluate_path_advance`] to run the current stage's gate
//! 2. calls [`build_lesson_queue`] with the gate's failure reasons to get the
//!    day's (verb, template) queue plus a [`PathStatePatch`] to persist
//!
//! Both calls are pure: the returned state replaces the caller's copy.

pub mod composition;
pub mod config;
pub mod gate;
mod irregular_policy;
pub mod lesson_queue;
pub mod path_state;
pub mod weakness;

pub use composition::{clamp_counts, compute_composition_window, ClassBias, CompositionWindow, GateBoost, Tier};
pub use config::{
    BucketCounts, CompositionWindows, CurriculumConfig, GateBand, GateProfile, GateProfileOverrides,
    IrregularPolicy, PathType, StageConfig, StageOverride,
};
pub use gate::{
    evaluate_path_advance, resolve_gate_profile, BandMatch, GateEvaluation, GateFailure, GateReason, GateReport,
    ResolvedGateProfile,
};
pub use lesson_queue::{
    build_lesson_queue, class_targets, Bucket, IrregularPolicySummary, LessonDetails, LessonPlan, LessonRequest,
    QueueItem,
};
pub use path_state::{PathState, PathStatePatch};
pub use weakness::{apply_confusable_pair_boost, select_weakness_templates};
