//! # katsuyo-algo - Japanese verb conjugation drill engine
//!
//! Pure Rust core with no I/O beyond parsing reference data from strings:
//!
//! - **Conjugation Engine** - rule-based godan/ichidan/irregular inflection
//! - **Review Scheduler** - per-card spaced repetition with leech tracking
//! - **Lesson Composition & Gate Engine** - daily lesson queues and stage gates
//!
//! ## Module layout
//!
//! - [`types`] - verbs, templates, exception table, study items
//! - [`conjugation`] - form rendering and the exception override order
//! - [`srs`] - card state machine and review queues
//! - [`grading`] - answer normalization and grading
//! - [`session`] - practice-loop helpers (requeue position, lesson outcome)
//! - [`catalog`] - reference data loading and lookups
//! - [`curriculum`] - path state, composition window, gates, lesson queues
//!
//! Clock and randomness are always passed in: every `now` is an explicit
//! `DateTime<Utc>` and every random choice takes a caller-supplied [`rand::Rng`].
//!
//! ## Example
//!
//! ```rust
//! use katsuyo_algo::{conjugate, ExceptionTable, Verb, VerbClass};
//!
//! let verb = Verb::new("kaku", "かく", VerbClass::Godan);
//! let te = conjugate(&verb, "plain_te_form", &ExceptionTable::default()).unwrap();
//! assert_eq!(te, "かいて");
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod catalog;
pub mod conjugation;
pub mod curriculum;
pub mod grading;
pub mod session;
pub mod srs;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use catalog::{unseen_pairs, Catalog, CatalogError};

pub use conjugation::{conjugate, conjugate_accepted, conjugate_item, ConjugationError, Form};

pub use srs::{
    apply_review_result, build_daily_review_queue, build_focused_drill_queue, build_weakness_queue, is_due,
    make_card_id, normalize_enabled_forms, split_card_id, Card, Review, ReviewOutcome, Stage,
};

pub use grading::{grade_answer, normalize_answer, Grade};

pub use session::{lesson_practice_outcome, requeue_insert_index, LessonPracticeOutcome};

pub use curriculum::{
    build_lesson_queue, compute_composition_window, evaluate_path_advance, BucketCounts, CompositionWindow,
    CurriculumConfig, GateEvaluation, GateFailure, GateReport, LessonPlan, LessonRequest, PathState,
    PathStatePatch, PathType, QueueItem, Tier,
};
