//! Helpers for the caller's in-session queue loop.

use rand::Rng;
use serde::Serialize;

/// Where to reinsert a missed item: never the head, so it is not shown twice in a row.
pub fn requeue_insert_index<R: Rng + ?Sized>(queue_len: usize, rng: &mut R) -> usize {
    if queue_len == 0 {
        return 0;
    }
    rng.gen_range(1..=queue_len)
}

/// What a lesson-practice answer does to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LessonPracticeOutcome {
    pub advance: bool,
    pub requeue: bool,
    pub decrement_lesson_bank: bool,
    pub record_completed_lesson: bool,
}

pub fn lesson_practice_outcome(correct: bool) -> LessonPracticeOutcome {
    LessonPracticeOutcome {
        advance: correct,
        requeue: !correct,
        decrement_lesson_bank: correct,
        record_completed_lesson: correct,
    }
}
