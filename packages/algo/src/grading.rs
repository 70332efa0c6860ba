//! Answer grading: normalize free-form input and compare it against every
//! accepted conjugation.

use serde::Serialize;
use wana_kana::ConvertJapanese;

use crate::conjugation::{conjugate_accepted, ConjugationError};
use crate::types::{ExceptionTable, Verb};

/// Fold a typed answer into bare hiragana.
///
/// Punctuation becomes whitespace, romaji and katakana are transcribed to
/// hiragana, then every whitespace character is dropped.
pub fn normalize_answer(raw: &str) -> String {
    let spaced: String = raw
        .chars()
        .map(|c| if matches!(c, '.' | ',' | '!' | '?') { ' ' } else { c })
        .collect();
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .to_lowercase()
        .to_hiragana()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grade {
    pub correct: bool,
    pub normalized: String,
    /// Canonical form shown back to the learner
    pub expected: String,
    pub accepted: Vec<String>,
}

pub fn grade_answer(
    verb: &Verb,
    template_id: &str,
    exceptions: &ExceptionTable,
    raw: &str,
) -> Result<Grade, ConjugationError> {
    let accepted = conjugate_accepted(verb, template_id, exceptions)?;
    let normalized = normalize_answer(raw);
    let correct = !normalized.is_empty() && accepted.iter().any(|form| *form == normalized);
    Ok(Grade {
        correct,
        expected: accepted.first().cloned().unwrap_or_default(),
        normalized,
        accepted,
    })
}
