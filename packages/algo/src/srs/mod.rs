//! Review Scheduler
//!
//! Per-card state machine: LEARNING (steps 0..=2) -> S1 .. S6 -> RETIRED.
//! Transitions are total; the scheduler never fails on a card it can read.

pub mod queue;

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use queue::{
    build_daily_review_queue, build_focused_drill_queue, build_weakness_queue, is_due,
    normalize_enabled_forms,
};

// ==================== Constants ====================

/// Interval in days for S1..S6
pub const STAGE_INTERVAL_DAYS: [i64; 6] = [1, 3, 7, 14, 30, 60];

pub const MAX_REVIEW_LEVEL: u8 = 6;

/// Last learning step before promotion to S1
pub const LAST_LEARNING_STEP: u8 = 2;

/// In-session requeue offsets (queue positions)
pub const REQUEUE_SHORT: usize = 8;
pub const REQUEUE_LONG: usize = 18;

/// Cumulative failures that mark a card as a leech
pub const LEECH_THRESHOLD: u32 = 4;

const CARD_ID_SEPARATOR: &str = "::";

pub fn make_card_id(verb_id: &str, template_id: &str) -> String {
    format!("{verb_id}{CARD_ID_SEPARATOR}{template_id}")
}

/// Split a composite card id back into (verb id, template id)
pub fn split_card_id(card_id: &str) -> Option<(&str, &str)> {
    card_id.split_once(CARD_ID_SEPARATOR)
}

// ==================== Stage ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Learning,
    /// Numbered review stage, 1..=6
    Review(u8),
    Retired,
}

impl Stage {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LEARNING" => Some(Self::Learning),
            "RETIRED" => Some(Self::Retired),
            _ => {
                let level: u8 = s.strip_prefix('S')?.parse().ok()?;
                (1..=MAX_REVIEW_LEVEL)
                    .contains(&level)
                    .then_some(Self::Review(level))
            }
        }
    }

    /// Interval of a numbered stage; `None` for LEARNING and RETIRED
    pub fn interval_days(&self) -> Option<i64> {
        match self {
            Self::Review(level) => STAGE_INTERVAL_DAYS.get(usize::from(*level).checked_sub(1)?).copied(),
            _ => None,
        }
    }

    pub fn is_staged(&self) -> bool {
        matches!(self, Self::Review(_))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Learning => f.write_str("LEARNING"),
            Self::Review(level) => write!(f, "S{level}"),
            Self::Retired => f.write_str("RETIRED"),
        }
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Stage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw).unwrap_or_else(|| {
            tracing::warn!(stage = %raw, "malformed card stage, treating as LEARNING");
            Self::Learning
        }))
    }
}

// ==================== Card ====================

/// Per (verb, template) scheduling record. `due_at` is `None` iff RETIRED.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub card_id: String,
    pub verb_id: String,
    #[serde(alias = "conjugation_id")]
    pub template_id: String,
    pub stage: Stage,
    #[serde(default)]
    pub learning_step: Option<u8>,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub success_count_total: u32,
    #[serde(default)]
    pub failure_count_total: u32,
    #[serde(default)]
    pub hint_used_last: bool,
    #[serde(default)]
    pub is_leech: bool,
}

impl Card {
    /// Fresh LEARNING card, due immediately
    pub fn new(verb_id: &str, template_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            card_id: make_card_id(verb_id, template_id),
            verb_id: verb_id.to_string(),
            template_id: template_id.to_string(),
            stage: Stage::Learning,
            learning_step: Some(0),
            due_at: Some(now),
            last_reviewed_at: None,
            success_count_total: 0,
            failure_count_total: 0,
            hint_used_last: false,
            is_leech: false,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.success_count_total.saturating_add(self.failure_count_total)
    }

    /// Success ratio; 1.0 for a card that was never answered
    pub fn accuracy(&self) -> f64 {
        match self.attempts() {
            0 => 1.0,
            attempts => f64::from(self.success_count_total) / f64::from(attempts),
        }
    }
}

// ==================== Transitions ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Review {
    pub correct: bool,
    pub hint_used: bool,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    pub card: Card,
    /// Queue offset at which the caller should show the item again this session
    pub requeue_offset: Option<usize>,
}

fn days(n: i64) -> Duration {
    Duration::days(n)
}

pub fn apply_review_result(card: &Card, review: Review) -> ReviewOutcome {
    let Review {
        correct,
        hint_used,
        now,
    } = review;

    let mut next = card.clone();
    next.last_reviewed_at = Some(now);
    next.hint_used_last = hint_used;

    if !correct {
        let requeue_offset = apply_failure(&mut next, now);
        return ReviewOutcome {
            card: next,
            requeue_offset,
        };
    }

    next.success_count_total = next.success_count_total.saturating_add(1);
    let requeue_offset = if hint_used {
        apply_hinted_success(&mut next, now)
    } else {
        apply_success(&mut next, now)
    };
    ReviewOutcome {
        card: next,
        requeue_offset,
    }
}

fn apply_failure(card: &mut Card, now: DateTime<Utc>) -> Option<usize> {
    card.failure_count_total = card.failure_count_total.saturating_add(1);
    if card.failure_count_total >= LEECH_THRESHOLD && !card.is_leech {
        card.is_leech = true;
        tracing::info!(
            card_id = %card.card_id,
            failures = card.failure_count_total,
            "card flagged as leech"
        );
    }

    // Both branches push due_at a full day out; the LEARNING reset also asks for
    // an in-session retry.
    card.due_at = Some(now + days(1));
    match card.stage {
        Stage::Review(level) => {
            card.stage = Stage::Review(level.saturating_sub(2).max(1));
            card.learning_step = None;
            None
        }
        Stage::Learning | Stage::Retired => {
            card.stage = Stage::Learning;
            card.learning_step = Some(0);
            Some(REQUEUE_SHORT)
        }
    }
}

fn apply_hinted_success(card: &mut Card, now: DateTime<Utc>) -> Option<usize> {
    match card.stage {
        Stage::Learning => {
            card.due_at = Some(now);
            Some(REQUEUE_SHORT)
        }
        stage @ Stage::Review(_) => {
            let interval = stage.interval_days().unwrap_or(1);
            card.due_at = Some(now + days((interval / 2).max(1)));
            None
        }
        Stage::Retired => {
            card.due_at = None;
            None
        }
    }
}

fn apply_success(card: &mut Card, now: DateTime<Utc>) -> Option<usize> {
    match card.stage {
        Stage::Learning => {
            let step = card.learning_step.unwrap_or(0).min(LAST_LEARNING_STEP);
            if step < LAST_LEARNING_STEP {
                let step = step + 1;
                card.learning_step = Some(step);
                card.due_at = Some(now);
                Some(if step == 1 { REQUEUE_SHORT } else { REQUEUE_LONG })
            } else {
                card.stage = Stage::Review(1);
                card.learning_step = None;
                card.due_at = Some(now + days(STAGE_INTERVAL_DAYS[0]));
                None
            }
        }
        Stage::Review(level) if level >= MAX_REVIEW_LEVEL => {
            card.stage = Stage::Retired;
            card.learning_step = None;
            card.due_at = None;
            tracing::debug!(card_id = %card.card_id, "card retired");
            None
        }
        Stage::Review(level) => {
            let promoted = Stage::Review(level + 1);
            card.stage = promoted;
            card.learning_step = None;
            card.due_at = Some(now + days(promoted.interval_days().unwrap_or(1)));
            None
        }
        Stage::Retired => {
            card.due_at = None;
            None
        }
    }
}
