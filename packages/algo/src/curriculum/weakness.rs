//! Weakness ranking and confusable-pair boosting.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::srs::Card;

/// Templates ranked for the weakness bucket of a lesson
pub const LESSON_WEAKNESS_LIMIT: usize = 8;

/// Accuracy shortfall is scaled by this before adding raw failures
const LOW_ACCURACY_WEIGHT: f64 = 10.0;

#[derive(Debug, Default)]
struct TemplateMetrics {
    success: u64,
    failure: u64,
    attempts: u64,
}

impl TemplateMetrics {
    fn score(&self) -> f64 {
        let accuracy = if self.attempts > 0 {
            self.success as f64 / self.attempts as f64
        } else {
            1.0
        };
        self.failure as f64 + (1.0 - accuracy).max(0.0) * LOW_ACCURACY_WEIGHT
    }
}

/// Rank `allowed` templates by failures plus accuracy shortfall.
///
/// Raw mistake counts add to both failures and attempts. Ties go to the
/// template with more failures, then to the lexicographically smaller id.
pub fn select_weakness_templates<'a, I>(
    allowed: &[String],
    cards: I,
    mistake_counts: &HashMap<String, u32>,
    limit: usize,
) -> Vec<String>
where
    I: IntoIterator<Item = &'a Card>,
{
    let allowed: HashSet<&str> = allowed.iter().map(String::as_str).collect();
    let mut metrics: HashMap<&str, TemplateMetrics> = HashMap::new();

    for card in cards {
        let Some(&tid) = allowed.get(card.template_id.as_str()) else {
            continue;
        };
        let entry = metrics.entry(tid).or_default();
        entry.success += u64::from(card.success_count_total);
        entry.failure += u64::from(card.failure_count_total);
        entry.attempts += u64::from(card.attempts());
    }

    for (tid, &count) in mistake_counts {
        let Some(&tid) = allowed.get(tid.as_str()) else {
            continue;
        };
        let entry = metrics.entry(tid).or_default();
        entry.failure += u64::from(count);
        entry.attempts += u64::from(count);
    }

    let mut ranked: Vec<(&str, f64, u64)> = metrics
        .iter()
        .map(|(tid, m)| (*tid, m.score(), m.failure))
        .collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.2.cmp(&a.2))
            .then_with(|| a.0.cmp(b.0))
    });

    ranked
        .into_iter()
        .take(limit)
        .map(|(tid, _, _)| tid.to_string())
        .collect()
}

/// Add the partner of any confusable pair whose other member has reached
/// `trigger_errors` mistakes, provided the partner is unlocked.
pub fn apply_confusable_pair_boost(
    base: &[String],
    pairs: &[(String, String)],
    trigger_errors: u32,
    mistake_counts: &HashMap<String, u32>,
    allowed: &[String],
) -> Vec<String> {
    let trigger = trigger_errors.max(1);
    let mistakes = |tid: &str| mistake_counts.get(tid).copied().unwrap_or(0);
    let mut boosted: Vec<String> = Vec::with_capacity(base.len());
    for tid in base {
        if !boosted.contains(tid) {
            boosted.push(tid.clone());
        }
    }

    let mut add = |tid: &String| {
        if allowed.contains(tid) && !boosted.contains(tid) {
            tracing::debug!(template_id = %tid, "confusable partner boosted");
            boosted.push(tid.clone());
        }
    };
    for (first, second) in pairs {
        if mistakes(first) >= trigger {
            add(second);
        }
        if mistakes(second) >= trigger {
            add(first);
        }
    }
    boosted
}
