//! Review queues built over the caller's card store.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use super::{make_card_id, Card};
use crate::types::{Template, Verb};

pub fn is_due(card: &Card, now: DateTime<Utc>) -> bool {
    card.due_at.is_some_and(|due| due <= now)
}

/// Due cards, oldest due date first
pub fn build_daily_review_queue<'a, I>(cards: I, now: DateTime<Utc>) -> Vec<&'a Card>
where
    I: IntoIterator<Item = &'a Card>,
{
    let mut due: Vec<&Card> = cards.into_iter().filter(|card| is_due(card, now)).collect();
    due.sort_by(|a, b| a.due_at.cmp(&b.due_at).then_with(|| a.card_id.cmp(&b.card_id)));
    due
}

/// Cards with at least one failure: leeches, then most failures, then lowest accuracy
pub fn build_weakness_queue<'a, I>(cards: I, count: usize) -> Vec<&'a Card>
where
    I: IntoIterator<Item = &'a Card>,
{
    let mut weak: Vec<&Card> = cards
        .into_iter()
        .filter(|card| card.failure_count_total > 0)
        .collect();
    weak.sort_by(|a, b| {
        b.is_leech
            .cmp(&a.is_leech)
            .then_with(|| b.failure_count_total.cmp(&a.failure_count_total))
            .then_with(|| {
                a.accuracy()
                    .partial_cmp(&b.accuracy())
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.card_id.cmp(&b.card_id))
    });
    weak.truncate(count);
    weak
}

/// Up to `count` random verbs drilled on a single template.
///
/// Existing cards are reused as-is; missing ones are created fresh.
pub fn build_focused_drill_queue<R: Rng + ?Sized>(
    verbs: &[Verb],
    template_id: &str,
    count: usize,
    cards: &HashMap<String, Card>,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<Card> {
    verbs
        .choose_multiple(rng, count.min(verbs.len()))
        .map(|verb| {
            cards
                .get(&make_card_id(&verb.id, template_id))
                .cloned()
                .unwrap_or_else(|| Card::new(&verb.id, template_id, now))
        })
        .collect()
}

/// Resolve the learner's enabled template list against the catalog.
///
/// `None` enables every eligible template, an empty list enables none, and
/// otherwise unknown or ineligible ids are dropped in the caller's order.
pub fn normalize_enabled_forms(templates: &[Template], enabled: Option<&[String]>) -> Vec<String> {
    let eligible: Vec<&str> = templates
        .iter()
        .filter(|tpl| tpl.is_eligible())
        .map(|tpl| tpl.id.as_str())
        .collect();
    match enabled {
        None => eligible.into_iter().map(str::to_string).collect(),
        Some(ids) => {
            let eligible: HashSet<&str> = eligible.into_iter().collect();
            ids.iter()
                .filter(|id| eligible.contains(id.as_str()))
                .cloned()
                .collect()
        }
    }
}
