//! Post-pass over a built queue: irregular-verb quota and periodic いく items.

use rand::seq::SliceRandom;
use rand::Rng;

use super::config::IrregularPolicy;
use super::lesson_queue::{verb_class_of, Bucket, QueueItem};
use super::path_state::{PathState, PathStatePatch};
use crate::catalog::Catalog;
use crate::types::{StudyItem, VerbClass, IKU_KANA};

/// Buckets given up first when a quota item needs a slot
const REPLACE_ORDER: [Bucket; 5] = [
    Bucket::Fallback,
    Bucket::Previous,
    Bucket::Recent,
    Bucket::Weakness,
    Bucket::Current,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct IrregularOutcome {
    pub patch: PathStatePatch,
    pub iku_injected: bool,
}

fn is_irregular(catalog: &Catalog, item: &QueueItem) -> bool {
    verb_class_of(catalog, &item.verb_id) == Some(VerbClass::Irregular)
}

fn count_irregular(catalog: &Catalog, queue: &[QueueItem]) -> usize {
    queue.iter().filter(|item| is_irregular(catalog, item)).count()
}

/// Random unqueued pool item matching `predicate`, preferring `preferred` templates
fn select_candidate<'p, R, F>(
    pool: &[&'p StudyItem],
    queue: &[QueueItem],
    predicate: F,
    preferred: &[String],
    rng: &mut R,
) -> Option<&'p StudyItem>
where
    R: Rng + ?Sized,
    F: Fn(&StudyItem) -> bool,
{
    let open: Vec<&StudyItem> = pool
        .iter()
        .copied()
        .filter(|item| predicate(*item))
        .filter(|item| !queue.iter().any(|entry| entry.is_pair(item)))
        .collect();
    let favored: Vec<&StudyItem> = open
        .iter()
        .copied()
        .filter(|item| preferred.contains(&item.template_id))
        .collect();
    let source = if favored.is_empty() { open } else { favored };
    source.choose(rng).copied()
}

/// Slot a quota item may take over; never an irregular-verb slot
fn replace_index(catalog: &Catalog, queue: &[QueueItem]) -> Option<usize> {
    REPLACE_ORDER
        .iter()
        .find_map(|bucket| {
            queue
                .iter()
                .position(|item| item.bucket == *bucket && !is_irregular(catalog, item))
        })
        .or_else(|| queue.iter().position(|item| !is_irregular(catalog, item)))
}

/// Put `item` in the queue: append while there is room, otherwise replace a
/// lower-priority slot.
fn ensure_in_queue(
    queue: &mut Vec<QueueItem>,
    item: QueueItem,
    daily_count: usize,
    catalog: &Catalog,
) -> bool {
    if queue
        .iter()
        .any(|entry| entry.verb_id == item.verb_id && entry.template_id == item.template_id)
    {
        return true;
    }
    if queue.len() < daily_count {
        queue.push(item);
        return true;
    }
    match replace_index(catalog, queue) {
        Some(idx) => {
            queue[idx] = item;
            true
        }
        None => false,
    }
}

#[allow(clippy::too_many_arguments)]
pub(super) fn enforce_irregular_policy<R: Rng + ?Sized>(
    policy: Option<&IrregularPolicy>,
    queue: &mut Vec<QueueItem>,
    daily_count: usize,
    state: &PathState,
    catalog: &Catalog,
    unlocked_pool: &[&StudyItem],
    current_template_ids: &[String],
    rng: &mut R,
) -> IrregularOutcome {
    let mut patch = PathStatePatch {
        lesson_session_count: state.lesson_session_count.saturating_add(1),
        last_iku_session: None,
    };
    let Some(policy) = policy.filter(|p| p.enabled) else {
        return IrregularOutcome {
            patch,
            iku_injected: false,
        };
    };

    let irregular_pool: Vec<&StudyItem> = unlocked_pool
        .iter()
        .copied()
        .filter(|item| verb_class_of(catalog, &item.verb_id) == Some(VerbClass::Irregular))
        .collect();
    let minimum = policy.min_per_session;

    if !irregular_pool.is_empty() && minimum > 0 {
        let before = count_irregular(catalog, queue);
        let mut irregular_count = before;
        // every primary verb with a candidate gets a slot, even past the minimum
        for kana in &policy.primary_kana {
            let verb_ids = catalog.verb_ids_by_kana(kana);
            if verb_ids.is_empty() || queue.iter().any(|entry| verb_ids.contains(&entry.verb_id.as_str())) {
                continue;
            }
            let candidate = select_candidate(
                &irregular_pool,
                queue,
                |item| verb_ids.contains(&item.verb_id.as_str()),
                current_template_ids,
                rng,
            );
            if let Some(candidate) = candidate {
                let entry = QueueItem::new(candidate, Bucket::IrregularQuota);
                if ensure_in_queue(queue, entry, daily_count, catalog) {
                    irregular_count = count_irregular(catalog, queue);
                }
            }
        }
        while irregular_count < minimum {
            let Some(candidate) = select_candidate(&irregular_pool, queue, |_| true, current_template_ids, rng)
            else {
                break;
            };
            let entry = QueueItem::new(candidate, Bucket::IrregularQuota);
            if !ensure_in_queue(queue, entry, daily_count, catalog) {
                break;
            }
            irregular_count = count_irregular(catalog, queue);
        }
        if irregular_count > before {
            tracing::debug!(before, after = irregular_count, minimum, "irregular quota filled");
        }
    }

    let requires_iku = current_template_ids
        .iter()
        .any(|tid| policy.iku_special_templates.contains(tid));
    let every = policy.iku_every_n_sessions.max(1);
    let session = patch.lesson_session_count;
    let iku_due = requires_iku && session.saturating_sub(state.last_iku_session) >= every;

    let mut iku_injected = false;
    if iku_due {
        let iku_ids = catalog.verb_ids_by_kana(IKU_KANA);
        if !iku_ids.is_empty() {
            let iku_pool: Vec<&StudyItem> = unlocked_pool
                .iter()
                .copied()
                .filter(|item| iku_ids.contains(&item.verb_id.as_str()))
                .collect();
            let candidate = select_candidate(&iku_pool, queue, |_| true, &policy.iku_special_templates, rng);
            if let Some(candidate) = candidate {
                let entry = QueueItem::new(candidate, Bucket::IkuQuota);
                iku_injected = ensure_in_queue(queue, entry, daily_count, catalog);
            }
        }
        if iku_injected {
            patch.last_iku_session = Some(session);
            tracing::info!(session, "いく item injected");
        }
    }

    IrregularOutcome {
        patch,
        iku_injected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Verb;
    use chrono::Utc;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn catalog() -> Catalog {
        Catalog::new(
            vec![
                Verb::new("kaku", "かく", VerbClass::Godan),
                Verb::new("taberu", "たべる", VerbClass::Ichidan),
                Verb::new("suru", "する", VerbClass::Irregular),
                Verb::new("kuru", "くる", VerbClass::Irregular),
                Verb::new("iku", "いく", VerbClass::Godan),
            ],
            Vec::new(),
            Default::default(),
        )
        .unwrap()
    }

    fn queued(verb: &str, tpl: &str, bucket: Bucket) -> QueueItem {
        QueueItem::new(&StudyItem::new(verb, tpl), bucket)
    }

    #[test]
    fn test_replace_prefers_fallback_and_skips_irregular() {
        let catalog = catalog();
        let queue = vec![
            queued("suru", "plain_past", Bucket::Fallback),
            queued("kaku", "plain_past", Bucket::Current),
            queued("taberu", "plain_past", Bucket::Previous),
        ];
        assert_eq!(replace_index(&catalog, &queue), Some(2));
        let all_irregular = vec![queued("suru", "plain_past", Bucket::Fallback)];
        assert_eq!(replace_index(&catalog, &all_irregular), None);
    }

    #[test]
    fn test_quota_replaces_when_full() {
        let catalog = catalog();
        let items = vec![
            StudyItem::new("suru", "plain_past"),
            StudyItem::new("kuru", "plain_past"),
        ];
        let pool: Vec<&StudyItem> = items.iter().collect();
        let mut queue = vec![
            queued("kaku", "plain_past", Bucket::Current),
            queued("taberu", "plain_past", Bucket::Weakness),
        ];
        let policy = IrregularPolicy::default();
        let state = PathState::new(Utc::now());
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let outcome = enforce_irregular_policy(
            Some(&policy),
            &mut queue,
            2,
            &state,
            &catalog,
            &pool,
            &["plain_past".to_string()],
            &mut rng,
        );
        assert_eq!(outcome.patch.lesson_session_count, 1);
        assert_eq!(queue.len(), 2);
        // weakness goes before current
        assert_eq!(queue[0].verb_id, "kuru");
        assert_eq!(queue[1].verb_id, "suru");
    }

    #[test]
    fn test_primary_verbs_added_past_minimum() {
        let catalog = catalog();
        let items = vec![
            StudyItem::new("suru", "plain_past"),
            StudyItem::new("kuru", "plain_past"),
            StudyItem::new("kaku", "plain_past"),
        ];
        let pool: Vec<&StudyItem> = items.iter().collect();
        let policy = IrregularPolicy {
            min_per_session: 1,
            ..IrregularPolicy::default()
        };
        let state = PathState::new(Utc::now());
        for seed in 0..10 {
            let mut queue = vec![queued("suru", "plain_past", Bucket::Current)];
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            enforce_irregular_policy(Some(&policy), &mut queue, 4, &state, &catalog, &pool, &[], &mut rng);
            let verbs: Vec<&str> = queue.iter().map(|item| item.verb_id.as_str()).collect();
            assert_eq!(verbs, vec!["suru", "kuru"]);
        }
    }

    #[test]
    fn test_session_count_saturates() {
        let catalog = catalog();
        let mut state = PathState::new(Utc::now());
        state.lesson_session_count = u32::MAX;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let outcome = enforce_irregular_policy(None, &mut Vec::new(), 3, &state, &catalog, &[], &[], &mut rng);
        assert_eq!(outcome.patch.lesson_session_count, u32::MAX);
    }

    #[test]
    fn test_disabled_policy_only_counts_session() {
        let catalog = catalog();
        let policy = IrregularPolicy {
            enabled: false,
            ..IrregularPolicy::default()
        };
        let mut state = PathState::new(Utc::now());
        state.lesson_session_count = 4;
        let mut queue = Vec::new();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let outcome = enforce_irregular_policy(Some(&policy), &mut queue, 5, &state, &catalog, &[], &[], &mut rng);
        assert_eq!(outcome.patch.lesson_session_count, 5);
        assert_eq!(outcome.patch.last_iku_session, None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_iku_every_n_sessions() {
        let catalog = catalog();
        let items = vec![StudyItem::new("iku", "plain_te_form"), StudyItem::new("iku", "plain_past")];
        let pool: Vec<&StudyItem> = items.iter().collect();
        let policy = IrregularPolicy {
            min_per_session: 0,
            iku_special_templates: vec!["plain_te_form".to_string()],
            iku_every_n_sessions: 2,
            ..IrregularPolicy::default()
        };
        let current = vec!["plain_te_form".to_string()];
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let mut state = PathState::new(Utc::now());
        state.lesson_session_count = 1;
        state.last_iku_session = 1;
        let mut queue = Vec::new();
        let outcome = enforce_irregular_policy(Some(&policy), &mut queue, 5, &state, &catalog, &pool, &current, &mut rng);
        assert!(!outcome.iku_injected);

        state.lesson_session_count = 2;
        let outcome = enforce_irregular_policy(Some(&policy), &mut queue, 5, &state, &catalog, &pool, &current, &mut rng);
        assert!(outcome.iku_injected);
        assert_eq!(outcome.patch.last_iku_session, Some(3));
        assert_eq!(queue[0].template_id, "plain_te_form");
        assert_eq!(queue[0].bucket, Bucket::IkuQuota);
    }
}
