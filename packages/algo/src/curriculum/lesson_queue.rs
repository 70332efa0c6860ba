//! Daily lesson queue assembly.
//!
//! Buckets are drawn in order (current, previous/recent, weakness), then the
//! queue is backfilled from every unlocked template and handed to the
//! irregular-verb policy.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use super::composition::{compute_composition_window, ClassBias, CompositionWindow, Tier};
use super::config::{CurriculumConfig, PathType};
use super::gate::GateFailure;
use super::irregular_policy::{enforce_irregular_policy, IrregularOutcome};
use super::path_state::{PathState, PathStatePatch};
use super::weakness::{apply_confusable_pair_boost, select_weakness_templates, LESSON_WEAKNESS_LIMIT};
use crate::catalog::Catalog;
use crate::srs::Card;
use crate::types::{StudyItem, VerbClass};

/// A verb may not repeat within this many trailing queue entries
pub const RECENT_VERB_WINDOW: usize = 5;

/// Stages feeding the recent bucket on the mid-course mix
pub const RECENT_STAGE_WINDOW: usize = 5;

/// Base class proportions for current-bucket picks
const CLASS_WEIGHTS: [(VerbClass, f64); 3] = [
    (VerbClass::Godan, 0.6),
    (VerbClass::Ichidan, 0.33),
    (VerbClass::Irregular, 0.07),
];

/// Weight added per unit of class bias
const CLASS_BIAS_WEIGHT: f64 = 0.08;

// ==================== Queue Items ====================

/// Where a queue item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Current,
    Previous,
    Recent,
    Weakness,
    Fallback,
    IrregularQuota,
    IkuQuota,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueItem {
    pub verb_id: String,
    pub template_id: String,
    pub bucket: Bucket,
}

impl QueueItem {
    pub fn new(item: &StudyItem, bucket: Bucket) -> Self {
        Self {
            verb_id: item.verb_id.clone(),
            template_id: item.template_id.clone(),
            bucket,
        }
    }

    pub fn is_pair(&self, item: &StudyItem) -> bool {
        self.verb_id == item.verb_id && self.template_id == item.template_id
    }
}

// ==================== Request / Plan ====================

/// Everything a lesson build reads; nothing here is mutated
#[derive(Debug, Clone, Copy)]
pub struct LessonRequest<'a> {
    pub path_type: PathType,
    pub config: &'a CurriculumConfig,
    pub state: &'a PathState,
    pub catalog: &'a Catalog,
    pub cards: &'a HashMap<String, Card>,
    /// Never-studied (verb, template) pairs
    pub unseen: &'a [StudyItem],
    /// Raw mistake counts keyed by template id
    pub mistake_counts: &'a HashMap<String, u32>,
    /// Failure reasons from the track's last gate evaluation
    pub gate_failures: &'a [GateFailure],
    pub daily_count: usize,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IrregularPolicySummary {
    pub enabled: bool,
    pub iku_injected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonDetails {
    pub current_stage_id: Option<String>,
    pub current_stage_index: usize,
    pub current_template_ids: Vec<String>,
    /// Current templates taught today (sub-phase aware)
    pub active_current_template_ids: Vec<String>,
    /// Unlocked templates minus deferred sub-phase templates
    pub unlocked_template_ids: Vec<String>,
    pub weakness_template_ids: Vec<String>,
    pub composition: CompositionWindow,
    pub bucket_counts: BTreeMap<Bucket, usize>,
    pub irregular_policy: IrregularPolicySummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonPlan {
    pub queue: Vec<QueueItem>,
    pub path_state_patch: PathStatePatch,
    pub details: LessonDetails,
}

// ==================== Picking ====================

pub(super) fn verb_class_of(catalog: &Catalog, verb_id: &str) -> Option<VerbClass> {
    catalog.verb(verb_id).map(|verb| verb.verb_class)
}

/// Append up to `count` shuffled pool items, skipping verbs seen in the last
/// few entries and pairs already queued. Returns how many were added.
fn pick_from_pool<R: Rng + ?Sized>(
    queue: &mut Vec<QueueItem>,
    pool: &[&StudyItem],
    bucket: Bucket,
    count: usize,
    rng: &mut R,
) -> usize {
    if count == 0 || pool.is_empty() {
        return 0;
    }
    let mut shuffled = pool.to_vec();
    shuffled.shuffle(rng);

    let mut picked = 0;
    for item in shuffled {
        if picked >= count {
            break;
        }
        let tail = &queue[queue.len().saturating_sub(RECENT_VERB_WINDOW)..];
        if tail.iter().any(|entry| entry.verb_id == item.verb_id) {
            continue;
        }
        if queue.iter().any(|entry| entry.is_pair(item)) {
            continue;
        }
        queue.push(QueueItem::new(item, bucket));
        picked += 1;
    }
    picked
}

fn class_pool<'p>(pool: &[&'p StudyItem], catalog: &Catalog, class: VerbClass) -> Vec<&'p StudyItem> {
    pool.iter()
        .copied()
        .filter(|item| verb_class_of(catalog, &item.verb_id) == Some(class))
        .collect()
}

/// Split `count` across verb classes by weight, largest remainders first.
pub fn class_targets(count: usize, bias: &ClassBias) -> [(VerbClass, usize); 3] {
    let mut targets = CLASS_WEIGHTS.map(|(class, _)| (class, 0));
    if count == 0 {
        return targets;
    }
    let weights = CLASS_WEIGHTS
        .map(|(class, base)| base + CLASS_BIAS_WEIGHT * f64::from(bias.get(class)));
    let weight_sum: f64 = weights.iter().sum();
    let raw = weights.map(|w| count as f64 * w / weight_sum);

    let mut assigned = 0;
    for (slot, value) in targets.iter_mut().zip(raw) {
        slot.1 = value.floor() as usize;
        assigned += slot.1;
    }

    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| {
        let frac = |i: usize| raw[i] - raw[i].floor();
        frac(b).partial_cmp(&frac(a)).unwrap_or(std::cmp::Ordering::Equal)
    });
    for idx in order.into_iter().take(count.saturating_sub(assigned)) {
        targets[idx].1 += 1;
    }
    targets
}

/// Current-bucket picks: proportional class targets, shortfall from the whole pool
fn pick_with_class_targets<R: Rng + ?Sized>(
    queue: &mut Vec<QueueItem>,
    pool: &[&StudyItem],
    bucket: Bucket,
    count: usize,
    bias: &ClassBias,
    catalog: &Catalog,
    rng: &mut R,
) -> usize {
    if count == 0 {
        return 0;
    }
    let mut picked = 0;
    for (class, target) in class_targets(count, bias) {
        if target == 0 {
            continue;
        }
        let subset = class_pool(pool, catalog, class);
        picked += pick_from_pool(queue, &subset, bucket, target, rng);
    }
    if picked < count {
        picked += pick_from_pool(queue, pool, bucket, count - picked, rng);
    }
    picked
}

/// Other buckets: biased classes first (largest bias first), then unconstrained
fn pick_with_class_bias<R: Rng + ?Sized>(
    queue: &mut Vec<QueueItem>,
    pool: &[&StudyItem],
    bucket: Bucket,
    count: usize,
    bias: &ClassBias,
    catalog: &Catalog,
    rng: &mut R,
) -> usize {
    if count == 0 {
        return 0;
    }
    let mut ordered: Vec<(VerbClass, usize)> = [VerbClass::Irregular, VerbClass::Godan, VerbClass::Ichidan]
        .into_iter()
        .map(|class| (class, bias.get(class) as usize))
        .filter(|&(_, amount)| amount > 0)
        .collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1));

    let mut picked = 0;
    for (class, amount) in ordered {
        if picked >= count {
            break;
        }
        let subset = class_pool(pool, catalog, class);
        picked += pick_from_pool(queue, &subset, bucket, amount.min(count - picked), rng);
    }
    if picked < count {
        picked += pick_from_pool(queue, pool, bucket, count - picked, rng);
    }
    picked
}

fn pool_for<'a>(unseen: &'a [StudyItem], template_ids: &[String]) -> Vec<&'a StudyItem> {
    let wanted: HashSet<&str> = template_ids.iter().map(String::as_str).collect();
    unseen
        .iter()
        .filter(|item| wanted.contains(item.template_id.as_str()))
        .collect()
}

fn summarize_buckets(queue: &[QueueItem]) -> BTreeMap<Bucket, usize> {
    let mut counts = BTreeMap::new();
    for item in queue {
        *counts.entry(item.bucket).or_insert(0) += 1;
    }
    counts
}

// ==================== Build ====================

pub fn build_lesson_queue<R: Rng + ?Sized>(request: &LessonRequest<'_>, rng: &mut R) -> LessonPlan {
    let LessonRequest {
        path_type,
        config,
        catalog,
        cards,
        unseen,
        mistake_counts,
        gate_failures,
        now,
        ..
    } = *request;
    let state = request.state.normalized(now);
    let daily_count = request.daily_count.max(1);

    let current_stage = config.current_stage(&state);
    let days_in_stage = state.days_in_stage(now);
    let current_template_ids: Vec<String> = current_stage
        .map(|stage| stage.template_ids.clone())
        .unwrap_or_default();
    let active_current: Vec<String> = current_stage
        .map(|stage| config.stage_current_template_ids(stage, days_in_stage))
        .unwrap_or_default();
    let deferred: Vec<&String> = current_template_ids
        .iter()
        .filter(|tid| !active_current.contains(tid))
        .collect();
    let unlocked: Vec<String> = config
        .unlocked_template_ids(&state)
        .into_iter()
        .filter(|tid| !deferred.contains(&tid))
        .collect();
    let previous: Vec<String> = unlocked
        .iter()
        .filter(|tid| !active_current.contains(tid))
        .cloned()
        .collect();

    let composition = compute_composition_window(path_type, config, &state, daily_count, now, gate_failures);

    let weakness_base = select_weakness_templates(&unlocked, cards.values(), mistake_counts, LESSON_WEAKNESS_LIMIT);
    let weakness_ids = apply_confusable_pair_boost(
        &weakness_base,
        &config.confusable_pairs,
        config.confusion_trigger(),
        mistake_counts,
        &unlocked,
    );

    let (review_bucket, review_ids) = match composition.tier {
        Tier::MidCourse => (Bucket::Recent, config.recent_template_ids(&state, RECENT_STAGE_WINDOW)),
        _ => (Bucket::Previous, previous),
    };

    let bias = composition.boost.class_bias;
    let mut queue: Vec<QueueItem> = Vec::with_capacity(daily_count);
    pick_with_class_targets(
        &mut queue,
        &pool_for(unseen, &active_current),
        Bucket::Current,
        composition.counts.current,
        &bias,
        catalog,
        rng,
    );
    pick_with_class_bias(
        &mut queue,
        &pool_for(unseen, &review_ids),
        review_bucket,
        composition.review_count(),
        &bias,
        catalog,
        rng,
    );
    pick_with_class_bias(
        &mut queue,
        &pool_for(unseen, &weakness_ids),
        Bucket::Weakness,
        composition.counts.weakness,
        &bias,
        catalog,
        rng,
    );
    if queue.len() < daily_count {
        let missing = daily_count - queue.len();
        pick_from_pool(&mut queue, &pool_for(unseen, &unlocked), Bucket::Fallback, missing, rng);
    }

    let IrregularOutcome { patch, iku_injected } = enforce_irregular_policy(
        config.irregular_policy.as_ref(),
        &mut queue,
        daily_count,
        &state,
        catalog,
        &pool_for(unseen, &unlocked),
        &active_current,
        rng,
    );
    queue.truncate(daily_count);

    let bucket_counts = summarize_buckets(&queue);
    tracing::debug!(
        path = %path_type,
        stage = current_stage.map(|s| s.id.as_str()).unwrap_or("-"),
        queued = queue.len(),
        daily_count,
        iku_injected,
        "lesson queue built"
    );

    LessonPlan {
        queue,
        path_state_patch: patch,
        details: LessonDetails {
            current_stage_id: current_stage.map(|stage| stage.id.clone()),
            current_stage_index: state.stage_index,
            current_template_ids,
            active_current_template_ids: active_current,
            unlocked_template_ids: unlocked,
            weakness_template_ids: weakness_ids,
            composition,
            bucket_counts,
            irregular_policy: IrregularPolicySummary {
                enabled: config.irregular_policy.as_ref().is_some_and(|p| p.enabled),
                iku_injected,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn item(verb: &str, tpl: &str) -> StudyItem {
        StudyItem::new(verb, tpl)
    }

    #[test]
    fn test_class_targets_default_split() {
        let targets = class_targets(10, &ClassBias::default());
        assert_eq!(
            targets,
            [(VerbClass::Godan, 6), (VerbClass::Ichidan, 3), (VerbClass::Irregular, 1)]
        );
        let targets = class_targets(3, &ClassBias::default());
        assert_eq!(targets.iter().map(|t| t.1).sum::<usize>(), 3);
        assert_eq!(class_targets(0, &ClassBias::default())[0].1, 0);
    }

    #[test]
    fn test_class_bias_shifts_targets() {
        let bias = ClassBias {
            ichidan: 4,
            ..ClassBias::default()
        };
        let targets = class_targets(10, &bias);
        // ichidan weight 0.33 + 0.32 = 0.65 of 1.32
        assert_eq!(targets[1], (VerbClass::Ichidan, 5));
        assert_eq!(targets.iter().map(|t| t.1).sum::<usize>(), 10);
    }

    #[test]
    fn test_pick_from_pool_skips_recent_verbs_and_duplicates() {
        let pool_items = vec![
            item("kaku", "plain_past"),
            item("kaku", "plain_negative"),
            item("yomu", "plain_past"),
        ];
        let pool: Vec<&StudyItem> = pool_items.iter().collect();
        let mut queue = vec![QueueItem::new(&item("yomu", "plain_past"), Bucket::Current)];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let picked = pick_from_pool(&mut queue, &pool, Bucket::Previous, 5, &mut rng);
        // one kaku item only: the second repeats a verb inside the window
        assert_eq!(picked, 1);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[1].verb_id, "kaku");
        assert_eq!(queue[1].bucket, Bucket::Previous);
    }
}
