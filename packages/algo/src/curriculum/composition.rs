//! Daily composition windows: how many items each bucket contributes.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::config::{BucketCounts, CurriculumConfig, PathType};
use super::gate::GateFailure;
use super::path_state::PathState;
use crate::types::VerbClass;

/// Extra weakness slots while a stall-recovery window is open
const STABILIZATION_WEAKNESS_BONUS: usize = 2;

/// Stages with at most this many templates count as narrow
const NARROW_STAGE_TEMPLATES: usize = 1;

/// Narrow-stage reserve starts after this many days in the stage
const NARROW_STAGE_GRACE_DAYS: i64 = 2;

/// Class-bias units per failed class floor
const CLASS_BIAS_PER_FAILURE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Intro,
    Consolidation,
    Maintenance,
    MidCourse,
}

/// Per-class sampling bias raised by failed class-accuracy floors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassBias {
    pub godan: u32,
    pub ichidan: u32,
    pub irregular: u32,
}

impl ClassBias {
    pub fn get(&self, class: VerbClass) -> u32 {
        match class {
            VerbClass::Godan => self.godan,
            VerbClass::Ichidan => self.ichidan,
            VerbClass::Irregular => self.irregular,
        }
    }

    fn add(&mut self, class: VerbClass, amount: u32) {
        match class {
            VerbClass::Godan => self.godan += amount,
            VerbClass::Ichidan => self.ichidan += amount,
            VerbClass::Irregular => self.irregular += amount,
        }
    }
}

/// Composition adjustments derived from the last gate evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GateBoost {
    pub weakness_extra: usize,
    pub class_bias: ClassBias,
}

impl GateBoost {
    pub fn from_failures(failures: &[GateFailure]) -> Self {
        let mut boost = Self::default();
        for failure in failures {
            match failure {
                GateFailure::MinAccuracy => boost.weakness_extra += 1,
                GateFailure::ClassAccuracy(class) => {
                    boost.weakness_extra += 1;
                    boost.class_bias.add(*class, CLASS_BIAS_PER_FAILURE);
                }
                _ => {}
            }
        }
        boost
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionWindow {
    pub tier: Tier,
    pub days_in_stage: i64,
    pub unlocked_stage_count: usize,
    pub stage_is_narrow: bool,
    pub stabilization_active: bool,
    pub boost: GateBoost,
    pub counts: BucketCounts,
}

impl CompositionWindow {
    /// Count for the unlocked-but-not-current bucket the tier uses
    pub fn review_count(&self) -> usize {
        match self.tier {
            Tier::MidCourse => self.counts.recent,
            _ => self.counts.previous,
        }
    }
}

fn is_mid_course(path_type: PathType, config: &CurriculumConfig, unlocked_stage_count: usize) -> bool {
    path_type == PathType::Guided
        && config
            .windows
            .mid_course_unlocked_forms
            .is_some_and(|threshold| threshold > 0 && unlocked_stage_count >= threshold)
}

pub fn compute_composition_window(
    path_type: PathType,
    config: &CurriculumConfig,
    state: &PathState,
    daily_count: usize,
    now: DateTime<Utc>,
    gate_failures: &[GateFailure],
) -> CompositionWindow {
    let state = state.normalized(now);
    let daily_count = daily_count.max(1);
    let days_in_stage = state.days_in_stage(now);
    let windows = &config.windows;
    let unlocked_stage_count = state.stage_index.saturating_add(1);
    let current_template_count = config
        .current_stage(&state)
        .map_or(0, |stage| stage.template_ids.len());
    let stage_is_narrow = current_template_count <= NARROW_STAGE_TEMPLATES;

    let (tier, mut counts) = if is_mid_course(path_type, config, unlocked_stage_count) {
        (Tier::MidCourse, windows.counts_mid_course)
    } else if days_in_stage <= windows.intro_days {
        (Tier::Intro, windows.counts_intro)
    } else if days_in_stage <= windows.consolidation_days {
        (Tier::Consolidation, windows.counts_consolidation)
    } else {
        (Tier::Maintenance, windows.counts_maintenance)
    };

    let boost = GateBoost::from_failures(gate_failures);
    let fail_boost = usize::from(state.failed_gate_count > 0);
    counts.weakness += fail_boost + boost.weakness_extra;

    let stabilization_active = state.stabilization_active(now);
    if stabilization_active {
        counts.weakness += STABILIZATION_WEAKNESS_BONUS;
    }

    // A single-template stage past its grace period keeps at least half the
    // batch on earlier material. On the mid-course mix that share goes to recent.
    let mut floors = BucketCounts::default();
    if path_type == PathType::Guided && stage_is_narrow && days_in_stage > NARROW_STAGE_GRACE_DAYS {
        let reserve = daily_count.div_ceil(2);
        let slot = match tier {
            Tier::MidCourse => &mut counts.recent,
            _ => &mut counts.previous,
        };
        *slot = (*slot).max(reserve);
        match tier {
            Tier::MidCourse => floors.recent = reserve,
            _ => floors.previous = reserve,
        }
    }

    let counts = clamp_counts(counts, daily_count, floors);
    tracing::debug!(
        path = %path_type,
        ?tier,
        days_in_stage,
        current = counts.current,
        previous = counts.previous,
        recent = counts.recent,
        weakness = counts.weakness,
        "composition window computed"
    );

    CompositionWindow {
        tier,
        days_in_stage,
        unlocked_stage_count,
        stage_is_narrow,
        stabilization_active,
        boost,
        counts,
    }
}

#[derive(Clone, Copy)]
enum Slot {
    Current,
    Previous,
    Recent,
    Weakness,
}

fn slot_mut(counts: &mut BucketCounts, slot: Slot) -> &mut usize {
    match slot {
        Slot::Current => &mut counts.current,
        Slot::Previous => &mut counts.previous,
        Slot::Recent => &mut counts.recent,
        Slot::Weakness => &mut counts.weakness,
    }
}

fn slot_floor(floors: &BucketCounts, slot: Slot) -> usize {
    match slot {
        Slot::Current => floors.current,
        Slot::Previous => floors.previous,
        Slot::Recent => floors.recent,
        Slot::Weakness => floors.weakness,
    }
}

/// Trim counts until they fit `daily_count`.
///
/// One unit at a time, round-robin over previous, recent, weakness, current,
/// never below a bucket's floor. When every bucket sits at its floor the
/// floors are ignored and trimming continues over weakness, current,
/// previous, recent.
pub fn clamp_counts(counts: BucketCounts, daily_count: usize, floors: BucketCounts) -> BucketCounts {
    const CHEAPEST_FIRST: [Slot; 4] = [Slot::Previous, Slot::Recent, Slot::Weakness, Slot::Current];
    const FLOORLESS: [Slot; 4] = [Slot::Weakness, Slot::Current, Slot::Previous, Slot::Recent];

    let mut out = counts;
    let mut total = out.total();
    while total > daily_count {
        let mut reduced = false;
        for slot in CHEAPEST_FIRST {
            if total <= daily_count {
                break;
            }
            let value = slot_mut(&mut out, slot);
            if *value > slot_floor(&floors, slot) {
                *value -= 1;
                total -= 1;
                reduced = true;
            }
        }
        if !reduced {
            for slot in FLOORLESS {
                if total <= daily_count {
                    break;
                }
                let value = slot_mut(&mut out, slot);
                if *value > 0 {
                    *value -= 1;
                    total -= 1;
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::config::StageConfig;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 10, 12, 0, 0).unwrap()
    }

    fn config(stage_templates: &[usize], mid_course: Option<usize>) -> CurriculumConfig {
        let mut config = CurriculumConfig::default();
        config.windows.mid_course_unlocked_forms = mid_course;
        config.stages = stage_templates
            .iter()
            .enumerate()
            .map(|(idx, &n)| StageConfig {
                id: format!("stage_{idx}"),
                label: None,
                template_ids: (0..n).map(|t| format!("t{idx}_{t}")).collect(),
            })
            .collect();
        config
    }

    fn state(stage_index: usize, day: i64) -> PathState {
        let mut state = PathState::new(now() - Duration::days(day - 1));
        state.stage_index = stage_index;
        state
    }

    #[test]
    fn test_tiers_by_days() {
        let config = config(&[2, 2, 2], None);
        let w = compute_composition_window(PathType::Guided, &config, &state(1, 1), 10, now(), &[]);
        assert_eq!(w.tier, Tier::Intro);
        assert_eq!(w.counts, BucketCounts::new(6, 3, 0, 1));

        let w = compute_composition_window(PathType::Guided, &config, &state(1, 4), 10, now(), &[]);
        assert_eq!(w.tier, Tier::Consolidation);
        assert_eq!(w.counts, BucketCounts::new(4, 4, 0, 2));

        let w = compute_composition_window(PathType::Textbook, &config, &state(1, 9), 10, now(), &[]);
        assert_eq!(w.tier, Tier::Maintenance);
        assert_eq!(w.counts, BucketCounts::new(3, 5, 0, 2));
    }

    #[test]
    fn test_mid_course_is_guided_only() {
        let config = config(&[2, 2, 2, 2], Some(3));
        let w = compute_composition_window(PathType::Guided, &config, &state(2, 1), 10, now(), &[]);
        assert_eq!(w.tier, Tier::MidCourse);
        assert_eq!(w.counts, BucketCounts::new(2, 0, 5, 3));
        assert_eq!(w.review_count(), 5);

        let w = compute_composition_window(PathType::Textbook, &config, &state(2, 1), 10, now(), &[]);
        assert_eq!(w.tier, Tier::Intro);
    }

    #[test]
    fn test_weakness_boosts_then_trim() {
        let config = config(&[2, 2], None);
        let mut st = state(1, 1);
        st.failed_gate_count = 1;
        st.stabilization_until = Some(now() + Duration::days(1));
        let failures = [GateFailure::MinAccuracy, GateFailure::ClassAccuracy(VerbClass::Ichidan)];
        let w = compute_composition_window(PathType::Guided, &config, &st, 10, now(), &failures);
        // weakness 1 + 1 fail + 2 gate + 2 stabilization = 6, then trimmed round-robin
        assert_eq!(w.counts.total(), 10);
        assert_eq!(w.boost.class_bias.ichidan, 2);
        assert!(w.stabilization_active);
        assert_eq!(w.counts, BucketCounts::new(5, 1, 0, 4));
    }

    #[test]
    fn test_narrow_stage_reserves_half() {
        let config = config(&[3, 1], None);
        let w = compute_composition_window(PathType::Guided, &config, &state(1, 3), 10, now(), &[]);
        assert!(w.stage_is_narrow);
        assert_eq!(w.counts.previous, 5);
        assert!(w.counts.total() <= 10);

        // reserve lands on recent when the mid-course mix is active
        let config = self::config(&[3, 1], Some(2));
        let w = compute_composition_window(PathType::Guided, &config, &state(1, 3), 10, now(), &[]);
        assert_eq!(w.tier, Tier::MidCourse);
        assert_eq!(w.counts.recent, 5);
    }

    #[test]
    fn test_clamp_counts() {
        let out = clamp_counts(BucketCounts::new(6, 3, 0, 1), 4, BucketCounts::default());
        assert_eq!(out.total(), 4);
        assert_eq!(out, BucketCounts::new(4, 0, 0, 0));

        let floors = BucketCounts::new(0, 5, 0, 0);
        let out = clamp_counts(BucketCounts::new(4, 5, 0, 2), 5, floors);
        assert_eq!(out, BucketCounts::new(0, 5, 0, 0));

        // floors above the budget still give way
        let out = clamp_counts(BucketCounts::new(0, 5, 0, 0), 3, floors);
        assert_eq!(out.total(), 3);
    }
}
