//! Stage gates: decide whether a track may advance to its next stage.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::config::{CurriculumConfig, GateProfile};
use super::path_state::PathState;
use crate::catalog::Catalog;
use crate::srs::Card;
use crate::types::VerbClass;

// ==================== Failure Reasons ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateFailure {
    MinAnswered,
    MinAccuracy,
    MinDaysInStage,
    ClassAccuracy(VerbClass),
    HoldActive,
}

impl GateFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MinAnswered => "min_answered",
            Self::MinAccuracy => "min_accuracy",
            Self::MinDaysInStage => "min_days_in_stage",
            Self::ClassAccuracy(VerbClass::Godan) => "class_accuracy_godan",
            Self::ClassAccuracy(VerbClass::Ichidan) => "class_accuracy_ichidan",
            Self::ClassAccuracy(VerbClass::Irregular) => "class_accuracy_irregular",
            Self::HoldActive => "hold_active",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "min_answered" => Some(Self::MinAnswered),
            "min_accuracy" => Some(Self::MinAccuracy),
            "min_days_in_stage" => Some(Self::MinDaysInStage),
            "hold_active" => Some(Self::HoldActive),
            _ => s
                .strip_prefix("class_accuracy_")
                .and_then(VerbClass::parse)
                .map(Self::ClassAccuracy),
        }
    }
}

impl fmt::Display for GateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for GateFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for GateFailure {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown gate failure: {raw}")))
    }
}

/// Headline verdict of an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateReason {
    Passed,
    NoStages,
    /// First failing check
    Failed(GateFailure),
}

impl GateReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::NoStages => "no_stages",
            Self::Failed(failure) => failure.as_str(),
        }
    }
}

impl Serialize for GateReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ==================== Profile Resolution ====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BandMatch {
    pub id: Option<String>,
    pub label: Option<String>,
    pub min_stage: u32,
    pub max_stage: u32,
}

/// Effective profile for one stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedGateProfile {
    #[serde(flatten)]
    pub profile: GateProfile,
    pub band: Option<BandMatch>,
}

/// Merge the first band whose range holds the 1-based stage number over the base profile.
pub fn resolve_gate_profile(config: &CurriculumConfig, stage_index: usize) -> ResolvedGateProfile {
    let stage_number = u32::try_from(stage_index.saturating_add(1)).unwrap_or(u32::MAX);
    match config.gate_bands.iter().find(|band| band.contains(stage_number)) {
        Some(band) => {
            let (min_stage, max_stage) = band.range();
            ResolvedGateProfile {
                profile: config.gates.merged(&band.gates),
                band: Some(BandMatch {
                    id: band.id.clone(),
                    label: band.label.clone(),
                    min_stage,
                    max_stage,
                }),
            }
        }
        None => ResolvedGateProfile {
            profile: config.gates.clone(),
            band: None,
        },
    }
}

// ==================== Evaluation ====================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateReport {
    pub passed: bool,
    pub reason: GateReason,
    pub failed_reasons: Vec<GateFailure>,
    pub answered: u32,
    pub accuracy: f64,
    /// One entry per configured class floor
    pub class_accuracy: BTreeMap<VerbClass, f64>,
    pub days_in_stage: i64,
    pub failed_gate_count: u32,
    pub profile: Option<ResolvedGateProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateEvaluation {
    pub path_state: PathState,
    pub advanced: bool,
    pub completed: bool,
    pub gate: GateReport,
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    success: u32,
    failure: u32,
}

impl Tally {
    fn add(&mut self, card: &Card) {
        self.success = self.success.saturating_add(card.success_count_total);
        self.failure = self.failure.saturating_add(card.failure_count_total);
    }

    fn total(&self) -> u32 {
        self.success.saturating_add(self.failure)
    }

    fn accuracy(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => f64::from(self.success) / f64::from(total),
        }
    }
}

/// Longest hold or stabilization window, in days
pub const MAX_WINDOW_DAYS: i64 = 3650;

/// `now` plus `days`, with `days` capped at [`MAX_WINDOW_DAYS`]
fn days_after(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    Duration::try_days(days.clamp(0, MAX_WINDOW_DAYS))
        .and_then(|offset| now.checked_add_signed(offset))
        .unwrap_or(now)
}

/// Thresholds after clamping configured values into range
struct Thresholds {
    min_answered: u32,
    min_accuracy: f64,
    hold_days_on_fail: i64,
    min_days_in_stage: i64,
    max_days_in_stage: i64,
    stabilization_days_on_stall: i64,
    relaxed_accuracy_delta: f64,
}

impl Thresholds {
    fn from_profile(profile: &GateProfile) -> Self {
        Self {
            min_answered: profile.min_answered,
            min_accuracy: profile.min_accuracy.clamp(0.0, 1.0),
            hold_days_on_fail: profile.hold_days_on_fail.max(0),
            min_days_in_stage: profile.min_days_in_stage.max(0),
            max_days_in_stage: profile.max_days_in_stage.max(0),
            stabilization_days_on_stall: profile.stabilization_days_on_stall.max(1),
            relaxed_accuracy_delta: profile.relaxed_accuracy_delta.max(0.0),
        }
    }
}

pub fn evaluate_path_advance(
    config: &CurriculumConfig,
    state: &PathState,
    cards: &HashMap<String, Card>,
    catalog: &Catalog,
    now: DateTime<Utc>,
) -> GateEvaluation {
    let mut state = state.normalized(now);

    let Some(stage_index) = config.clamped_stage_index(&state) else {
        state.completed = true;
        let failed_gate_count = state.failed_gate_count;
        return GateEvaluation {
            path_state: state,
            advanced: false,
            completed: true,
            gate: GateReport {
                passed: true,
                reason: GateReason::NoStages,
                failed_reasons: Vec::new(),
                answered: 0,
                accuracy: 0.0,
                class_accuracy: BTreeMap::new(),
                days_in_stage: 0,
                failed_gate_count,
                profile: None,
            },
        };
    };
    state.stage_index = stage_index;

    let stage = &config.stages[stage_index];
    let resolved = resolve_gate_profile(config, stage_index);
    let limits = Thresholds::from_profile(&resolved.profile);
    let days_in_stage = state.days_in_stage(now);

    if state.stabilization_until.is_some_and(|until| now >= until) {
        state.stabilization_until = None;
        state.relaxed_accuracy_mode = true;
        tracing::info!(stage = %stage.id, "stabilization window over, accuracy floor relaxed");
    }
    if state.hold_until.is_some_and(|until| now >= until) {
        state.hold_until = None;
    }

    if state.hold_active(now) {
        tracing::debug!(stage = %stage.id, hold_until = ?state.hold_until, "gate on hold");
        let failed_gate_count = state.failed_gate_count;
        return GateEvaluation {
            path_state: state,
            advanced: false,
            completed: false,
            gate: GateReport {
                passed: false,
                reason: GateReason::Failed(GateFailure::HoldActive),
                failed_reasons: vec![GateFailure::HoldActive],
                answered: 0,
                accuracy: 0.0,
                class_accuracy: BTreeMap::new(),
                days_in_stage,
                failed_gate_count,
                profile: Some(resolved),
            },
        };
    }

    let mut overall = Tally::default();
    let mut by_class: HashMap<VerbClass, Tally> = HashMap::new();
    for card in cards.values() {
        if !stage.template_ids.contains(&card.template_id) || card.attempts() == 0 {
            continue;
        }
        overall.add(card);
        if let Some(verb) = catalog.verb(&card.verb_id) {
            by_class.entry(verb.verb_class).or_default().add(card);
        }
    }

    let answered = overall.total();
    let accuracy = overall.accuracy();
    let min_accuracy = if state.relaxed_accuracy_mode {
        (limits.min_accuracy - limits.relaxed_accuracy_delta).max(0.0)
    } else {
        limits.min_accuracy
    };

    let mut failed_reasons = Vec::new();
    if answered < limits.min_answered {
        failed_reasons.push(GateFailure::MinAnswered);
    }
    if accuracy < min_accuracy {
        failed_reasons.push(GateFailure::MinAccuracy);
    }
    if days_in_stage < limits.min_days_in_stage {
        failed_reasons.push(GateFailure::MinDaysInStage);
    }

    let mut class_accuracy = BTreeMap::new();
    for (class_name, &threshold) in &resolved.profile.min_accuracy_by_class {
        let Some(class) = VerbClass::parse(class_name) else {
            tracing::warn!(class = %class_name, "ignoring class floor for unknown verb class");
            continue;
        };
        let tally = by_class.get(&class).copied().unwrap_or_default();
        let class_acc = tally.accuracy();
        class_accuracy.insert(class, class_acc);
        if tally.total() == 0 || class_acc < threshold {
            failed_reasons.push(GateFailure::ClassAccuracy(class));
        }
    }

    if failed_reasons.is_empty() {
        let at_final_stage = stage_index + 1 >= config.stages.len();
        state.failed_gate_count = 0;
        state.hold_until = None;
        state.stabilization_until = None;
        state.relaxed_accuracy_mode = false;
        if at_final_stage {
            state.completed = true;
            tracing::info!(stage = %stage.id, answered, accuracy, "final gate passed, track completed");
        } else {
            state.stage_index = stage_index + 1;
            state.stage_started_at = Some(now);
            state.completed = false;
            tracing::info!(
                stage = %stage.id,
                next_stage = %config.stages[stage_index + 1].id,
                answered,
                accuracy,
                "gate passed, stage advanced"
            );
        }
        return GateEvaluation {
            path_state: state,
            advanced: !at_final_stage,
            completed: at_final_stage,
            gate: GateReport {
                passed: true,
                reason: GateReason::Passed,
                failed_reasons,
                answered,
                accuracy,
                class_accuracy,
                days_in_stage,
                failed_gate_count: 0,
                profile: Some(resolved),
            },
        };
    }

    if answered >= limits.min_answered {
        state.failed_gate_count = state.failed_gate_count.saturating_add(1);
        if limits.hold_days_on_fail > 0 {
            state.hold_until = Some(days_after(now, limits.hold_days_on_fail));
        }
    }
    if limits.max_days_in_stage > 0
        && days_in_stage >= limits.max_days_in_stage
        && state.stabilization_until.is_none()
        && !state.relaxed_accuracy_mode
    {
        state.stabilization_until = Some(days_after(now, limits.stabilization_days_on_stall));
        tracing::info!(
            stage = %stage.id,
            days_in_stage,
            until = ?state.stabilization_until,
            "stage stalled, stabilization window started"
        );
    }
    state.completed = false;

    let reasons: Vec<&str> = failed_reasons.iter().map(GateFailure::as_str).collect();
    tracing::info!(
        stage = %stage.id,
        answered,
        accuracy,
        failed_gate_count = state.failed_gate_count,
        reasons = ?reasons,
        "gate not passed"
    );

    GateEvaluation {
        advanced: false,
        completed: false,
        gate: GateReport {
            passed: false,
            reason: GateReason::Failed(failed_reasons[0]),
            failed_reasons,
            answered,
            accuracy,
            class_accuracy,
            days_in_stage,
            failed_gate_count: state.failed_gate_count,
            profile: Some(resolved),
        },
        path_state: state,
    }
}
