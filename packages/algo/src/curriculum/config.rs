//! Per-track curriculum configuration.
//!
//! Every field is defaulted so partial JSON documents deserialize into a
//! usable config.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::path_state::PathState;

// ==================== Path Type ====================

/// Curriculum track; each keeps its own path state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathType {
    #[default]
    Guided,
    Textbook,
    Custom,
}

impl PathType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guided => "guided",
            Self::Textbook => "textbook",
            Self::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "guided" => Some(Self::Guided),
            "textbook" => Some(Self::Textbook),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

impl fmt::Display for PathType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==================== Stages ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub template_ids: Vec<String>,
}

/// Sub-phase: only `intro_template_ids` are taught until `subphase_unlock_day`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StageOverride {
    pub intro_template_ids: Vec<String>,
    pub subphase_unlock_day: i64,
}

// ==================== Gate Profile ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateProfile {
    pub min_answered: u32,
    pub min_accuracy: f64,
    /// Keyed by verb class name
    pub min_accuracy_by_class: BTreeMap<String, f64>,
    pub hold_days_on_fail: i64,
    pub min_days_in_stage: i64,
    /// 0 disables stall detection
    pub max_days_in_stage: i64,
    pub stabilization_days_on_stall: i64,
    pub relaxed_accuracy_delta: f64,
}

impl Default for GateProfile {
    fn default() -> Self {
        Self {
            min_answered: 0,
            min_accuracy: 0.0,
            min_accuracy_by_class: BTreeMap::new(),
            hold_days_on_fail: 0,
            min_days_in_stage: 0,
            max_days_in_stage: 0,
            stabilization_days_on_stall: 2,
            relaxed_accuracy_delta: 0.0,
        }
    }
}

/// Band-level overrides; unset fields keep the base value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GateProfileOverrides {
    pub min_answered: Option<u32>,
    pub min_accuracy: Option<f64>,
    pub min_accuracy_by_class: Option<BTreeMap<String, f64>>,
    pub hold_days_on_fail: Option<i64>,
    pub min_days_in_stage: Option<i64>,
    pub max_days_in_stage: Option<i64>,
    pub stabilization_days_on_stall: Option<i64>,
    pub relaxed_accuracy_delta: Option<f64>,
}

impl GateProfile {
    /// Field-by-field merge; class floors merge per class
    pub fn merged(&self, overrides: &GateProfileOverrides) -> Self {
        let mut min_accuracy_by_class = self.min_accuracy_by_class.clone();
        if let Some(by_class) = &overrides.min_accuracy_by_class {
            min_accuracy_by_class.extend(by_class.iter().map(|(k, v)| (k.clone(), *v)));
        }
        Self {
            min_answered: overrides.min_answered.unwrap_or(self.min_answered),
            min_accuracy: overrides.min_accuracy.unwrap_or(self.min_accuracy),
            min_accuracy_by_class,
            hold_days_on_fail: overrides.hold_days_on_fail.unwrap_or(self.hold_days_on_fail),
            min_days_in_stage: overrides.min_days_in_stage.unwrap_or(self.min_days_in_stage),
            max_days_in_stage: overrides.max_days_in_stage.unwrap_or(self.max_days_in_stage),
            stabilization_days_on_stall: overrides
                .stabilization_days_on_stall
                .unwrap_or(self.stabilization_days_on_stall),
            relaxed_accuracy_delta: overrides
                .relaxed_accuracy_delta
                .unwrap_or(self.relaxed_accuracy_delta),
        }
    }
}

/// Stage-number range (1-based, inclusive) with its own gate overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateBand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default = "default_min_stage")]
    pub min_stage: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_stage: Option<u32>,
    #[serde(default, alias = "overrides")]
    pub gates: GateProfileOverrides,
}

fn default_min_stage() -> u32 {
    1
}

impl GateBand {
    /// Normalized (min, max) range; max never below min
    pub fn range(&self) -> (u32, u32) {
        let min = self.min_stage.max(1);
        let max = self.max_stage.unwrap_or(min).max(min);
        (min, max)
    }

    pub fn contains(&self, stage_number: u32) -> bool {
        let (min, max) = self.range();
        (min..=max).contains(&stage_number)
    }
}

// ==================== Composition Windows ====================

/// Target item counts per bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketCounts {
    pub current: usize,
    pub previous: usize,
    pub recent: usize,
    pub weakness: usize,
}

impl BucketCounts {
    pub const fn new(current: usize, previous: usize, recent: usize, weakness: usize) -> Self {
        Self {
            current,
            previous,
            recent,
            weakness,
        }
    }

    pub fn total(&self) -> usize {
        self.current + self.previous + self.recent + self.weakness
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionWindows {
    pub intro_days: i64,
    pub consolidation_days: i64,
    /// Unlocked-stage count at which the guided track switches to the mid-course mix
    pub mid_course_unlocked_forms: Option<usize>,
    pub counts_intro: BucketCounts,
    pub counts_consolidation: BucketCounts,
    pub counts_maintenance: BucketCounts,
    pub counts_mid_course: BucketCounts,
}

impl Default for CompositionWindows {
    fn default() -> Self {
        Self {
            intro_days: 2,
            consolidation_days: 6,
            mid_course_unlocked_forms: None,
            counts_intro: BucketCounts::new(6, 3, 0, 1),
            counts_consolidation: BucketCounts::new(4, 4, 0, 2),
            counts_maintenance: BucketCounts::new(3, 5, 0, 2),
            counts_mid_course: BucketCounts::new(2, 0, 5, 3),
        }
    }
}

// ==================== Irregular Policy ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IrregularPolicy {
    pub enabled: bool,
    pub min_per_session: usize,
    /// Irregular verbs (by kana) filled first, in order
    pub primary_kana: Vec<String>,
    /// Templates whose presence in the current stage triggers いく injections
    pub iku_special_templates: Vec<String>,
    pub iku_every_n_sessions: u32,
}

impl Default for IrregularPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            min_per_session: 2,
            primary_kana: vec!["する".to_string(), "くる".to_string()],
            iku_special_templates: Vec::new(),
            iku_every_n_sessions: 2,
        }
    }
}

// ==================== Curriculum Config ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurriculumConfig {
    pub stages: Vec<StageConfig>,
    pub gates: GateProfile,
    pub gate_bands: Vec<GateBand>,
    pub windows: CompositionWindows,
    pub confusable_pairs: Vec<(String, String)>,
    pub confusion_pair_trigger_errors: u32,
    /// Absent policy disables quota enforcement
    pub irregular_policy: Option<IrregularPolicy>,
    pub stage_overrides: HashMap<String, StageOverride>,
}

impl Default for CurriculumConfig {
    fn default() -> Self {
        Self {
            stages: Vec::new(),
            gates: GateProfile::default(),
            gate_bands: Vec::new(),
            windows: CompositionWindows::default(),
            confusable_pairs: Vec::new(),
            confusion_pair_trigger_errors: 2,
            irregular_policy: None,
            stage_overrides: HashMap::new(),
        }
    }
}

impl CurriculumConfig {
    /// Stage index clamped into the stage list; `None` when there are no stages
    pub fn clamped_stage_index(&self, state: &PathState) -> Option<usize> {
        let last = self.stages.len().checked_sub(1)?;
        Some(state.stage_index.min(last))
    }

    pub fn current_stage(&self, state: &PathState) -> Option<&StageConfig> {
        self.clamped_stage_index(state).map(|idx| &self.stages[idx])
    }

    /// Template ids of every stage up to and including the current one
    pub fn unlocked_template_ids(&self, state: &PathState) -> Vec<String> {
        match self.clamped_stage_index(state) {
            Some(max_idx) => self.template_ids_in(0, max_idx),
            None => Vec::new(),
        }
    }

    /// Template ids of the last `stage_window` unlocked stages
    pub fn recent_template_ids(&self, state: &PathState, stage_window: usize) -> Vec<String> {
        match self.clamped_stage_index(state) {
            Some(max_idx) => {
                let min_idx = (max_idx + 1).saturating_sub(stage_window.max(1));
                self.template_ids_in(min_idx, max_idx)
            }
            None => Vec::new(),
        }
    }

    fn template_ids_in(&self, min_idx: usize, max_idx: usize) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for stage in &self.stages[min_idx..=max_idx] {
            for tid in &stage.template_ids {
                if !out.contains(tid) {
                    out.push(tid.clone());
                }
            }
        }
        out
    }

    /// Templates taught today from `stage`, honoring its sub-phase override
    pub fn stage_current_template_ids(&self, stage: &StageConfig, days_in_stage: i64) -> Vec<String> {
        let all = stage.template_ids.clone();
        let Some(overrides) = self.stage_overrides.get(&stage.id) else {
            return all;
        };
        let intro: Vec<String> = overrides
            .intro_template_ids
            .iter()
            .filter(|tid| all.contains(tid))
            .cloned()
            .collect();
        let unlock_day = overrides.subphase_unlock_day.max(1);
        if !intro.is_empty() && unlock_day > 1 && days_in_stage < unlock_day {
            intro
        } else {
            all
        }
    }

    pub fn confusion_trigger(&self) -> u32 {
        self.confusion_pair_trigger_errors.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn three_stages() -> CurriculumConfig {
        serde_json::from_str(
            r#"{"stages":[
                {"id":"s1","template_ids":["plain_negative","plain_past"]},
                {"id":"s2","template_ids":["plain_past","polite_dictionary"]},
                {"id":"s3","template_ids":["plain_te_form","plain_te_iru","plain_te_oku"]}
            ],
            "stage_overrides":{"s3":{"intro_template_ids":["plain_te_form","bogus"],"subphase_unlock_day":3}}}"#,
        )
        .unwrap()
    }

    fn at_stage(idx: usize) -> PathState {
        let mut state = PathState::new(Utc::now());
        state.stage_index = idx;
        state
    }

    #[test]
    fn test_defaults_fill_partial_config() {
        let config: CurriculumConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.windows.intro_days, 2);
        assert_eq!(config.windows.counts_mid_course, BucketCounts::new(2, 0, 5, 3));
        assert_eq!(config.gates.stabilization_days_on_stall, 2);
        assert_eq!(config.confusion_trigger(), 2);
        assert!(config.irregular_policy.is_none());

        let policy: IrregularPolicy = serde_json::from_str(r#"{"min_per_session":3}"#).unwrap();
        assert!(policy.enabled);
        assert_eq!(policy.primary_kana, vec!["する", "くる"]);
    }

    #[test]
    fn test_unlocked_and_recent_ids() {
        let config = three_stages();
        assert_eq!(
            config.unlocked_template_ids(&at_stage(1)),
            vec!["plain_negative", "plain_past", "polite_dictionary"]
        );
        assert_eq!(
            config.recent_template_ids(&at_stage(2), 1),
            vec!["plain_te_form", "plain_te_iru", "plain_te_oku"]
        );
        // Index past the end clamps to the final stage
        assert_eq!(config.current_stage(&at_stage(9)).map(|s| s.id.as_str()), Some("s3"));
    }

    #[test]
    fn test_subphase_intro_templates() {
        let config = three_stages();
        let stage = &config.stages[2];
        assert_eq!(config.stage_current_template_ids(stage, 1), vec!["plain_te_form"]);
        assert_eq!(config.stage_current_template_ids(stage, 3).len(), 3);
        assert_eq!(config.stage_current_template_ids(&config.stages[0], 1).len(), 2);
    }

    #[test]
    fn test_band_merge() {
        let base = GateProfile {
            min_accuracy: 0.8,
            min_accuracy_by_class: BTreeMap::from([("godan".to_string(), 0.7)]),
            ..GateProfile::default()
        };
        let band: GateBand = serde_json::from_str(
            r#"{"id":"late","min_stage":3,"overrides":{"min_answered":30,"min_accuracy_by_class":{"ichidan":0.75}}}"#,
        )
        .unwrap();
        assert_eq!(band.range(), (3, 3));
        assert!(band.contains(3) && !band.contains(4));

        let merged = base.merged(&band.gates);
        assert_eq!(merged.min_answered, 30);
        assert_eq!(merged.min_accuracy, 0.8);
        assert_eq!(merged.min_accuracy_by_class.len(), 2);
    }
}
