//! Per-track progress record, owned and persisted by the host.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathState {
    #[serde(default, deserialize_with = "non_negative")]
    pub stage_index: usize,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub stage_started_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "non_negative")]
    pub failed_gate_count: u32,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub hold_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, deserialize_with = "non_negative")]
    pub lesson_session_count: u32,
    #[serde(default, deserialize_with = "non_negative")]
    pub last_iku_session: u32,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub stabilization_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub relaxed_accuracy_mode: bool,
}

impl PathState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            stage_index: 0,
            stage_started_at: Some(now),
            failed_gate_count: 0,
            hold_until: None,
            completed: false,
            lesson_session_count: 0,
            last_iku_session: 0,
            stabilization_until: None,
            relaxed_accuracy_mode: false,
        }
    }

    /// Copy with a missing stage start filled in as `now`
    pub fn normalized(&self, now: DateTime<Utc>) -> Self {
        let mut out = self.clone();
        out.stage_started_at.get_or_insert(now);
        out
    }

    /// Inclusive day count: the day the stage started is day 1
    pub fn days_in_stage(&self, now: DateTime<Utc>) -> i64 {
        let start = self.stage_started_at.unwrap_or(now);
        let elapsed = (now - start).max(Duration::zero());
        elapsed.num_days() + 1
    }

    pub fn hold_active(&self, now: DateTime<Utc>) -> bool {
        self.hold_until.is_some_and(|until| now < until)
    }

    pub fn stabilization_active(&self, now: DateTime<Utc>) -> bool {
        self.stabilization_until.is_some_and(|until| now < until)
    }
}

/// Session bookkeeping produced by lesson building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStatePatch {
    pub lesson_session_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_iku_session: Option<u32>,
}

impl PathStatePatch {
    pub fn apply(&self, state: &mut PathState) {
        state.lesson_session_count = self.lesson_session_count;
        if let Some(session) = self.last_iku_session {
            state.last_iku_session = session;
        }
    }
}

/// Unparseable timestamps read as absent
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| match DateTime::parse_from_rfc3339(&s) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(_) => {
            tracing::warn!(value = %s, "ignoring malformed path-state timestamp");
            None
        }
    }))
}

/// Negative counters read as zero
fn non_negative<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64> + Default,
{
    let raw: Option<i64> = Option::deserialize(deserializer)?;
    Ok(raw
        .and_then(|n| T::try_from(n.max(0)).ok())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_days_in_stage_is_inclusive() {
        let mut state = PathState::new(now());
        assert_eq!(state.days_in_stage(now()), 1);
        state.stage_started_at = Some(now() - Duration::hours(47));
        assert_eq!(state.days_in_stage(now()), 2);
        state.stage_started_at = Some(now() - Duration::days(3));
        assert_eq!(state.days_in_stage(now()), 4);
        state.stage_started_at = Some(now() + Duration::days(3));
        assert_eq!(state.days_in_stage(now()), 1);
        state.stage_started_at = None;
        assert_eq!(state.days_in_stage(now()), 1);
    }

    #[test]
    fn test_lenient_deserialize() {
        let raw = r#"{"stage_index":-2,"failed_gate_count":3,"hold_until":"not a date",
            "stabilization_until":"2024-04-12T00:00:00Z","lesson_session_count":null}"#;
        let state: PathState = serde_json::from_str(raw).unwrap();
        assert_eq!(state.stage_index, 0);
        assert_eq!(state.failed_gate_count, 3);
        assert_eq!(state.hold_until, None);
        assert!(state.stabilization_active(now()));
        assert_eq!(state.lesson_session_count, 0);
        assert_eq!(state.stage_started_at, None);
        assert_eq!(state.normalized(now()).stage_started_at, Some(now()));
    }

    #[test]
    fn test_patch_apply() {
        let mut state = PathState::new(now());
        state.last_iku_session = 2;
        PathStatePatch {
            lesson_session_count: 5,
            last_iku_session: None,
        }
        .apply(&mut state);
        assert_eq!((state.lesson_session_count, state.last_iku_session), (5, 2));
        PathStatePatch {
            lesson_session_count: 6,
            last_iku_session: Some(6),
        }
        .apply(&mut state);
        assert_eq!(state.last_iku_session, 6);
    }
}
