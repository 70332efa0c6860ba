//! End-to-end lesson flow: catalog parsing, lesson building, reviews and gates.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use katsuyo_algo::catalog::unseen_pairs;
use katsuyo_algo::curriculum::{
    build_lesson_queue, evaluate_path_advance, CurriculumConfig, GateFailure, GateReason, LessonRequest, PathState,
    PathType,
};
use katsuyo_algo::{apply_review_result, conjugate_item, grade_answer, Card, Catalog, Review, VerbClass};

const VERBS: &str = r#"{"id":"kaku","kana":"かく","kanji":"書く","verb_class":"godan","gloss_en":["to write"]}
{"id":"yomu","kana":"よむ","kanji":"読む","verb_class":"godan","gloss_en":["to read"]}
{"id":"hanasu","kana":"はなす","kanji":"話す","verb_class":"godan","gloss_en":["to speak"]}
{"id":"iku","kana":"いく","kanji":"行く","verb_class":"godan","gloss_en":["to go"]}

{"id":"taberu","kana":"たべる","kanji":"食べる","verb_class":"ichidan","gloss_en":["to eat"]}
{"id":"miru","kana":"みる","kanji":"見る","verb_class":"ichidan","gloss_en":["to see"]}
{"id":"suru","kana":"する","verb_class":"irregular","gloss_en":["to do"]}
{"id":"kuru","kana":"くる","kanji":"来る","verb_class":"irregular","gloss_en":["to come"]}
"#;

const TEMPLATES: &str = r#"[
  {"id":"plain_dictionary","label":"Dictionary"},
  {"id":"plain_negative","label":"Negative"},
  {"id":"plain_past","label":"Past"},
  {"id":"plain_te_form","label":"Te-form"},
  {"id":"plain_te_iru","label":"Progressive"}
]"#;

const EXCEPTIONS: &str = r#"{"special_cases":{"te_form":{"いく":"いって"},"plain_past":{"いく":"いった"}}}"#;

const CURRICULUM: &str = r#"{
  "stages": [
    {"id": "s1", "template_ids": ["plain_negative", "plain_past"]},
    {"id": "s2", "template_ids": ["plain_te_form", "plain_te_iru"]}
  ],
  "gates": {"min_answered": 10, "min_accuracy": 0.8, "hold_days_on_fail": 2},
  "irregular_policy": {}
}"#;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 2, 7, 30, 0).unwrap()
}

fn catalog() -> Catalog {
    Catalog::from_sources(VERBS, TEMPLATES, EXCEPTIONS).unwrap()
}

fn config() -> CurriculumConfig {
    serde_json::from_str(CURRICULUM).unwrap()
}

/// Answer every (verb, template) of `templates` `rounds` times
fn practice(
    catalog: &Catalog,
    templates: &[&str],
    rounds: usize,
    correct: bool,
    at: DateTime<Utc>,
) -> HashMap<String, Card> {
    let mut cards = HashMap::new();
    for verb in catalog.verbs() {
        for tpl in templates {
            let mut card = Card::new(&verb.id, tpl, at);
            for _ in 0..rounds {
                let review = Review {
                    correct,
                    hint_used: false,
                    now: at,
                };
                card = apply_review_result(&card, review).card;
            }
            cards.insert(card.card_id.clone(), card);
        }
    }
    cards
}

#[test]
fn lesson_queue_respects_quota_and_uniqueness() {
    let catalog = catalog();
    let config = config();
    let state = PathState::new(now());
    let cards = HashMap::new();
    let unlocked = config.unlocked_template_ids(&state);
    let unseen = unseen_pairs(&catalog, &cards, &unlocked);
    assert_eq!(unseen.len(), 16);

    let mistakes = HashMap::new();
    let request = LessonRequest {
        path_type: PathType::Guided,
        config: &config,
        state: &state,
        catalog: &catalog,
        cards: &cards,
        unseen: &unseen,
        mistake_counts: &mistakes,
        gate_failures: &[],
        daily_count: 6,
        now: now(),
    };

    for seed in 0..20 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let plan = build_lesson_queue(&request, &mut rng);
        assert_eq!(plan.queue.len(), 6);
        assert_eq!(plan.path_state_patch.lesson_session_count, 1);

        let pairs: HashSet<(&str, &str)> = plan
            .queue
            .iter()
            .map(|item| (item.verb_id.as_str(), item.template_id.as_str()))
            .collect();
        assert_eq!(pairs.len(), plan.queue.len());
        assert!(plan.queue.iter().all(|item| unlocked.contains(&item.template_id)));

        let irregular: Vec<&str> = plan
            .queue
            .iter()
            .filter(|item| catalog.verb(&item.verb_id).map(|v| v.verb_class) == Some(VerbClass::Irregular))
            .map(|item| item.verb_id.as_str())
            .collect();
        assert!(irregular.len() >= 2, "seed {seed}: {:?}", plan.queue);
        assert!(irregular.contains(&"suru"), "seed {seed}: {:?}", plan.queue);
        assert!(irregular.contains(&"kuru"), "seed {seed}: {:?}", plan.queue);

        assert!(plan.details.irregular_policy.enabled);
        assert_eq!(plan.details.current_stage_id.as_deref(), Some("s1"));
        assert_eq!(plan.details.bucket_counts.values().sum::<usize>(), 6);
    }
}

#[test]
fn lesson_queue_always_holds_suru_and_kuru() {
    let catalog = catalog();
    let config = config();
    let state = PathState::new(now());
    let cards = HashMap::new();
    let unseen = unseen_pairs(&catalog, &cards, &config.unlocked_template_ids(&state));
    let mistakes = HashMap::new();

    for daily_count in [4, 6, 10] {
        let request = LessonRequest {
            path_type: PathType::Guided,
            config: &config,
            state: &state,
            catalog: &catalog,
            cards: &cards,
            unseen: &unseen,
            mistake_counts: &mistakes,
            gate_failures: &[],
            daily_count,
            now: now(),
        };
        for seed in 0..200 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let plan = build_lesson_queue(&request, &mut rng);
            assert!(plan.queue.len() <= daily_count);
            for verb_id in ["suru", "kuru"] {
                assert!(
                    plan.queue.iter().any(|item| item.verb_id == verb_id),
                    "daily {daily_count} seed {seed}: {verb_id} missing from {:?}",
                    plan.queue
                );
            }
        }
    }
}

#[test]
fn passing_gate_advances_to_next_stage() {
    let catalog = catalog();
    let config = config();
    let state = PathState::new(now() - Duration::days(3));
    let cards = practice(&catalog, &["plain_negative", "plain_past"], 2, true, now());

    let result = evaluate_path_advance(&config, &state, &cards, &catalog, now());
    assert!(result.gate.passed);
    assert!(result.advanced);
    assert_eq!(result.gate.reason, GateReason::Passed);
    assert_eq!(result.gate.answered, 32);
    assert_eq!(result.path_state.stage_index, 1);
    assert_eq!(result.path_state.stage_started_at, Some(now()));
}

#[test]
fn failing_gate_holds_then_releases() {
    let catalog = catalog();
    let config = config();
    let state = PathState::new(now() - Duration::days(3));
    let cards = practice(&catalog, &["plain_negative", "plain_past"], 1, false, now());

    let failed = evaluate_path_advance(&config, &state, &cards, &catalog, now());
    assert!(!failed.gate.passed);
    assert_eq!(failed.gate.failed_reasons, vec![GateFailure::MinAccuracy]);
    assert_eq!(failed.path_state.failed_gate_count, 1);
    assert_eq!(failed.path_state.hold_until, Some(now() + Duration::days(2)));

    let held = evaluate_path_advance(&config, &failed.path_state, &cards, &catalog, now() + Duration::days(1));
    assert_eq!(held.gate.reason, GateReason::Failed(GateFailure::HoldActive));
    let json = serde_json::to_value(&held.gate).unwrap();
    assert_eq!(json["reason"], "hold_active");

    let recovered = practice(&catalog, &["plain_negative", "plain_past"], 3, true, now());
    let released = evaluate_path_advance(
        &config,
        &held.path_state,
        &recovered,
        &catalog,
        now() + Duration::days(2),
    );
    assert!(released.gate.passed);
    assert_eq!(released.path_state.hold_until, None);
    assert_eq!(released.path_state.failed_gate_count, 0);
}

#[test]
fn iku_uses_exception_forms_through_catalog() {
    let catalog = catalog();
    assert_eq!(conjugate_item(&catalog, "iku", "plain_te_form").unwrap(), "いって");
    assert_eq!(conjugate_item(&catalog, "iku", "plain_te_iru").unwrap(), "いっている");
    assert!(conjugate_item(&catalog, "nope", "plain_past").is_err());

    let verb = catalog.verb("iku").unwrap();
    let grade = grade_answer(verb, "plain_past", catalog.exceptions(), "itta").unwrap();
    assert!(grade.correct);
    assert_eq!(grade.expected, "いった");
}
