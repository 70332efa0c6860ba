//! Subcommand bodies. Each returns a serializable report; `main` prints it.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context as _, Result};
use chrono::{DateTime, Utc};
use katsuyo_algo::catalog::unseen_pairs;
use katsuyo_algo::curriculum::{
    build_lesson_queue, evaluate_path_advance, GateEvaluation, GateFailure, LessonPlan, LessonRequest, PathType,
};
use katsuyo_algo::{
    apply_review_result, build_daily_review_queue, build_weakness_queue, conjugate, grade_answer, split_card_id,
    Card, Catalog, Grade, Review, Verb,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::data;

/// Settings shared by every subcommand after env and flags are merged
#[derive(Debug, Clone)]
pub struct Context {
    pub data_dir: PathBuf,
    pub daily_count: usize,
    pub seed: Option<u64>,
    pub now: DateTime<Utc>,
}

impl Context {
    pub fn rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }
}

/// Verb by id, falling back to the first verb with matching kana
fn find_verb<'c>(catalog: &'c Catalog, key: &str) -> Result<&'c Verb> {
    if let Some(verb) = catalog.verb(key) {
        return Ok(verb);
    }
    catalog
        .verb_ids_by_kana(key)
        .first()
        .and_then(|id| catalog.verb(id))
        .ok_or_else(|| anyhow!("unknown verb: {key}"))
}

// ==================== conjugate ====================

#[derive(Debug, Serialize)]
pub struct FormReport {
    pub template_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConjugateReport {
    pub verb_id: String,
    pub kana: String,
    pub forms: Vec<FormReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<Grade>,
}

pub fn conjugate_verb(
    ctx: &Context,
    verb_key: &str,
    template_ids: &[String],
    answer: Option<&str>,
) -> Result<ConjugateReport> {
    let catalog = data::load_catalog(&ctx.data_dir)?;
    let verb = find_verb(&catalog, verb_key)?;

    let template_ids: Vec<String> = if template_ids.is_empty() {
        catalog
            .eligible_template_ids()
            .into_iter()
            .map(str::to_string)
            .collect()
    } else {
        template_ids.to_vec()
    };

    let grade = match answer {
        Some(answer) => {
            let [template_id] = template_ids.as_slice() else {
                bail!("--answer needs exactly one --template");
            };
            Some(grade_answer(verb, template_id, catalog.exceptions(), answer)?)
        }
        None => None,
    };

    let forms = template_ids
        .into_iter()
        .map(|template_id| match conjugate(verb, &template_id, catalog.exceptions()) {
            Ok(form) => FormReport {
                template_id,
                form: Some(form),
                error: None,
            },
            Err(err) => FormReport {
                template_id,
                form: None,
                error: Some(err.to_string()),
            },
        })
        .collect();

    Ok(ConjugateReport {
        verb_id: verb.id.clone(),
        kana: verb.kana.clone(),
        forms,
        grade,
    })
}

// ==================== lesson ====================

#[derive(Debug, Clone, Default)]
pub struct ProgressFiles {
    pub state: Option<PathBuf>,
    pub cards: Option<PathBuf>,
    pub mistakes: Option<PathBuf>,
}

fn parse_gate_failures(raw: &[String]) -> Result<Vec<GateFailure>> {
    raw.iter()
        .map(|reason| GateFailure::parse(reason).ok_or_else(|| anyhow!("unknown gate failure reason: {reason}")))
        .collect()
}

/// Build today's lesson. With `save`, the session bookkeeping is written back
/// to the state file.
pub fn lesson(
    ctx: &Context,
    path_type: PathType,
    files: &ProgressFiles,
    gate_failures: &[String],
    save: bool,
) -> Result<LessonPlan> {
    let catalog = data::load_catalog(&ctx.data_dir)?;
    let config = data::load_curriculum(&ctx.data_dir, path_type)?;
    let state = data::load_path_state(files.state.as_deref(), ctx.now)?;
    let cards = data::load_cards(files.cards.as_deref())?;
    let mistakes = data::load_mistake_counts(files.mistakes.as_deref())?;
    let gate_failures = parse_gate_failures(gate_failures)?;

    let unseen = unseen_pairs(&catalog, &cards, &config.unlocked_template_ids(&state));
    let request = LessonRequest {
        path_type,
        config: &config,
        state: &state,
        catalog: &catalog,
        cards: &cards,
        unseen: &unseen,
        mistake_counts: &mistakes,
        gate_failures: &gate_failures,
        daily_count: ctx.daily_count,
        now: ctx.now,
    };
    let plan = build_lesson_queue(&request, &mut ctx.rng());

    if save {
        let path = files
            .state
            .as_deref()
            .context("--save needs a --state file")?;
        let mut next = state.normalized(ctx.now);
        plan.path_state_patch.apply(&mut next);
        data::write_json(path, &next)?;
        tracing::info!(path = %path.display(), session = next.lesson_session_count, "path state saved");
    }
    Ok(plan)
}

// ==================== gate ====================

pub fn gate(ctx: &Context, path_type: PathType, files: &ProgressFiles, save: bool) -> Result<GateEvaluation> {
    let catalog = data::load_catalog(&ctx.data_dir)?;
    let config = data::load_curriculum(&ctx.data_dir, path_type)?;
    let state = data::load_path_state(files.state.as_deref(), ctx.now)?;
    let cards = data::load_cards(files.cards.as_deref())?;

    let evaluation = evaluate_path_advance(&config, &state, &cards, &catalog, ctx.now);
    if save {
        let path = files
            .state
            .as_deref()
            .context("--save needs a --state file")?;
        data::write_json(path, &evaluation.path_state)?;
    }
    Ok(evaluation)
}

// ==================== review ====================

#[derive(Debug, Serialize)]
pub struct ReviewQueues {
    pub due: Vec<Card>,
    pub weakness: Vec<Card>,
}

#[derive(Debug, Serialize)]
pub struct ReviewReport {
    pub card: Card,
    pub requeue_offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<Grade>,
}

/// How a single review was answered
#[derive(Debug, Clone)]
pub enum ReviewAnswer {
    /// Self-graded result
    Marked(bool),
    /// Typed answer, graded against the catalog
    Typed(String),
}

pub fn review_queues(ctx: &Context, cards_file: &Path) -> Result<ReviewQueues> {
    let cards = data::load_cards(Some(cards_file))?;
    let due = build_daily_review_queue(cards.values(), ctx.now)
        .into_iter()
        .cloned()
        .collect();
    let weakness = build_weakness_queue(cards.values(), ctx.daily_count)
        .into_iter()
        .cloned()
        .collect();
    Ok(ReviewQueues { due, weakness })
}

/// Apply one answer to `card_id` and write the card file back. Unknown ids
/// start as fresh LEARNING cards.
pub fn review_card(
    ctx: &Context,
    cards_file: &Path,
    card_id: &str,
    answer: ReviewAnswer,
    hint_used: bool,
) -> Result<ReviewReport> {
    let (verb_id, template_id) =
        split_card_id(card_id).ok_or_else(|| anyhow!("card id must look like verb::template, got {card_id}"))?;
    let mut cards = data::load_cards(Some(cards_file))?;

    let (correct, grade) = match answer {
        ReviewAnswer::Marked(correct) => (correct, None),
        ReviewAnswer::Typed(text) => {
            let catalog = data::load_catalog(&ctx.data_dir)?;
            let verb = catalog
                .verb(verb_id)
                .ok_or_else(|| anyhow!("unknown verb: {verb_id}"))?;
            let grade = grade_answer(verb, template_id, catalog.exceptions(), &text)?;
            (grade.correct, Some(grade))
        }
    };

    let card = cards
        .get(card_id)
        .cloned()
        .unwrap_or_else(|| Card::new(verb_id, template_id, ctx.now));
    let outcome = apply_review_result(
        &card,
        Review {
            correct,
            hint_used,
            now: ctx.now,
        },
    );
    cards.insert(outcome.card.card_id.clone(), outcome.card.clone());
    data::write_cards(cards_file, &cards)?;

    Ok(ReviewReport {
        card: outcome.card,
        requeue_offset: outcome.requeue_offset,
        grade,
    })
}
