use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use katsuyo_algo::curriculum::PathType;
use serde::Serialize;

use katsuyo_cli::commands::{self, Context, ProgressFiles, ReviewAnswer};
use katsuyo_cli::config::Config;
use katsuyo_cli::logging;

#[derive(Parser)]
#[command(name = "katsuyo", about = "Japanese verb conjugation drills", version)]
struct Cli {
    /// Data directory (overrides KATSUYO_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Items per lesson (overrides KATSUYO_DAILY_COUNT)
    #[arg(long, global = true)]
    daily_count: Option<usize>,

    /// Seed for reproducible queues (overrides KATSUYO_SEED)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Evaluate as of this RFC 3339 timestamp instead of the current time
    #[arg(long, global = true, value_parser = parse_now)]
    now: Option<DateTime<Utc>>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Also write daily log files here (overrides KATSUYO_LOG_DIR)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ProgressArgs {
    /// Curriculum track
    #[arg(long, default_value = "guided", value_parser = parse_path_type)]
    path: PathType,
    /// Path state JSON file
    #[arg(long)]
    state: Option<PathBuf>,
    /// Card list JSON file
    #[arg(long)]
    cards: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Conjugate a verb (by id or kana)
    Conjugate {
        verb: String,
        /// Template ids; all study templates when omitted
        #[arg(long = "template")]
        templates: Vec<String>,
        /// Grade this answer against the single given template
        #[arg(long)]
        answer: Option<String>,
    },

    /// Build today's lesson queue
    Lesson {
        #[command(flatten)]
        progress: ProgressArgs,
        /// Mistake counts JSON file (template id -> count)
        #[arg(long)]
        mistakes: Option<PathBuf>,
        /// Failure reasons from the last gate run
        #[arg(long = "gate-failure")]
        gate_failures: Vec<String>,
        /// Write the session bookkeeping back to --state
        #[arg(long)]
        save: bool,
    },

    /// Evaluate the current stage gate
    Gate {
        #[command(flatten)]
        progress: ProgressArgs,
        /// Write the resulting path state back to --state
        #[arg(long)]
        save: bool,
    },

    /// Show review queues, or record one review
    Review {
        /// Card list JSON file
        #[arg(long)]
        cards: PathBuf,
        /// Card to review (verb::template)
        #[arg(long)]
        card: Option<String>,
        /// Self-graded result
        #[arg(long, conflicts_with = "answer")]
        correct: Option<bool>,
        /// Typed answer, graded against the catalog
        #[arg(long)]
        answer: Option<String>,
        /// A hint was shown
        #[arg(long)]
        hint: bool,
    },
}

fn parse_path_type(raw: &str) -> Result<PathType, String> {
    PathType::parse(raw).ok_or_else(|| format!("unknown track '{raw}' (guided, textbook, custom)"))
}

fn parse_now(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| err.to_string())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let cli = Cli::parse();

    let directive = logging::filter_directive(&config.log_level, cli.verbose);
    let log_dir = cli.log_dir.or(config.log_dir);
    let _log_guard = logging::init_tracing(&directive, log_dir.as_deref());

    let ctx = Context {
        data_dir: cli.data_dir.unwrap_or(config.data_dir),
        daily_count: cli.daily_count.unwrap_or(config.daily_count).max(1),
        seed: cli.seed.or(config.seed),
        now: cli.now.unwrap_or_else(Utc::now),
    };
    tracing::debug!(data_dir = %ctx.data_dir.display(), daily_count = ctx.daily_count, seed = ?ctx.seed, "katsuyo starting");

    match cli.command {
        Command::Conjugate {
            verb,
            templates,
            answer,
        } => print_json(&commands::conjugate_verb(&ctx, &verb, &templates, answer.as_deref())?),
        Command::Lesson {
            progress,
            mistakes,
            gate_failures,
            save,
        } => {
            let files = ProgressFiles {
                state: progress.state,
                cards: progress.cards,
                mistakes,
            };
            print_json(&commands::lesson(&ctx, progress.path, &files, &gate_failures, save)?)
        }
        Command::Gate { progress, save } => {
            let files = ProgressFiles {
                state: progress.state,
                cards: progress.cards,
                mistakes: None,
            };
            print_json(&commands::gate(&ctx, progress.path, &files, save)?)
        }
        Command::Review {
            cards,
            card: None,
            ..
        } => print_json(&commands::review_queues(&ctx, &cards)?),
        Command::Review {
            cards,
            card: Some(card_id),
            correct,
            answer,
            hint,
        } => {
            let answer = match (answer, correct) {
                (Some(text), _) => ReviewAnswer::Typed(text),
                (None, Some(correct)) => ReviewAnswer::Marked(correct),
                (None, None) => anyhow::bail!("--card needs --correct or --answer"),
            };
            print_json(&commands::review_card(&ctx, &cards, &card_id, answer, hint)?)
        }
    }
}
