use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tally_core::types::Feedback;
use tally_engine::{Categorizer, EngineConfig};
use tally_ingest::parse_labeled_csv;

mod state;

#[derive(Parser, Debug)]
#[command(name = "tally", version, about = "Adaptive transaction categorization CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Suggest categories for a transaction description
    Suggest {
        /// Free-text transaction description
        description: String,

        #[arg(long, default_value_t = 0.0)]
        amount: f64,

        /// Merchant name, if known
        #[arg(long, default_value = "")]
        merchant: String,

        /// Maximum number of suggestions
        #[arg(long, default_value_t = 3)]
        limit: usize,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Record user feedback for a categorized transaction
    Feedback {
        description: String,

        #[arg(long, default_value_t = 0.0)]
        amount: f64,

        #[arg(long)]
        merchant: Option<String>,

        /// The category the user settled on
        #[arg(long)]
        category: String,

        /// Mark the suggestion as rejected instead of confirmed
        #[arg(long)]
        incorrect: bool,

        #[arg(long, default_value = "local")]
        user: String,
    },

    /// Induce new rules from the accumulated training corpus
    Induce,

    /// Evaluate classifier accuracy on recent feedback
    Evaluate {
        /// Held-out slice size (capped at 100)
        #[arg(long, default_value_t = 50)]
        size: usize,
    },

    /// Seed the training corpus from a labeled CSV export
    Import {
        #[arg(long)]
        csv: PathBuf,
    },

    /// Show store counters
    Stats,

    /// Update the engine profile (~/.tally/config.json)
    Config {
        /// IANA timezone used for time-of-day bucketing
        #[arg(long)]
        timezone: Option<String>,

        /// Rolling-window cap on the training corpus
        #[arg(long)]
        max_examples: Option<usize>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let engine = open_engine()?;

    match cli.command {
        Command::Suggest { description, amount, merchant, limit, json } => {
            if limit == 0 {
                bail!("--limit must be greater than 0");
            }
            let suggestions = engine.suggest_categories(&description, amount, &merchant, limit);

            if json {
                println!("{}", serde_json::to_string_pretty(&suggestions)?);
            } else if suggestions.is_empty() {
                println!("No suggestions.");
            } else {
                for s in &suggestions {
                    println!(
                        "{} {} ({:.0}%) — {}",
                        s.icon,
                        s.category_name,
                        s.confidence * 100.0,
                        s.reason
                    );
                }
            }
        }

        Command::Feedback { description, amount, merchant, category, incorrect, user } => {
            engine.submit_feedback(Feedback {
                description,
                amount,
                merchant,
                category_id: category.clone(),
                is_correct: !incorrect,
                user_id: user,
                timestamp: Utc::now(),
            });
            println!(
                "Recorded {} feedback for category {category}",
                if incorrect { "rejection" } else { "confirmation" }
            );
        }

        Command::Induce => {
            let added = engine.induce_rules();
            if added == 0 {
                println!("No new rules (corpus too small or patterns already covered).");
            } else {
                println!("Induced {added} new rule(s).");
            }
        }

        Command::Evaluate { size } => {
            let report = engine.evaluate_accuracy(size);
            if report.total_test_cases == 0 {
                println!("Training corpus is empty; nothing to evaluate.");
            } else {
                println!(
                    "Overall: {:.1}% over {} test cases\n",
                    report.overall_accuracy * 100.0,
                    report.total_test_cases
                );
                for (category, acc) in &report.per_category {
                    println!(
                        "  {category}: {:.1}% ({}/{})",
                        acc.accuracy * 100.0,
                        acc.correct,
                        acc.total
                    );
                }
            }
        }

        Command::Import { csv } => {
            if !csv.exists() {
                bail!("CSV not found: {} (pass --csv <path>)", csv.display());
            }
            let rows = parse_labeled_csv(&csv)
                .with_context(|| format!("parsing {}", csv.display()))?;

            let imported = rows.len();
            for row in rows {
                let timestamp = row
                    .date
                    .and_hms_opt(12, 0, 0)
                    .map(|ndt| ndt.and_utc())
                    .unwrap_or_else(Utc::now);
                engine.submit_feedback(Feedback {
                    description: row.description,
                    amount: row.amount,
                    merchant: row.merchant,
                    category_id: row.category_id,
                    is_correct: true,
                    user_id: "import".to_string(),
                    timestamp,
                });
            }
            println!("Imported {imported} labeled transactions from {}", csv.display());
        }

        Command::Stats => {
            let stats = engine.stats();
            println!("Rules:     {} ({} active)", stats.total_rules, stats.active_rules);
            println!("Merchants: {}", stats.merchant_mappings);
            println!("Corpus:    {} examples", stats.corpus_size);
        }

        Command::Config { timezone, max_examples } => {
            let mut profile = state::read_profile().unwrap_or_default();
            if let Some(tz) = timezone {
                profile.timezone = tz;
            }
            if let Some(cap) = max_examples {
                if cap == 0 {
                    bail!("--max-examples must be greater than 0");
                }
                profile.max_examples = cap;
            }
            state::write_profile(&profile)?;
            println!(
                "Profile updated: timezone={}, max_examples={}",
                profile.timezone, profile.max_examples
            );
        }
    }

    Ok(())
}

fn open_engine() -> Result<Categorizer> {
    let home = state::ensure_tally_home()?;
    let profile = state::read_profile().unwrap_or_default();

    Ok(Categorizer::open(EngineConfig {
        data_dir: home.join("data"),
        timezone: profile.timezone,
        max_examples: profile.max_examples,
    }))
}
