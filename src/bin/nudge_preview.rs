use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clientbase::config::load_or_default;
use clientbase::nudges::{generate_nudges, selection_threshold, NudgeSelector, QuestionContext};
use clientbase::profiles::{default_registry, profile_completeness, score_empty_fields};
use clientbase::CustomerProfile;
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse()?;
    let data = fs::read(&args.snapshot)
        .with_context(|| format!("Failed to read snapshot {}", args.snapshot.display()))?;
    let profile: CustomerProfile = serde_json::from_slice(&data)
        .with_context(|| format!("Failed parsing snapshot {}", args.snapshot.display()))?;

    let mut settings = load_or_default()?.enrichment;
    if let Some(max_questions) = args.max_questions {
        settings.max_questions = max_questions;
    }

    let registry = default_registry();
    let scored = score_empty_fields(&profile, registry.sections());
    let selected =
        NudgeSelector::from_settings(&settings).select(&scored, &args.extracted, &registry);
    let context = QuestionContext::for_profile(&profile, registry.sections());
    let questions = generate_nudges(None, &selected, &context, &registry).await;
    info!(
        customer = %profile.id,
        empty = scored.len(),
        selected = selected.len(),
        "prepared nudge preview"
    );

    let report = json!({
        "customerId": &profile.id,
        "completeness": profile_completeness(&profile, registry.sections()),
        "emptyFields": scored.len(),
        "threshold": selection_threshold(&selected),
        "selected": selected,
        "questions": questions,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

struct CliArgs {
    snapshot: PathBuf,
    max_questions: Option<usize>,
    extracted: HashSet<String>,
}

impl CliArgs {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let mut snapshot = None;
        let mut max_questions = None;
        let mut extracted = HashSet::new();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--max-questions" => {
                    let value = args
                        .next()
                        .context("Expected a number after --max-questions")?;
                    let parsed = value
                        .parse()
                        .with_context(|| format!("Invalid --max-questions value '{value}'"))?;
                    max_questions = Some(parsed);
                }
                "--extracted" => {
                    let value = args
                        .next()
                        .context("Expected comma-separated field keys after --extracted")?;
                    extracted.extend(
                        value
                            .split(',')
                            .map(str::trim)
                            .filter(|key| !key.is_empty())
                            .map(str::to_string),
                    );
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                other if other.starts_with("--") => {
                    return Err(anyhow!(
                        "Unknown argument '{other}'. Run with --help for usage instructions."
                    ));
                }
                path => snapshot = Some(PathBuf::from(path)),
            }
        }
        let snapshot = snapshot
            .ok_or_else(|| anyhow!("Missing customer snapshot path. Run with --help for usage."))?;
        Ok(Self {
            snapshot,
            max_questions,
            extracted,
        })
    }
}

fn print_usage() {
    println!("ClientBase nudge preview");
    println!("Scores a customer snapshot and prints the follow-up questions it would get.");
    println!("Usage: cargo run --bin nudge_preview -- <snapshot.json> [options]");
    println!("Options:");
    println!("  --max-questions <n>     Override the configured question cap");
    println!("  --extracted <a,b,...>   Field keys the latest extraction already filled");
}
