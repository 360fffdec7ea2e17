use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{ArgGroup, Parser};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use healthvision_client::{load_insights, ApiClient};
use healthvision_core::{ChartDatum, DatasetInsights, InsightsConfig, LoadState, RowPolicy};
use healthvision_csv::aggregate_csv_reader;

/// Prefix for configuration overrides taken from the environment.
const ENV_PREFIX: &str = "HEALTHVISION_";

#[derive(Parser, Debug)]
#[command(
    name = "healthvision-cli",
    about = "Summarise a patient CSV dataset into dashboard distributions."
)]
#[command(group(ArgGroup::new("source").required(true).args(["input", "url"])))]
struct Args {
    /// Path to a CSV file.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Dataset URL, or a path relative to the backend base URL.
    #[arg(short, long)]
    url: Option<String>,

    /// TOML file with column names, delimiter and row policy.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip rows whose visit count or follow-up flag is not numeric.
    #[arg(long)]
    strict: bool,

    /// Print the load state as JSON instead of a text summary.
    #[arg(long)]
    json: bool,
}

fn load_config(path: Option<&Path>) -> figment::error::Result<InsightsConfig> {
    let mut figment = Figment::from(Serialized::defaults(InsightsConfig::default()));
    if let Some(path) = path {
        figment = figment.merge(Toml::file(path));
    }
    figment
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["api_base"]).split("__"))
        .extract()
}

fn aggregate_file(path: &Path, config: &InsightsConfig) -> LoadState {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            tracing::error!(path = %path.display(), error = %err, "could not open dataset");
            return LoadState::from_result(Err(healthvision_core::InsightsError::Retrieval {
                resource: path.display().to_string(),
                status: None,
                reason: err.to_string(),
            }));
        }
    };
    LoadState::from_result(aggregate_csv_reader(BufReader::new(file), config))
}

fn print_chart(title: &str, data: &[ChartDatum]) {
    println!("{title}:");
    for datum in data {
        println!("  {:<16} {}", datum.label, datum.count);
    }
}

fn print_summary(insights: &DatasetInsights) {
    println!(
        "Rows: {}\nSkipped: {}",
        insights.rows_total, insights.rows_skipped
    );
    print_chart("Visit count", &insights.visit_chart());
    print_chart("Risk class", &insights.risk_chart());
    print_chart("Heart disease", &insights.heart_chart());
    print_chart("Smoking status", &insights.smoking_chart());
    print_chart("Diabetes", &insights.diabetes_chart());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Some(path) = &args.config {
        anyhow::ensure!(path.is_file(), "Configuration file {path:?} not found");
    }
    let mut config = load_config(args.config.as_deref()).with_context(|| {
        format!("Could not read configuration {:?}", args.config)
    })?;
    if args.strict {
        config.row_policy = RowPolicy::Strict;
    }

    let state = match (&args.input, &args.url) {
        (Some(path), _) => aggregate_file(path, &config),
        (None, Some(url)) => {
            let client = ApiClient::from_env().context("Invalid backend base URL")?;
            load_insights(&client, url, &config).await
        }
        (None, None) => bail!("either --input or --url is required"),
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&state).context("Could not serialize load state")?
        );
        return Ok(());
    }

    match &state {
        LoadState::Ready { insights } => print_summary(insights),
        LoadState::Empty { message, .. } => println!("{message}"),
        LoadState::Failed { message, .. } => bail!("{message}"),
        LoadState::Loading => {}
    }

    Ok(())
}
