//! ChiCTR registry command line interface.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use chictr_registry::{error_payload, ChromeConfig, ChromeSession, TrialRegistry};

/// Query the ChiCTR clinical trial registry from the command line
#[derive(Parser)]
#[command(name = "chictr-registry")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a Chrome/Chromium executable (auto-detected when omitted)
    #[arg(long, global = true)]
    chrome: Option<String>,

    /// Proxy URL (falls back to HTTP_PROXY/HTTPS_PROXY)
    #[arg(long, global = true)]
    proxy: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search trials by keyword, registration number and/or year
    Search(SearchArgs),

    /// Fetch the full record for one registration number
    Detail(DetailArgs),

    /// Print hit/miss counters for the search and detail caches
    CacheStats,
}

#[derive(Parser)]
struct SearchArgs {
    /// Title keyword, e.g. "KRAS G12C" or "胰腺癌"
    #[arg(short, long)]
    keyword: Option<String>,

    /// Exact registration number, e.g. ChiCTR2400084905
    #[arg(short, long)]
    regno: Option<String>,

    /// Registration year, e.g. 2024
    #[arg(short, long)]
    year: Option<u16>,

    /// Maximum number of results
    #[arg(short, long, default_value = "10")]
    limit: usize,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Parser)]
struct DetailArgs {
    /// Registration number, e.g. ChiCTR2400084905
    regno: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    let session = Arc::new(ChromeSession::new(ChromeConfig {
        chrome_path: cli.chrome.clone(),
        proxy_url: cli.proxy.clone(),
        ..Default::default()
    }));
    let registry = TrialRegistry::new(session.clone());

    let outcome = match cli.command {
        Commands::Search(args) => run_search(&registry, args).await,
        Commands::Detail(args) => run_detail(&registry, args).await,
        Commands::CacheStats => run_cache_stats(&registry),
    };

    session.close().await;
    outcome
}

async fn run_search(registry: &TrialRegistry, args: SearchArgs) -> Result<()> {
    let result = registry
        .search_trials(
            args.keyword.as_deref(),
            args.regno.as_deref(),
            args.year,
            args.limit,
        )
        .await;

    match result {
        Ok(trials) => match args.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&trials)?),
            OutputFormat::Text => {
                if trials.is_empty() {
                    println!("No trials found.");
                }
                for (i, trial) in trials.iter().enumerate() {
                    println!(
                        "{}. {} [{}]",
                        i + 1,
                        trial.title,
                        trial.registration_number
                    );
                    println!(
                        "   {} | {} | {}",
                        trial.study_type, trial.registration_date, trial.institution
                    );
                }
            }
        },
        Err(e) => {
            eprintln!("{}", serde_json::to_string_pretty(&error_payload(&e))?);
            return Err(e.into());
        }
    }
    Ok(())
}

fn run_cache_stats(registry: &TrialRegistry) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&registry.cache_stats())?);
    Ok(())
}

async fn run_detail(registry: &TrialRegistry, args: DetailArgs) -> Result<()> {
    match registry.get_trial_detail(&args.regno).await {
        Ok(detail) => println!("{}", serde_json::to_string_pretty(&detail)?),
        Err(e) => {
            eprintln!("{}", serde_json::to_string_pretty(&error_payload(&e))?);
            return Err(e.into());
        }
    }
    Ok(())
}
