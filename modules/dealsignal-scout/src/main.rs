use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dealsignal_common::{Config, SourcingRequest, Thesis, DEFAULT_DESIRED_COUNT};
use dealsignal_scout::SourcingPipeline;

#[derive(Parser)]
#[command(
    name = "dealsignal-scout",
    about = "Discover and rank early-stage companies for an investment thesis"
)]
struct Cli {
    /// Comma-separated sectors, e.g. "Fintech,Climate Tech"
    #[arg(long, value_delimiter = ',')]
    sectors: Vec<String>,

    #[arg(long)]
    stage: Option<String>,

    #[arg(long)]
    geography: Option<String>,

    #[arg(long)]
    ticket_size: Option<String>,

    /// Free-text criteria
    #[arg(long)]
    criteria: Option<String>,

    /// Seed company for look-alike search
    #[arg(long)]
    reference_company: Option<String>,

    /// How many ranked candidates to return
    #[arg(long, default_value_t = DEFAULT_DESIRED_COUNT)]
    count: usize,

    /// Read the whole request from a JSON file instead of flags
    #[arg(long, conflicts_with_all = ["sectors", "stage", "geography", "ticket_size", "criteria", "reference_company"])]
    thesis_file: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Pretty-print the result
    #[arg(long)]
    pretty: bool,
}

impl Cli {
    fn request(&self) -> Result<SourcingRequest> {
        if let Some(path) = &self.thesis_file {
            let body = std::fs::read_to_string(path)
                .with_context(|| format!("reading thesis file {}", path.display()))?;
            return SourcingRequest::from_json(&body).context("invalid thesis file");
        }

        let thesis = Thesis {
            sectors: self.sectors.clone(),
            stage: self.stage.clone(),
            geography: self.geography.clone(),
            ticket_size: self.ticket_size.clone(),
            free_text_criteria: self.criteria.clone(),
            reference_company: self.reference_company.clone(),
        };
        Ok(SourcingRequest::new(thesis, self.count))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only the result.
    let filter = EnvFilter::from_default_env().add_directive("dealsignal=info".parse()?);
    if cli.log_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    info!("DealSignal Scout starting...");

    let config = Config::from_env();
    let request = cli.request()?;
    let pipeline = SourcingPipeline::from_config(&config);

    let result = pipeline.run(&request).await.context("sourcing run failed")?;

    let output = if cli.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{output}");

    if result.setup_required {
        info!(degradations = ?result.degradations, "Run needs configuration before it can be complete");
    }
    Ok(())
}
