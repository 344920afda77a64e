use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use harvest_common::Config;
use harvest_scout::pipeline::{self, PipelineOutcome};

#[derive(Parser)]
#[command(name = "harvest", about = "Collect outbound links from recent tweets and their timemaps")]
struct Cli {
    /// Distinct links to collect before timemaps are fetched
    #[arg(long, default_value_t = 50)]
    total_links_to_scrape: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("harvest=info".parse()?)
                .add_directive("harvest_scout=info".parse()?)
                .add_directive("harvest_archive=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    info!(target_links = cli.total_links_to_scrape, "Link harvest starting...");

    let config = Config::from_env()?;
    config.log_redacted();

    match pipeline::run(&config, cli.total_links_to_scrape).await? {
        PipelineOutcome::Complete { links, timemaps } => info!(
            links,
            timemaps_written = timemaps.written,
            placeholders = timemaps.placeholders,
            "Link harvest complete"
        ),
        PipelineOutcome::Incomplete { collected, target } => {
            info!(collected, target, "Link harvest paused, resumable")
        }
    }

    Ok(())
}
