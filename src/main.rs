//! Supply-chain digest — binary entrypoint.
//! One invocation = one run; scheduling, commit and push live outside.
//! Exit status is non-zero only when aggregation, rendering or persistence fails.

use chrono::Utc;
use supply_chain_digest::config::DigestConfig;
use supply_chain_digest::{notify, pipeline, sources};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact text logs by default; JSON lines when `LOG_FORMAT=json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("supply_chain_digest=info,ingest=info,digest=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in CI where the environment is injected.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = DigestConfig::from_env()?;
    let registry = sources::load_sources_default()?;
    let aggregator = pipeline::http_aggregator(&cfg)?;
    let sink = notify::sink_from_env();

    let outcome =
        pipeline::run_digest(&aggregator, &registry, sink.as_ref(), &cfg.output_dir, Utc::now())
            .await?;

    println!("{}", outcome.report_path.display());
    Ok(())
}
