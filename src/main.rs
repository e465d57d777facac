use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

use embedding_service::EmbeddingService;
use embedding_service::config::default_config::config_from_env;
use embedding_service::telemetry;
use rag_store::{RagConfig, RagStore, RunReport};
use tracing::{Level, error, info, warn};
use tracing_subscriber::{Layer, filter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine; the process environment may carry everything.
    let dotenv = dotenvy::dotenv();

    init_tracing();
    if let Err(e) = dotenv {
        warn!("no .env loaded: {e}");
    }

    match run().await {
        Ok(report) if report.is_success() => ExitCode::SUCCESS,
        Ok(report) => {
            error!(
                failed = report.failures.len(),
                "run finished with records that were not stored"
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("run failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<RunReport, Box<dyn Error>> {
    let cfg = RagConfig::from_env()?;
    let svc = Arc::new(EmbeddingService::new(config_from_env()?)?);
    let store = RagStore::new(cfg, svc)?;

    let records = store.load_records()?;
    let report = store.run(&records).await?;

    info!(
        index = %store.config().index.name,
        lifecycle = %report.lifecycle,
        stored = report.stored.len(),
        failed = report.failures.len(),
        "run summary"
    );
    for m in &report.query.matches {
        info!(
            id = %m.id,
            score = m.score,
            metadata = ?m.metadata,
            "match for '{}'",
            report.query.query
        );
    }
    if let Some(deleted) = report.deleted {
        info!(index = %store.config().index.name, outcome = %deleted, "cleanup");
    }
    Ok(report)
}

fn init_tracing() {
    let filter = telemetry::env_filter_with_level("info", Level::INFO);

    // Library events go through the library's own layer.
    let app_layer = fmt::layer()
        .with_target(false)
        .with_filter(filter::filter_fn(|meta| {
            !meta.target().starts_with(telemetry::TARGET_PREFIX)
        }));

    tracing_subscriber::registry()
        .with(filter)
        .with(app_layer)
        .with(telemetry::layer())
        .init();
}
