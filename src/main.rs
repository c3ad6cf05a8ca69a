//! Service entrypoint: configuration, logging, wiring, serve.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use labtrail::api::{self, ApiContext};
use labtrail::config::{self, AppConfig};
use labtrail::history::{HistoryStore, SqliteHistoryStore, UnavailableHistoryStore};
use labtrail::pipeline::ReportProcessor;
use labtrail::remote::{
    AnalysisClient, DisabledAnalysisClient, HttpAnalysisClient, HttpResearchClient,
    HttpVaultClient, VaultClient,
};
use labtrail::storage::FileStore;

const DB_BUSY_TIMEOUT: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "fatal");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    std::fs::create_dir_all(&config.data_dir)?;

    // A failed database open degrades to an unavailable store rather than
    // refusing to serve: uploads still analyze, nothing persists.
    let history: Arc<dyn HistoryStore> =
        match SqliteHistoryStore::open(&config.database_path(), DB_BUSY_TIMEOUT) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::warn!(
                    path = %config.database_path().display(),
                    error = %e,
                    "could not open history database, persistence disabled"
                );
                Arc::new(UnavailableHistoryStore)
            }
        };

    let files = Arc::new(FileStore::open(config.uploads_dir())?);

    let analysis: Box<dyn AnalysisClient> = match &config.analysis_api_key {
        Some(key) => Box::new(HttpAnalysisClient::new(
            &config.analysis_base_url,
            key,
            &config.analysis_model,
            config.remote_timeout_secs,
        )),
        None => {
            tracing::warn!("no analysis API key, every upload will use fallback biomarkers");
            Box::new(DisabledAnalysisClient)
        }
    };

    let research = Box::new(HttpResearchClient::new(
        &config.research_base_url,
        config.research_api_key.clone(),
        config.remote_timeout_secs,
    ));

    let vault: Option<Box<dyn VaultClient>> = config.vault.as_ref().map(|v| {
        Box::new(HttpVaultClient::new(
            &v.records_url,
            &v.api_key,
            v.schema.clone(),
            config.remote_timeout_secs,
        )) as Box<dyn VaultClient>
    });
    if vault.is_some() {
        tracing::info!("vault tokenization enabled");
    }

    let processor = Arc::new(ReportProcessor::new(
        analysis,
        research,
        vault,
        Arc::clone(&history),
        config.token_salt.clone(),
    ));

    let router = api::api_router(
        ApiContext::new(processor, history, files),
        &config.cors_origin,
    );
    api::serve(router, config.bind_addr).await?;

    Ok(())
}
