use database::Database;
use scan_service::ScanService;
use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};
use threadsense_core::{
    load_api_configs, load_keywords, CoreError, ErrorReporter, HttpTransport, Settings,
    SettingsSource,
};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CoreError> {
    let defaults = Settings::default();
    let loaded = Settings::from_env();
    init_logging(loaded.as_ref().map(|(settings, _)| settings).unwrap_or(&defaults));

    let reporter = ErrorReporter::new();
    let settings = match loaded {
        Ok((settings, SettingsSource::File(path))) => {
            tracing::info!("Loaded settings from {}", path.display());
            settings
        }
        Ok((settings, SettingsSource::Defaults(path))) => {
            tracing::warn!("Settings file {} not found, using defaults", path.display());
            settings
        }
        Err(e) => {
            let e = CoreError::from(e);
            reporter.report_error(&e);
            return Err(e);
        }
    };

    tracing::info!("Starting threadsense");

    if let Err(e) = run(settings).await {
        reporter.report_error(&e);
        return Err(e);
    }
    Ok(())
}

async fn run(settings: Settings) -> Result<(), CoreError> {
    let apis = load_api_configs(&settings.api_config_path)?;
    let keywords = load_keywords(&settings.keyword_config_path)?;
    tracing::info!(apis = apis.len(), keywords = keywords.len(), "Loaded configuration");

    let transport = Arc::new(HttpTransport::from_settings(&settings)?);

    let mut db = Database::new(settings.database_url.clone());
    db.connect().await?;
    db.run_migrations().await?;

    let mut service = ScanService::new(&settings, transport, Arc::new(db), apis, &keywords);
    let summary = service.run().await;

    tracing::info!(
        pages = summary.pages,
        candidates = summary.candidates,
        records = summary.records,
        persisted = summary.analysis.persisted,
        skipped = summary.analysis.already_persisted,
        exhausted_fields = summary.analysis.exhausted_fields,
        reason = ?summary.exhaustion,
        "Out of data, exiting"
    );
    Ok(())
}

/// `RUST_LOG` wins over the configured filter. Output goes to the log file,
/// or stderr when it cannot be opened.
fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_filter.as_str()));

    match OpenOptions::new()
        .create(true)
        .append(true)
        .open(&settings.log_file)
    {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            tracing::warn!(
                "Could not open log file {}: {}, logging to stderr",
                settings.log_file.display(),
                e
            );
        }
    }
}
