mod config;

use clap::{Args, Parser};
use config::{Config, ConfigError, LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use resolver::api::ResolverApiError;
use resolver::codec::{self, EncodeError};
use resolver::gateway::SsmParameterStore;
use resolver::types::ResolvedDocument;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(version, about = "Serves versioned configuration parameters")]
enum CliCommand {
    /// Run the HTTP service
    Serve(ServeArgs),
    /// Print the single-key blob for a JSON document of string values
    Encode { file: PathBuf },
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ResolverApiError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not read document: {0}")]
    Document(#[from] serde_json::Error),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("could not set up metrics: {0}")]
    Metrics(String),
}

fn main() -> ExitCode {
    let cli = CliCommand::parse();

    let result = match cli {
        CliCommand::Serve(args) => serve(args),
        CliCommand::Encode { file } => encode(&file),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Exiting");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn serve(args: ServeArgs) -> Result<(), CliError> {
    let config = Config::load(args.config.as_deref())?;

    let logging = config.common.logging.clone().unwrap_or_default();
    let _sentry = init_logging(&logging, config.resolver.debug);
    for warning in &config.warnings {
        tracing::warn!("{warning}");
    }

    if let Some(metrics) = &config.common.metrics {
        init_metrics(metrics)?;
    }

    tracing::info!(
        region = %config.resolver.parameter_store.region,
        mode = ?config.resolver.mode,
        debug = config.resolver.debug,
        "Starting paramserve"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let store = SsmParameterStore::new(&config.resolver.parameter_store).await;
        resolver::api::serve(config.resolver, Arc::new(store)).await
    })?;
    Ok(())
}

fn encode(path: &Path) -> Result<(), CliError> {
    let file = File::open(path)?;
    let document: ResolvedDocument = serde_json::from_reader(BufReader::new(file))?;
    println!("{}", codec::encode(&document)?);
    Ok(())
}

/// Installs the global subscriber. Debug mode always logs at debug level,
/// otherwise `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig, debug: bool) -> Option<sentry::ClientInitGuard> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    let guard = logging.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });
    let sentry_layer = guard
        .as_ref()
        .map(|_| sentry::integrations::tracing::layer());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_layer)
        .init();

    guard
}

fn init_metrics(config: &MetricsConfig) -> Result<(), CliError> {
    let recorder = StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port)
        .build(Some("paramserve"))
        .map_err(|e| CliError::Metrics(e.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|e| CliError::Metrics(e.to_string()))?;
    shared::metrics_defs::describe_all(resolver::metrics_defs::ALL_METRICS);
    Ok(())
}
