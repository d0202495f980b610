use clap::{Args, Parser};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use mock_provider::ProviderKind;
use search_api::config::Config;
use std::future::Future;
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
enum CliCommand {
    /// Run the hotel search aggregation API
    SearchApi,
    /// Run one mock upstream provider
    Provider(ProviderArgs),
    /// Show all metrics definitions as markdown table
    ShowMetrics,
}

#[derive(Args, Debug)]
struct ProviderArgs {
    /// Provider profile: mock1, mock2 or mock3
    #[arg(long, env = "PROVIDER_TYPE", default_value = "mock1")]
    kind: String,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "PORT", default_value_t = 9001)]
    port: u16,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("Failed to load config: {0}")]
    ConfigError(#[from] search_api::config::ConfigError),
    #[error("Invalid provider type: {0}")]
    InvalidProviderType(String),
    #[error("Failed to install metrics recorder: {0}")]
    MetricsRecorder(#[from] BuildError),
    #[error("Failed to create runtime: {0}")]
    RuntimeError(#[from] std::io::Error),
}

fn main() {
    init_tracing();

    if let Err(e) = cli() {
        tracing::error!(error = %e, "Startup error");
        std::process::exit(1);
    }
}

fn cli() -> Result<(), CliError> {
    match CliCommand::parse() {
        CliCommand::SearchApi => {
            let config = Config::from_env()?;
            let metrics_handle = init_prometheus_recorder()?;

            run_async(search_api::run(config, metrics_handle))
        }
        CliCommand::Provider(args) => {
            let kind: ProviderKind = args
                .kind
                .parse()
                .map_err(|_| CliError::InvalidProviderType(args.kind.clone()))?;

            run_async(mock_provider::run(kind, &args.host, args.port))
        }
        CliCommand::ShowMetrics => {
            println!(
                "{}",
                generate_metrics_table(search_api::metrics_defs::ALL_METRICS)
            );
            Ok(())
        }
    }
}

fn generate_metrics_table(metrics: &[shared::metrics_defs::MetricDef]) -> String {
    let mut lines = vec![
        "| Metric | Type | Description |".to_string(),
        "|--------|------|-------------|".to_string(),
    ];
    for m in metrics {
        lines.push(format!(
            "| `{}` | {} | {} |",
            m.name,
            m.metric_type.as_str(),
            m.description
        ));
    }
    lines.join("\n")
}

/// Installs the global recorder backing the `/metrics` endpoint.
fn init_prometheus_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

fn run_async(
    fut: impl Future<Output = Result<(), impl std::error::Error>>,
) -> Result<(), CliError> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    if let Err(e) = rt.block_on(fut) {
        tracing::error!(error = %e, "Runtime error");
        process::exit(1);
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
