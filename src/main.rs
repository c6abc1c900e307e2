use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use logo_resolver::{config::Config, services::LogoResolutionService, web::WebServer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "logo-resolver")]
#[command(version)]
#[command(about = "Resolves brand logos from domains or company names through failover providers")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = if cli.log_level == "trace" {
        format!("logo_resolver={},tower_http=trace", cli.log_level)
    } else {
        format!("logo_resolver={}", cli.log_level)
    };
    let json = cli.log_format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();

    info!("Starting Logo Resolver v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }

    let providers: Vec<_> = config
        .providers
        .iter()
        .filter(|p| p.enabled)
        .map(|p| p.kind.name())
        .collect();
    info!(
        "Providers: {} | cache max age: {} | rate limit: {} per {}",
        providers.join(", "),
        humantime::format_duration(config.cache.max_age),
        config.rate_limit.quota,
        humantime::format_duration(config.rate_limit.window)
    );

    let service = Arc::new(LogoResolutionService::from_config(&config).await?);
    let server = WebServer::new(&config.web, service)?;
    server.serve().await?;

    info!("Logo Resolver stopped");
    Ok(())
}
