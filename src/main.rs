use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gitship::config::Settings;
use gitship::server;

#[derive(Parser)]
#[command(name = "gitship")]
#[command(version, about = "Publish generated code into GitHub repositories")]
struct Cli {
    /// Port to serve on; overrides the PORT environment variable.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::from_env();
    if let Some(port) = cli.port {
        settings.port = port;
    }

    if settings.github_token.is_none() {
        tracing::warn!("GITHUB_TOKEN is not set; publish requests will be rejected");
    }

    server::start_server(settings).await
}
