use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sonos_gateway::actions::BuiltinActions;
use sonos_gateway::{
    ActionRegistry, ApiServerBuilder, Config, Discovery, HttpTransport, StaticDiscovery,
    WebhookNotifier,
};

/// Sonos Gateway - HTTP control surface and webhook relay for networked speakers
#[derive(Parser)]
#[command(name = "sonos-gateway", version, about)]
struct Cli {
    /// Port to listen on (overrides config file)
    #[arg(long, env = "SONOS_GATEWAY_PORT")]
    port: Option<u16>,

    /// Path to config file (default: ~/.config/sonos-gateway/config.toml)
    #[arg(short, long, env = "SONOS_GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,sonos_gateway=info",
        1 => "info,sonos_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(?config, "loaded configuration");

    let port = cli.port.unwrap_or(config.api_server.port);
    tracing::info!(
        port,
        webroot = %config.api_server.webroot.display(),
        players = config.players.len(),
        "starting sonos gateway"
    );

    let discovery = Arc::new(StaticDiscovery::new(config.players));
    let registry = ActionRegistry::builder()
        .module(&BuiltinActions::new(Arc::clone(&discovery) as Arc<dyn Discovery>))
        .build();
    tracing::debug!(?registry, "registered actions");

    let notifier = WebhookNotifier::new(config.webhook, Arc::new(HttpTransport::new()));
    let consumers = notifier.spawn(discovery.events());

    let server = ApiServerBuilder::new(registry, discovery, port).build();

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }

    for consumer in consumers {
        consumer.abort();
    }

    Ok(())
}
