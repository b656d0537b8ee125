use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};

use anyhow::anyhow;

use voxmeter_gateway::{ServerConfig, commands, init, routes, state::AppState};

/// Voxmeter Gateway - Credit-metered voice synthesis server
#[derive(Parser, Debug)]
#[command(name = "voxmeter-gateway")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Create the database schema and artifact directory
    Init,

    /// Print the admin usage report as JSON
    Report,

    /// Reset an account's credit usage to zero
    ResetUsage {
        /// E-mail address of the account
        #[arg(long)]
        email: String,
    },

    /// Replace an account's password
    SetPassword {
        /// E-mail address of the account
        #[arg(long)]
        email: String,

        /// New password
        #[arg(long)]
        password: String,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(config_path) => {
            info!("Loading configuration from {}", config_path.display());
            ServerConfig::from_file(config_path).map_err(|e| anyhow!(e.to_string()))
        }
        None => ServerConfig::from_env().map_err(|e| anyhow!(e.to_string())),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing, honoring RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    // Handle subcommands
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Init => init::run(&config).await,
        Commands::Report => {
            let report = commands::report(config).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::ResetUsage { email } => commands::reset_usage(&config, &email),
        Commands::SetPassword { email, password } => {
            commands::set_password(&config, &email, &password)
        }
    }
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let address = config.address();
    let rate_limit_rps = config.rate_limit_requests_per_second;
    let rate_limit_burst = config.rate_limit_burst_size;
    info!("Starting server on {address}");

    // Create application state
    let app_state = AppState::new(config).await?;

    // Configure rate limiting (disabled when rate >= 100000 for performance testing)
    let governor_layer = if rate_limit_rps < 100000 {
        let governor_config = GovernorConfigBuilder::default()
            .per_second(u64::from(rate_limit_rps))
            .burst_size(rate_limit_burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow!("Failed to build rate limiter config"))?;
        Some(GovernorLayer::new(governor_config))
    } else {
        warn!("Rate limiting disabled (rate >= 100000/s)");
        None
    };

    let app = routes::create_app(app_state).layer(tower::util::option_layer(governor_layer));

    // Parse socket address
    let socket_addr: SocketAddr = address
        .parse()
        .map_err(|e| anyhow!("Invalid server address '{}': {}", address, e))?;

    info!("Server listening on http://{}", socket_addr);

    let listener = TcpListener::bind(&socket_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
