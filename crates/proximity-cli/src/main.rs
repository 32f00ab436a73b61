use clap::{Parser, Subcommand};

mod commands;
mod sink;

#[derive(Parser)]
#[command(name = "proximity-cli", version, about = "Proximity CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up an address and print every candidate
    Geocode {
        /// Free-text address
        address: String,
    },
    /// Home point management
    Home {
        #[command(subcommand)]
        action: commands::home::HomeAction,
    },
    /// Distance from home to a position
    Check {
        /// Latitude in degrees
        #[arg(allow_hyphen_values = true)]
        latitude: f64,
        /// Longitude in degrees
        #[arg(allow_hyphen_values = true)]
        longitude: f64,
    },
    /// Track a stream of positions and alert when too far from home
    Watch(commands::watch::WatchArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Geocode { address } => commands::geocode::run(&address).await,
        Commands::Home { action } => commands::home::run(action).await,
        Commands::Check {
            latitude,
            longitude,
        } => commands::check::run(latitude, longitude),
        Commands::Watch(args) => commands::watch::run(args).await,
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
