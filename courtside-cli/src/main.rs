//! Courtside CLI - operator tools for league push notifications.
//!
//! # Commands
//!
//! - `courtside keys` - Generate a VAPID key pair
//! - `courtside auth-header <endpoint>` - Print the Authorization header for an endpoint
//! - `courtside send` - Push a direct notification to one subscription
//! - `courtside deliver` - Deliver an inbound event against a store snapshot
//!
//! Configuration comes from `COURTSIDE_*` environment variables (a `.env`
//! file is loaded first), or from a TOML file passed with `--config`.

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use courtside_log::{Level, LogConfig};
use std::path::PathBuf;

mod commands;
mod error;

use commands::{auth_header, deliver, keys, load_config, send};
use error::CliResult;

/// Courtside CLI - Web Push delivery tools
#[derive(Parser)]
#[command(name = "courtside")]
#[command(version)]
#[command(about = "Web Push tools for the Courtside league app")]
#[command(long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Push configuration file (TOML). Overrides environment variables.
    #[arg(short, long, global = true, env = "COURTSIDE_CONFIG")]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a VAPID key pair
    #[command(alias = "k")]
    Keys {
        /// Print as .env lines
        #[arg(long)]
        env: bool,
    },

    /// Print the Authorization header value for a push endpoint
    AuthHeader {
        /// Push service endpoint URL
        endpoint: String,
    },

    /// Send a direct notification to one subscription
    #[command(alias = "s")]
    Send(SendArgs),

    /// Deliver an inbound event against a JSON store snapshot
    #[command(alias = "d")]
    Deliver(DeliverArgs),
}

#[derive(Args)]
struct SendArgs {
    /// Subscription JSON file
    #[arg(short, long)]
    subscription: PathBuf,

    /// Notification title
    #[arg(short, long)]
    title: String,

    /// Notification body
    #[arg(short, long, default_value = "")]
    body: String,

    /// URL opened on click
    #[arg(short, long)]
    url: Option<String>,
}

#[derive(Args)]
struct DeliverArgs {
    /// Event JSON file
    #[arg(short, long)]
    event: PathBuf,

    /// Store snapshot JSON file
    #[arg(short, long)]
    store: PathBuf,

    /// Write the snapshot back after removing expired subscriptions
    #[arg(long)]
    save: bool,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let mut log_config = LogConfig::from_env();
    if cli.verbose {
        log_config = log_config.level(Level::Debug);
    }
    if cli.no_color {
        log_config = log_config.color(false);
    }
    let _ = log_config.try_init();

    let result: CliResult<()> = match cli.command {
        Commands::Keys { env } => keys::run(env),

        Commands::AuthHeader { endpoint } => load_config(cli.config.as_deref())
            .and_then(|config| auth_header::run(&config, &endpoint)),

        Commands::Send(args) => match load_config(cli.config.as_deref()) {
            Ok(config) => {
                send::run(
                    config,
                    send::SendOptions {
                        subscription: &args.subscription,
                        title: args.title,
                        body: args.body,
                        url: args.url,
                    },
                )
                .await
            }
            Err(e) => Err(e),
        },

        Commands::Deliver(args) => match load_config(cli.config.as_deref()) {
            Ok(config) => deliver::run(config, &args.event, &args.store, args.save).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("\n  {} {}\n", "Error:".red().bold(), e);
        std::process::exit(1);
    };
}
