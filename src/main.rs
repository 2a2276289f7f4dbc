mod advisor;
mod api;
mod cli;
mod config;
mod logging;
mod memory;
mod process;
mod providers;
mod template;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "krishi")]
#[command(version)]
#[command(about = "Agricultural advisory backend - weather, local knowledge and a generative model")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file layered over the user and project configs
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project directory holding .krishi/config.toml (defaults to current)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Output format for one-shot commands
    #[arg(long, global = true, value_enum, default_value_t = cli::OutputMode::Console)]
    output: cli::OutputMode,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Only log errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Log JSON lines to stderr
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Override the listen port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Check keys, storage and tools
    Doctor,

    /// Load the seed documents into the knowledge base
    Seed {
        /// Seed even if the knowledge base already has records
        #[arg(long)]
        force: bool,
    },

    /// Query the knowledge base
    Search {
        query: String,

        #[arg(long, default_value = "delhi")]
        location: String,

        #[arg(long)]
        top_k: Option<usize>,
    },

    /// List the starter questions for a language
    Questions {
        #[arg(default_value = "en")]
        lang: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logging(cli.debug, cli.quiet, cli.log_file.clone(), cli.log_json)?;

    let mut config = config::AdvisorConfig::load(cli.config.as_deref(), cli.dir.as_deref())?;
    let handler = cli::create_handler(cli.output);

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            cli::serve(&config).await?;
        }

        Commands::Doctor => {
            let code = cli::doctor(&config, &*handler).await;
            if code != 0 {
                std::process::exit(code);
            }
        }

        Commands::Seed { force } => {
            cli::seed(&config, force, &*handler).await?;
        }

        Commands::Search {
            query,
            location,
            top_k,
        } => {
            cli::search(&config, &query, &location, top_k, &*handler).await?;
        }

        Commands::Questions { lang } => {
            cli::questions(&lang, &*handler);
        }
    }

    Ok(())
}
