//! # Bylines CLI (`bylines`)
//!
//! Command-line front end for a CMS-driven personal site: list and read
//! articles, check the CMS content model, use the AI assists, browse the
//! site in the terminal, or serve it as a JSON API.
//!
//! ## Usage
//!
//! ```bash
//! bylines --config ./config/bylines.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `bylines articles` | List articles, newest first |
//! | `bylines article <id>` | Show one article with share links |
//! | `bylines bio` | Show the site owner's bio |
//! | `bylines inspect [type]` | Show the fields of a CMS content type |
//! | `bylines summarize <id>` | Three-sentence AI summary of an article |
//! | `bylines speak <id> --out a.wav` | Narrate an article to a WAV file |
//! | `bylines chat` | Chat with the site assistant |
//! | `bylines browse` | Navigate the site interactively |
//! | `bylines serve` | Start the JSON API server |
//!
//! Credentials come from the environment (`CONTENTFUL_SPACE_ID`,
//! `CONTENTFUL_ACCESS_TOKEN`, `CONTENTFUL_CONTENT_TYPE_ID`, `GEMINI_API_KEY`
//! or `API_KEY`) or from the config file.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use bylines::{commands, config, logging, server};

/// Bylines: a CMS-driven personal site with AI assists.
#[derive(Parser)]
#[command(
    name = "bylines",
    about = "Bylines: a CMS-driven personal site with AI assists",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/bylines.toml`. When the file does not exist,
    /// built-in defaults plus environment variables are used.
    #[arg(long, global = true, default_value = "./config/bylines.toml")]
    config: PathBuf,

    /// Debug-level logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all articles, newest first.
    Articles {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show one article.
    Article {
        /// CMS entry id.
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Show the site owner's bio.
    Bio,

    /// Show the fields of a CMS content type.
    ///
    /// Defaults to the configured article content type. Useful when
    /// articles fail to load.
    Inspect {
        content_type: Option<String>,
    },

    /// Summarize an article with the AI assistant.
    Summarize { id: String },

    /// Narrate an article to a WAV file.
    Speak {
        id: String,

        /// Output WAV file.
        #[arg(long, short)]
        out: PathBuf,
    },

    /// Chat with the site assistant (one message per line).
    Chat,

    /// Navigate the site in the terminal.
    Browse {
        /// Starting location, e.g. `/?articleId=abc` or `/?page=about`.
        #[arg(long, default_value = "/")]
        location: String,
    },

    /// Start the JSON API server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose, cli.quiet)?;

    let cfg = config::load_or_minimal(&cli.config)?;

    match cli.command {
        Commands::Articles { json } => {
            commands::run_articles(&cfg, json).await?;
        }
        Commands::Article { id, json } => {
            commands::run_article(&cfg, &id, json).await?;
        }
        Commands::Bio => {
            commands::run_bio(&cfg).await?;
        }
        Commands::Inspect { content_type } => {
            commands::run_inspect(&cfg, content_type.as_deref()).await?;
        }
        Commands::Summarize { id } => {
            commands::run_summarize(&cfg, &id).await?;
        }
        Commands::Speak { id, out } => {
            commands::run_speak(&cfg, &id, &out).await?;
        }
        Commands::Chat => {
            commands::run_chat(&cfg).await?;
        }
        Commands::Browse { location } => {
            commands::run_browse(&cfg, &location).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
