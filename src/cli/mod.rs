use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::core::AppConfig;

pub mod ask;
pub mod chat;
pub mod render;
pub mod sessions;

#[derive(Subcommand)]
enum Command {
    /// List chat sessions, most recent first
    Sessions {},
    /// Upload a document as a new session, or add it to an existing one
    Upload {
        #[arg(long)]
        file: PathBuf,
        /// Add the document to this session instead of creating one
        #[arg(long)]
        session_id: Option<String>,
    },
    /// Print the transcript of a session
    Messages {
        #[arg(long)]
        id: String,
    },
    /// Delete a session
    Delete {
        #[arg(long)]
        id: String,
    },
    /// Ask a single question and stream the answer
    Ask {
        #[arg(long)]
        session_id: String,
        #[arg(long)]
        question: String,
    },
    /// Start an interactive chat
    Chat {
        /// Open this session right away
        #[arg(long)]
        session_id: Option<String>,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Backend address, overrides DOCCHAT_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, global = true, action, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}={}", env!("CARGO_CRATE_NAME"), level).into()),
        )
        // Answers stream to stdout, keep logs out of the way
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    let mut config = AppConfig::default();
    if let Some(api_url) = &args.api_url {
        config = config.with_api_url(api_url);
    }

    // Handle each sub command
    match args.command {
        Some(Command::Sessions {}) => {
            sessions::list(&config).await?;
        }
        Some(Command::Upload { file, session_id }) => {
            sessions::upload(&config, &file, session_id.as_deref()).await?;
        }
        Some(Command::Messages { id }) => {
            sessions::messages(&config, &id).await?;
        }
        Some(Command::Delete { id }) => {
            sessions::delete(&config, &id).await?;
        }
        Some(Command::Ask {
            session_id,
            question,
        }) => {
            ask::run(&config, &session_id, &question).await?;
        }
        Some(Command::Chat { session_id }) => {
            chat::run(&config, session_id.as_deref()).await?;
        }
        None => {}
    }

    Ok(())
}
