//! CLI command definitions.

use clap::{Parser, Subcommand};

pub mod catalog;
pub mod chat;
pub mod transcripts;

/// EcoChat - environmental education chat assistant
#[derive(Parser)]
#[command(name = "eco")]
#[command(version, about = "EcoChat - environmental education chat assistant")]
#[command(long_about = r#"
EcoChat is a terminal chat assistant for environmental education. It talks
to a hosted chat-completion API (models starting with "gpt-") or to a local
Ollama daemon (every other model).

COMMANDS:
  chat          → Start an interactive learning session
  catalog       → List models, topics, content types and difficulty levels
  transcripts   → Inspect a saved transcript file

ENVIRONMENT:
  OPENAI_API_KEY         Hosted API key
  OPENAI_BASE_URL        Hosted API endpoint (default https://api.openai.com/v1)
  OLLAMA_HOST            Local daemon address (default http://localhost:11434)
  ECO_CONVERSATIONS_DIR  Where transcripts are saved (default ./conversations)
  RUST_LOG               Log filter (logs go to stderr)

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive learning session
    Chat(chat::ChatArgs),

    /// List models, topics, content types and difficulty levels
    Catalog(catalog::CatalogArgs),

    /// Inspect a saved transcript file
    Transcripts(transcripts::TranscriptsArgs),
}
