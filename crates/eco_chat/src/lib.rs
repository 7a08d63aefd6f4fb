//! # eco_chat - Environmental Education Chat
//!
//! This crate provides the session logic behind the EcoChat learning
//! assistant:
//! - Backend dispatch between a hosted chat-completion API and a local
//!   Ollama daemon, chosen by model name
//! - Streaming answers as text fragments
//! - Cumulative token accounting per session
//! - Saving and restoring conversation transcripts as JSON
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐     ┌──────────────────┐
//! │  SessionState    │◀───▶│ SessionController│────▶│  TranscriptStore │
//! └──────────────────┘     └────────┬─────────┘     └──────────────────┘
//!                                   │ dispatch(model)
//!                     ┌─────────────┴─────────────┐
//!                     ▼                           ▼
//!             ┌───────────────┐           ┌───────────────┐
//!             │ HostedProvider│           │ LocalProvider │
//!             └───────────────┘           └───────────────┘
//! ```

pub mod curriculum;
pub mod error;
pub mod llm;
pub mod persistence;
pub mod session;
pub mod types;

pub use curriculum::{Difficulty, LessonPlan};
pub use error::*;
pub use llm::{dispatch, Backends, Completion, FragmentStream, LlmConfig, ProviderKind, ResponseProvider};
pub use persistence::*;
pub use session::*;
pub use types::*;
