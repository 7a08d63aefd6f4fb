//! LLM backends for chat completions.
//!
//! Two providers share one contract: [`HostedProvider`] talks to an
//! OpenAI-compatible chat-completion API and [`LocalProvider`] talks to a
//! local Ollama daemon. [`dispatch`] picks one from the model name.

mod config;
mod hosted;
mod local;
mod stream;

#[cfg(test)]
mod loopback;

pub use config::LlmConfig;
pub use hosted::HostedProvider;
pub use local::LocalProvider;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::ChatResult;
use crate::types::Message;

/// Model names with this prefix are served by the hosted backend
pub const HOSTED_MODEL_PREFIX: &str = "gpt-";

/// Lazy, finite sequence of answer fragments
pub type FragmentStream = BoxStream<'static, ChatResult<String>>;

/// Which backend serves a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Hosted,
    Local,
}

impl ProviderKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Hosted => "hosted",
            Self::Local => "local",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Route a model name to the backend that serves it
pub fn dispatch(model: &str) -> ProviderKind {
    if model.starts_with(HOSTED_MODEL_PREFIX) {
        ProviderKind::Hosted
    } else {
        ProviderKind::Local
    }
}

/// A completed, non-streaming answer with its usage counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// Answer text; absent when the backend returned no content
    pub content: Option<String>,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl Completion {
    /// The `(absent, 0, 0)` result substituted after a failure
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Contract shared by every chat backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResponseProvider: Send + Sync {
    /// Send the full conversation and wait for the whole answer
    async fn complete(&self, messages: &[Message], model: &str) -> ChatResult<Completion>;

    /// Send the full conversation and receive the answer as text fragments
    async fn stream(&self, messages: &[Message], model: &str) -> ChatResult<FragmentStream>;
}

/// The set of providers a session can dispatch to
pub struct Backends {
    hosted: Box<dyn ResponseProvider>,
    local: Box<dyn ResponseProvider>,
}

impl Backends {
    pub fn new(hosted: Box<dyn ResponseProvider>, local: Box<dyn ResponseProvider>) -> Self {
        Self { hosted, local }
    }

    /// Build HTTP-backed providers from configuration
    pub fn from_config(config: &LlmConfig) -> Self {
        let client = reqwest::Client::new();
        Self::new(
            Box::new(HostedProvider::new(
                client.clone(),
                config.openai_base_url.clone(),
                config.openai_api_key.clone(),
            )),
            Box::new(LocalProvider::new(client, config.ollama_host.clone())),
        )
    }

    /// Provider selected by [`dispatch`]
    pub fn for_model(&self, model: &str) -> &dyn ResponseProvider {
        match dispatch(model) {
            ProviderKind::Hosted => self.hosted.as_ref(),
            ProviderKind::Local => self.local.as_ref(),
        }
    }
}

/// Wire form of a message, shared by both backends
#[derive(Debug, serde::Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

fn wire_messages(messages: &[Message]) -> Vec<WireMessage<'_>> {
    messages
        .iter()
        .map(|m| WireMessage {
            role: m.role.as_str(),
            content: &m.content,
        })
        .collect()
}

/// Turn a non-2xx response into a backend error carrying the body
async fn check_status(response: reqwest::Response, backend: &str) -> ChatResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(crate::error::ChatError::Backend(format!(
        "{} API error {}: {}",
        backend, status, body
    )))
}
