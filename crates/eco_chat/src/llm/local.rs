//! Local Ollama backend.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{check_status, stream, wire_messages, Completion, FragmentStream, ResponseProvider, WireMessage};
use crate::error::{ChatError, ChatResult};
use crate::types::Message;

/// Local provider speaking the Ollama `/api/chat` protocol
pub struct LocalProvider {
    client: reqwest::Client,
    host: String,
}

impl LocalProvider {
    pub fn new(client: reqwest::Client, host: impl Into<String>) -> Self {
        Self {
            client,
            host: host.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.host.trim_end_matches('/'))
    }

    async fn send(&self, messages: &[Message], model: &str, stream: bool) -> ChatResult<reqwest::Response> {
        let request = OllamaRequest {
            model,
            messages: wire_messages(messages),
            stream,
        };

        debug!(model, stream, messages = messages.len(), "Sending local chat request");

        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await?;

        check_status(response, "Ollama").await
    }
}

#[async_trait]
impl ResponseProvider for LocalProvider {
    async fn complete(&self, messages: &[Message], model: &str) -> ChatResult<Completion> {
        let response = self.send(messages, model, false).await?;

        let result: OllamaResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Backend(format!("Failed to parse response: {}", e)))?;

        result.into_completion()
    }

    async fn stream(&self, messages: &[Message], model: &str) -> ChatResult<FragmentStream> {
        let response = self.send(messages, model, true).await?;

        let fragments = stream::lines(response.bytes_stream()).filter_map(|line| async move {
            match line {
                Ok(line) => parse_chunk_line(&line).transpose(),
                Err(e) => Some(Err(e)),
            }
        });

        Ok(fragments.boxed())
    }
}

/// Extract the answer fragment from one newline-delimited JSON chunk
pub(crate) fn parse_chunk_line(line: &str) -> ChatResult<Option<String>> {
    let chunk: OllamaResponse = serde_json::from_str(line)
        .map_err(|e| ChatError::Backend(format!("Failed to parse stream chunk: {} (data: {})", e, line)))?;

    if let Some(error) = chunk.error {
        return Err(ChatError::Backend(format!("Ollama error: {}", error)));
    }

    Ok(chunk
        .message
        .map(|m| m.content)
        .filter(|content| !content.is_empty()))
}

// Ollama API types
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

/// Shape shared by the full response and each streamed chunk
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: Option<OllamaMessage>,
    #[serde(default)]
    prompt_eval_count: u64,
    #[serde(default)]
    eval_count: u64,
    error: Option<String>,
}

impl OllamaResponse {
    fn into_completion(self) -> ChatResult<Completion> {
        if let Some(error) = self.error {
            return Err(ChatError::Backend(format!("Ollama error: {}", error)));
        }
        Ok(Completion {
            content: self.message.map(|m| m.content),
            prompt_tokens: self.prompt_eval_count,
            completion_tokens: self.eval_count,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}
