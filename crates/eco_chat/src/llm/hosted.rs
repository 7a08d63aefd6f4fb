//! OpenAI-compatible chat-completion backend.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{check_status, stream, wire_messages, Completion, FragmentStream, ResponseProvider, WireMessage};
use crate::error::{ChatError, ChatResult};
use crate::types::Message;

/// Hosted provider speaking the `/chat/completions` protocol
pub struct HostedProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HostedProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    async fn send(&self, messages: &[Message], model: &str, stream: bool) -> ChatResult<reqwest::Response> {
        let api_key = self.api_key.as_deref().ok_or(ChatError::LlmNotConfigured)?;

        let request = OpenAIRequest {
            model,
            messages: wire_messages(messages),
            stream,
        };

        debug!(model, stream, messages = messages.len(), "Sending hosted chat request");

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        check_status(response, "OpenAI").await
    }
}

#[async_trait]
impl ResponseProvider for HostedProvider {
    async fn complete(&self, messages: &[Message], model: &str) -> ChatResult<Completion> {
        let response = self.send(messages, model, false).await?;

        let result: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Backend(format!("Failed to parse response: {}", e)))?;

        Ok(result.into_completion())
    }

    async fn stream(&self, messages: &[Message], model: &str) -> ChatResult<FragmentStream> {
        let response = self.send(messages, model, true).await?;

        let fragments = stream::lines(response.bytes_stream()).filter_map(|line| async move {
            match line {
                Ok(line) => parse_sse_line(&line).transpose(),
                Err(e) => Some(Err(e)),
            }
        });

        Ok(fragments.boxed())
    }
}

/// Extract the answer fragment from one SSE line.
///
/// Comments, `[DONE]`, chunks without choices and empty deltas yield `None`.
pub(crate) fn parse_sse_line(line: &str) -> ChatResult<Option<String>> {
    let data = match line.strip_prefix("data:") {
        Some(data) => data.trim(),
        None => return Ok(None),
    };
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }

    let chunk: OpenAIChunk = serde_json::from_str(data)
        .map_err(|e| ChatError::Backend(format!("Failed to parse stream chunk: {} (data: {})", e, data)))?;

    if let Some(error) = chunk.error {
        return Err(ChatError::Backend(format!("OpenAI stream error: {}", error.message)));
    }

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

impl OpenAIResponse {
    fn into_completion(self) -> Completion {
        let (prompt_tokens, completion_tokens) = self
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((0, 0));

        Completion {
            content: self.choices.into_iter().next().and_then(|c| c.message.content),
            prompt_tokens,
            completion_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChunk {
    #[serde(default)]
    choices: Vec<OpenAIChunkChoice>,
    error: Option<OpenAIError>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChunkChoice {
    delta: OpenAIDelta,
}

#[derive(Debug, Deserialize)]
struct OpenAIDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
}
