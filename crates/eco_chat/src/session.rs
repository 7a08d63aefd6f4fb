//! Chat session controller.
//!
//! [`SessionState`] holds everything one interactive session owns: the
//! conversation, token counters, user selections and queued notices. It is
//! created when the session starts and handed `&mut` to each
//! [`SessionController`] action. Actions never fail outright; problems are
//! queued as [`Notice`]s and the session returns to [`Phase::Idle`].

use std::path::PathBuf;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::curriculum::{self, LessonPlan, DEFAULT_USER_NAME};
use crate::error::ChatError;
use crate::llm::{dispatch, Backends, Completion, FragmentStream, ProviderKind};
use crate::persistence::TranscriptStore;
use crate::types::{Conversation, Message, Notice, TokenUsage, Transcript};

/// Glyph appended to an answer while it is still streaming
pub const CURSOR_GLYPH: char = '\u{258c}';

/// Render an in-progress answer with the trailing cursor
pub fn with_cursor(answer: &str) -> String {
    let mut text = String::with_capacity(answer.len() + CURSOR_GLYPH.len_utf8());
    text.push_str(answer);
    text.push(CURSOR_GLYPH);
    text
}

/// Receives the assistant answer as it streams in
pub trait ResponseSink {
    /// Called after each fragment with the answer accumulated so far
    fn partial(&mut self, fragment: &str, answer: &str);

    /// Called once when the stream has ended
    fn finished(&mut self, answer: &str);
}

/// Where the session is in its request loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingUserInput,
    StreamingResponse,
}

/// Result of one user submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// Final assistant answer as appended to the conversation
    pub answer: String,
    /// Counts reported for this exchange
    pub usage: TokenUsage,
    /// Number of fragments received
    pub fragments: usize,
}

/// State owned by one interactive session
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Identifies the session in logs
    pub id: Uuid,
    pub user_name: String,
    pub model: String,
    pub plan: LessonPlan,
    phase: Phase,
    custom_instructions: Option<String>,
    messages: Conversation,
    usage: TokenUsage,
    loaded: Vec<Transcript>,
    notices: Vec<Notice>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Start a session with default selections
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            user_name: DEFAULT_USER_NAME.to_string(),
            model: curriculum::default_model().to_string(),
            plan: LessonPlan::default(),
            phase: Phase::Idle,
            custom_instructions: None,
            messages: Vec::new(),
            usage: TokenUsage::default(),
            loaded: Vec::new(),
            notices: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Mark the session as waiting for the next user message
    pub fn await_input(&mut self) {
        if self.phase == Phase::Idle {
            self.phase = Phase::AwaitingUserInput;
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn usage(&self) -> TokenUsage {
        self.usage
    }

    /// Switch model, returning the backend it routes to
    pub fn select_model(&mut self, model: impl Into<String>) -> ProviderKind {
        self.model = model.into();
        let kind = dispatch(&self.model);
        if !curriculum::MODELS.contains(&self.model.as_str()) {
            self.notify(Notice::info(format!(
                "Model '{}' is not in the catalog; requests go to the {} backend",
                self.model, kind
            )));
        }
        kind
    }

    /// Persona instructions in effect: the user's override, or the template
    pub fn instructions(&self) -> String {
        self.custom_instructions
            .clone()
            .unwrap_or_else(|| self.plan.persona_instructions())
    }

    /// Override the persona instructions; `None` restores the template
    pub fn set_instructions(&mut self, instructions: Option<String>) {
        self.custom_instructions = instructions;
    }

    pub fn has_custom_instructions(&self) -> bool {
        self.custom_instructions.is_some()
    }

    /// Full request: persona and focus reminder, then the conversation
    pub fn outbound_messages(&self) -> Vec<Message> {
        let mut outbound = Vec::with_capacity(self.messages.len() + 2);
        outbound.extend(self.plan.system_messages(&self.instructions()));
        outbound.extend(self.messages.iter().cloned());
        outbound
    }

    /// Transcripts from the last load, awaiting selection
    pub fn loaded_transcripts(&self) -> &[Transcript] {
        &self.loaded
    }

    /// Timestamps of the loaded transcripts, in file order
    pub fn transcript_choices(&self) -> Vec<&str> {
        self.loaded.iter().map(|t| t.timestamp.as_str()).collect()
    }

    pub fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    /// Drain queued notices for display
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

/// Drives backends and the transcript store on behalf of a session
pub struct SessionController {
    backends: Backends,
    store: TranscriptStore,
}

impl SessionController {
    pub fn new(backends: Backends, store: TranscriptStore) -> Self {
        Self { backends, store }
    }

    /// Handle one user message: stream the answer, then record token usage.
    ///
    /// The stream is read to the end before the follow-up completion that
    /// supplies the token counts is sent.
    pub async fn submit(
        &self,
        state: &mut SessionState,
        prompt: &str,
        sink: &mut dyn ResponseSink,
    ) -> Exchange {
        let content = format!("{}: {}", state.user_name, prompt);
        state.messages.push(Message::user(content));

        let outbound = state.outbound_messages();
        let model = state.model.clone();
        let provider = self.backends.for_model(&model);

        info!(session = %state.id, model = %model, backend = %dispatch(&model), "Submitting message");
        state.phase = Phase::StreamingResponse;

        let mut fragments: FragmentStream = match provider.stream(&outbound, &model).await {
            Ok(fragments) => fragments,
            Err(e) => {
                warn!(session = %state.id, "Failed to start stream: {}", e);
                state.notify(Notice::error(format!("Error: {}", e)));
                stream::empty().boxed()
            }
        };

        let mut answer = String::new();
        let mut received = 0;
        while let Some(fragment) = fragments.next().await {
            match fragment {
                Ok(fragment) => {
                    answer.push_str(&fragment);
                    received += 1;
                    sink.partial(&fragment, &answer);
                }
                Err(e) => {
                    warn!(session = %state.id, "Stream ended early: {}", e);
                    state.notify(Notice::error(format!("Error: {}", e)));
                    break;
                }
            }
        }
        drop(fragments);
        sink.finished(&answer);

        debug!(session = %state.id, fragments = received, chars = answer.len(), "Stream finished");
        state.messages.push(Message::assistant(answer.clone()));

        let completion = match provider.complete(&outbound, &model).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!(session = %state.id, "Token accounting call failed: {}", e);
                state.notify(Notice::error(format!("Error: {}", e)));
                Completion::empty()
            }
        };

        let mut usage = TokenUsage::default();
        usage.record(completion.prompt_tokens, completion.completion_tokens);
        state.usage.record(usage.prompt, usage.completion);
        state.phase = Phase::Idle;

        info!(
            session = %state.id,
            prompt_tokens = usage.prompt,
            completion_tokens = usage.completion,
            "Exchange complete"
        );

        Exchange {
            answer,
            usage,
            fragments: received,
        }
    }

    /// Forget the conversation and reset token counters
    pub fn clear(&self, state: &mut SessionState) {
        state.messages.clear();
        state.usage.reset();
        state.phase = Phase::Idle;
        info!(session = %state.id, "Chat history cleared");
    }

    /// Append the conversation to `filename` in the conversations directory
    pub fn save(&self, state: &mut SessionState, filename: &str) -> Option<PathBuf> {
        state.phase = Phase::Idle;
        match self.store.save(&state.messages, filename) {
            Ok(report) => {
                if let Some(e) = report.discarded {
                    state.notify(Notice::warning(format!(
                        "Existing file could not be read and was replaced: {}",
                        e
                    )));
                }
                info!(session = %state.id, path = ?report.path, transcripts = report.transcripts, "Conversation saved");
                state.notify(Notice::success(format!(
                    "Conversation saved to {}",
                    report.path.display()
                )));
                Some(report.path)
            }
            Err(e) => {
                warn!(session = %state.id, "Failed to save conversation: {}", e);
                state.notify(Notice::error(format!("Error saving conversation: {}", e)));
                None
            }
        }
    }

    /// Parse an uploaded transcript collection and offer it for restoring.
    ///
    /// Returns the number of transcripts available for [`restore`](Self::restore).
    pub fn load(&self, state: &mut SessionState, source: Option<&[u8]>) -> usize {
        state.phase = Phase::Idle;
        match TranscriptStore::load(source) {
            Ok(transcripts) if transcripts.is_empty() => {
                state.loaded.clear();
                state.notify(Notice::error("No valid conversations found in the uploaded file."));
            }
            Ok(transcripts) => {
                state.notify(Notice::success(format!(
                    "Loaded {} conversations from the uploaded file",
                    transcripts.len()
                )));
                state.loaded = transcripts;
            }
            Err(ChatError::MissingInput) => {
                state.notify(Notice::warning(ChatError::MissingInput.to_string()));
            }
            Err(e) => {
                warn!(session = %state.id, "Rejected uploaded transcripts: {}", e);
                state.loaded.clear();
                state.notify(Notice::error(format!(
                    "Error decoding the uploaded file. The file may be corrupted or not in JSON format. ({})",
                    e
                )));
            }
        }
        state.loaded.len()
    }

    /// Replace the conversation with a loaded transcript.
    ///
    /// Token counters are left as they are.
    pub fn restore(&self, state: &mut SessionState, index: usize) -> bool {
        state.phase = Phase::Idle;
        let Some(transcript) = state.loaded.get(index) else {
            state.notify(Notice::error(format!(
                "No loaded conversation #{} (have {})",
                index,
                state.loaded.len()
            )));
            return false;
        };

        state.messages = transcript.messages.clone();
        info!(session = %state.id, timestamp = %transcript.timestamp, "Conversation restored");
        state.notify(Notice::success("Conversation loaded successfully!"));
        true
    }
}
