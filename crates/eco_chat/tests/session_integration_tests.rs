//! Integration tests for chat sessions and transcript storage.

use std::fs;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tempfile::tempdir;

use eco_chat::{
    Backends, ChatResult, Completion, FragmentStream, Message, MessageRole, NoticeLevel,
    ResponseProvider, ResponseSink, SessionController, SessionState, TokenUsage, TranscriptStore,
    DEFAULT_TRANSCRIPT_FILE,
};

/// Provider that answers every request with the same fragments and counts
/// the calls it receives.
struct ScriptedProvider {
    fragments: Vec<&'static str>,
    prompt_tokens: u64,
    completion_tokens: u64,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedProvider {
    fn new(fragments: Vec<&'static str>, prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            fragments,
            prompt_tokens,
            completion_tokens,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl ResponseProvider for ScriptedProvider {
    async fn complete(&self, messages: &[Message], model: &str) -> ChatResult<Completion> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("complete:{}:{}", model, messages.len()));
        Ok(Completion {
            content: Some(self.fragments.concat()),
            prompt_tokens: self.prompt_tokens,
            completion_tokens: self.completion_tokens,
        })
    }

    async fn stream(&self, messages: &[Message], model: &str) -> ChatResult<FragmentStream> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("stream:{}:{}", model, messages.len()));
        let fragments: Vec<ChatResult<String>> =
            self.fragments.iter().map(|f| Ok(f.to_string())).collect();
        Ok(stream::iter(fragments).boxed())
    }
}

struct Quiet;

impl ResponseSink for Quiet {
    fn partial(&mut self, _fragment: &str, _answer: &str) {}
    fn finished(&mut self, _answer: &str) {}
}

fn setup(root: &std::path::Path) -> (SessionController, Arc<Mutex<Vec<String>>>, Arc<Mutex<Vec<String>>>) {
    let hosted = ScriptedProvider::new(vec!["Hello", " world"], 30, 2);
    let local = ScriptedProvider::new(vec!["Local ", "answer"], 12, 3);
    let hosted_calls = Arc::clone(&hosted.calls);
    let local_calls = Arc::clone(&local.calls);

    let controller = SessionController::new(
        Backends::new(Box::new(hosted), Box::new(local)),
        TranscriptStore::new(root.join("conversations")),
    );
    (controller, hosted_calls, local_calls)
}

/// A full exchange streams first and then issues one accounting call.
#[tokio::test]
async fn test_exchange_call_order() {
    let temp = tempdir().unwrap();
    let (controller, hosted_calls, local_calls) = setup(temp.path());
    let mut state = SessionState::new();

    let exchange = controller.submit(&mut state, "What is composting?", &mut Quiet).await;

    assert_eq!(exchange.answer, "Hello world");
    // Two system messages plus the user message
    assert_eq!(
        *hosted_calls.lock().unwrap(),
        vec!["stream:gpt-4o:3".to_string(), "complete:gpt-4o:3".to_string()]
    );
    assert!(local_calls.lock().unwrap().is_empty());

    let messages = state.messages();
    assert_eq!(messages[0], Message::user("Eco-Learner: What is composting?"));
    assert_eq!(messages[1].role, MessageRole::Assistant);
}

/// Counters only grow across exchanges and return to zero on clear.
#[tokio::test]
async fn test_token_counters_monotonic_until_clear() {
    let temp = tempdir().unwrap();
    let (controller, _, local_calls) = setup(temp.path());
    let mut state = SessionState::new();

    let mut previous = TokenUsage::default();
    for (i, model) in ["gpt-4o", "llama3.1:8b", "gpt-3.5-turbo", "phi3:latest"].iter().enumerate() {
        state.select_model(*model);
        controller.submit(&mut state, &format!("question {}", i), &mut Quiet).await;

        let usage = state.usage();
        assert!(usage.prompt >= previous.prompt);
        assert!(usage.completion >= previous.completion);
        previous = usage;
    }

    assert_eq!(previous, TokenUsage { prompt: 84, completion: 10 });
    assert_eq!(local_calls.lock().unwrap().len(), 4);

    controller.clear(&mut state);
    assert_eq!(state.usage(), TokenUsage::default());
    assert!(state.messages().is_empty());
}

/// The second request carries the whole conversation so far.
#[tokio::test]
async fn test_history_is_resent() {
    let temp = tempdir().unwrap();
    let (controller, hosted_calls, _) = setup(temp.path());
    let mut state = SessionState::new();
    state.user_name = "Ada".to_string();

    controller.submit(&mut state, "one", &mut Quiet).await;
    controller.submit(&mut state, "two", &mut Quiet).await;

    assert_eq!(hosted_calls.lock().unwrap()[2], "stream:gpt-4o:5");
    assert_eq!(state.messages()[2], Message::user("Ada: two"));
}

/// Saving and loading the same file returns the saved conversation last.
#[tokio::test]
async fn test_save_then_load_round_trip() {
    let temp = tempdir().unwrap();
    let (controller, _, _) = setup(temp.path());
    let mut state = SessionState::new();

    controller.submit(&mut state, "first", &mut Quiet).await;
    controller.save(&mut state, DEFAULT_TRANSCRIPT_FILE).unwrap();
    controller.submit(&mut state, "second", &mut Quiet).await;
    let path = controller.save(&mut state, DEFAULT_TRANSCRIPT_FILE).unwrap();
    let saved: Vec<Message> = state.messages().to_vec();

    let bytes = fs::read(&path).unwrap();
    let mut fresh = SessionState::new();
    let available = controller.load(&mut fresh, Some(bytes.as_slice()));

    assert_eq!(available, 2);
    assert_eq!(fresh.loaded_transcripts().last().unwrap().messages, saved);

    assert!(controller.restore(&mut fresh, available - 1));
    assert_eq!(fresh.messages(), saved.as_slice());
    assert_eq!(fresh.usage(), TokenUsage::default());
}

/// Saving into a fresh directory produces a one-element collection.
#[test]
fn test_save_to_missing_directory() {
    let temp = tempdir().unwrap();
    let store = TranscriptStore::new(temp.path().join("nested").join("conversations"));
    let conversation = vec![Message::user("Eco-Learner: hi"), Message::assistant("Hello!")];

    let report = store.save(&conversation, "fresh.json").unwrap();

    let collection = TranscriptStore::load_file(&report.path).unwrap();
    assert_eq!(collection.len(), 1);
    assert_eq!(collection[0].messages, conversation);
}

/// Malformed uploads never crash and always leave an empty selection.
#[test]
fn test_malformed_uploads_are_reported() {
    let temp = tempdir().unwrap();
    let (controller, _, _) = setup(temp.path());
    let mut state = SessionState::new();

    let uploads: [&[u8]; 5] = [
        b"{",
        b"\"just a string\"",
        b"[{\"timestamp\": 1, \"messages\": []}]",
        b"[{\"timestamp\": \"t\", \"messages\": [{\"role\": \"robot\", \"content\": \"x\"}]}]",
        &[0xc3, 0x28],
    ];
    for upload in uploads {
        assert_eq!(controller.load(&mut state, Some(upload)), 0);
        let notices = state.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
    }

    assert_eq!(controller.load(&mut state, None), 0);
    assert_eq!(state.take_notices()[0].level, NoticeLevel::Warning);
}
