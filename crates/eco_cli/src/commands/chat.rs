//! Chat command - Interactive learning session.
//!
//! Plain lines are sent to the model. Lines starting with `/` adjust the
//! session; `/help` lists them.

use std::borrow::Cow::{self, Borrowed, Owned};
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tracing::info;

use eco_chat::curriculum::{self, DEFAULT_USER_NAME, MODELS};
use eco_chat::{
    Backends, Difficulty, LlmConfig, MessageRole, ResponseSink, SessionController, SessionState,
    TranscriptStore, DEFAULT_CONVERSATIONS_DIR, DEFAULT_TRANSCRIPT_FILE, with_cursor,
};

use crate::theme::Theme;

#[derive(Args)]
pub struct ChatArgs {
    /// Name shown before each of your messages
    #[arg(short, long, default_value = DEFAULT_USER_NAME)]
    name: String,

    /// Model to talk to; "gpt-" models use the hosted API, others Ollama
    #[arg(short, long, default_value_t = curriculum::default_model().to_string())]
    model: String,

    /// Environmental topic to focus on (repeatable)
    #[arg(short, long = "topic")]
    topics: Vec<String>,

    /// Content format, e.g. "Case Studies"
    #[arg(long, default_value = "Fact Sheets")]
    content_type: String,

    /// Beginner, Intermediate or Advanced
    #[arg(long, default_value_t = Difficulty::Intermediate)]
    difficulty: Difficulty,

    /// Colour theme
    #[arg(long, value_enum, default_value_t = Theme::Light)]
    theme: Theme,

    /// Read persona instructions from a file instead of the template
    #[arg(long)]
    instructions_file: Option<PathBuf>,

    /// Directory transcripts are saved to
    #[arg(long, env = "ECO_CONVERSATIONS_DIR", default_value = DEFAULT_CONVERSATIONS_DIR)]
    conversations_dir: PathBuf,

    /// Hosted API key (defaults to OPENAI_API_KEY)
    #[arg(long)]
    openai_api_key: Option<String>,

    /// Hosted API endpoint (defaults to OPENAI_BASE_URL)
    #[arg(long)]
    openai_base_url: Option<String>,

    /// Local daemon address (defaults to OLLAMA_HOST)
    #[arg(long)]
    ollama_host: Option<String>,

    /// Transcript file to offer for restoring at start
    #[arg(long)]
    load: Option<PathBuf>,
}

impl ChatArgs {
    fn llm_config(&self) -> LlmConfig {
        let mut config = LlmConfig::from_env();
        if let Some(key) = &self.openai_api_key {
            config = config.with_api_key(key.clone());
        }
        if let Some(url) = &self.openai_base_url {
            config = config.with_openai_base_url(url.clone());
        }
        if let Some(host) = &self.ollama_host {
            config = config.with_ollama_host(host.clone());
        }
        config
    }

    fn initial_state(&self) -> Result<SessionState> {
        let mut state = SessionState::new();
        state.user_name = self.name.clone();
        state.select_model(self.model.clone());
        state.plan.difficulty = self.difficulty;
        state
            .plan
            .select_content_type(&self.content_type)
            .map_err(anyhow::Error::msg)?;

        let unknown = state.plan.select_topics(self.topics.iter().map(String::as_str));
        if !unknown.is_empty() {
            anyhow::bail!("Unknown topics: {}", unknown.join(", "));
        }

        if let Some(path) = &self.instructions_file {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read instructions from {}", path.display()))?;
            state.set_instructions(Some(text));
        }

        Ok(state)
    }
}

/// One line of REPL input
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Empty,
    Prompt(String),
    Help,
    Quit,
    Clear,
    Tokens,
    History,
    Models,
    Name(String),
    Model(String),
    Topics(Vec<String>),
    ContentType(String),
    Difficulty(String),
    ShowInstructions,
    ResetInstructions,
    SetInstructions(String),
    Theme(String),
    Save(Option<String>),
    Load(Option<PathBuf>),
    Restore(usize),
    Invalid(String),
}

const COMMANDS: &[(&str, &str)] = &[
    ("/help", "Show this list"),
    ("/name", "<text>  Set your display name"),
    ("/model", "<id>  Switch model"),
    ("/models", "List available models"),
    ("/topics", "<a, b, ...>  Select topics (empty clears)"),
    ("/type", "<content type>  Select content format"),
    ("/difficulty", "<Beginner|Intermediate|Advanced>"),
    ("/instructions", "[text|reset]  Show or override persona instructions"),
    ("/theme", "<light|dark>  Change colours"),
    ("/tokens", "Show token usage"),
    ("/history", "Show the conversation"),
    ("/clear", "Clear chat history and token counts"),
    ("/save", "[file]  Save the conversation"),
    ("/load", "<file>  Load transcripts from a file"),
    ("/restore", "<n>  Restore a loaded transcript"),
    ("/quit", "Leave the session"),
];

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    if !line.starts_with('/') {
        return Input::Prompt(line.to_string());
    }

    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };
    let argument = || (!rest.is_empty()).then(|| rest.to_string());
    let required = |usage: &str, build: fn(String) -> Input| match argument() {
        Some(value) => build(value),
        None => Input::Invalid(format!("Usage: {}", usage)),
    };

    match command {
        "/help" | "/?" => Input::Help,
        "/quit" | "/exit" => Input::Quit,
        "/clear" => Input::Clear,
        "/tokens" => Input::Tokens,
        "/history" => Input::History,
        "/models" => Input::Models,
        "/name" => required("/name <text>", Input::Name),
        "/model" => required("/model <id>", Input::Model),
        "/type" => required("/type <content type>", Input::ContentType),
        "/difficulty" => required("/difficulty <level>", Input::Difficulty),
        "/theme" => required("/theme <light|dark>", Input::Theme),
        "/topics" => Input::Topics(
            rest.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        "/instructions" => match rest {
            "" => Input::ShowInstructions,
            "reset" => Input::ResetInstructions,
            text => Input::SetInstructions(text.to_string()),
        },
        "/save" => Input::Save(argument()),
        "/load" => Input::Load(argument().map(PathBuf::from)),
        "/restore" => match rest.parse::<usize>() {
            Ok(index) => Input::Restore(index),
            Err(_) => Input::Invalid("Usage: /restore <n>".to_string()),
        },
        other => Input::Invalid(format!("Unknown command: {} (try /help)", other)),
    }
}

/// Rustyline helper providing slash-command completion and hints
#[derive(Clone)]
struct CliHelper {
    theme: Theme,
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            let candidates = COMMANDS
                .iter()
                .filter(|(cmd, _)| cmd.starts_with(line))
                .map(|(cmd, _)| Pair {
                    display: cmd.to_string(),
                    replacement: cmd.to_string(),
                })
                .collect();
            Ok((0, candidates))
        } else if let Some(prefix) = line.strip_prefix("/model ") {
            let candidates = MODELS
                .iter()
                .filter(|model| model.starts_with(prefix))
                .map(|model| Pair {
                    display: model.to_string(),
                    replacement: model.to_string(),
                })
                .collect();
            Ok(("/model ".len(), candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(self.theme.muted(line).to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            COMMANDS
                .iter()
                .find(|(cmd, _)| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|(cmd, _)| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

/// Prints fragments as they arrive, keeping the cursor glyph at the end
struct TerminalSink {
    theme: Theme,
    cursor_shown: bool,
}

impl TerminalSink {
    fn new(theme: Theme) -> Self {
        Self {
            theme,
            cursor_shown: false,
        }
    }

    fn erase_cursor(&mut self) {
        if self.cursor_shown {
            print!("\u{8} \u{8}");
            self.cursor_shown = false;
        }
    }
}

impl ResponseSink for TerminalSink {
    fn partial(&mut self, fragment: &str, _answer: &str) {
        self.erase_cursor();
        print!("{}", self.theme.assistant(&with_cursor(fragment)));
        self.cursor_shown = true;
        let _ = std::io::stdout().flush();
    }

    fn finished(&mut self, _answer: &str) {
        self.erase_cursor();
        println!();
    }
}

/// Interactive session: the state, its controller and the display settings
struct Repl {
    controller: SessionController,
    state: SessionState,
    theme: Theme,
}

impl Repl {
    fn print_notices(&mut self) {
        for notice in self.state.take_notices() {
            println!("{}", self.theme.notice(&notice));
        }
    }

    fn print_tokens(&self) {
        let usage = self.state.usage();
        println!(
            "{}",
            self.theme.muted(&format!(
                "Tokens: prompt {} | completion {} | total {}",
                usage.prompt,
                usage.completion,
                usage.total()
            ))
        );
    }

    fn print_history(&self) {
        if self.state.messages().is_empty() {
            println!("{}", self.theme.muted("(no messages yet)"));
            return;
        }
        for message in self.state.messages() {
            match message.role {
                MessageRole::User => println!("{}", self.theme.user(&message.content)),
                MessageRole::Assistant => println!("{}", self.theme.assistant(&message.content)),
                MessageRole::System => println!("{}", self.theme.muted(&message.content)),
            }
            println!();
        }
    }

    fn print_loaded(&self) {
        let choices = self.state.transcript_choices();
        for (index, timestamp) in choices.iter().enumerate() {
            println!("  [{}] {}", index, timestamp);
        }
        if !choices.is_empty() {
            println!("{}", self.theme.muted("Use /restore <n> to continue one of them."));
        }
    }

    fn print_help(&self) {
        for (command, description) in COMMANDS {
            println!("  {:<14} {}", command, self.theme.muted(description));
        }
    }

    fn print_selection(&self) {
        let plan = &self.state.plan;
        let topics = if plan.topics.is_empty() {
            "(none)".to_string()
        } else {
            plan.topics.join(", ")
        };
        println!(
            "{}",
            self.theme.muted(&format!(
                "{} | {} ({}) | {} | {} | {}",
                self.state.user_name,
                self.state.model,
                eco_chat::dispatch(&self.state.model),
                topics,
                plan.content_type,
                plan.difficulty
            ))
        );
    }

    fn load_file(&mut self, path: Option<PathBuf>) {
        let bytes = match path {
            Some(path) => match std::fs::read(&path) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    println!(
                        "{}",
                        format!("Error loading conversations from {}: {}", path.display(), e).red()
                    );
                    return;
                }
            },
            None => None,
        };
        self.controller.load(&mut self.state, bytes.as_deref());
        self.print_notices();
        self.print_loaded();
    }

    /// Handle one input line; returns `false` when the session should end
    async fn handle(&mut self, input: Input) -> bool {
        match input {
            Input::Empty => {}
            Input::Quit => return false,
            Input::Help => self.print_help(),
            Input::Prompt(prompt) => {
                println!("{}", self.theme.user(&format!("{}: {}", self.state.user_name, prompt)));
                let mut sink = TerminalSink::new(self.theme);
                self.controller.submit(&mut self.state, &prompt, &mut sink).await;
                self.print_notices();
                self.print_tokens();
            }
            Input::Clear => {
                self.controller.clear(&mut self.state);
                println!("{}", self.theme.muted("Chat history cleared."));
            }
            Input::Tokens => self.print_tokens(),
            Input::History => self.print_history(),
            Input::Models => {
                for model in MODELS {
                    let marker = if *model == self.state.model { "*" } else { " " };
                    println!("{} {:<22} {}", marker, model, eco_chat::dispatch(model));
                }
            }
            Input::Name(name) => {
                self.state.user_name = name;
                self.print_selection();
            }
            Input::Model(model) => {
                self.state.select_model(model);
                self.print_notices();
                self.print_selection();
            }
            Input::Topics(topics) => {
                let unknown = self.state.plan.select_topics(topics.iter().map(String::as_str));
                if !unknown.is_empty() {
                    println!(
                        "{}",
                        format!(
                            "Unknown topics ignored: {}. See `eco catalog`.",
                            unknown.join(", ")
                        )
                        .yellow()
                    );
                }
                self.print_selection();
            }
            Input::ContentType(name) => match self.state.plan.select_content_type(&name) {
                Ok(()) => self.print_selection(),
                Err(e) => println!("{}", e.yellow()),
            },
            Input::Difficulty(level) => match level.parse::<Difficulty>() {
                Ok(level) => {
                    self.state.plan.difficulty = level;
                    self.print_selection();
                }
                Err(e) => println!("{}", e.yellow()),
            },
            Input::ShowInstructions => {
                let source = if self.state.has_custom_instructions() {
                    "custom"
                } else {
                    "template"
                };
                println!("{}", self.theme.muted(&format!("Persona instructions ({}):", source)));
                println!("{}", self.state.instructions());
            }
            Input::ResetInstructions => {
                self.state.set_instructions(None);
                println!("{}", self.theme.muted("Persona instructions reset to the template."));
            }
            Input::SetInstructions(text) => {
                self.state.set_instructions(Some(text));
                println!("{}", self.theme.muted("Persona instructions updated."));
            }
            Input::Theme(name) => match Theme::parse(&name) {
                Some(theme) => {
                    self.theme = theme;
                    println!("{}", self.theme.muted(&format!("Theme: {}", theme.name())));
                }
                None => println!("{}", "Usage: /theme <light|dark>".yellow()),
            },
            Input::Save(file) => {
                let file = file.unwrap_or_else(|| DEFAULT_TRANSCRIPT_FILE.to_string());
                self.controller.save(&mut self.state, &file);
                self.print_notices();
            }
            Input::Load(path) => self.load_file(path),
            Input::Restore(index) => {
                if self.controller.restore(&mut self.state, index) {
                    self.print_notices();
                    self.print_history();
                } else {
                    self.print_notices();
                }
            }
            Input::Invalid(message) => println!("{}", message.yellow()),
        }
        true
    }
}

pub async fn execute(args: ChatArgs) -> Result<()> {
    let state = args.initial_state()?;
    let config = args.llm_config();

    info!(
        session = %state.id,
        model = %state.model,
        ollama = %config.ollama_host,
        hosted_key = config.openai_api_key.is_some(),
        "Starting chat session"
    );

    let controller = SessionController::new(
        Backends::from_config(&config),
        TranscriptStore::new(&args.conversations_dir),
    );

    let mut repl = Repl {
        controller,
        state,
        theme: args.theme,
    };

    let mut rl: Editor<CliHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(CliHelper { theme: repl.theme }));

    println!("{}", repl.theme.heading("=== Environmental Awareness Chat ==="));
    println!(
        "{}",
        repl.theme
            .muted("Ask about environmental topics or request specific information. /help lists commands.")
    );
    repl.print_selection();
    repl.print_notices();
    println!();

    if let Some(path) = args.load.clone() {
        repl.load_file(Some(path));
    }

    loop {
        repl.state.await_input();
        match rl.readline(">> ") {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.as_str());
                }
                if !repl.handle(parse_input(&line)).await {
                    break;
                }
                if let Some(helper) = rl.helper_mut() {
                    helper.theme = repl.theme;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type /quit to exit.".yellow());
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }

    println!("{}", repl.theme.heading("Goodbye!"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_lines_are_prompts() {
        assert_eq!(parse_input("  What is biodiversity? "), Input::Prompt("What is biodiversity?".into()));
        assert_eq!(parse_input("   "), Input::Empty);
    }

    #[test]
    fn test_commands_with_arguments() {
        assert_eq!(parse_input("/model llama3.1:8b"), Input::Model("llama3.1:8b".into()));
        assert_eq!(parse_input("/type Case Studies"), Input::ContentType("Case Studies".into()));
        assert_eq!(
            parse_input("/topics Biodiversity,  Air Quality ,"),
            Input::Topics(vec!["Biodiversity".into(), "Air Quality".into()])
        );
        assert_eq!(parse_input("/topics"), Input::Topics(vec![]));
        assert_eq!(parse_input("/restore 2"), Input::Restore(2));
        assert_eq!(parse_input("/save"), Input::Save(None));
        assert_eq!(parse_input("/save mine.json"), Input::Save(Some("mine.json".into())));
        assert_eq!(parse_input("/load a.json"), Input::Load(Some(PathBuf::from("a.json"))));
    }

    #[test]
    fn test_instructions_variants() {
        assert_eq!(parse_input("/instructions"), Input::ShowInstructions);
        assert_eq!(parse_input("/instructions reset"), Input::ResetInstructions);
        assert_eq!(
            parse_input("/instructions Keep it short."),
            Input::SetInstructions("Keep it short.".into())
        );
    }

    #[test]
    fn test_invalid_commands() {
        assert!(matches!(parse_input("/model"), Input::Invalid(_)));
        assert!(matches!(parse_input("/restore two"), Input::Invalid(_)));
        assert!(matches!(parse_input("/dance"), Input::Invalid(msg) if msg.contains("/dance")));
    }

    #[test]
    fn test_initial_state_from_args() {
        use clap::Parser;

        #[derive(Parser)]
        struct Harness {
            #[command(flatten)]
            args: ChatArgs,
        }

        let harness = Harness::try_parse_from([
            "eco",
            "--name",
            "Ada",
            "--model",
            "gemma2:2b",
            "--topic",
            "ocean conservation",
            "--content-type",
            "debates",
            "--difficulty",
            "advanced",
        ])
        .unwrap();
        let state = harness.args.initial_state().unwrap();

        assert_eq!(state.user_name, "Ada");
        assert_eq!(state.model, "gemma2:2b");
        assert_eq!(state.plan.topics, vec!["Ocean Conservation"]);
        assert_eq!(state.plan.content_type, "Debates");
        assert_eq!(state.plan.difficulty, Difficulty::Advanced);
    }

    #[test]
    fn test_unknown_topic_is_rejected() {
        use clap::Parser;

        #[derive(Parser)]
        struct Harness {
            #[command(flatten)]
            args: ChatArgs,
        }

        let harness = Harness::try_parse_from(["eco", "--topic", "Asteroids"]).unwrap();
        assert!(harness.args.initial_state().is_err());
    }
}
