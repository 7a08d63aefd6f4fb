//! Terminal colour themes.
//!
//! The theme only changes how text is painted; it never affects requests
//! or saved transcripts.

use clap::ValueEnum;
use colored::{ColoredString, Colorize};

use eco_chat::{Notice, NoticeLevel};

/// Colour scheme for the REPL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Parse a theme name, ignoring case
    pub fn parse(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name.trim(), true).ok()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Light => "Light",
            Self::Dark => "Dark",
        }
    }

    pub fn heading(&self, text: &str) -> ColoredString {
        match self {
            Self::Light => text.green().bold(),
            Self::Dark => text.bright_green().bold(),
        }
    }

    pub fn user(&self, text: &str) -> ColoredString {
        match self {
            Self::Light => text.blue(),
            Self::Dark => text.bright_cyan(),
        }
    }

    pub fn assistant(&self, text: &str) -> ColoredString {
        match self {
            Self::Light => text.normal(),
            Self::Dark => text.white().on_truecolor(0x1e, 0x1e, 0x1e),
        }
    }

    pub fn muted(&self, text: &str) -> ColoredString {
        match self {
            Self::Light => text.bright_black(),
            Self::Dark => text.bright_black().on_truecolor(0x1e, 0x1e, 0x1e),
        }
    }

    pub fn notice(&self, notice: &Notice) -> ColoredString {
        let text = notice.message.as_str();
        match notice.level {
            NoticeLevel::Success => text.green(),
            NoticeLevel::Info => text.cyan(),
            NoticeLevel::Warning => text.yellow(),
            NoticeLevel::Error => text.red(),
        }
    }
}
