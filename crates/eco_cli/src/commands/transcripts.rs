//! Transcripts command - Inspect a saved transcript collection.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use eco_chat::TranscriptStore;

#[derive(Args)]
pub struct TranscriptsArgs {
    /// Transcript collection file
    file: PathBuf,

    /// Print the messages of this transcript
    #[arg(short, long)]
    show: Option<usize>,
}

pub async fn execute(args: TranscriptsArgs) -> Result<()> {
    info!("Reading transcripts from {:?}", args.file);

    let transcripts = TranscriptStore::load_file(&args.file)
        .with_context(|| format!("Failed to read transcripts from {}", args.file.display()))?;

    if transcripts.is_empty() {
        println!("No valid conversations found in {}", args.file.display());
        return Ok(());
    }

    match args.show {
        None => {
            println!("{} conversations in {}", transcripts.len(), args.file.display());
            for (index, transcript) in transcripts.iter().enumerate() {
                println!(
                    "  [{}] {}  ({} messages)",
                    index,
                    transcript.timestamp,
                    transcript.messages.len()
                );
            }
        }
        Some(index) => {
            let transcript = transcripts.get(index).with_context(|| {
                format!(
                    "Invalid transcript index {} (file has {})",
                    index,
                    transcripts.len()
                )
            })?;
            println!("{}", transcript.timestamp);
            for message in &transcript.messages {
                println!();
                println!("[{}]", message.role);
                println!("{}", message.content);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eco_chat::Message;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_lists_saved_transcripts() {
        let temp = tempdir().unwrap();
        let store = TranscriptStore::new(temp.path());
        let report = store.save(&[Message::user("Eco-Learner: hi")], "s.json").unwrap();

        let args = TranscriptsArgs {
            file: report.path.clone(),
            show: None,
        };
        assert!(execute(args).await.is_ok());

        let args = TranscriptsArgs {
            file: report.path,
            show: Some(3),
        };
        assert!(execute(args).await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();

        let args = TranscriptsArgs { file: path, show: None };
        let err = execute(args).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Transcript format error"));
    }
}
