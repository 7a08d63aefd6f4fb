//! Transcript persistence.
//!
//! Conversations are saved as transcript collections under the
//! conversations directory:
//!
//! ```text
//! conversations/
//! └── environmental_education_session.json   # [{timestamp, messages}, ...]
//! ```
//!
//! Saving appends one transcript to whatever collection the target already
//! holds. Files are not locked; a concurrent writer to the same file can
//! lose entries.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{ChatError, ChatResult};
use crate::types::{Message, Transcript};

/// Directory transcripts are written to unless configured otherwise
pub const DEFAULT_CONVERSATIONS_DIR: &str = "conversations";

/// File name offered for saving
pub const DEFAULT_TRANSCRIPT_FILE: &str = "environmental_education_session.json";

/// Outcome of a successful save
#[derive(Debug)]
pub struct SaveReport {
    /// File that was written
    pub path: PathBuf,
    /// Number of transcripts now in the file
    pub transcripts: usize,
    /// Set when existing contents were unreadable and replaced
    pub discarded: Option<ChatError>,
}

/// Reads and writes transcript collections
#[derive(Debug, Clone)]
pub struct TranscriptStore {
    root: PathBuf,
}

impl TranscriptStore {
    /// Create a store writing into `root`
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Resolve a save target inside the conversations directory
    pub fn target_path(&self, filename: &str) -> ChatResult<PathBuf> {
        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Ok(self.root.join(name)),
            _ => Err(ChatError::InvalidFilename(filename.to_string())),
        }
    }

    /// Append a transcript of `messages` to `filename`.
    ///
    /// Creates the directory and file when missing. An existing file that is
    /// not a transcript collection is replaced by a new one-element
    /// collection and reported through [`SaveReport::discarded`].
    pub fn save(&self, messages: &[Message], filename: &str) -> ChatResult<SaveReport> {
        let path = self.target_path(filename)?;
        fs::create_dir_all(&self.root)?;

        let (mut collection, discarded) = if path.exists() {
            let content = fs::read(&path)?;
            match parse_collection(&content) {
                Ok(existing) => (existing, None),
                Err(e) => {
                    warn!("Existing transcript file {:?} is unreadable, starting a new collection: {}", path, e);
                    (Vec::new(), Some(e))
                }
            }
        } else {
            (Vec::new(), None)
        };

        collection.push(Transcript::now(messages));

        let content = serde_json::to_string_pretty(&collection)?;
        fs::write(&path, content)?;

        debug!("Saved transcript {} to {:?}", collection.len(), path);

        Ok(SaveReport {
            path,
            transcripts: collection.len(),
            discarded,
        })
    }

    /// Parse uploaded bytes as a transcript collection.
    ///
    /// `None` and zero-length input are [`ChatError::MissingInput`];
    /// anything that is not a collection is [`ChatError::Format`].
    pub fn load(source: Option<&[u8]>) -> ChatResult<Vec<Transcript>> {
        match source {
            Some(bytes) if !bytes.is_empty() => parse_collection(bytes),
            _ => Err(ChatError::MissingInput),
        }
    }

    /// Read a collection from a file on disk
    pub fn load_file(path: impl AsRef<Path>) -> ChatResult<Vec<Transcript>> {
        let bytes = fs::read(path.as_ref())?;
        Self::load(Some(bytes.as_slice()))
    }
}

fn parse_collection(bytes: &[u8]) -> ChatResult<Vec<Transcript>> {
    serde_json::from_slice(bytes).map_err(|e| ChatError::Format(e.to_string()))
}
