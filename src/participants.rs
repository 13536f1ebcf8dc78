use std::{fs, path::PathBuf, sync::Arc};

use tracing::error;

use crate::config::ParticipantsConfig;

/// Where the names to pick from come from.
pub trait ParticipantSource: Send + Sync {
    fn list_participants(&self) -> Vec<String>;
}

/// A fixed list, loaded once.
pub struct StaticParticipants(pub Vec<String>);

impl ParticipantSource for StaticParticipants {
    fn list_participants(&self) -> Vec<String> {
        self.0.clone()
    }
}

/// Re-reads the file on every call so edits show up without a restart.
pub struct FileParticipants {
    path: PathBuf,
}

impl FileParticipants {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ParticipantSource for FileParticipants {
    fn list_participants(&self) -> Vec<String> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) => {
                error!(path = %self.path.display(), error = %err, "participants unreadable, treating as empty");
                return Vec::new();
            }
        };

        match parse(&text) {
            Ok(names) => names,
            Err(err) => {
                error!(path = %self.path.display(), error = %err, "participants malformed, treating as empty");
                Vec::new()
            }
        }
    }
}

/// Either a JSON array of strings or one name per line (`#` starts a comment).
pub fn parse(text: &str) -> Result<Vec<String>, serde_json::Error> {
    if text.trim_start().starts_with('[') {
        let names: Vec<String> = serde_json::from_str(text)?;
        return Ok(names
            .into_iter()
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty())
            .collect());
    }

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect())
}

pub fn from_config(config: &ParticipantsConfig) -> Arc<dyn ParticipantSource> {
    match config {
        ParticipantsConfig::Inline(names) => Arc::new(StaticParticipants(names.clone())),
        ParticipantsConfig::File(path) => Arc::new(FileParticipants::new(path.clone())),
    }
}
