//! Audit log of outbound prompts
//!
//! Every prompt sent to the generation service is written to its own file,
//! `messages_<unix-millis>.json`, as a pretty-printed JSON array of
//! `{role, content}` objects. Nothing reads these files back.

use anyhow::Context;
use llm::ChatMessage;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const FILE_PREFIX: &str = "messages_";

#[derive(Debug, Clone)]
pub struct AuditLog {
    dir: Option<PathBuf>,
}

impl AuditLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// An audit log that writes nothing
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Write `messages` to a new file. Returns its path, or `None` when the
    /// log is disabled.
    pub fn record(&self, messages: &[ChatMessage]) -> anyhow::Result<Option<PathBuf>> {
        let Some(dir) = &self.dir else {
            return Ok(None);
        };

        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create audit directory {}", dir.display()))?;

        let json = serde_json::to_string_pretty(messages)?;
        let stamp = chrono::Utc::now().timestamp_millis();

        // Two calls in the same millisecond get -1, -2, ... suffixes
        let mut attempt = 0u32;
        loop {
            let path = dir.join(file_name(stamp, attempt));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(json.as_bytes())
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    debug!("Prompt of {} messages logged to {}", messages.len(), path.display());
                    return Ok(Some(path));
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to create {}", path.display()));
                }
            }
        }
    }
}

fn file_name(stamp: i64, attempt: u32) -> String {
    if attempt == 0 {
        format!("{}{}.json", FILE_PREFIX, stamp)
    } else {
        format!("{}{}-{}.json", FILE_PREFIX, stamp, attempt)
    }
}
