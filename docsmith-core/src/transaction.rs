//! Per-turn write buffer
//!
//! A turn touches three pieces of session state: the transcript, the
//! section registry and the document. `TurnTransaction` holds every change
//! a turn wants to make until the turn succeeds, so that a failed
//! generation call leaves the session exactly as it was.
//!
//! ```ignore
//! let mut tx = session.begin();
//! tx.add(ChatMessage::user(utterance));
//! // ... generation, extraction ...
//! tx.stage_registration(registration);
//! tx.replace_document(rendered);
//! tx.add(ChatMessage::assistant(reply));
//! session.commit(tx);
//! ```

use crate::registry::Registration;
use llm::ChatMessage;
use tracing::warn;

/// Everything a finished turn hands back to the session
#[derive(Debug, Default)]
pub struct TurnChanges {
    pub messages: Vec<ChatMessage>,
    pub registration: Registration,
    pub document: Option<String>,
}

pub struct TurnTransaction {
    pending: Vec<ChatMessage>,
    registration: Registration,
    document: Option<String>,
    finalized: bool,
}

impl TurnTransaction {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            registration: Registration::default(),
            document: None,
            finalized: false,
        }
    }

    /// Add a transcript message to the turn
    ///
    /// # Panics
    /// Panics if the transaction has already been committed or rolled back
    pub fn add(&mut self, message: ChatMessage) {
        assert!(!self.finalized, "Cannot add to finalized transaction");
        self.pending.push(message);
    }

    /// Registry additions to apply on commit. Replaces any earlier staging.
    pub fn stage_registration(&mut self, registration: Registration) {
        assert!(!self.finalized, "Cannot add to finalized transaction");
        self.registration = registration;
    }

    /// New document text to install on commit
    pub fn replace_document(&mut self, document: String) {
        assert!(!self.finalized, "Cannot add to finalized transaction");
        self.document = Some(document);
    }

    pub fn pending(&self) -> &[ChatMessage] {
        &self.pending
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    /// Number of pending messages
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn has_changes(&self) -> bool {
        !self.pending.is_empty() || !self.registration.is_empty() || self.document.is_some()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Consume the transaction, returning everything it staged
    pub fn commit(mut self) -> TurnChanges {
        self.finalized = true;
        TurnChanges {
            messages: std::mem::take(&mut self.pending),
            registration: std::mem::take(&mut self.registration),
            document: self.document.take(),
        }
    }

    /// Discard everything the turn staged
    pub fn rollback(mut self) {
        self.finalized = true;
        self.pending.clear();
        self.registration = Registration::default();
        self.document = None;
    }
}

impl Default for TurnTransaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TurnTransaction {
    fn drop(&mut self) {
        if !self.finalized && self.has_changes() {
            warn!(
                "Turn dropped without commit/rollback ({} messages, {} sections, document {}) lost",
                self.pending.len(),
                self.registration.added.len(),
                if self.document.is_some() { "replacement" } else { "unchanged" }
            );
        }
    }
}
