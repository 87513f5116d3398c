//! Per-user session state
//!
//! A `DocumentSession` owns the transcript, the section registry and the
//! document for one user. Nothing is shared between sessions; dropping the
//! session ends it.

use crate::context::{ConversationContext, TransactionContext};
use crate::registry::SectionRegistry;
use crate::render::EMPTY_DOCUMENT;
use crate::transaction::TurnTransaction;
use llm::ChatMessage;
use tracing::{debug, info};

/// Append-only list of user and assistant turns
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    fn extend(&mut self, messages: impl IntoIterator<Item = ChatMessage>) {
        self.messages.extend(messages);
    }
}

impl ConversationContext for Transcript {
    fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    fn len(&self) -> usize {
        self.messages.len()
    }
}

pub struct DocumentSession {
    id: String,
    transcript: Transcript,
    registry: SectionRegistry,
    document: String,
}

impl DocumentSession {
    /// Start a session with an empty transcript and registry, and the empty
    /// document placeholder.
    pub fn new() -> Self {
        Self::with_document(EMPTY_DOCUMENT)
    }

    /// Start a session over existing document text
    pub fn with_document(document: impl Into<String>) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        debug!("Session {} started", id);
        Self {
            id,
            transcript: Transcript::new(),
            registry: SectionRegistry::new(),
            document: document.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn registry(&self) -> &SectionRegistry {
        &self.registry
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    /// Begin a new turn
    pub fn begin(&self) -> TurnTransaction {
        TurnTransaction::new()
    }

    /// Committed transcript followed by the turn's pending messages
    pub fn transaction_context<'a>(&'a self, transaction: &'a TurnTransaction) -> TransactionContext<'a> {
        TransactionContext::new(self.transcript.messages(), transaction)
    }

    /// Apply everything the turn staged
    pub fn commit(&mut self, transaction: TurnTransaction) {
        let changes = transaction.commit();

        self.registry.apply(&changes.registration);
        if let Some(document) = changes.document {
            if document != self.document {
                info!("Session {}: document updated ({} bytes)", self.id, document.len());
            }
            self.document = document;
        }
        self.transcript.extend(changes.messages);
    }
}

impl Default for DocumentSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DocumentSession {
    fn drop(&mut self) {
        debug!(
            "Session {} ended ({} messages, {} sections)",
            self.id,
            self.transcript.len(),
            self.registry.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{Payload, Section};

    #[test]
    fn test_new_session_is_empty() {
        let session = DocumentSession::new();
        assert!(session.transcript().is_empty());
        assert!(session.registry().is_empty());
        assert_eq!(session.document(), EMPTY_DOCUMENT);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let mut first = DocumentSession::new();
        let second = DocumentSession::new();
        assert_ne!(first.id(), second.id());

        let mut tx = first.begin();
        tx.add(ChatMessage::user("Hello"));
        tx.replace_document("changed".to_string());
        first.commit(tx);

        assert_eq!(first.transcript().len(), 1);
        assert!(second.transcript().is_empty());
        assert_eq!(second.document(), EMPTY_DOCUMENT);
    }

    #[test]
    fn test_commit_applies_all_changes() {
        let mut session = DocumentSession::new();
        let mut tx = session.begin();
        tx.add(ChatMessage::user("Write an overview"));
        tx.stage_registration(
            session
                .registry()
                .plan(&Payload::new(vec![Section::new("s1", "Overview", "Hello")])),
        );
        tx.replace_document("## Overview (ID: s1)\n\nHello".to_string());
        tx.add(ChatMessage::assistant("<sections>...</sections>"));
        session.commit(tx);

        assert_eq!(session.transcript().len(), 2);
        assert_eq!(session.registry().lookup("Overview"), Some("s1"));
        assert_eq!(session.document(), "## Overview (ID: s1)\n\nHello");
    }

    #[test]
    fn test_rollback_leaves_session_untouched() {
        let session = DocumentSession::with_document("original");
        let mut tx = session.begin();
        tx.add(ChatMessage::user("Hello"));
        tx.replace_document("changed".to_string());
        tx.rollback();

        assert!(session.transcript().is_empty());
        assert_eq!(session.document(), "original");
    }

    #[test]
    fn test_transaction_context_sees_pending_turn() {
        let mut session = DocumentSession::new();
        let mut tx = session.begin();
        tx.add(ChatMessage::user("first"));
        tx.add(ChatMessage::assistant("reply"));
        session.commit(tx);

        let mut tx = session.begin();
        tx.add(ChatMessage::user("second"));
        let context = session.transaction_context(&tx);
        assert_eq!(context.len(), 3);
        assert_eq!(context.recent(1)[0].content, "second");

        tx.rollback();
    }
}
