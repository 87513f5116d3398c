//! Read-only views of the conversation transcript
//!
//! Prompt assembly only ever reads the transcript, so it takes a
//! `ConversationContext` rather than the session itself. The committed
//! transcript and a turn in flight are both contexts.

use crate::transaction::TurnTransaction;
use llm::ChatMessage;

/// Read-only view of conversation messages, oldest first
pub trait ConversationContext {
    fn iter(&self) -> impl Iterator<Item = &ChatMessage>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The last `n` messages, oldest first
    fn recent(&self, n: usize) -> Vec<ChatMessage> {
        let skip = self.len().saturating_sub(n);
        self.iter().skip(skip).cloned().collect()
    }
}

/// Committed messages followed by the messages of a turn in flight
pub struct TransactionContext<'a> {
    committed: &'a [ChatMessage],
    transaction: &'a TurnTransaction,
}

impl<'a> TransactionContext<'a> {
    pub fn new(committed: &'a [ChatMessage], transaction: &'a TurnTransaction) -> Self {
        Self {
            committed,
            transaction,
        }
    }
}

impl ConversationContext for TransactionContext<'_> {
    fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.committed.iter().chain(self.transaction.pending().iter())
    }

    fn len(&self) -> usize {
        self.committed.len() + self.transaction.len()
    }
}
