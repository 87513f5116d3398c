//! Outbound prompt assembly

use crate::context::ConversationContext;
use crate::resolver::Resolution;
use llm::ChatMessage;

pub const DEFAULT_HISTORY_WINDOW: usize = 3;

/// The user message sent in place of the raw request when it targets a
/// known section.
pub fn section_directive(name: &str, id: &str) -> String {
    format!(
        "I want to change section '{}', id = {}. Tell me what changes are possible.",
        name, id
    )
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_context: String,
    history_window: usize,
}

impl PromptBuilder {
    pub fn new(system_context: impl Into<String>) -> Self {
        Self {
            system_context: system_context.into(),
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    pub fn with_history_window(mut self, history_window: usize) -> Self {
        self.history_window = history_window;
        self
    }

    pub fn system_context(&self) -> &str {
        &self.system_context
    }

    pub fn history_window(&self) -> usize {
        self.history_window
    }

    /// `[system context, directive or utterance, document, ...recent history]`
    ///
    /// `history` should already hold the turn being asked about.
    pub fn build(
        &self,
        resolution: &Resolution,
        utterance: &str,
        document: &str,
        history: &impl ConversationContext,
    ) -> Vec<ChatMessage> {
        let request = match resolution {
            Resolution::Resolved { name, id } => section_directive(name, id),
            Resolution::Unresolved { .. } | Resolution::Untargeted => utterance.to_string(),
        };

        let mut messages = Vec::with_capacity(3 + self.history_window);
        messages.push(ChatMessage::system(self.system_context.as_str()));
        messages.push(ChatMessage::user(request));
        messages.push(ChatMessage::user(document));
        messages.extend(history.recent(self.history_window));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::DocumentSession;
    use llm::Role;

    fn session_with_turns(turns: usize) -> DocumentSession {
        let mut session = DocumentSession::new();
        for i in 0..turns {
            let mut tx = session.begin();
            tx.add(ChatMessage::user(format!("question {}", i)));
            tx.add(ChatMessage::assistant(format!("answer {}", i)));
            session.commit(tx);
        }
        session
    }

    #[test]
    fn test_untargeted_prompt_carries_utterance() {
        let session = session_with_turns(0);
        let mut tx = session.begin();
        tx.add(ChatMessage::user("Write a project plan"));
        let context = session.transaction_context(&tx);

        let prompt = PromptBuilder::new("dataset\nspec").build(
            &Resolution::Untargeted,
            "Write a project plan",
            session.document(),
            &context,
        );

        assert_eq!(
            prompt,
            vec![
                ChatMessage::system("dataset\nspec"),
                ChatMessage::user("Write a project plan"),
                ChatMessage::user("Empty text"),
                ChatMessage::user("Write a project plan"),
            ]
        );
        tx.rollback();
    }

    #[test]
    fn test_resolved_prompt_carries_directive() {
        let session = session_with_turns(0);
        let resolution = Resolution::Resolved {
            name: "Overview".to_string(),
            id: "s1".to_string(),
        };

        let prompt = PromptBuilder::new("ctx").build(&resolution, "section 'Overview'", "doc", session.transcript());

        assert_eq!(
            prompt[1].content,
            "I want to change section 'Overview', id = s1. Tell me what changes are possible."
        );
        assert_eq!(prompt[2].content, "doc");
    }

    #[test]
    fn test_unresolved_prompt_falls_back_to_utterance() {
        let session = session_with_turns(0);
        let resolution = Resolution::Unresolved {
            name: "Budget".to_string(),
        };

        let prompt = PromptBuilder::new("ctx").build(&resolution, "add section Budget", "doc", session.transcript());
        assert_eq!(prompt[1].content, "add section Budget");
    }

    #[test]
    fn test_history_is_windowed() {
        let session = session_with_turns(4);
        let mut tx = session.begin();
        tx.add(ChatMessage::user("latest"));
        let context = session.transaction_context(&tx);

        let prompt = PromptBuilder::new("ctx").build(&Resolution::Untargeted, "latest", "doc", &context);

        let history: Vec<_> = prompt[3..].iter().map(|m| (m.role, m.content.as_str())).collect();
        assert_eq!(
            history,
            vec![
                (Role::User, "question 3"),
                (Role::Assistant, "answer 3"),
                (Role::User, "latest"),
            ]
        );
        tx.rollback();
    }

    #[test]
    fn test_custom_window() {
        let session = session_with_turns(2);
        let prompt = PromptBuilder::new("ctx")
            .with_history_window(0)
            .build(&Resolution::Untargeted, "hi", "doc", session.transcript());
        assert_eq!(prompt.len(), 3);
    }
}
