use async_trait::async_trait;
use docsmith_core::payload::Section;
use docsmith_core::render::rendered_section_body;
use docsmith_core::splice::locate_section;
use docsmith_core::{
    AuditLog, ConversationContext, DocumentSession, Orchestrator, OrchestratorConfig, Payload,
    PromptBuilder, Resolution, SectionResolver, TurnEvent, TurnOutcome, render_markdown,
    splice_section,
};
use futures::stream;
use llm::{ChatChunk, ChatMessage, ChatModel, ChatRequest, ChatStream, LlmError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Replies with canned text, one script entry per call
struct CannedModel {
    replies: Mutex<VecDeque<anyhow::Result<String>>>,
}

impl CannedModel {
    fn new(replies: Vec<anyhow::Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
        })
    }
}

#[async_trait]
impl ChatModel for CannedModel {
    fn name(&self) -> &str {
        "canned"
    }

    async fn chat(&self, _request: &ChatRequest) -> anyhow::Result<ChatMessage> {
        anyhow::bail!("streaming only")
    }

    async fn stream_chat(&self, _request: &ChatRequest) -> anyhow::Result<ChatStream> {
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow::anyhow!("no reply left")))?;

        // Split the reply so extraction only works on the buffered whole
        let mid = reply.char_indices().nth(reply.chars().count() / 2).map_or(0, |(i, _)| i);
        let (head, tail) = reply.split_at(mid);
        Ok(Box::pin(stream::iter(vec![
            Ok(ChatChunk::assistant(head)),
            Ok(ChatChunk::assistant(tail)),
        ])))
    }
}

fn orchestrator(model: Arc<CannedModel>, config: OrchestratorConfig) -> Orchestrator {
    Orchestrator::new(
        model,
        PromptBuilder::new("dataset\nspecification"),
        SectionResolver::default(),
        AuditLog::disabled(),
        config,
    )
}

#[tokio::test]
async fn test_untargeted_turn_builds_document_from_payload() {
    let model = CannedModel::new(vec![Ok(
        r#"<sections><section id="s1" name="Overview">Hello</section></sections>"#.to_string(),
    )]);
    let orchestrator = orchestrator(model, OrchestratorConfig::default());
    let mut session = DocumentSession::new();
    let (events, _rx) = mpsc::unbounded_channel();

    let outcome = orchestrator
        .handle_turn(&mut session, "Write the first draft", &events)
        .await;

    assert!(outcome.is_completed());
    let registry: Vec<_> = session.registry().iter().collect();
    assert_eq!(registry, vec![("Overview", "s1")]);
    assert_eq!(session.document(), "## Overview (ID: s1)\n\nHello\n\n".trim());
}

#[tokio::test]
async fn test_targeted_turn_splices_only_its_section() {
    let document = "Preamble\n<section id='s1' name='Overview'>Hello</section>\nAppendix";
    let model = CannedModel::new(vec![
        Ok(r#"Updated:
<sections><section id="s1" name="Overview">World</section></sections>"#
            .to_string()),
    ]);
    let orchestrator = orchestrator(
        model,
        OrchestratorConfig {
            document_format: config::DocumentFormat::Marked,
            ..Default::default()
        },
    );
    let mut session = DocumentSession::with_document(document);
    let (events, _rx) = mpsc::unbounded_channel();

    // Overview is known from an earlier turn
    let mut tx = session.begin();
    tx.stage_registration(session.registry().plan(&Payload::new(vec![Section::new(
        "s1", "Overview", "",
    )])));
    session.commit(tx);

    let outcome = orchestrator
        .handle_turn(&mut session, "Change section 'Overview' please", &events)
        .await;

    let TurnOutcome::Completed { resolution, document_changed, .. } = outcome else {
        panic!("turn failed: {:?}", outcome);
    };
    assert_eq!(
        resolution,
        Resolution::Resolved {
            name: "Overview".to_string(),
            id: "s1".to_string(),
        }
    );
    assert!(document_changed);
    assert_eq!(
        session.document(),
        "Preamble\n<section id='s1' name='Overview'>\nWorld\n</section>\nAppendix"
    );
}

#[tokio::test]
async fn test_rate_limit_leaves_session_untouched() {
    let model = CannedModel::new(vec![Err(LlmError::RateLimited {
        limit: Some("30000".to_string()),
        message: "Request too large".to_string(),
    }
    .into())]);
    let orchestrator = orchestrator(model, OrchestratorConfig::default());
    let mut session = DocumentSession::new();
    let (events, mut rx) = mpsc::unbounded_channel();

    let outcome = orchestrator.handle_turn(&mut session, "Draft", &events).await;

    assert!(!outcome.is_completed());
    assert!(session.transcript().is_empty());
    assert!(session.registry().is_empty());
    assert_eq!(session.document(), docsmith_core::EMPTY_DOCUMENT);

    let mut saw_error = false;
    while let Ok(event) = rx.try_recv() {
        if let TurnEvent::Error(message) = event {
            assert!(message.contains("30000"));
            saw_error = true;
        }
    }
    assert!(saw_error);
}

#[tokio::test]
async fn test_session_survives_failure_and_continues() {
    let model = CannedModel::new(vec![
        Err(anyhow::anyhow!("connection refused")),
        Ok(r#"<sections><section id="a" name="Aims">Ship it</section></sections>"#.to_string()),
    ]);
    let orchestrator = orchestrator(model, OrchestratorConfig::default());
    let mut session = DocumentSession::new();
    let (events, _rx) = mpsc::unbounded_channel();

    assert!(!orchestrator.handle_turn(&mut session, "Draft", &events).await.is_completed());
    assert!(orchestrator.handle_turn(&mut session, "Draft", &events).await.is_completed());

    assert_eq!(session.transcript().len(), 2);
    assert_eq!(session.registry().lookup("Aims"), Some("a"));
}

#[test]
fn test_rendered_bodies_round_trip() {
    let payload = Payload::parse(
        r#"<sections>
            <section id="s1" name="Overview">The system keeps documents in sync.</section>
            <section id="s2" name="Scope">
                Parsing and splicing.
                <sub_section><title>Out of scope</title>Fuzzy matching</sub_section>
            </section>
        </sections>"#,
    )
    .unwrap();
    let markdown = render_markdown(&payload);

    for section in &payload.sections {
        assert_eq!(
            rendered_section_body(&markdown, &section.id).as_deref(),
            Some(section.body.as_str())
        );
    }
}

#[test]
fn test_splice_preserves_text_outside_span() {
    let document = "# Plan\n\n<section id='s2' name='Scope'>\nold scope\n</section>\n\nSign-off: pending\n";
    let span = locate_section(document, "s2", "Scope").unwrap();
    let spliced = splice_section(document, "s2", "Scope", "new scope");

    let expected = format!(
        "{}{}\nnew scope\n{}",
        &document[..span.start],
        "<section id='s2' name='Scope'>",
        &document[span.end..]
    );
    assert_eq!(spliced, expected);

    assert_eq!(splice_section(document, "s9", "Scope", "x"), document);
    assert_eq!(splice_section(document, "s2", "Scope", ""), document);
}
