//! Conversation turn handling
//!
//! One call to [`Orchestrator::handle_turn`] runs a whole user turn:
//! resolve the request, build and log the prompt, stream the reply, then
//! update the registry and the document from whatever payload the reply
//! carries. All session changes go through a [`TurnTransaction`], so a turn
//! that fails at the transport leaves the session untouched.
//!
//! [`TurnTransaction`]: crate::transaction::TurnTransaction

use crate::audit_log::AuditLog;
use crate::extractor::extract_payload;
use crate::payload::Payload;
use crate::prompt::PromptBuilder;
use crate::registry::Registration;
use crate::render::{render_markdown, render_marked};
use crate::reply::collect_reply;
use crate::resolver::{Resolution, SectionResolver};
use crate::session::DocumentSession;
use crate::splice::splice_section;
use config::DocumentFormat;
use llm::{ChatMessage, ChatModel, ChatRequest, LlmError};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Progress of a turn, in the order it happens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// Status line for the user: resolution result, registry changes, ...
    Notice(String),
    /// A streamed fragment of the reply
    Fragment(String),
    /// The turn was aborted; the session is unchanged
    Error(String),
    /// The turn was committed
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed {
        resolution: Resolution,
        document_changed: bool,
        /// `(name, id)` pairs the registry gained this turn
        registered: Vec<(String, String)>,
    },
    Failed {
        message: String,
    },
}

impl TurnOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TurnOutcome::Completed { .. })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    pub temperature: f32,
    /// Shape of the document after an untargeted rewrite
    pub document_format: DocumentFormat,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            document_format: DocumentFormat::Markdown,
        }
    }
}

pub struct Orchestrator {
    model: Arc<dyn ChatModel + Send + Sync>,
    prompt: PromptBuilder,
    resolver: SectionResolver,
    audit_log: AuditLog,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn ChatModel + Send + Sync>,
        prompt: PromptBuilder,
        resolver: SectionResolver,
        audit_log: AuditLog,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            model,
            prompt,
            resolver,
            audit_log,
            config,
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn set_model(&mut self, model: Arc<dyn ChatModel + Send + Sync>) {
        info!("Switching model to {}", model.name());
        self.model = model;
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub async fn handle_turn(
        &self,
        session: &mut DocumentSession,
        utterance: &str,
        events: &mpsc::UnboundedSender<TurnEvent>,
    ) -> TurnOutcome {
        // 1. Work out what the request is about
        let resolution = self.resolver.resolve(utterance, session.registry());
        let _ = events.send(TurnEvent::Notice(resolution_notice(&resolution)));

        // 2. Stage the user turn and build the prompt around it
        let mut tx = session.begin();
        tx.add(ChatMessage::user(utterance));

        let prompt = {
            let context = session.transaction_context(&tx);
            self.prompt
                .build(&resolution, utterance, session.document(), &context)
        };
        if let Err(e) = self.audit_log.record(&prompt) {
            warn!("Failed to write prompt audit log: {:#}", e);
        }

        // 3. Stream the reply
        let request = ChatRequest::new(&prompt).with_temperature(self.config.temperature);
        let reply = match self.generate(&request, events).await {
            Ok(reply) => reply,
            Err(e) => {
                let message = failure_message(&e);
                warn!("Turn aborted: {:#}", e);
                tx.rollback();
                let _ = events.send(TurnEvent::Error(message.clone()));
                return TurnOutcome::Failed { message };
            }
        };

        // 4. Fold the payload, if any, into the registry and document
        let mut document_changed = false;
        let mut registered = Vec::new();
        match extract_payload(&reply) {
            Some(payload) => {
                let registration = session.registry().plan(&payload);
                notify_registration(&registration, events);
                registered = registration.added.clone();
                tx.stage_registration(registration);

                if let Some(document) = self.updated_document(&resolution, &payload, session.document()) {
                    document_changed = document != session.document();
                    tx.replace_document(document);
                }
            }
            None => {
                let _ = events.send(TurnEvent::Notice(
                    "No structured sections in the reply, document unchanged".to_string(),
                ));
            }
        }

        // 5. Record the reply and commit
        tx.add(ChatMessage::assistant(reply));
        session.commit(tx);
        let _ = events.send(TurnEvent::Completed);

        TurnOutcome::Completed {
            resolution,
            document_changed,
            registered,
        }
    }

    async fn generate(
        &self,
        request: &ChatRequest,
        events: &mpsc::UnboundedSender<TurnEvent>,
    ) -> anyhow::Result<String> {
        debug!("Sending {} messages to {}", request.messages().len(), self.model.name());
        let stream = self.model.stream_chat(request).await?;
        let reply = collect_reply(stream, |fragment| {
            let _ = events.send(TurnEvent::Fragment(fragment.to_string()));
        })
        .await?;
        Ok(reply.text)
    }

    /// The document this turn should leave behind, or `None` to keep the
    /// current one.
    fn updated_document(&self, resolution: &Resolution, payload: &Payload, current: &str) -> Option<String> {
        match resolution {
            Resolution::Resolved { name, id } => {
                let Some(body) = payload.section_body(id) else {
                    debug!("Reply has no section with id {}, document unchanged", id);
                    return None;
                };
                if body.is_empty() {
                    debug!("Section {} came back empty, document unchanged", id);
                    return None;
                }
                Some(splice_section(current, id, name, body))
            }
            Resolution::Unresolved { .. } | Resolution::Untargeted => {
                let document = match self.config.document_format {
                    DocumentFormat::Markdown => render_markdown(payload),
                    DocumentFormat::Marked => render_marked(payload),
                };
                info!("Document rewritten from {} sections", payload.len());
                Some(document)
            }
        }
    }
}

fn resolution_notice(resolution: &Resolution) -> String {
    match resolution {
        Resolution::Resolved { name, id } => format!("Found section '{}' with id {}", name, id),
        Resolution::Unresolved { name } => {
            format!("Section '{}' is not registered yet, asking the model", name)
        }
        Resolution::Untargeted => "Request does not name a section, continuing without one".to_string(),
    }
}

fn notify_registration(registration: &Registration, events: &mpsc::UnboundedSender<TurnEvent>) {
    for (name, id) in &registration.added {
        let _ = events.send(TurnEvent::Notice(format!(
            "New section registered: {} with id {}",
            name, id
        )));
    }
    for kept in &registration.kept {
        let _ = events.send(TurnEvent::Notice(format!(
            "Section '{}' already exists with id {}",
            kept.name, kept.existing_id
        )));
    }
}

/// Text shown to the user when the generation call fails
pub fn failure_message(error: &anyhow::Error) -> String {
    match error.chain().find_map(|cause| cause.downcast_ref::<LlmError>()) {
        Some(LlmError::RateLimited { limit, message }) => format!(
            "Rate limit error (HTTP 429). Assigned rate limit: {}\n{}",
            limit.as_deref().unwrap_or("unknown"),
            message
        ),
        Some(other) => format!("Generation failed: {}", other),
        None => format!("Generation failed: {:#}", error),
    }
}
