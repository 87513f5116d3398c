//! Section-addressable document synchronization for docsmith
//!
//! This crate provides:
//! - **Payload**: `Payload::parse` and `extract_payload` for the `<sections>` markup models reply with
//! - **Registry**: `SectionRegistry`, the add-only name → id map
//! - **Resolver**: `SectionResolver`, which finds the section a request names
//! - **Rendering**: markdown and marked document forms, plus `splice_section` for in-place edits
//! - **Sessions**: `DocumentSession` and `TurnTransaction` for all-or-nothing turns
//! - **Orchestrator**: `Orchestrator::handle_turn`, which runs one user turn end to end
//!
//! # Example
//!
//! ```ignore
//! use docsmith_core::{DocumentSession, Orchestrator};
//!
//! let mut session = DocumentSession::new();
//! let (events, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let outcome = orchestrator.handle_turn(&mut session, "Write a project plan", &events).await;
//! println!("{}", session.document());
//! ```
pub mod audit_log;
pub mod context;
pub mod extractor;
pub mod orchestrator;
pub mod payload;
pub mod prompt;
pub mod registry;
pub mod render;
pub mod reply;
pub mod resolver;
pub mod seed;
pub mod session;
pub mod splice;
pub mod transaction;

pub use audit_log::AuditLog;
pub use context::{ConversationContext, TransactionContext};
pub use extractor::{extract_payload, extract_payload_block};
pub use orchestrator::{Orchestrator, OrchestratorConfig, TurnEvent, TurnOutcome};
pub use payload::{Payload, PayloadError, Section, Subsection};
pub use prompt::PromptBuilder;
pub use registry::{Registration, SectionRegistry};
pub use render::{EMPTY_DOCUMENT, render_markdown, render_marked, render_payload_xml};
pub use reply::{Reply, ReplyBuffer, collect_reply};
pub use resolver::{Resolution, SectionResolver};
pub use seed::SeedContext;
pub use session::{DocumentSession, Transcript};
pub use splice::splice_section;
pub use transaction::TurnTransaction;
