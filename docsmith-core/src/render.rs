//! Document rendering
//!
//! Two shapes are produced from a [`Payload`]:
//!
//! - markdown, one `## Name (ID: id)` heading per section, for reading;
//! - marked, one `<section id='..' name='..'>` span per section, which
//!   [`crate::splice`] can later patch in place.

use crate::payload::{Payload, Section};
use crate::splice::{CLOSING_MARKER, opening_marker};
use std::fmt::Write;
use tracing::warn;

/// What the document holds before the first rewrite, and what a payload
/// that fails to parse renders to.
pub const EMPTY_DOCUMENT: &str = "Empty text";

/// Heading used for subsections that came without a `<title>`
pub const DEFAULT_SUBSECTION_TITLE: &str = "Subsection";

fn section_heading(section: &Section) -> String {
    format!("## {} (ID: {})", section.name, section.id)
}

fn push_subsections(out: &mut String, section: &Section) {
    for sub in &section.subsections {
        let title = sub.title.as_deref().unwrap_or(DEFAULT_SUBSECTION_TITLE);
        let _ = write!(out, "### {}\n\n{}\n\n", title, sub.body);
    }
}

/// A section's body followed by its subsections as `###` blocks.
///
/// This is the text that goes between a section's markers.
pub fn section_content(section: &Section) -> String {
    let mut out = String::new();
    if !section.body.is_empty() {
        out.push_str(&section.body);
        out.push_str("\n\n");
    }
    push_subsections(&mut out, section);
    out.trim().to_string()
}

pub fn render_markdown(payload: &Payload) -> String {
    let mut out = String::new();
    for section in &payload.sections {
        let _ = write!(out, "{}\n\n{}\n\n", section_heading(section), section.body);
        push_subsections(&mut out, section);
    }
    out.trim().to_string()
}

/// Parse `xml` and render it as markdown. Never fails: a fragment that does
/// not parse yields [`EMPTY_DOCUMENT`].
pub fn render_payload_xml(xml: &str) -> String {
    match Payload::parse(xml) {
        Ok(payload) => render_markdown(&payload),
        Err(e) => {
            warn!("Rendering empty document, payload did not parse: {}", e);
            EMPTY_DOCUMENT.to_string()
        }
    }
}

pub fn render_marked(payload: &Payload) -> String {
    payload
        .sections
        .iter()
        .map(|section| {
            format!(
                "{}\n{}\n{}",
                opening_marker(&section.id, &section.name),
                section_content(section),
                CLOSING_MARKER
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Read a section's own body back out of [`render_markdown`] output.
///
/// The body runs from the heading carrying `(ID: <id>)` to the next `##` or
/// `###` heading.
pub fn rendered_section_body(markdown: &str, id: &str) -> Option<String> {
    let suffix = format!("(ID: {})", id);
    let mut lines = markdown.lines();

    lines.find(|line| line.starts_with("## ") && line.ends_with(&suffix))?;

    let body: Vec<&str> = lines
        .take_while(|line| !line.starts_with("## ") && !line.starts_with("### "))
        .collect();
    Some(body.join("\n").trim().to_string())
}
