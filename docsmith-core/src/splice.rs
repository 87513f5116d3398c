//! In-place replacement of one section of a marked document.
//!
//! A marked span looks like
//!
//! ```text
//! <section id='s1' name='Overview'>
//! body
//! </section>
//! ```
//!
//! Markers are matched byte-for-byte; nothing outside the span is touched.

use std::ops::Range;
use tracing::{debug, warn};

pub const CLOSING_MARKER: &str = "</section>";

pub fn opening_marker(id: &str, name: &str) -> String {
    format!("<section id='{}' name='{}'>", id, name)
}

/// Byte range from the start of the opening marker to the start of the
/// first closing marker after it.
pub fn locate_section(document: &str, id: &str, name: &str) -> Option<Range<usize>> {
    let opening = opening_marker(id, name);
    let start = document.find(&opening)?;
    let body_start = start + opening.len();
    let end = body_start + document[body_start..].find(CLOSING_MARKER)?;
    Some(start..end)
}

/// Replace the body of section `id`/`name` with `body`.
///
/// Returns `document` unchanged when the markers are missing or `body` is
/// empty.
pub fn splice_section(document: &str, id: &str, name: &str, body: &str) -> String {
    if body.is_empty() {
        debug!("Empty body for section {} ({}), document left as is", name, id);
        return document.to_string();
    }

    let Some(span) = locate_section(document, id, name) else {
        warn!(
            "Section {} ({}) has no marker span in the document, edit dropped",
            name, id
        );
        return document.to_string();
    };

    let opening = opening_marker(id, name);
    let mut out = String::with_capacity(document.len() + body.len());
    out.push_str(&document[..span.start]);
    out.push_str(&opening);
    out.push('\n');
    out.push_str(body);
    out.push('\n');
    out.push_str(&document[span.end..]);
    out
}
