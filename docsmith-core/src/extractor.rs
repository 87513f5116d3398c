//! Pulls the `<sections>` block out of a free-form model reply.

use crate::payload::Payload;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

static PAYLOAD_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<sections(?:\s[^>]*)?>.*?</sections>").expect("payload block pattern")
});

/// The first `<sections>...</sections>` substring of `reply`, untouched.
///
/// Nothing inside the block is checked here; [`Payload::parse`] does that.
pub fn extract_payload_block(reply: &str) -> Option<&str> {
    PAYLOAD_BLOCK_RE.find(reply).map(|m| m.as_str())
}

/// Locate and parse the payload block. A reply without a block, or with a
/// block that fails to parse, yields `None`.
pub fn extract_payload(reply: &str) -> Option<Payload> {
    let Some(block) = extract_payload_block(reply) else {
        debug!("Reply carries no <sections> block");
        return None;
    };

    match Payload::parse(block) {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!("Discarding unparseable <sections> block: {}", e);
            None
        }
    }
}
