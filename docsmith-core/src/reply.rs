//! Buffering of streamed replies
//!
//! Payload extraction needs the closing `</sections>` tag, so nothing looks
//! at a reply until the stream has ended. The end of the stream is the
//! completion signal; an error item aborts the reply.

use futures::StreamExt;
use llm::{ChatChunk, ChatStream};
use tracing::trace;

/// A complete reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// Number of non-empty fragments the reply arrived in
    pub fragments: usize,
}

#[derive(Debug, Default)]
pub struct ReplyBuffer {
    text: String,
    fragments: usize,
}

impl ReplyBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &ChatChunk) {
        let text = chunk.get_text();
        if text.is_empty() {
            return;
        }
        self.text.push_str(text);
        self.fragments += 1;
    }

    /// Text received so far
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn finish(self) -> Reply {
        Reply {
            text: self.text,
            fragments: self.fragments,
        }
    }
}

/// Drive `stream` to its end, handing each fragment to `on_fragment`.
///
/// The first error item ends collection and is returned; the partial text is
/// dropped.
pub async fn collect_reply<F>(mut stream: ChatStream, mut on_fragment: F) -> anyhow::Result<Reply>
where
    F: FnMut(&str),
{
    let mut buffer = ReplyBuffer::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if !chunk.get_text().is_empty() {
            on_fragment(chunk.get_text());
        }
        buffer.push(&chunk);
    }

    let reply = buffer.finish();
    trace!("Reply complete: {} fragments, {} bytes", reply.fragments, reply.text.len());
    Ok(reply)
}
