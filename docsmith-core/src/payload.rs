//! Structured payload parsing
//!
//! The model marks up its document content as
//!
//! ```text
//! <sections>
//!   <section id="s1" name="Overview">
//!     body text
//!     <sub_section><title>Goals</title>subsection body</sub_section>
//!   </section>
//! </sections>
//! ```
//!
//! `quick-xml` tokenizes the fragment; this module folds the events into a
//! typed [`Payload`]. A section body is the text before its first child
//! element; a subsection body is its own text with the title excluded. Both
//! are unescaped and trimmed. Elements the format does not know are
//! skipped together with their content.

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ROOT_TAG: &str = "sections";
const SECTION_TAG: &[u8] = b"section";
const SUBSECTION_TAG: &[u8] = b"sub_section";
const TITLE_TAG: &[u8] = b"title";

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("malformed payload: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("expected <sections> root, found <{0}>")]
    UnexpectedRoot(String),

    #[error("unclosed element <{0}>")]
    Unclosed(String),

    #[error("payload has no root element")]
    Empty,

    #[error("content outside the <sections> root")]
    StrayContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Subsection {
    pub title: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Section {
    /// Value of the `id` attribute, empty when the model left it out
    pub id: String,
    /// Value of the `name` attribute, empty when the model left it out
    pub name: String,
    pub body: String,
    pub subsections: Vec<Subsection>,
}

impl Section {
    pub fn new(id: impl Into<String>, name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            body: body.into(),
            subsections: Vec::new(),
        }
    }

    pub fn with_subsection(mut self, title: Option<&str>, body: impl Into<String>) -> Self {
        self.subsections.push(Subsection {
            title: title.map(str::to_string),
            body: body.into(),
        });
        self
    }
}

/// Sections in the order the model emitted them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Payload {
    pub sections: Vec<Section>,
}

impl Payload {
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    pub fn parse(xml: &str) -> Result<Self, PayloadError> {
        PayloadParser::default().run(xml)
    }

    /// Body of the first section carrying `id`
    pub fn section_body(&self, id: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|section| section.id == id)
            .map(|section| section.body.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }
}

enum Frame {
    Root,
    /// `leading` stays true until the first child element opens
    Section { section: Section, leading: bool },
    Subsection(Subsection),
    Title(String),
    Skipped(String),
}

impl Frame {
    fn tag(&self) -> &str {
        match self {
            Frame::Root => ROOT_TAG,
            Frame::Section { .. } => "section",
            Frame::Subsection(_) => "sub_section",
            Frame::Title(_) => "title",
            Frame::Skipped(name) => name,
        }
    }
}

#[derive(Default)]
struct PayloadParser {
    stack: Vec<Frame>,
    sections: Vec<Section>,
    closed: bool,
}

impl PayloadParser {
    fn run(mut self, xml: &str) -> Result<Payload, PayloadError> {
        let mut reader = Reader::from_str(xml);

        loop {
            match reader.read_event()? {
                Event::Start(start) => self.open(&start)?,
                Event::Empty(start) => {
                    self.open(&start)?;
                    self.close();
                }
                Event::End(_) => self.close(),
                Event::Text(text) => {
                    let text = text.unescape()?;
                    self.text(&text)?;
                }
                Event::CData(data) => {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    self.text(&text)?;
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions
                _ => {}
            }
        }

        if let Some(frame) = self.stack.last() {
            return Err(PayloadError::Unclosed(frame.tag().to_string()));
        }
        if !self.closed {
            return Err(PayloadError::Empty);
        }

        Ok(Payload::new(self.sections))
    }

    fn open(&mut self, start: &BytesStart<'_>) -> Result<(), PayloadError> {
        let name = start.name();
        let name = name.as_ref();

        if let Some(Frame::Section { leading, .. }) = self.stack.last_mut() {
            *leading = false;
        }

        let frame = match self.stack.last() {
            None => {
                if self.closed {
                    return Err(PayloadError::StrayContent);
                }
                if name != ROOT_TAG.as_bytes() {
                    return Err(PayloadError::UnexpectedRoot(
                        String::from_utf8_lossy(name).into_owned(),
                    ));
                }
                Frame::Root
            }
            Some(Frame::Root) if name == SECTION_TAG => {
                let mut section = Section::default();
                for attr in start.attributes() {
                    let attr = attr?;
                    match attr.key.as_ref() {
                        b"id" => section.id = attr.unescape_value()?.into_owned(),
                        b"name" => section.name = attr.unescape_value()?.into_owned(),
                        _ => {}
                    }
                }
                Frame::Section {
                    section,
                    leading: true,
                }
            }
            Some(Frame::Section { .. }) if name == SUBSECTION_TAG => {
                Frame::Subsection(Subsection::default())
            }
            Some(Frame::Subsection(sub)) if name == TITLE_TAG && sub.title.is_none() => {
                Frame::Title(String::new())
            }
            Some(_) => Frame::Skipped(String::from_utf8_lossy(name).into_owned()),
        };

        self.stack.push(frame);
        Ok(())
    }

    // quick-xml rejects mismatched end tags, so the top frame always matches
    fn close(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };

        match frame {
            Frame::Root => self.closed = true,
            Frame::Section { mut section, .. } => {
                section.body = section.body.trim().to_string();
                self.sections.push(section);
            }
            Frame::Subsection(mut sub) => {
                sub.body = sub.body.trim().to_string();
                if let Some(Frame::Section { section, .. }) = self.stack.last_mut() {
                    section.subsections.push(sub);
                }
            }
            Frame::Title(title) => {
                let title = title.trim();
                if let Some(Frame::Subsection(sub)) = self.stack.last_mut() {
                    sub.title = (!title.is_empty()).then(|| title.to_string());
                }
            }
            Frame::Skipped(_) => {}
        }
    }

    fn text(&mut self, text: &str) -> Result<(), PayloadError> {
        match self.stack.last_mut() {
            Some(Frame::Section { section, leading }) => {
                if *leading {
                    section.body.push_str(text);
                }
            }
            Some(Frame::Subsection(sub)) => sub.body.push_str(text),
            Some(Frame::Title(title)) => title.push_str(text),
            Some(Frame::Root) | Some(Frame::Skipped(_)) => {}
            None if text.trim().is_empty() => {}
            None => return Err(PayloadError::StrayContent),
        }
        Ok(())
    }
}
