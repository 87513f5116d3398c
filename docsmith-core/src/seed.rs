//! Seed inputs for the system context
//!
//! A plain-text domain dataset and a specification document are read once
//! when a session starts and joined into the system message. Either file
//! may be a `.docx`, in which case its paragraph text is used.

use anyhow::Context;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

const DOCX_BODY: &str = "word/document.xml";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedContext {
    pub dataset: String,
    pub specification: String,
}

impl SeedContext {
    pub fn new(dataset: impl Into<String>, specification: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            specification: specification.into(),
        }
    }

    pub fn load(dataset: &Path, specification: &Path) -> anyhow::Result<Self> {
        let dataset_text = read_seed(dataset)?;
        let specification_text = read_seed(specification)?;
        info!(
            "Seed loaded: dataset {} ({} bytes), specification {} ({} bytes)",
            dataset.display(),
            dataset_text.len(),
            specification.display(),
            specification_text.len()
        );
        Ok(Self::new(dataset_text, specification_text))
    }

    /// Dataset and specification joined by a newline
    pub fn system_context(&self) -> String {
        format!("{}\n{}", self.dataset, self.specification)
    }
}

fn read_seed(path: &Path) -> anyhow::Result<String> {
    if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"))
    {
        return read_docx(path);
    }

    let bytes = fs::read(path).with_context(|| format!("Failed to read seed file {}", path.display()))?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            warn!("{} is not valid UTF-8, invalid bytes replaced", path.display());
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

fn read_docx(path: &Path) -> anyhow::Result<String> {
    let file = File::open(path).with_context(|| format!("Failed to read seed file {}", path.display()))?;
    let mut archive =
        zip::ZipArchive::new(file).with_context(|| format!("{} is not a valid .docx archive", path.display()))?;
    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .with_context(|| format!("{} has no {}", path.display(), DOCX_BODY))?
        .read_to_string(&mut xml)
        .with_context(|| format!("Failed to read {} from {}", DOCX_BODY, path.display()))?;

    let paragraphs = docx_paragraphs(&xml).with_context(|| format!("Malformed {} in {}", DOCX_BODY, path.display()))?;
    debug!("{}: {} paragraphs", path.display(), paragraphs.len());
    Ok(paragraphs.join("\n"))
}

/// Text of each `<w:p>`, built from its `<w:t>` runs plus tabs and breaks
fn docx_paragraphs(xml: &str) -> anyhow::Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(start) => match start.local_name().as_ref() {
                b"p" => current = Some(String::new()),
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(start) => match (start.local_name().as_ref(), current.as_mut()) {
                (b"p", _) => paragraphs.push(String::new()),
                (b"tab", Some(paragraph)) => paragraph.push('\t'),
                (b"br" | b"cr", Some(paragraph)) => paragraph.push('\n'),
                _ => {}
            },
            Event::End(end) => match end.local_name().as_ref() {
                b"p" => paragraphs.extend(current.take()),
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(text) if in_text => {
                if let Some(paragraph) = current.as_mut() {
                    paragraph.push_str(&text.unescape()?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}
