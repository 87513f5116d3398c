//! Application settings management

use crate::PathManager;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// How a full rewrite of the document is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Markdown headings per section; targeted edits cannot splice into it
    #[default]
    Markdown,
    /// `<section id='..' name='..'>` markers around each section body
    Marked,
}

impl std::str::FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" => Ok(DocumentFormat::Markdown),
            "marked" => Ok(DocumentFormat::Marked),
            _ => Err(format!("Unknown document format: {}", s)),
        }
    }
}

/// Application settings stored in settings.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Model identifier sent to the generation service
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Number of most recent transcript turns included in each prompt
    pub history_window: usize,
    /// Plain-text domain dataset prepended to the system context
    pub dataset_path: PathBuf,
    /// Specification document appended to the system context
    pub specification_path: PathBuf,
    /// Words that introduce a section name in a user request
    pub section_keywords: Vec<String>,
    pub document_format: DocumentFormat,
    /// Base URL of an OpenAI-compatible endpoint
    pub openai_base_url: Option<String>,
    /// Where outbound prompts are written; defaults to the logs directory
    pub audit_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.7,
            history_window: 3,
            dataset_path: PathBuf::from("dataset.txt"),
            specification_path: PathBuf::from("tech-specs.md"),
            section_keywords: vec!["section".to_string()],
            document_format: DocumentFormat::Markdown,
            openai_base_url: None,
            audit_dir: None,
        }
    }
}

impl Settings {
    /// Load settings from the settings file, or return defaults if not found
    pub fn load() -> Self {
        match PathManager::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load settings from an explicit path. A missing or malformed file
    /// yields defaults.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };

        match Self::from_toml_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring malformed settings file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save settings to the settings file
    pub fn save(&self) -> Result<(), String> {
        let path = PathManager::settings_path().ok_or("Could not determine settings path")?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config dir: {}", e))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;
        fs::write(path, content).map_err(|e| format!("Failed to write settings: {}", e))?;
        Ok(())
    }

    /// Audit directory from settings, falling back to the platform logs dir
    pub fn resolved_audit_dir(&self) -> Option<PathBuf> {
        self.audit_dir.clone().or_else(PathManager::audit_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.history_window, 3);
        assert_eq!(settings.section_keywords, vec!["section".to_string()]);
        assert_eq!(settings.document_format, DocumentFormat::Markdown);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            temperature = 0.2
            section_keywords = ["section", "раздел"]
            document_format = "marked"
            "#,
        )
        .unwrap();

        assert_eq!(settings.model, "gpt-4o");
        assert!((settings.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(settings.section_keywords.len(), 2);
        assert_eq!(settings.document_format, DocumentFormat::Marked);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.model = "gpt-4o-mini".to_string();
        settings.openai_base_url = Some("http://localhost:8080".to_string());
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path);
        assert_eq!(loaded.model, "gpt-4o-mini");
        assert_eq!(loaded.openai_base_url.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "model = [").unwrap();

        let loaded = Settings::load_from(&path);
        assert_eq!(loaded.model, "gpt-4o");
    }

    #[test]
    fn test_document_format_from_str() {
        assert_eq!("Marked".parse::<DocumentFormat>(), Ok(DocumentFormat::Marked));
        assert_eq!("markdown".parse::<DocumentFormat>(), Ok(DocumentFormat::Markdown));
        assert!("html".parse::<DocumentFormat>().is_err());
    }
}
