//! Works out which section, if any, a user request is about.

use crate::registry::SectionRegistry;
use regex::Regex;

/// Three-way outcome of resolving a request against the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The request names a section the registry knows
    Resolved { name: String, id: String },
    /// The request names a section the registry has never seen
    Unresolved { name: String },
    /// The request does not name a section
    Untargeted,
}

impl Resolution {
    pub fn name(&self) -> Option<&str> {
        match self {
            Resolution::Resolved { name, .. } | Resolution::Unresolved { name } => Some(name),
            Resolution::Untargeted => None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Resolution::Resolved { id, .. } => Some(id),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved { .. })
    }
}

/// What the name pattern captured
#[derive(Debug, Clone, PartialEq, Eq)]
enum Mention {
    /// `section 'Name'`: taken verbatim
    Quoted(String),
    /// `section Name and whatever follows`: may carry trailing words
    Bare(String),
}

#[derive(Debug, Clone)]
pub struct SectionResolver {
    pattern: Regex,
}

impl Default for SectionResolver {
    fn default() -> Self {
        Self::new(["section"]).expect("default section keyword")
    }
}

impl SectionResolver {
    /// Build a resolver that recognises `<keyword> 'Name'` and
    /// `<keyword> Name`, case-insensitively, for any of `keywords`.
    pub fn new<I, S>(keywords: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let alternation = keywords
            .into_iter()
            .map(|k| regex::escape(k.as_ref().trim()))
            .filter(|k| !k.is_empty())
            .collect::<Vec<_>>()
            .join("|");
        if alternation.is_empty() {
            anyhow::bail!("no section keywords configured");
        }

        let pattern = Regex::new(&format!(
            r#"(?i)\b(?:{alternation})(?:\s*'(?P<single>[^']+)'|\s*"(?P<double>[^"]+)"|\s+['"]?(?P<bare>[\w\s]+))"#
        ))?;
        Ok(Self { pattern })
    }

    fn mention(&self, utterance: &str) -> Option<Mention> {
        let caps = self.pattern.captures(utterance)?;

        if let Some(quoted) = caps.name("single").or_else(|| caps.name("double")) {
            let name = quoted.as_str().trim();
            return (!name.is_empty()).then(|| Mention::Quoted(name.to_string()));
        }

        let bare = caps.name("bare")?.as_str().trim();
        (!bare.is_empty()).then(|| Mention::Bare(bare.to_string()))
    }

    /// The section name mentioned in `utterance`, if any
    pub fn extract_name(&self, utterance: &str) -> Option<String> {
        match self.mention(utterance)? {
            Mention::Quoted(name) | Mention::Bare(name) => Some(name),
        }
    }

    pub fn resolve(&self, utterance: &str, registry: &SectionRegistry) -> Resolution {
        let Some(mention) = self.mention(utterance) else {
            return Resolution::Untargeted;
        };

        match mention {
            Mention::Quoted(name) => match registry.lookup(&name) {
                Some(id) => Resolution::Resolved {
                    id: id.to_string(),
                    name,
                },
                None => Resolution::Unresolved { name },
            },
            Mention::Bare(name) => {
                // "section Scope to be shorter": try the longest word prefix first
                let words: Vec<&str> = name.split_whitespace().collect();
                for len in (1..=words.len()).rev() {
                    let candidate = words[..len].join(" ");
                    if let Some(id) = registry.lookup(&candidate) {
                        return Resolution::Resolved {
                            id: id.to_string(),
                            name: candidate,
                        };
                    }
                }
                Resolution::Unresolved { name }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{Payload, Section};

    fn registry(entries: &[(&str, &str)]) -> SectionRegistry {
        let mut registry = SectionRegistry::new();
        registry.register_all(&Payload::new(
            entries
                .iter()
                .map(|(name, id)| Section::new(*id, *name, ""))
                .collect(),
        ));
        registry
    }

    #[test]
    fn test_quoted_known_name_resolves() {
        let resolver = SectionResolver::default();
        let resolution = resolver.resolve("section 'Introduction'", &registry(&[("Introduction", "s1")]));

        assert_eq!(
            resolution,
            Resolution::Resolved {
                name: "Introduction".to_string(),
                id: "s1".to_string(),
            }
        );
    }

    #[test]
    fn test_quoted_unknown_name_is_unresolved() {
        let resolver = SectionResolver::default();
        let resolution = resolver.resolve("section 'Introduction'", &SectionRegistry::new());

        assert_eq!(
            resolution,
            Resolution::Unresolved {
                name: "Introduction".to_string(),
            }
        );
        assert_eq!(resolution.id(), None);
    }

    #[test]
    fn test_no_section_phrase_is_untargeted() {
        let resolver = SectionResolver::default();
        let resolution = resolver.resolve("Write a project plan", &registry(&[("Introduction", "s1")]));

        assert_eq!(resolution, Resolution::Untargeted);
        assert_eq!(resolution.name(), None);
    }

    #[test]
    fn test_keyword_is_case_insensitive_but_names_are_not() {
        let resolver = SectionResolver::default();
        let known = registry(&[("Introduction", "s1")]);

        assert!(resolver.resolve("Please rewrite SECTION \"Introduction\"", &known).is_resolved());
        assert_eq!(
            resolver.resolve("rewrite section 'introduction'", &known),
            Resolution::Unresolved {
                name: "introduction".to_string(),
            }
        );
    }

    #[test]
    fn test_quoted_names_keep_punctuation() {
        let resolver = SectionResolver::default();
        assert_eq!(
            resolver.extract_name("change section \"Scope & Goals\" please"),
            Some("Scope & Goals".to_string())
        );
    }

    #[test]
    fn test_bare_name_matches_longest_registered_prefix() {
        let resolver = SectionResolver::default();
        let known = registry(&[("Risk", "r0"), ("Risk Analysis", "r1")]);

        assert_eq!(
            resolver.resolve("edit section Risk Analysis to be shorter", &known),
            Resolution::Resolved {
                name: "Risk Analysis".to_string(),
                id: "r1".to_string(),
            }
        );
    }

    #[test]
    fn test_bare_unknown_name_keeps_whole_capture() {
        let resolver = SectionResolver::default();
        assert_eq!(
            resolver.resolve("add section Budget details, thanks", &SectionRegistry::new()),
            Resolution::Unresolved {
                name: "Budget details".to_string(),
            }
        );
    }

    #[test]
    fn test_plural_word_is_not_a_mention() {
        let resolver = SectionResolver::default();
        assert_eq!(resolver.extract_name("list all sections"), None);
    }

    #[test]
    fn test_custom_keywords() {
        let resolver = SectionResolver::new(["section", "раздел"]).unwrap();
        let known = registry(&[("Введение", "s1")]);

        assert_eq!(
            resolver.resolve("Измени раздел 'Введение'", &known),
            Resolution::Resolved {
                name: "Введение".to_string(),
                id: "s1".to_string(),
            }
        );
        assert_eq!(resolver.extract_name("раздел Цели проекта"), Some("Цели проекта".to_string()));
    }

    #[test]
    fn test_empty_keyword_list_is_rejected() {
        assert!(SectionResolver::new(Vec::<String>::new()).is_err());
        assert!(SectionResolver::new(["  "]).is_err());
    }
}
