//! Section name → id registry
//!
//! Grows only by addition: once a name is registered its id never changes
//! for the lifetime of the session.

use crate::payload::Payload;
use std::collections::HashMap;
use tracing::{debug, info};

/// A registration request that lost to an earlier one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeptSection {
    pub name: String,
    pub existing_id: String,
    pub offered_id: String,
}

/// What `plan`/`register_all` decided for each section of a payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration {
    /// New `(name, id)` entries, in payload order
    pub added: Vec<(String, String)>,
    /// Names that were already known; their ids stay as they were
    pub kept: Vec<KeptSection>,
    /// Sections without a name or id
    pub skipped: usize,
}

impl Registration {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SectionRegistry {
    ids: HashMap<String, String>,
    order: Vec<String>,
}

impl SectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact, case-sensitive lookup
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.ids.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ids.contains_key(name)
    }

    /// Work out what registering `payload` would change, without changing it.
    pub fn plan(&self, payload: &Payload) -> Registration {
        let mut registration = Registration::default();

        for section in &payload.sections {
            if section.name.is_empty() || section.id.is_empty() {
                registration.skipped += 1;
                continue;
            }

            let earlier = self.lookup(&section.name).map(str::to_string).or_else(|| {
                registration
                    .added
                    .iter()
                    .find(|(name, _)| *name == section.name)
                    .map(|(_, id)| id.clone())
            });

            match earlier {
                Some(existing_id) => registration.kept.push(KeptSection {
                    name: section.name.clone(),
                    existing_id,
                    offered_id: section.id.clone(),
                }),
                None => registration
                    .added
                    .push((section.name.clone(), section.id.clone())),
            }
        }

        registration
    }

    /// Insert the planned additions. Names registered in the meantime keep
    /// their id.
    pub fn apply(&mut self, registration: &Registration) {
        for (name, id) in &registration.added {
            self.insert_new(name, id);
        }
        for kept in &registration.kept {
            debug!(
                "Section '{}' already registered with id {} (ignored id {})",
                kept.name, kept.existing_id, kept.offered_id
            );
        }
    }

    /// Register every named section of `payload`; first registration wins.
    pub fn register_all(&mut self, payload: &Payload) -> Registration {
        let registration = self.plan(payload);
        self.apply(&registration);
        registration
    }

    fn insert_new(&mut self, name: &str, id: &str) {
        if self.ids.contains_key(name) {
            return;
        }
        info!("New section registered: '{}' with id {}", name, id);
        self.ids.insert(name.to_string(), id.to_string());
        self.order.push(name.to_string());
    }

    /// `(name, id)` pairs in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order
            .iter()
            .filter_map(|name| self.ids.get_key_value(name))
            .map(|(name, id)| (name.as_str(), id.as_str()))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
