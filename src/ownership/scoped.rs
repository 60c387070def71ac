//! The slice of a locked registry one chapter is allowed to see.

use dossier_types::ChapterId;
use serde::{Deserialize, Serialize};

use super::OwnershipScope;
use crate::registry::{Lookup, Registry, RegistryEntry};

/// Owned copy of a chapter's visible entries, handed to the narrative
/// generator and the chapter assembler. Scope keys the registry does not
/// hold are listed in `missing_keys` so collaborators can state the gap
/// instead of inventing a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopedFacts {
    pub chapter_id: ChapterId,
    pub entries: Vec<RegistryEntry>,
    pub missing_keys: Vec<String>,
}

impl ScopedFacts {
    pub fn collect(registry: &Registry, scope: &OwnershipScope) -> Self {
        let mut entries = Vec::new();
        let mut missing_keys = Vec::new();
        for key in &scope.allowed_keys {
            match registry.get(key) {
                Lookup::Present(entry) => entries.push(entry.clone()),
                Lookup::Absent => missing_keys.push(key.clone()),
            }
        }
        Self {
            chapter_id: scope.chapter_id.clone(),
            entries,
            missing_keys,
        }
    }

    pub fn get(&self, key: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
