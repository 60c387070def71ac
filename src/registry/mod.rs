//! Canonical fact registry
//!
//! Single source of truth for every fact a report may display. Writes are
//! accepted only while the registry is open; [`Registry::lock`] is a one-way
//! transition after which every write fails with [`RegistryError::Locked`].
//!
//! The registry knows nothing about chapters. Visibility policy lives in
//! [`crate::ownership`].

mod input;
mod snapshot;
mod value;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use dossier_types::FactKind;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::RegistryError;
use crate::ownership::{OwnershipScope, ScopedFacts};

pub use input::{NormalizedFact, NormalizedFacts};
pub use snapshot::RegistrySnapshot;
pub use value::RegistryValue;

/// One registered fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub key: String,
    pub value: RegistryValue,
    pub kind: FactKind,
    pub source: String,
    pub registered_at: DateTime<Utc>,
    /// Stamped on every entry when the registry locks.
    pub locked_at: Option<DateTime<Utc>>,
}

/// Result of a registry lookup. Absence is a normal state, not an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    Present(&'a RegistryEntry),
    Absent,
}

impl<'a> Lookup<'a> {
    pub fn is_present(&self) -> bool {
        matches!(self, Lookup::Present(_))
    }

    pub fn entry(&self) -> Option<&'a RegistryEntry> {
        match self {
            Lookup::Present(entry) => Some(entry),
            Lookup::Absent => None,
        }
    }

    pub fn value(&self) -> Option<&'a RegistryValue> {
        self.entry().map(|e| &e.value)
    }
}

/// Per-run fact store. `locked_at` doubles as the lock flag.
#[derive(Debug, Default)]
pub struct Registry {
    entries: BTreeMap<String, RegistryEntry>,
    locked_at: Option<DateTime<Utc>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fact.
    ///
    /// Re-registering an identical value is a no-op; the first entry's kind
    /// and source are kept. A different value for an existing key is a
    /// conflict, and any write after lock is rejected even if it would have
    /// been a no-op.
    pub fn register(
        &mut self,
        key: impl Into<String>,
        value: impl Into<RegistryValue>,
        kind: FactKind,
        source: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let key = key.into();
        if self.is_locked() {
            return Err(RegistryError::Locked { key });
        }
        if key.trim().is_empty() {
            return Err(RegistryError::InvalidKey(key));
        }

        let value = value.into();
        match self.entries.get(&key) {
            Some(existing) if existing.value == value => {
                debug!(key = %key, "identical re-registration ignored");
                Ok(())
            }
            Some(existing) => Err(RegistryError::Conflict {
                key,
                existing: existing.value.clone(),
                attempted: value,
            }),
            None => {
                let entry = RegistryEntry {
                    key: key.clone(),
                    value,
                    kind,
                    source: source.into(),
                    registered_at: Utc::now(),
                    locked_at: None,
                };
                self.entries.insert(key, entry);
                Ok(())
            }
        }
    }

    /// Register every fact from the parser, stopping at the first error.
    pub fn register_all(&mut self, facts: NormalizedFacts) -> Result<usize, RegistryError> {
        let mut count = 0;
        for fact in facts.facts {
            self.register(fact.key, fact.value, fact.kind, fact.source)?;
            count += 1;
        }
        Ok(count)
    }

    /// Lock the registry. Calling this again is harmless and keeps the
    /// original lock timestamp.
    pub fn lock(&mut self) {
        if self.locked_at.is_some() {
            return;
        }
        let now = Utc::now();
        for entry in self.entries.values_mut() {
            entry.locked_at = Some(now);
        }
        self.locked_at = Some(now);
        info!(entries = self.entries.len(), "registry locked");
    }

    pub fn is_locked(&self) -> bool {
        self.locked_at.is_some()
    }

    pub fn locked_at(&self) -> Option<DateTime<Utc>> {
        self.locked_at
    }

    pub fn get(&self, key: &str) -> Lookup<'_> {
        match self.entries.get(key) {
            Some(entry) => Lookup::Present(entry),
            None => Lookup::Absent,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }

    /// Read-only view of the entries a chapter may see.
    pub fn subset(&self, scope: &OwnershipScope) -> ScopedFacts {
        ScopedFacts::collect(self, scope)
    }

    /// Audit copy of a locked registry.
    pub fn snapshot(&self) -> Result<RegistrySnapshot, RegistryError> {
        let locked_at = self.locked_at.ok_or(RegistryError::NotLocked)?;
        Ok(RegistrySnapshot::new(
            locked_at,
            self.entries.values().cloned().collect(),
        ))
    }
}
