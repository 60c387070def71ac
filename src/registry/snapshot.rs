//! Read-only audit copy of a locked registry.
//!
//! Fingerprint algorithm:
//!   1. Entries in key order (the registry is a BTreeMap)
//!   2. Per entry: `key \n kind \n type:value \n source \n`
//!   3. Hash: SHA-256 of ("v1:" + concatenated entries), hex encoded
//!
//! Timestamps are excluded so that two runs over the same facts share a
//! fingerprint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{RegistryEntry, RegistryValue};

pub const FINGERPRINT_VERSION: &str = "v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub locked_at: DateTime<Utc>,
    pub entries: Vec<RegistryEntry>,
    pub fingerprint: String,
}

impl RegistrySnapshot {
    pub(crate) fn new(locked_at: DateTime<Utc>, entries: Vec<RegistryEntry>) -> Self {
        let fingerprint = compute_fingerprint(&entries);
        Self {
            locked_at,
            entries,
            fingerprint,
        }
    }

    /// Linear scan: a deserialized snapshot carries no ordering guarantee.
    pub fn get(&self, key: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// First 16 chars, for log lines.
    pub fn short_fingerprint(&self) -> &str {
        match self.fingerprint.char_indices().nth(16) {
            Some((idx, _)) => &self.fingerprint[..idx],
            None => &self.fingerprint,
        }
    }

    /// Check key order and recompute the fingerprint, e.g. after loading
    /// from storage.
    pub fn verify(&self) -> bool {
        self.entries.windows(2).all(|w| w[0].key < w[1].key)
            && compute_fingerprint(&self.entries) == self.fingerprint
    }
}

fn compute_fingerprint(entries: &[RegistryEntry]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:", FINGERPRINT_VERSION).as_bytes());
    for entry in entries {
        hasher.update(entry.key.as_bytes());
        hasher.update(b"\n");
        hasher.update(entry.kind.as_str().as_bytes());
        hasher.update(b"\n");
        hasher.update(canonical_value(&entry.value).as_bytes());
        hasher.update(b"\n");
        hasher.update(entry.source.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

fn canonical_value(value: &RegistryValue) -> String {
    match value {
        // normalize() drops trailing zeros so 120.5 and 120.50 hash alike
        RegistryValue::Decimal(d) => format!("decimal:{}", d.normalize()),
        other => format!("{}:{}", other.type_name(), other),
    }
}
