//! Fact plane: labelled registry values, displayed as-is.

use std::collections::BTreeSet;

use dossier_types::{ChapterId, FactKind, Provenance};
use serde::{Deserialize, Serialize};

use crate::config::ChapterPolicy;
use crate::registry::{Lookup, Registry, RegistryEntry, RegistryValue};
use crate::validator::{Violation, ViolationKind};

/// Reason attached to registry entries the parser flagged as untrustworthy.
pub const UNCERTAIN_AT_SOURCE: &str = "value marked uncertain at source";

/// Display provenance for a registry kind. Uncertain values are never shown
/// as facts.
pub fn provenance_for(kind: FactKind) -> Provenance {
    match kind {
        FactKind::Fact => Provenance::Fact,
        FactKind::Derived | FactKind::Kpi => Provenance::Derived,
        FactKind::Uncertain => Provenance::Unknown,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactEntry {
    pub key: String,
    pub label: String,
    pub value: Option<RegistryValue>,
    pub provenance: Provenance,
    pub missing_reason: Option<String>,
}

impl FactEntry {
    /// Copy a registry entry into the plane. Uncertain entries are shown as
    /// an explicit gap rather than a value.
    pub fn from_registry(entry: &RegistryEntry, label: impl Into<String>) -> Self {
        match entry.kind {
            FactKind::Uncertain => Self::missing(&entry.key, label, UNCERTAIN_AT_SOURCE),
            kind => Self {
                key: entry.key.clone(),
                label: label.into(),
                value: Some(entry.value.clone()),
                provenance: provenance_for(kind),
                missing_reason: None,
            },
        }
    }

    pub fn missing(
        key: impl Into<String>,
        label: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            value: None,
            provenance: Provenance::Unknown,
            missing_reason: Some(reason.into()),
        }
    }

    pub fn is_missing(&self) -> bool {
        self.value.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactContainer {
    pub entries: Vec<FactEntry>,
}

impl FactContainer {
    pub fn new(entries: Vec<FactEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }
}

pub fn check(
    facts: &FactContainer,
    chapter_id: &ChapterId,
    registry: &Registry,
    policy: &ChapterPolicy,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut seen = BTreeSet::new();

    for entry in &facts.entries {
        if !seen.insert(entry.key.as_str()) {
            violations.push(Violation::warning(
                chapter_id,
                ViolationKind::FactDuplicate,
                format!("Fact '{}' appears more than once", entry.key),
            ));
        }
        check_entry(entry, chapter_id, registry, &mut violations);
    }

    if facts.len() > policy.max_facts {
        violations.push(Violation::fatal(
            chapter_id,
            ViolationKind::FactsTooMany,
            format!(
                "{} facts exceed the maximum of {}",
                facts.len(),
                policy.max_facts
            ),
        ));
    }
    if facts.len() < policy.min_facts {
        violations.push(Violation::warning(
            chapter_id,
            ViolationKind::FactsBelowFloor,
            format!(
                "{} facts, recommended minimum is {}",
                facts.len(),
                policy.min_facts
            ),
        ));
    }

    violations
}

fn check_entry(
    entry: &FactEntry,
    chapter_id: &ChapterId,
    registry: &Registry,
    violations: &mut Vec<Violation>,
) {
    let Some(value) = &entry.value else {
        let has_reason = entry
            .missing_reason
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty());
        if !has_reason {
            violations.push(Violation::fatal(
                chapter_id,
                ViolationKind::FactSilentGap,
                format!("'{}' has no value and no stated reason", entry.label),
            ));
        }
        return;
    };

    match registry.get(&entry.key) {
        Lookup::Absent => violations.push(Violation::fatal(
            chapter_id,
            ViolationKind::FactUnknownKey,
            format!(
                "'{}' shows a value for '{}', which is not in the registry",
                entry.label, entry.key
            ),
        )),
        Lookup::Present(registered) => {
            if &registered.value != value {
                violations.push(Violation::fatal(
                    chapter_id,
                    ViolationKind::FactValueDrift,
                    format!(
                        "'{}' shows {}, registry holds {}",
                        entry.key, value, registered.value
                    ),
                ));
            }
            let expected = provenance_for(registered.kind);
            if entry.provenance != expected {
                violations.push(Violation::fatal(
                    chapter_id,
                    ViolationKind::FactProvenanceMismatch,
                    format!(
                        "'{}' is labelled {}, registry kind {} requires {}",
                        entry.key, entry.provenance, registered.kind, expected
                    ),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register("asking_price", 485_000, FactKind::Fact, "listing")
            .unwrap();
        registry
            .register("price_per_m2", 4_041, FactKind::Derived, "calc")
            .unwrap();
        registry
            .register("woz_value", 410_000, FactKind::Uncertain, "scraper")
            .unwrap();
        registry.lock();
        registry
    }

    fn codes(violations: &[Violation]) -> Vec<&'static str> {
        violations.iter().map(Violation::code).collect()
    }

    fn relaxed() -> ChapterPolicy {
        ChapterPolicy {
            min_facts: 0,
            ..ChapterPolicy::default()
        }
    }

    fn entry(registry: &Registry, key: &str) -> FactEntry {
        FactEntry::from_registry(registry.get(key).entry().unwrap(), key)
    }

    #[test]
    fn test_registry_copies_pass() {
        let registry = registry();
        let facts = FactContainer::new(vec![
            entry(&registry, "asking_price"),
            entry(&registry, "price_per_m2"),
        ]);
        assert!(check(&facts, &"ch2".into(), &registry, &relaxed()).is_empty());
    }

    #[test]
    fn test_uncertain_entry_becomes_explicit_gap() {
        let registry = registry();
        let woz = entry(&registry, "woz_value");
        assert!(woz.is_missing());
        assert_eq!(woz.provenance, Provenance::Unknown);
        assert_eq!(woz.missing_reason.as_deref(), Some(UNCERTAIN_AT_SOURCE));
        let facts = FactContainer::new(vec![woz]);
        assert!(check(&facts, &"ch2".into(), &registry, &relaxed()).is_empty());
    }

    #[test]
    fn test_silent_gap_is_fatal() {
        let facts = FactContainer::new(vec![FactEntry {
            key: "energy_label".into(),
            label: "Energy label".into(),
            value: None,
            provenance: Provenance::Unknown,
            missing_reason: Some("   ".into()),
        }]);
        let v = check(&facts, &"ch4".into(), &registry(), &relaxed());
        assert_eq!(codes(&v), vec!["FACTS:HONESTY:SILENT_GAP"]);
        assert!(v[0].is_fatal());
    }

    #[test]
    fn test_stated_gap_passes() {
        let facts = FactContainer::new(vec![FactEntry::missing(
            "energy_label",
            "Energy label",
            "no energy certificate registered",
        )]);
        assert!(check(&facts, &"ch4".into(), &registry(), &relaxed()).is_empty());
    }

    #[test]
    fn test_invented_value_rejected() {
        let facts = FactContainer::new(vec![FactEntry {
            key: "energy_label".into(),
            label: "Energy label".into(),
            value: Some("A".into()),
            provenance: Provenance::Fact,
            missing_reason: None,
        }]);
        let v = check(&facts, &"ch4".into(), &registry(), &relaxed());
        assert_eq!(codes(&v), vec!["FACTS:PROVENANCE:UNKNOWN_KEY"]);
    }

    #[test]
    fn test_value_drift_and_provenance_mismatch() {
        let registry = registry();
        let mut price = entry(&registry, "asking_price");
        price.value = Some(RegistryValue::Integer(495_000));
        let mut per_m2 = entry(&registry, "price_per_m2");
        per_m2.provenance = Provenance::Fact;

        let v = check(
            &FactContainer::new(vec![price, per_m2]),
            &"ch2".into(),
            &registry,
            &relaxed(),
        );
        assert_eq!(
            codes(&v),
            vec!["FACTS:PROVENANCE:VALUE_DRIFT", "FACTS:PROVENANCE:KIND_MISMATCH"]
        );
        assert!(v[0].message.contains("registry holds 485000"));
    }

    #[test]
    fn test_cardinality_floor_is_soft_ceiling_is_hard() {
        let registry = registry();
        let few = FactContainer::new(vec![entry(&registry, "asking_price")]);
        let v = check(&few, &"ch2".into(), &registry, &ChapterPolicy::default());
        assert_eq!(codes(&v), vec!["FACTS:CARDINALITY:BELOW_FLOOR"]);
        assert!(!v[0].is_fatal());

        let policy = ChapterPolicy {
            max_facts: 2,
            ..relaxed()
        };
        let many = FactContainer::new(vec![
            entry(&registry, "asking_price"),
            entry(&registry, "price_per_m2"),
            entry(&registry, "woz_value"),
        ]);
        let v = check(&many, &"ch2".into(), &registry, &policy);
        assert_eq!(codes(&v), vec!["FACTS:CARDINALITY:TOO_MANY"]);
        assert!(v[0].is_fatal());
    }

    #[test]
    fn test_duplicate_key_warns() {
        let registry = registry();
        let facts = FactContainer::new(vec![
            entry(&registry, "asking_price"),
            entry(&registry, "asking_price"),
        ]);
        let v = check(&facts, &"ch2".into(), &registry, &relaxed());
        assert_eq!(codes(&v), vec!["FACTS:CARDINALITY:DUPLICATE"]);
        assert!(!v[0].is_fatal());
    }
}
