//! Turning scoped facts plus a narrative into a chapter composition.

use dossier_types::ChapterId;

use crate::content::{
    ChapterComposition, FactContainer, FactEntry, NarrativeContainer, PreferenceContainer,
    SkippedVisual, VisualContainer,
};
use crate::ownership::ScopedFacts;

/// Reason given for scope keys the registry does not hold.
pub const NOT_IN_SOURCE: &str = "not present in source data";

/// Builds the non-narrative planes of a chapter. Implementations must only
/// cite keys from the `ScopedFacts` they are given.
pub trait ChapterAssembler: Send + Sync {
    fn assemble(
        &self,
        chapter_id: &ChapterId,
        facts: &ScopedFacts,
        narrative: NarrativeContainer,
    ) -> ChapterComposition;
}

/// Plain fact sheet: every scoped key in the fact plane (absent keys as
/// stated gaps), no charts, no personas.
#[derive(Debug, Clone, Copy, Default)]
pub struct FactSheetAssembler;

impl ChapterAssembler for FactSheetAssembler {
    fn assemble(
        &self,
        chapter_id: &ChapterId,
        facts: &ScopedFacts,
        narrative: NarrativeContainer,
    ) -> ChapterComposition {
        let mut entries: Vec<FactEntry> = facts
            .entries
            .iter()
            .map(|entry| FactEntry::from_registry(entry, label_for(&entry.key)))
            .collect();
        entries.extend(
            facts
                .missing_keys
                .iter()
                .map(|key| FactEntry::missing(key, label_for(key), NOT_IN_SOURCE)),
        );

        let visual = VisualContainer::not_applicable(vec![SkippedVisual::new(
            format!("{chapter_id}_overview"),
            "fact sheet layout renders no charts",
        )]);

        ChapterComposition::new(
            chapter_id.clone(),
            visual,
            narrative,
            FactContainer::new(entries),
            PreferenceContainer::default(),
        )
    }
}

/// `price_per_m2` → `Price per m2`
fn label_for(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::facts::UNCERTAIN_AT_SOURCE;
    use crate::ownership::OwnershipScope;
    use crate::registry::Registry;
    use dossier_types::{FactKind, Provenance};

    #[test]
    fn test_label_for() {
        assert_eq!(label_for("price_per_m2"), "Price per m2");
        assert_eq!(label_for(""), "");
    }

    #[test]
    fn test_fact_sheet_marks_gaps() {
        let mut registry = Registry::new();
        registry
            .register("asking_price", 485_000, FactKind::Fact, "listing")
            .unwrap();
        registry
            .register("woz_value", 410_000, FactKind::Uncertain, "scraper")
            .unwrap();
        registry.lock();
        let scope = OwnershipScope::new("ch2", ["asking_price", "woz_value", "price_history"]);
        let scoped = ScopedFacts::collect(&registry, &scope);

        let composition =
            FactSheetAssembler.assemble(&"ch2".into(), &scoped, NarrativeContainer::empty());
        let facts = &composition.facts().entries;
        assert_eq!(facts.len(), 3);

        let price = facts.iter().find(|f| f.key == "asking_price").unwrap();
        assert_eq!(price.provenance, Provenance::Fact);
        assert_eq!(price.label, "Asking price");

        let woz = facts.iter().find(|f| f.key == "woz_value").unwrap();
        assert!(woz.is_missing());
        assert_eq!(woz.missing_reason.as_deref(), Some(UNCERTAIN_AT_SOURCE));

        let history = facts.iter().find(|f| f.key == "price_history").unwrap();
        assert_eq!(history.missing_reason.as_deref(), Some(NOT_IN_SOURCE));

        assert!(!composition.visual().applicable);
        assert!(composition.preference().is_empty());
    }
}
