//! Chapter content model
//!
//! A chapter is four planes with disjoint jobs:
//!
//! - **visual**: charts backed by registry keys
//! - **narrative**: interpretive prose, never a fact dump
//! - **facts**: registry values shown verbatim, with explicit gaps
//! - **preference**: persona scores that must actually diverge
//!
//! Each plane module owns its rule function. [`crate::validator`] runs them
//! in a fixed order and adds the cross-plane checks.

pub mod facts;
pub mod narrative;
pub mod preference;
pub mod visual;

use std::collections::BTreeSet;

use dossier_types::ChapterId;
use serde::{Deserialize, Serialize};

pub use facts::{FactContainer, FactEntry};
pub use narrative::{word_count, NarrativeContainer};
pub use preference::{PersonaId, PersonaScore, PreferenceContainer};
pub use visual::{ChartKind, SkippedVisual, VisualContainer, VisualItem};

/// The four planes of one chapter. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterComposition {
    chapter_id: ChapterId,
    visual: VisualContainer,
    narrative: NarrativeContainer,
    facts: FactContainer,
    preference: PreferenceContainer,
}

impl ChapterComposition {
    pub fn new(
        chapter_id: impl Into<ChapterId>,
        visual: VisualContainer,
        narrative: NarrativeContainer,
        facts: FactContainer,
        preference: PreferenceContainer,
    ) -> Self {
        Self {
            chapter_id: chapter_id.into(),
            visual,
            narrative,
            facts,
            preference,
        }
    }

    pub fn chapter_id(&self) -> &ChapterId {
        &self.chapter_id
    }

    pub fn visual(&self) -> &VisualContainer {
        &self.visual
    }

    pub fn narrative(&self) -> &NarrativeContainer {
        &self.narrative
    }

    pub fn facts(&self) -> &FactContainer {
        &self.facts
    }

    pub fn preference(&self) -> &PreferenceContainer {
        &self.preference
    }

    /// Every registry key cited by the visual and fact planes, deduplicated.
    pub fn referenced_keys(&self) -> BTreeSet<&str> {
        self.visual
            .referenced_keys()
            .chain(self.facts.keys())
            .collect()
    }
}
