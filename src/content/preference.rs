//! Preference plane: how each buyer persona scores the property.

use std::collections::{BTreeMap, BTreeSet};

use dossier_types::{ChapterId, Mood};
use serde::{Deserialize, Serialize};

use crate::config::ChapterPolicy;
use crate::validator::{Violation, ViolationKind};

pub type PersonaId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaScore {
    pub display_name: String,
    /// 0..=100. Out-of-range scores are reported, not clamped.
    pub score: u8,
    pub mood: Mood,
    pub key_values: Vec<String>,
    pub concerns: Vec<String>,
}

impl PersonaScore {
    pub fn new(display_name: impl Into<String>, score: u8, mood: Mood) -> Self {
        Self {
            display_name: display_name.into(),
            score,
            mood,
            key_values: Vec::new(),
            concerns: Vec::new(),
        }
    }

    pub fn with_key_values<I: IntoIterator<Item = S>, S: Into<String>>(mut self, items: I) -> Self {
        self.key_values = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_concerns<I: IntoIterator<Item = S>, S: Into<String>>(mut self, items: I) -> Self {
        self.concerns = items.into_iter().map(Into::into).collect();
        self
    }

    fn concern_set(&self) -> BTreeSet<String> {
        self.concerns
            .iter()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceContainer {
    pub persona_scores: BTreeMap<PersonaId, PersonaScore>,
    pub overlaps: Vec<String>,
    pub tensions: Vec<String>,
}

impl PreferenceContainer {
    pub fn is_empty(&self) -> bool {
        self.persona_scores.is_empty()
    }

    pub fn with_persona(mut self, id: impl Into<PersonaId>, score: PersonaScore) -> Self {
        self.persona_scores.insert(id.into(), score);
        self
    }

    /// Display names, for the leakage check. Ids are often plain words
    /// ("family") and are left out.
    pub fn persona_names(&self) -> impl Iterator<Item = &str> {
        self.persona_scores
            .values()
            .map(|p| p.display_name.as_str())
            .filter(|name| !name.trim().is_empty())
    }
}

pub fn check(
    preference: &PreferenceContainer,
    chapter_id: &ChapterId,
    policy: &ChapterPolicy,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (id, persona) in &preference.persona_scores {
        if persona.score > 100 {
            violations.push(Violation::fatal(
                chapter_id,
                ViolationKind::PersonaScoreOutOfRange,
                format!("Persona '{}' scored {} (range 0..=100)", id, persona.score),
            ));
        }
        for (what, len) in [
            ("key values", persona.key_values.len()),
            ("concerns", persona.concerns.len()),
        ] {
            if len > policy.max_persona_bullets {
                violations.push(Violation::fatal(
                    chapter_id,
                    ViolationKind::PersonaTooManyBullets,
                    format!(
                        "Persona '{}' lists {} {}, maximum is {}",
                        id, len, what, policy.max_persona_bullets
                    ),
                ));
            }
        }
    }

    check_divergence(preference, chapter_id, &mut violations);
    violations
}

fn check_divergence(
    preference: &PreferenceContainer,
    chapter_id: &ChapterId,
    violations: &mut Vec<Violation>,
) {
    let personas: Vec<(&PersonaId, BTreeSet<String>)> = preference
        .persona_scores
        .iter()
        .map(|(id, p)| (id, p.concern_set()))
        .collect();

    if !personas.is_empty() && preference.tensions.is_empty() && preference.overlaps.is_empty() {
        violations.push(Violation::warning(
            chapter_id,
            ViolationKind::PreferenceDecorative,
            "Persona scores carry no tensions and no overlaps",
        ));
    }

    if personas.len() < 2 {
        return;
    }

    let mut paired = BTreeSet::new();
    for (i, (a, a_set)) in personas.iter().enumerate() {
        for (b, b_set) in &personas[i + 1..] {
            if !a_set.is_empty() && a_set == b_set {
                violations.push(Violation::warning(
                    chapter_id,
                    ViolationKind::PersonaIdenticalConcerns,
                    format!("Personas '{}' and '{}' share identical concerns", a, b),
                ));
                paired.insert(*a);
                paired.insert(*b);
            }
        }
    }

    for (id, set) in &personas {
        if paired.contains(id) {
            continue;
        }
        let unique = set.iter().any(|concern| {
            personas
                .iter()
                .filter(|(other, _)| other != id)
                .all(|(_, other_set)| !other_set.contains(concern))
        });
        if !unique {
            violations.push(Violation::warning(
                chapter_id,
                ViolationKind::PersonaNoUniqueConcern,
                format!("Persona '{}' has no concern of its own", id),
            ));
        }
    }
}
