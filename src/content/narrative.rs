//! Narrative plane: free text from the narrative generator.

use std::sync::LazyLock;

use dossier_types::{ChapterId, NarrativeProvenance};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ChapterPolicy;
use crate::validator::{Violation, ViolationKind};

static MARKUP_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static HTML_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(?:[A-Za-z]+|#[0-9]+|#x[0-9A-Fa-f]+);").unwrap());

/// Canonical word count.
///
/// Markup tags and HTML entities are replaced by whitespace, then the text
/// is split on whitespace. Only tokens containing at least one alphanumeric
/// character count, so bullets, heading hashes and bare punctuation do not.
pub fn word_count(text: &str) -> usize {
    let stripped = MARKUP_TAG.replace_all(text, " ");
    let stripped = HTML_ENTITY.replace_all(&stripped, " ");
    stripped
        .split_whitespace()
        .filter(|token| token.chars().any(char::is_alphanumeric))
        .count()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeContainer {
    pub text: String,
    pub word_count: usize,
    pub generated_by_model: bool,
    pub provenance: Option<NarrativeProvenance>,
}

impl NarrativeContainer {
    /// Hand-written or templated text.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            word_count: word_count(&text),
            text,
            generated_by_model: false,
            provenance: None,
        }
    }

    /// Model output. A `None` provenance is kept as-is so the validator can
    /// report it.
    pub fn generated(text: impl Into<String>, provenance: Option<NarrativeProvenance>) -> Self {
        Self {
            generated_by_model: true,
            provenance,
            ..Self::from_text(text)
        }
    }

    /// Placeholder for a chapter whose generation failed.
    pub fn empty() -> Self {
        Self::from_text(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Plane rules. Length is a hard contract in both directions: there is no
/// degraded narrative.
pub fn check(
    narrative: &NarrativeContainer,
    chapter_id: &ChapterId,
    policy: &ChapterPolicy,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    if narrative.is_empty() {
        violations.push(Violation::fatal(
            chapter_id,
            ViolationKind::NarrativeEmpty,
            "Narrative is empty; generation failed or returned nothing",
        ));
    }

    let counted = word_count(&narrative.text);
    if counted != narrative.word_count {
        violations.push(Violation::fatal(
            chapter_id,
            ViolationKind::NarrativeCountMismatch,
            format!(
                "Declared word_count {} does not match canonical count {}",
                narrative.word_count, counted
            ),
        ));
    }

    if counted < policy.min_words {
        violations.push(Violation::fatal(
            chapter_id,
            ViolationKind::NarrativeBelowMinimum,
            format!(
                "Narrative has {} words, chapter minimum is {}",
                counted, policy.min_words
            ),
        ));
    }
    if counted > policy.max_words {
        violations.push(Violation::fatal(
            chapter_id,
            ViolationKind::NarrativeAboveMaximum,
            format!(
                "Narrative has {} words, maximum is {}",
                counted, policy.max_words
            ),
        ));
    }

    if narrative.generated_by_model {
        let complete = narrative.provenance.as_ref().is_some_and(|p| {
            !p.provider.trim().is_empty() && !p.model.trim().is_empty()
        });
        if !complete {
            violations.push(Violation::fatal(
                chapter_id,
                ViolationKind::NarrativeProvenanceMissing,
                "Model-generated narrative lacks provider/model provenance",
            ));
        }
    }

    violations
}
