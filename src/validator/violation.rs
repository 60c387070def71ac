//! Violation records and their stable codes.
//!
//! Code format: `{PLANE}:{CATEGORY}:{CODE}`
//!   COMPOSITION:* whole-chapter rules (ownership, chapter set)
//!   VISUAL:*      visual plane
//!   NARRATIVE:*   narrative plane, including cross-plane leakage
//!   FACTS:*       fact plane
//!   PREFERENCE:*  preference plane

use dossier_types::{ChapterId, ContainerKind, Severity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    // ── Composition ──────────────────────────────────────────
    /// A plane references a registry key outside the chapter's scope.
    OutOfScope,
    /// Composition validated against another chapter's scope.
    ScopeMismatch,
    UnknownChapter,
    DuplicateChapter,
    MissingChapter,

    // ── Visual ───────────────────────────────────────────────
    VisualNoSource,
    VisualUnknownKey,
    VisualUndeclaredSource,
    VisualUnusedSource,
    VisualTooMany,
    VisualFlagMismatch,
    VisualReasonMissing,
    VisualReasonGeneric,

    // ── Narrative ────────────────────────────────────────────
    NarrativeEmpty,
    NarrativeBelowMinimum,
    NarrativeAboveMaximum,
    NarrativeCountMismatch,
    NarrativeProvenanceMissing,
    LeakageFactDump,
    LeakagePersonaName,
    LeakageTabular,
    LeakageRawDump,

    // ── Facts ────────────────────────────────────────────────
    FactSilentGap,
    FactUnknownKey,
    FactValueDrift,
    FactProvenanceMismatch,
    FactDuplicate,
    FactsBelowFloor,
    FactsTooMany,

    // ── Preference ───────────────────────────────────────────
    PersonaScoreOutOfRange,
    PersonaTooManyBullets,
    PersonaIdenticalConcerns,
    PersonaNoUniqueConcern,
    PreferenceDecorative,
}

impl ViolationKind {
    pub fn code(&self) -> &'static str {
        use ViolationKind::*;
        match self {
            OutOfScope => "COMPOSITION:OWNERSHIP:OUT_OF_SCOPE",
            ScopeMismatch => "COMPOSITION:OWNERSHIP:SCOPE_MISMATCH",
            UnknownChapter => "COMPOSITION:OWNERSHIP:UNKNOWN_CHAPTER",
            DuplicateChapter => "COMPOSITION:STRUCTURE:DUPLICATE_CHAPTER",
            MissingChapter => "COMPOSITION:STRUCTURE:MISSING_CHAPTER",

            VisualNoSource => "VISUAL:PROVENANCE:NO_SOURCE",
            VisualUnknownKey => "VISUAL:PROVENANCE:UNKNOWN_KEY",
            VisualUndeclaredSource => "VISUAL:PROVENANCE:UNDECLARED_SOURCE",
            VisualUnusedSource => "VISUAL:PROVENANCE:UNUSED_SOURCE",
            VisualTooMany => "VISUAL:CARDINALITY:TOO_MANY",
            VisualFlagMismatch => "VISUAL:APPLICABILITY:FLAG_MISMATCH",
            VisualReasonMissing => "VISUAL:APPLICABILITY:REASON_MISSING",
            VisualReasonGeneric => "VISUAL:APPLICABILITY:REASON_GENERIC",

            NarrativeEmpty => "NARRATIVE:GENERATION:EMPTY",
            NarrativeBelowMinimum => "NARRATIVE:LENGTH:BELOW_MINIMUM",
            NarrativeAboveMaximum => "NARRATIVE:LENGTH:ABOVE_MAXIMUM",
            NarrativeCountMismatch => "NARRATIVE:LENGTH:COUNT_MISMATCH",
            NarrativeProvenanceMissing => "NARRATIVE:PROVENANCE:MISSING",
            LeakageFactDump => "NARRATIVE:LEAKAGE:FACT_DUMP",
            LeakagePersonaName => "NARRATIVE:LEAKAGE:PERSONA_NAME",
            LeakageTabular => "NARRATIVE:LEAKAGE:TABULAR",
            LeakageRawDump => "NARRATIVE:LEAKAGE:RAW_DUMP",

            FactSilentGap => "FACTS:HONESTY:SILENT_GAP",
            FactUnknownKey => "FACTS:PROVENANCE:UNKNOWN_KEY",
            FactValueDrift => "FACTS:PROVENANCE:VALUE_DRIFT",
            FactProvenanceMismatch => "FACTS:PROVENANCE:KIND_MISMATCH",
            FactDuplicate => "FACTS:CARDINALITY:DUPLICATE",
            FactsBelowFloor => "FACTS:CARDINALITY:BELOW_FLOOR",
            FactsTooMany => "FACTS:CARDINALITY:TOO_MANY",

            PersonaScoreOutOfRange => "PREFERENCE:SCORE:OUT_OF_RANGE",
            PersonaTooManyBullets => "PREFERENCE:CARDINALITY:TOO_MANY",
            PersonaIdenticalConcerns => "PREFERENCE:DIVERGENCE:IDENTICAL_CONCERNS",
            PersonaNoUniqueConcern => "PREFERENCE:DIVERGENCE:NO_UNIQUE_CONCERN",
            PreferenceDecorative => "PREFERENCE:DIVERGENCE:DECORATIVE",
        }
    }

    /// The plane this kind is reported against.
    pub fn container(&self) -> ContainerKind {
        match self.code().split(':').next() {
            Some("VISUAL") => ContainerKind::Visual,
            Some("NARRATIVE") => ContainerKind::Narrative,
            Some("FACTS") => ContainerKind::Facts,
            Some("PREFERENCE") => ContainerKind::Preference,
            _ => ContainerKind::Composition,
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// One broken contract. Produced by the validator, consumed by the gate,
/// never dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub chapter_id: ChapterId,
    pub container: ContainerKind,
    pub kind: ViolationKind,
    pub severity: Severity,
    pub message: String,
}

impl Violation {
    pub fn fatal(chapter_id: &ChapterId, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self::new(chapter_id, kind, Severity::Fatal, message)
    }

    pub fn warning(
        chapter_id: &ChapterId,
        kind: ViolationKind,
        message: impl Into<String>,
    ) -> Self {
        Self::new(chapter_id, kind, Severity::Warning, message)
    }

    fn new(
        chapter_id: &ChapterId,
        kind: ViolationKind,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            chapter_id: chapter_id.clone(),
            container: kind.container(),
            kind,
            severity,
            message: message.into(),
        }
    }

    /// Report against a different plane than the kind's default, e.g. an
    /// ownership breach found in the fact plane.
    pub fn in_container(mut self, container: ContainerKind) -> Self {
        self.container = container;
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.severity.is_blocking()
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}/{}] {} {}: {}",
            self.chapter_id,
            self.container,
            self.severity,
            self.kind.code(),
            self.message
        )
    }
}
