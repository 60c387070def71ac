//! Dossier Types - Level 1 Foundation Types
//!
//! Pure data structures shared by the governance core, the renderers and the
//! storage layer. This crate depends on nothing else in the workspace.
//!
//! ## Contents
//!
//! - Chapter identifiers
//! - Fact classification (registry kind, displayed provenance)
//! - Content planes and violation severity
//! - Run status state machine
//! - Narrative provenance metadata
//!
//! ## Critical Rules
//!
//! 1. **NO BUSINESS LOGIC** - Only data structures and their transitions
//! 2. **NO WORKSPACE DEPENDENCIES**
//! 3. **SERIALIZABLE** - All types must support serde
//! 4. **CLOSED ENUMS** - Status and category fields are enums, never strings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// CHAPTER IDENTIFIERS
// ============================================================================

/// Identifier of a report chapter (e.g. `ch0`, `ch9`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChapterId(String);

impl ChapterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChapterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChapterId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ChapterId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ============================================================================
// FACT CLASSIFICATION
// ============================================================================

/// Kind of a registry entry, as declared by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FactKind {
    /// Observed directly at the source
    Fact,
    /// Computed from other facts
    Derived,
    /// Key performance indicator
    Kpi,
    /// Present at the source but not trustworthy
    Uncertain,
}

impl FactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactKind::Fact => "FACT",
            FactKind::Derived => "DERIVED",
            FactKind::Kpi => "KPI",
            FactKind::Uncertain => "UNCERTAIN",
        }
    }
}

impl std::fmt::Display for FactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FACT" => Ok(FactKind::Fact),
            "DERIVED" => Ok(FactKind::Derived),
            "KPI" => Ok(FactKind::Kpi),
            "UNCERTAIN" => Ok(FactKind::Uncertain),
            _ => Err(format!("Unknown fact kind: {}", s)),
        }
    }
}

/// Provenance of a value displayed in a chapter's fact plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Fact,
    Derived,
    Unknown,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Fact => "fact",
            Provenance::Derived => "derived",
            Provenance::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// CONTENT PLANES AND SEVERITY
// ============================================================================

/// The plane a violation was raised against.
///
/// `Composition` covers rules that span the whole chapter (ownership,
/// duplicate or missing chapters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Visual,
    Narrative,
    Facts,
    Preference,
    Composition,
}

impl ContainerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::Visual => "visual",
            ContainerKind::Narrative => "narrative",
            ContainerKind::Facts => "facts",
            ContainerKind::Preference => "preference",
            ContainerKind::Composition => "composition",
        }
    }

    /// The four content planes, excluding `Composition`.
    pub fn planes() -> [ContainerKind; 4] {
        [
            ContainerKind::Visual,
            ContainerKind::Narrative,
            ContainerKind::Facts,
            ContainerKind::Preference,
        ]
    }
}

impl std::fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Violation severity. Only `Fatal` blocks delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Warning,
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Fatal => "fatal",
        }
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, Severity::Fatal)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RUN STATUS
// ============================================================================

/// Lifecycle of one report-generation run.
///
/// `Pending → Enriching → Locked → Validating → {Done | Failed}`. Every
/// non-terminal state may fail; terminal states never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Pending,
    Enriching,
    Locked,
    Validating,
    Done,
    Failed,
}

/// Rejected run status transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid run transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: RunStatus,
    pub to: RunStatus,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Enriching => "enriching",
            RunStatus::Locked => "locked",
            RunStatus::Validating => "validating",
            RunStatus::Done => "done",
            RunStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Done | RunStatus::Failed)
    }

    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        use RunStatus::*;
        match (self, next) {
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (Pending, Enriching) | (Enriching, Locked) | (Locked, Validating) => true,
            (Validating, Done) => true,
            _ => false,
        }
    }

    pub fn transition(self, next: RunStatus) -> Result<RunStatus, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Enriching,
            Self::Locked,
            Self::Validating,
            Self::Done,
            Self::Failed,
        ]
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// NARRATIVE AND PERSONA METADATA
// ============================================================================

/// Where a narrative came from, when it was produced by a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeProvenance {
    pub provider: String,
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

impl NarrativeProvenance {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            generated_at: Utc::now(),
        }
    }
}

/// Overall mood of a persona towards the property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Positive,
    Neutral,
    Mixed,
    Negative,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Positive => "positive",
            Mood::Neutral => "neutral",
            Mood::Mixed => "mixed",
            Mood::Negative => "negative",
        }
    }
}
