//! Error types for the governance core
//!
//! Registry and ownership errors are raised immediately and abort the run.
//! Content-level problems are never errors: they are collected as
//! [`Violation`]s and only surface here once the gate has refused a run.

use std::time::Duration;

use dossier_types::ChapterId;
use thiserror::Error;

use crate::registry::RegistryValue;
use crate::validator::Violation;

/// Top-level error for callers that drive the core end to end.
#[derive(Debug, Error)]
pub enum DossierError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("ownership error: {0}")]
    Ownership(#[from] OwnershipError),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("configuration error: {0}")]
    Config(#[from] anyhow::Error),
}

/// Writes rejected by the registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("conflicting value for '{key}': registered {existing}, attempted {attempted}")]
    Conflict {
        key: String,
        existing: RegistryValue,
        attempted: RegistryValue,
    },

    #[error("registry is locked, refusing write to '{key}'")]
    Locked { key: String },

    #[error("invalid registry key {0:?}")]
    InvalidKey(String),

    #[error("registry must be locked before it can be snapshotted")]
    NotLocked,
}

/// Failures resolving chapter ownership.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OwnershipError {
    #[error("unknown chapter '{0}'")]
    UnknownChapter(ChapterId),

    #[error("chapter '{0}' is declared more than once")]
    DuplicateChapter(ChapterId),
}

/// Failures reported by the external narrative generator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NarrativeError {
    #[error("narrative generation failed: {0}")]
    Failed(String),

    #[error("narrative generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("narrative generator returned no text")]
    Empty,
}

/// The gate refused a run.
#[derive(Debug, Clone, Error)]
pub enum GateError {
    #[error("gate failed: {} fatal violation(s)", .0.len())]
    Failed(Vec<Violation>),
}
