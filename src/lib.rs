//! Dossier - fail-closed content governance for property reports
//!
//! A report is a set of chapters. Every chapter is composed of four planes
//! (visual, narrative, facts, preference) built from one canonical, locked
//! fact registry. Nothing reaches a reader unless every chapter passes the
//! validation gate.
//!
//! ## Run lifecycle
//! Parser facts -> Registry (lock) -> per-chapter narrative + assembly ->
//! Structural validator -> Gate -> Report | FailedRun
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dossier::config::GovernanceConfig;
//! use dossier::ownership::OwnershipResolver;
//! use dossier::pipeline::{EnrichmentPipeline, FactSheetAssembler, NarrativeGenerator};
//! use dossier::registry::NormalizedFacts;
//!
//! # async fn demo(generator: Arc<dyn NarrativeGenerator>) -> anyhow::Result<()> {
//! let config = GovernanceConfig::from_env()?;
//! let resolver = OwnershipResolver::from_config(&config.chapters)?;
//! let assembler = Arc::new(FactSheetAssembler);
//! let pipeline = EnrichmentPipeline::new(config, resolver, generator, assembler);
//!
//! let outcome = pipeline.run(NormalizedFacts::new()).await;
//! assert!(!outcome.is_delivered());
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Governance thresholds and chapter table
pub mod config;

// Canonical fact registry
pub mod registry;

// Chapter scopes
pub mod ownership;

// Four-plane chapter content and per-plane rules
pub mod content;

// Composition checks and leakage detection
pub mod validator;

// Pass/fail decision and run status tracking
pub mod gate;

// Async run orchestration
pub mod pipeline;

pub use dossier_types::{
    ChapterId, ContainerKind, FactKind, Mood, NarrativeProvenance, Provenance, RunStatus,
    Severity,
};
pub use error::{DossierError, GateError, NarrativeError, OwnershipError, RegistryError};
pub use gate::{GateResult, RunBundle, ValidationGate};
pub use pipeline::{EnrichmentPipeline, RunOutcome, RunPool};
pub use registry::{NormalizedFacts, Registry};
pub use validator::{StructuralValidator, Violation, ViolationKind};
