//! Enrichment pipeline
//!
//! Drives one run end to end:
//!
//! ```text
//! Pending → Enriching → Locked → Validating → Done | Failed
//!             │            │          │
//!        register facts    │     gate over all compositions
//!                          │
//!          per chapter: scoped facts → narrative → assemble
//! ```
//!
//! The pipeline sequences work and records status. It makes no content
//! decisions: narrative failures become empty narratives and the validator
//! turns those into FATAL violations.

mod assembler;
mod pool;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dossier_types::{ChapterId, InvalidTransition, NarrativeProvenance, RunStatus};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::GovernanceConfig;
use crate::content::{ChapterComposition, NarrativeContainer};
use crate::error::{NarrativeError, RegistryError};
use crate::gate::{GateResult, RunTracker, StatusChange, ValidationGate};
use crate::ownership::{OwnershipResolver, ScopedFacts};
use crate::registry::{NormalizedFacts, Registry, RegistrySnapshot};
use crate::validator::{StructuralValidator, Violation};

pub use assembler::{ChapterAssembler, FactSheetAssembler};
pub use pool::RunPool;

// ============================================================================
// COLLABORATORS
// ============================================================================

/// Text produced for one chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedNarrative {
    pub text: String,
    pub provenance: Option<NarrativeProvenance>,
}

/// External narrative source (typically a language model). Sees only the
/// chapter's scoped facts.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    async fn generate(
        &self,
        chapter_id: &ChapterId,
        facts: &ScopedFacts,
    ) -> Result<GeneratedNarrative, NarrativeError>;
}

// ============================================================================
// OUTCOMES
// ============================================================================

/// Where a rejected run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Registry rejected the parser's facts.
    Enrichment,
    /// Gate found FATAL violations.
    Validation,
    /// Run bookkeeping failed (task panic, illegal status transition).
    Internal,
}

/// A run that passed the gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub run_id: Uuid,
    pub compositions: Vec<ChapterComposition>,
    pub registry: RegistrySnapshot,
    pub warnings: Vec<Violation>,
    pub history: Vec<StatusChange>,
}

/// A run that did not. `diagnostics` holds whatever compositions were built
/// and is never served to end users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRun {
    pub run_id: Uuid,
    pub stage: FailureStage,
    pub gate: Option<GateResult>,
    pub error: Option<String>,
    pub diagnostics: Vec<ChapterComposition>,
    pub history: Vec<StatusChange>,
}

impl FailedRun {
    pub(crate) fn internal(run_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            run_id,
            stage: FailureStage::Internal,
            gate: None,
            error: Some(error.into()),
            diagnostics: Vec::new(),
            history: Vec::new(),
        }
    }

    /// FATAL violations, empty unless the gate ran.
    pub fn fatal_violations(&self) -> &[Violation] {
        self.gate
            .as_ref()
            .map(|g| g.fatal_violations.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Delivered(Report),
    Rejected(FailedRun),
}

impl RunOutcome {
    pub fn run_id(&self) -> Uuid {
        match self {
            RunOutcome::Delivered(report) => report.run_id,
            RunOutcome::Rejected(failed) => failed.run_id,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, RunOutcome::Delivered(_))
    }

    pub fn report(&self) -> Option<&Report> {
        match self {
            RunOutcome::Delivered(report) => Some(report),
            RunOutcome::Rejected(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FailedRun> {
        match self {
            RunOutcome::Delivered(_) => None,
            RunOutcome::Rejected(failed) => Some(failed),
        }
    }

    pub fn status(&self) -> RunStatus {
        if self.is_delivered() {
            RunStatus::Done
        } else {
            RunStatus::Failed
        }
    }
}

/// Internal short-circuit while a run is in flight.
enum Abort {
    Registry(RegistryError),
    Transition(InvalidTransition),
}

impl From<RegistryError> for Abort {
    fn from(err: RegistryError) -> Self {
        Abort::Registry(err)
    }
}

impl From<InvalidTransition> for Abort {
    fn from(err: InvalidTransition) -> Self {
        Abort::Transition(err)
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct EnrichmentPipeline {
    config: Arc<GovernanceConfig>,
    resolver: Arc<OwnershipResolver>,
    validator: StructuralValidator,
    generator: Arc<dyn NarrativeGenerator>,
    assembler: Arc<dyn ChapterAssembler>,
}

impl std::fmt::Debug for EnrichmentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentPipeline")
            .field("chapters", &self.resolver.len())
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

impl EnrichmentPipeline {
    pub fn new(
        config: GovernanceConfig,
        resolver: OwnershipResolver,
        generator: Arc<dyn NarrativeGenerator>,
        assembler: Arc<dyn ChapterAssembler>,
    ) -> Self {
        let validator = StructuralValidator::from_config(&config);
        Self {
            config: Arc::new(config),
            resolver: Arc::new(resolver),
            validator,
            generator,
            assembler,
        }
    }

    /// Replace the default validator, e.g. to plug in another leakage detector.
    pub fn with_validator(mut self, validator: StructuralValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    pub fn resolver(&self) -> &OwnershipResolver {
        &self.resolver
    }

    /// Execute one run. Never panics on bad input; every failure is a
    /// [`RunOutcome::Rejected`].
    pub async fn run(&self, facts: NormalizedFacts) -> RunOutcome {
        let run_id = Uuid::new_v4();
        let mut tracker = RunTracker::new(run_id);
        info!(run_id = %run_id, facts = facts.len(), "run started");

        let mut registry = Registry::new();
        let enriched = tracker
            .advance(RunStatus::Enriching)
            .map_err(Abort::from)
            .and_then(|_| registry.register_all(facts).map_err(Abort::from));
        if let Err(abort) = enriched {
            return self.abort(tracker, abort);
        }

        registry.lock();
        if let Err(err) = tracker.advance(RunStatus::Locked) {
            return self.abort(tracker, err.into());
        }
        let registry = Arc::new(registry);

        let compositions = self.compose(run_id, Arc::clone(&registry)).await;

        if let Err(err) = tracker.advance(RunStatus::Validating) {
            return self.abort(tracker, err.into());
        }
        let gate = ValidationGate::new(&self.validator, &self.resolver, &registry, &self.config);
        let result = gate.evaluate(&compositions);

        if !result.passed {
            tracker.fail();
            warn!(
                run_id = %run_id,
                fatal = result.fatal_violations.len(),
                "run rejected by gate"
            );
            return RunOutcome::Rejected(FailedRun {
                run_id,
                stage: FailureStage::Validation,
                gate: Some(result),
                error: None,
                diagnostics: compositions,
                history: tracker.into_history(),
            });
        }

        let snapshot = match registry.snapshot() {
            Ok(snapshot) => snapshot,
            Err(err) => return self.abort(tracker, err.into()),
        };
        if let Err(err) = tracker.advance(RunStatus::Done) {
            return self.abort(tracker, err.into());
        }
        info!(
            run_id = %run_id,
            chapters = compositions.len(),
            warnings = result.warnings.len(),
            fingerprint = snapshot.short_fingerprint(),
            "run delivered"
        );
        RunOutcome::Delivered(Report {
            run_id,
            compositions,
            registry: snapshot,
            warnings: result.warnings,
            history: tracker.into_history(),
        })
    }

    /// Build one composition per chapter, in resolver order. Up to
    /// `max_parallel_chapters` narratives are generated at once.
    async fn compose(&self, run_id: Uuid, registry: Arc<Registry>) -> Vec<ChapterComposition> {
        let limit = self.config.narrative_timeout();
        let parallel = self.config.runtime.max_parallel_chapters.max(1);
        let generator = Arc::clone(&self.generator);
        let assembler = Arc::clone(&self.assembler);

        let mut built: Vec<(usize, ChapterComposition)> =
            stream::iter(self.resolver.definitions().to_vec().into_iter().enumerate())
                .map(move |(idx, chapter)| {
                    let registry = Arc::clone(&registry);
                    let generator = Arc::clone(&generator);
                    let assembler = Arc::clone(&assembler);
                    async move {
                        let scoped = registry.subset(&chapter.scope);
                        let narrative = generate_narrative(
                            generator.as_ref(),
                            run_id,
                            chapter.id(),
                            &scoped,
                            limit,
                        )
                        .await;
                        (idx, assembler.assemble(chapter.id(), &scoped, narrative))
                    }
                })
                .buffer_unordered(parallel)
                .collect()
                .await;

        built.sort_by_key(|(idx, _)| *idx);
        built.into_iter().map(|(_, composition)| composition).collect()
    }

    fn abort(&self, mut tracker: RunTracker, abort: Abort) -> RunOutcome {
        let run_id = tracker.run_id();
        tracker.fail();
        let (stage, error) = match abort {
            Abort::Registry(err) => (FailureStage::Enrichment, err.to_string()),
            Abort::Transition(err) => (FailureStage::Internal, err.to_string()),
        };
        warn!(run_id = %run_id, ?stage, error = %error, "run aborted");
        RunOutcome::Rejected(FailedRun {
            run_id,
            stage,
            gate: None,
            error: Some(error),
            diagnostics: Vec::new(),
            history: tracker.into_history(),
        })
    }
}

/// One generator call under a timeout. Failures are logged and replaced by
/// an empty narrative; there is no retry.
async fn generate_narrative(
    generator: &dyn NarrativeGenerator,
    run_id: Uuid,
    chapter_id: &ChapterId,
    facts: &ScopedFacts,
    limit: Duration,
) -> NarrativeContainer {
    let result = match timeout(limit, generator.generate(chapter_id, facts)).await {
        Ok(result) => result,
        Err(_) => Err(NarrativeError::Timeout(limit)),
    };

    match result {
        Ok(generated) if !generated.text.trim().is_empty() => {
            debug!(run_id = %run_id, chapter = %chapter_id, "narrative generated");
            NarrativeContainer::generated(generated.text, generated.provenance)
        }
        Ok(_) => {
            warn!(
                run_id = %run_id,
                chapter = %chapter_id,
                error = %NarrativeError::Empty,
                "narrative missing"
            );
            NarrativeContainer::empty()
        }
        Err(err) => {
            warn!(run_id = %run_id, chapter = %chapter_id, error = %err, "narrative missing");
            NarrativeContainer::empty()
        }
    }
}
