//! Validation gate
//!
//! Binary pass/fail over a run's chapter compositions. A single FATAL
//! violation anywhere blocks delivery; warnings travel with the report.
//! There is no partial publication and no degraded mode.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use dossier_types::{ChapterId, InvalidTransition, RunStatus};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::GovernanceConfig;
use crate::content::ChapterComposition;
use crate::error::{GateError, RegistryError};
use crate::ownership::OwnershipResolver;
use crate::registry::{NormalizedFacts, Registry};
use crate::validator::{StructuralValidator, ValidationContext, Violation, ViolationKind};

// ============================================================================
// GATE RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    pub passed: bool,
    pub fatal_violations: Vec<Violation>,
    pub warnings: Vec<Violation>,
}

impl GateResult {
    /// Partition violations by severity, keeping their order.
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        let (fatal_violations, warnings): (Vec<_>, Vec<_>) =
            violations.into_iter().partition(Violation::is_fatal);
        Self {
            passed: fatal_violations.is_empty(),
            fatal_violations,
            warnings,
        }
    }

    /// `None` when the gate passed.
    pub fn into_error(self) -> Option<GateError> {
        if self.passed {
            None
        } else {
            Some(GateError::Failed(self.fatal_violations))
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} fatal, {} warning(s)",
            if self.passed { "PASSED" } else { "FAILED" },
            self.fatal_violations.len(),
            self.warnings.len()
        )
    }
}

// ============================================================================
// GATE
// ============================================================================

/// Gate over one run. Borrows the run's locked registry.
#[derive(Debug, Clone, Copy)]
pub struct ValidationGate<'a> {
    validator: &'a StructuralValidator,
    resolver: &'a OwnershipResolver,
    registry: &'a Registry,
    config: &'a GovernanceConfig,
}

impl<'a> ValidationGate<'a> {
    pub fn new(
        validator: &'a StructuralValidator,
        resolver: &'a OwnershipResolver,
        registry: &'a Registry,
        config: &'a GovernanceConfig,
    ) -> Self {
        Self {
            validator,
            resolver,
            registry,
            config,
        }
    }

    /// Evaluate compositions in input order. Identical input yields an
    /// identical result.
    pub fn evaluate(&self, compositions: &[ChapterComposition]) -> GateResult {
        let mut violations = Vec::new();
        let mut seen: BTreeSet<&ChapterId> = BTreeSet::new();

        for composition in compositions {
            let chapter_id = composition.chapter_id();
            if !seen.insert(chapter_id) {
                violations.push(Violation::fatal(
                    chapter_id,
                    ViolationKind::DuplicateChapter,
                    format!("Chapter '{}' was composed more than once", chapter_id),
                ));
                continue;
            }

            let definition = match self.resolver.definition(chapter_id) {
                Ok(definition) => definition,
                Err(err) => {
                    violations.push(Violation::fatal(
                        chapter_id,
                        ViolationKind::UnknownChapter,
                        err.to_string(),
                    ));
                    continue;
                }
            };

            let policy = self.config.policy_for(definition);
            let ctx = ValidationContext {
                registry: self.registry,
                scope: &definition.scope,
                policy: &policy,
                persona_names: &self.config.personas,
            };
            violations.extend(self.validator.validate(composition, &ctx));
        }

        for required in self.required_chapters() {
            if !seen.contains(required) {
                violations.push(Violation::fatal(
                    required,
                    ViolationKind::MissingChapter,
                    format!("Required chapter '{}' is missing", required),
                ));
            }
        }

        let result = GateResult::from_violations(violations);
        if result.passed {
            info!(
                chapters = compositions.len(),
                warnings = result.warnings.len(),
                "gate passed"
            );
        } else {
            warn!(
                chapters = compositions.len(),
                fatal = result.fatal_violations.len(),
                warnings = result.warnings.len(),
                "gate failed"
            );
        }
        result
    }

    /// Chapters every run must deliver. An empty config list means the whole
    /// chapter table.
    fn required_chapters(&self) -> Vec<&'a ChapterId> {
        if self.config.required_chapters.is_empty() {
            self.resolver.chapters().collect()
        } else {
            self.config.required_chapters.iter().collect()
        }
    }
}

// ============================================================================
// OFFLINE REPLAY
// ============================================================================

/// Parser facts plus the compositions built from them, as stored by the
/// pipeline's caller. Re-running the gate over a bundle reproduces the
/// original decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunBundle {
    pub facts: NormalizedFacts,
    pub compositions: Vec<ChapterComposition>,
}

impl RunBundle {
    /// Rebuild and lock the registry, then gate the compositions.
    pub fn evaluate(
        &self,
        config: &GovernanceConfig,
        resolver: &OwnershipResolver,
    ) -> Result<GateResult, RegistryError> {
        let mut registry = Registry::new();
        registry.register_all(self.facts.clone())?;
        registry.lock();

        let validator = StructuralValidator::from_config(config);
        let gate = ValidationGate::new(&validator, resolver, &registry, config);
        Ok(gate.evaluate(&self.compositions))
    }
}

// ============================================================================
// RUN TRACKING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: RunStatus,
    pub at: DateTime<Utc>,
}

/// Status of one run plus every transition it went through.
#[derive(Debug, Clone)]
pub struct RunTracker {
    run_id: Uuid,
    status: RunStatus,
    history: Vec<StatusChange>,
}

impl RunTracker {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            status: RunStatus::Pending,
            history: vec![StatusChange {
                status: RunStatus::Pending,
                at: Utc::now(),
            }],
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn history(&self) -> &[StatusChange] {
        &self.history
    }

    pub fn into_history(self) -> Vec<StatusChange> {
        self.history
    }

    pub fn advance(&mut self, next: RunStatus) -> Result<RunStatus, InvalidTransition> {
        self.status = self.status.transition(next)?;
        self.history.push(StatusChange {
            status: self.status,
            at: Utc::now(),
        });
        info!(run_id = %self.run_id, status = %self.status, "run status changed");
        Ok(self.status)
    }

    /// Move to `Failed` from wherever the run is. A run that already ended
    /// keeps its terminal status.
    pub fn fail(&mut self) -> RunStatus {
        if !self.status.is_terminal() {
            // Every non-terminal state may fail.
            let _ = self.advance(RunStatus::Failed);
        }
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{
        FactContainer, FactEntry, NarrativeContainer, PreferenceContainer, SkippedVisual,
        VisualContainer,
    };
    use crate::ownership::{ChapterDefinition, OwnershipScope};
    use dossier_types::FactKind;
    use pretty_assertions::assert_eq;

    fn setup() -> (Registry, OwnershipResolver, GovernanceConfig) {
        let mut registry = Registry::new();
        registry.register("rooms", 5, FactKind::Fact, "listing").unwrap();
        registry.lock();
        let resolver = OwnershipResolver::new(vec![
            ChapterDefinition::new(OwnershipScope::new("ch1", ["rooms"]), "General"),
            ChapterDefinition::new(OwnershipScope::new("ch5", ["rooms"]), "Layout"),
        ])
        .unwrap();
        let mut config = GovernanceConfig::default();
        config.facts.min_facts = 1;
        (registry, resolver, config)
    }

    fn chapter(id: &str, registry: &Registry, words: usize) -> ChapterComposition {
        ChapterComposition::new(
            id,
            VisualContainer::not_applicable(vec![SkippedVisual::new("rooms_bar", "single value")]),
            NarrativeContainer::from_text(vec!["bright"; words].join(" ")),
            FactContainer::new(vec![FactEntry::from_registry(
                registry.get("rooms").entry().unwrap(),
                "Rooms",
            )]),
            PreferenceContainer::default(),
        )
    }

    #[test]
    fn test_gate_passes_clean_run() {
        let (registry, resolver, config) = setup();
        let validator = StructuralValidator::from_config(&config);
        let gate = ValidationGate::new(&validator, &resolver, &registry, &config);
        let result = gate.evaluate(&[
            chapter("ch1", &registry, 300),
            chapter("ch5", &registry, 400),
        ]);
        assert!(result.passed);
        assert!(result.fatal_violations.is_empty());
        assert!(result.clone().into_error().is_none());
        assert_eq!(result.summary(), "PASSED: 0 fatal, 0 warning(s)");
    }

    #[test]
    fn test_one_fatal_blocks_everything() {
        let (registry, resolver, config) = setup();
        let validator = StructuralValidator::from_config(&config);
        let gate = ValidationGate::new(&validator, &resolver, &registry, &config);
        let result = gate.evaluate(&[
            chapter("ch1", &registry, 300),
            chapter("ch5", &registry, 299),
        ]);
        assert!(!result.passed);
        assert_eq!(result.fatal_violations.len(), 1);
        assert_eq!(result.fatal_violations[0].chapter_id.as_str(), "ch5");

        let err = result.into_error().unwrap();
        assert_eq!(err.to_string(), "gate failed: 1 fatal violation(s)");
    }

    #[test]
    fn test_unknown_and_duplicate_chapters() {
        let (registry, resolver, config) = setup();
        let validator = StructuralValidator::from_config(&config);
        let gate = ValidationGate::new(&validator, &resolver, &registry, &config);
        let result = gate.evaluate(&[
            chapter("ch1", &registry, 300),
            chapter("ch1", &registry, 300),
            chapter("ch42", &registry, 300),
        ]);
        let codes: Vec<&str> = result.fatal_violations.iter().map(Violation::code).collect();
        assert_eq!(
            codes,
            vec![
                "COMPOSITION:STRUCTURE:DUPLICATE_CHAPTER",
                "COMPOSITION:OWNERSHIP:UNKNOWN_CHAPTER",
                "COMPOSITION:STRUCTURE:MISSING_CHAPTER"
            ]
        );
    }

    #[test]
    fn test_missing_required_chapter() {
        let (registry, resolver, mut config) = setup();
        config.required_chapters = vec!["ch5".into()];
        let validator = StructuralValidator::from_config(&config);
        let gate = ValidationGate::new(&validator, &resolver, &registry, &config);
        let result = gate.evaluate(&[chapter("ch1", &registry, 300)]);
        assert!(!result.passed);
        assert_eq!(result.fatal_violations[0].code(), "COMPOSITION:STRUCTURE:MISSING_CHAPTER");
        assert_eq!(result.fatal_violations[0].chapter_id.as_str(), "ch5");
    }

    #[test]
    fn test_empty_run_fails_with_every_chapter_missing() {
        let (registry, resolver, config) = setup();
        let validator = StructuralValidator::from_config(&config);
        let gate = ValidationGate::new(&validator, &resolver, &registry, &config);
        let result = gate.evaluate(&[]);
        assert!(!result.passed);
        let missing: Vec<&str> = result
            .fatal_violations
            .iter()
            .filter(|v| v.kind == ViolationKind::MissingChapter)
            .map(|v| v.chapter_id.as_str())
            .collect();
        assert_eq!(missing, vec!["ch1", "ch5"]);
    }

    #[test]
    fn test_partial_run_fails_without_required_list() {
        let (registry, resolver, config) = setup();
        assert!(config.required_chapters.is_empty());
        let validator = StructuralValidator::from_config(&config);
        let gate = ValidationGate::new(&validator, &resolver, &registry, &config);
        let result = gate.evaluate(&[chapter("ch1", &registry, 300)]);
        assert!(!result.passed);
        assert_eq!(result.fatal_violations.len(), 1);
        assert_eq!(result.fatal_violations[0].code(), "COMPOSITION:STRUCTURE:MISSING_CHAPTER");
        assert_eq!(result.fatal_violations[0].chapter_id.as_str(), "ch5");
    }

    #[test]
    fn test_explicit_required_list_narrows_the_check() {
        let (registry, resolver, mut config) = setup();
        config.required_chapters = vec!["ch1".into()];
        let validator = StructuralValidator::from_config(&config);
        let gate = ValidationGate::new(&validator, &resolver, &registry, &config);
        assert!(gate.evaluate(&[chapter("ch1", &registry, 300)]).passed);
    }

    #[test]
    fn test_warnings_do_not_block() {
        let (registry, resolver, mut config) = setup();
        config.facts.min_facts = 5;
        let validator = StructuralValidator::from_config(&config);
        let gate = ValidationGate::new(&validator, &resolver, &registry, &config);
        let result = gate.evaluate(&[
            chapter("ch1", &registry, 300),
            chapter("ch5", &registry, 300),
        ]);
        assert!(result.passed);
        assert_eq!(result.warnings.len(), 2);
        assert!(result
            .warnings
            .iter()
            .all(|v| v.code() == "FACTS:CARDINALITY:BELOW_FLOOR"));
    }

    #[test]
    fn test_bundle_replay_matches_live_gate() {
        let (registry, resolver, config) = setup();
        let bundle = RunBundle {
            facts: NormalizedFacts::new().with("rooms", 5, FactKind::Fact, "listing"),
            compositions: vec![chapter("ch1", &registry, 300), chapter("ch5", &registry, 10)],
        };
        let validator = StructuralValidator::from_config(&config);
        let live = ValidationGate::new(&validator, &resolver, &registry, &config)
            .evaluate(&bundle.compositions);
        let replayed = bundle.evaluate(&config, &resolver).unwrap();
        assert_eq!(replayed, live);
        assert!(!replayed.passed);
    }

    #[test]
    fn test_bundle_with_conflicting_facts_is_an_error() {
        let (_, resolver, config) = setup();
        let bundle = RunBundle {
            facts: NormalizedFacts::new()
                .with("rooms", 5, FactKind::Fact, "listing")
                .with("rooms", 6, FactKind::Fact, "brochure"),
            compositions: Vec::new(),
        };
        assert!(matches!(
            bundle.evaluate(&config, &resolver),
            Err(RegistryError::Conflict { .. })
        ));
    }

    #[test]
    fn test_tracker_happy_path() {
        let mut tracker = RunTracker::new(Uuid::new_v4());
        for next in [
            RunStatus::Enriching,
            RunStatus::Locked,
            RunStatus::Validating,
            RunStatus::Done,
        ] {
            tracker.advance(next).unwrap();
        }
        let statuses: Vec<RunStatus> = tracker.history().iter().map(|c| c.status).collect();
        assert_eq!(
            statuses,
            vec![
                RunStatus::Pending,
                RunStatus::Enriching,
                RunStatus::Locked,
                RunStatus::Validating,
                RunStatus::Done
            ]
        );
        assert_eq!(tracker.fail(), RunStatus::Done);
    }

    #[test]
    fn test_tracker_rejects_skipping_states() {
        let mut tracker = RunTracker::new(Uuid::new_v4());
        assert!(tracker.advance(RunStatus::Validating).is_err());
        assert_eq!(tracker.status(), RunStatus::Pending);
        assert_eq!(tracker.fail(), RunStatus::Failed);
        assert_eq!(tracker.history().len(), 2);
    }
}
