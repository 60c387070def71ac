//! Structural validator
//!
//! Pure function of (composition, locked registry, scope, policy). Checks run
//! in a fixed order so output is stable for identical input:
//!
//! 1. Ownership: every cited key must be in the chapter's scope
//! 2. Visual plane
//! 3. Narrative plane
//! 4. Fact plane
//! 5. Preference plane
//! 6. Cross-plane leakage into the narrative

mod leakage;
mod violation;

use std::sync::Arc;

use dossier_types::ContainerKind;
use tracing::debug;

use crate::config::{ChapterPolicy, GovernanceConfig};
use crate::content::{facts, narrative, preference, visual, ChapterComposition};
use crate::ownership::OwnershipScope;
use crate::registry::Registry;

pub use leakage::{LeakageDetector, LeakageFinding, PatternLeakageDetector};
pub use violation::{Violation, ViolationKind};

/// Everything the validator reads besides the composition itself.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub registry: &'a Registry,
    pub scope: &'a OwnershipScope,
    pub policy: &'a ChapterPolicy,
    /// Extra names (beyond the composition's own personas) that must not
    /// appear in narrative text.
    pub persona_names: &'a [String],
}

#[derive(Clone)]
pub struct StructuralValidator {
    personas: Vec<String>,
    leakage: Arc<dyn LeakageDetector>,
}

impl std::fmt::Debug for StructuralValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuralValidator")
            .field("personas", &self.personas)
            .finish_non_exhaustive()
    }
}

impl StructuralValidator {
    pub fn new(config: &GovernanceConfig, leakage: Arc<dyn LeakageDetector>) -> Self {
        Self {
            personas: config.personas.clone(),
            leakage,
        }
    }

    /// Validator with the pattern-based leakage detector.
    pub fn from_config(config: &GovernanceConfig) -> Self {
        Self::new(
            config,
            Arc::new(PatternLeakageDetector::from_config(&config.leakage)),
        )
    }

    pub fn validate(
        &self,
        composition: &ChapterComposition,
        ctx: &ValidationContext<'_>,
    ) -> Vec<Violation> {
        let chapter_id = composition.chapter_id();
        let mut violations = check_ownership(composition, ctx.scope);

        violations.extend(visual::check(
            composition.visual(),
            chapter_id,
            ctx.registry,
            ctx.policy,
        ));
        violations.extend(narrative::check(
            composition.narrative(),
            chapter_id,
            ctx.policy,
        ));
        violations.extend(facts::check(
            composition.facts(),
            chapter_id,
            ctx.registry,
            ctx.policy,
        ));
        violations.extend(preference::check(
            composition.preference(),
            chapter_id,
            ctx.policy,
        ));
        violations.extend(self.check_leakage(composition, ctx));

        debug!(
            chapter = %chapter_id,
            violations = violations.len(),
            fatal = violations.iter().filter(|v| v.is_fatal()).count(),
            "composition validated"
        );
        violations
    }

    fn check_leakage(
        &self,
        composition: &ChapterComposition,
        ctx: &ValidationContext<'_>,
    ) -> Vec<Violation> {
        let text = &composition.narrative().text;
        if text.trim().is_empty() {
            return Vec::new();
        }

        let mut names: Vec<&str> = composition.preference().persona_names().collect();
        names.extend(self.personas.iter().map(String::as_str));
        names.extend(ctx.persona_names.iter().map(String::as_str));
        names.sort_unstable();
        names.dedup();

        self.leakage
            .detect(text, &names)
            .into_iter()
            .map(|finding| {
                Violation::fatal(
                    composition.chapter_id(),
                    finding.kind,
                    format!("Narrative leaks plane content: {}", finding.evidence),
                )
            })
            .collect()
    }
}

/// One violation per out-of-scope key, reported against the plane that
/// cites it (visual first).
fn check_ownership(composition: &ChapterComposition, scope: &OwnershipScope) -> Vec<Violation> {
    let chapter_id = composition.chapter_id();
    let mut violations = Vec::new();

    if chapter_id != &scope.chapter_id {
        violations.push(Violation::fatal(
            chapter_id,
            ViolationKind::ScopeMismatch,
            format!(
                "Composition for '{}' validated against the scope of '{}'",
                chapter_id, scope.chapter_id
            ),
        ));
    }

    for key in composition.referenced_keys() {
        if scope.allows(key) {
            continue;
        }
        let container = if composition.visual().referenced_keys().any(|k| k == key) {
            ContainerKind::Visual
        } else {
            ContainerKind::Facts
        };
        violations.push(
            Violation::fatal(
                chapter_id,
                ViolationKind::OutOfScope,
                format!("Key '{}' is not owned by {}", key, scope.chapter_id),
            )
            .in_container(container),
        );
    }

    violations
}
