//! Async pipeline and run pool behaviour.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dossier::config::{ChapterConfig, GovernanceConfig};
use dossier::ownership::{OwnershipResolver, ScopedFacts};
use dossier::pipeline::{
    EnrichmentPipeline, FactSheetAssembler, FailureStage, GeneratedNarrative, NarrativeGenerator,
    RunOutcome, RunPool,
};
use dossier::{
    ChapterId, FactKind, NarrativeError, NarrativeProvenance, NormalizedFacts, RunStatus,
    ViolationKind,
};
use pretty_assertions::assert_eq;

const SENTENCE: &str = "The house offers generous daylight and a calm street setting.";

fn prose() -> String {
    vec![SENTENCE; 32].join(" ")
}

/// Well-behaved generator, except for the chapters it is told to break.
#[derive(Default)]
struct ScriptedGenerator {
    fail: HashSet<String>,
    stall: HashSet<String>,
    anonymous: bool,
}

#[async_trait]
impl NarrativeGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        chapter_id: &ChapterId,
        _facts: &ScopedFacts,
    ) -> Result<GeneratedNarrative, NarrativeError> {
        if self.stall.contains(chapter_id.as_str()) {
            tokio::time::sleep(Duration::from_secs(3_600)).await;
        }
        if self.fail.contains(chapter_id.as_str()) {
            return Err(NarrativeError::Failed("upstream returned 503".into()));
        }
        Ok(GeneratedNarrative {
            text: prose(),
            provenance: (!self.anonymous)
                .then(|| NarrativeProvenance::new("acme", "writer-large")),
        })
    }
}

/// Records the highest number of concurrent calls.
#[derive(Default)]
struct CountingGenerator {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl NarrativeGenerator for CountingGenerator {
    async fn generate(
        &self,
        _chapter_id: &ChapterId,
        _facts: &ScopedFacts,
    ) -> Result<GeneratedNarrative, NarrativeError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(GeneratedNarrative {
            text: prose(),
            provenance: Some(NarrativeProvenance::new("acme", "writer-large")),
        })
    }
}

fn chapter(id: &str, title: &str, keys: &[&str]) -> ChapterConfig {
    ChapterConfig {
        id: id.into(),
        title: title.into(),
        allowed_keys: keys.iter().map(|k| k.to_string()).collect(),
        min_words: None,
        max_visuals: None,
    }
}

fn config() -> GovernanceConfig {
    let mut config = GovernanceConfig {
        chapters: vec![
            chapter("ch1", "General", &["living_area", "rooms", "build_year"]),
            chapter("ch2", "Price", &["asking_price", "price_per_m2"]),
            chapter("ch9", "Legal", &["ownership_type"]),
        ],
        required_chapters: vec!["ch1".into()],
        ..GovernanceConfig::default()
    };
    config.facts.min_facts = 1;
    config.runtime.narrative_timeout_secs = 2;
    config
}

fn facts() -> NormalizedFacts {
    NormalizedFacts::new()
        .with("living_area", 120, FactKind::Fact, "listing")
        .with("rooms", 5, FactKind::Fact, "listing")
        .with("build_year", 1932, FactKind::Fact, "land_registry")
        .with("asking_price", 485_000, FactKind::Fact, "listing")
        .with("price_per_m2", 4_041, FactKind::Derived, "calc")
        .with("ownership_type", "freehold", FactKind::Fact, "land_registry")
}

fn pipeline_with(
    config: GovernanceConfig,
    generator: Arc<dyn NarrativeGenerator>,
) -> EnrichmentPipeline {
    let resolver = OwnershipResolver::from_config(&config.chapters).unwrap();
    EnrichmentPipeline::new(config, resolver, generator, Arc::new(FactSheetAssembler))
}

fn pipeline(generator: ScriptedGenerator) -> EnrichmentPipeline {
    pipeline_with(config(), Arc::new(generator))
}

fn statuses(history: &[dossier::gate::StatusChange]) -> Vec<RunStatus> {
    history.iter().map(|c| c.status).collect()
}

#[tokio::test]
async fn clean_run_is_delivered_in_chapter_order() {
    let outcome = pipeline(ScriptedGenerator::default()).run(facts()).await;
    let report = match &outcome {
        RunOutcome::Delivered(report) => report,
        RunOutcome::Rejected(failed) => panic!("run rejected: {:?}", failed.fatal_violations()),
    };

    let order: Vec<&str> = report
        .compositions
        .iter()
        .map(|c| c.chapter_id().as_str())
        .collect();
    assert_eq!(order, vec!["ch1", "ch2", "ch9"]);
    assert_eq!(
        statuses(&report.history),
        vec![
            RunStatus::Pending,
            RunStatus::Enriching,
            RunStatus::Locked,
            RunStatus::Validating,
            RunStatus::Done
        ]
    );
    assert_eq!(report.registry.entries.len(), 6);
    assert!(report.registry.verify());
    assert!(report.warnings.is_empty());
    assert!(report.compositions.iter().all(|c| c.narrative().generated_by_model));
}

#[tokio::test]
async fn same_facts_share_a_fingerprint_across_runs() {
    let pipeline = pipeline(ScriptedGenerator::default());
    let first = pipeline.run(facts()).await;
    let second = pipeline.run(facts()).await;
    assert_ne!(first.run_id(), second.run_id());
    assert_eq!(
        first.report().unwrap().registry.fingerprint,
        second.report().unwrap().registry.fingerprint
    );
}

#[tokio::test]
async fn generator_failure_fails_the_run_without_retry() {
    let generator = ScriptedGenerator {
        fail: HashSet::from(["ch2".to_string()]),
        ..ScriptedGenerator::default()
    };
    let outcome = pipeline(generator).run(facts()).await;
    let failed = outcome.failure().expect("run must be rejected");

    assert_eq!(failed.stage, FailureStage::Validation);
    assert_eq!(failed.diagnostics.len(), 3);
    assert!(failed
        .fatal_violations()
        .iter()
        .all(|v| v.chapter_id.as_str() == "ch2"));
    assert!(failed
        .fatal_violations()
        .iter()
        .any(|v| v.kind == ViolationKind::NarrativeEmpty));
    assert_eq!(statuses(&failed.history).last(), Some(&RunStatus::Failed));
    assert_eq!(outcome.status(), RunStatus::Failed);
}

#[tokio::test(start_paused = true)]
async fn stalled_generator_times_out() {
    let generator = ScriptedGenerator {
        stall: HashSet::from(["ch9".to_string()]),
        ..ScriptedGenerator::default()
    };
    let outcome = pipeline(generator).run(facts()).await;
    let failed = outcome.failure().expect("run must be rejected");
    let codes: Vec<&str> = failed.fatal_violations().iter().map(|v| v.code()).collect();
    assert_eq!(
        codes,
        vec!["NARRATIVE:GENERATION:EMPTY", "NARRATIVE:LENGTH:BELOW_MINIMUM"]
    );
    assert_eq!(failed.fatal_violations()[0].chapter_id.as_str(), "ch9");
}

#[tokio::test]
async fn narrative_without_provenance_is_fatal() {
    let generator = ScriptedGenerator {
        anonymous: true,
        ..ScriptedGenerator::default()
    };
    let outcome = pipeline(generator).run(facts()).await;
    let failed = outcome.failure().expect("run must be rejected");
    assert_eq!(failed.fatal_violations().len(), 3);
    assert!(failed
        .fatal_violations()
        .iter()
        .all(|v| v.kind == ViolationKind::NarrativeProvenanceMissing));
}

#[tokio::test]
async fn conflicting_facts_abort_enrichment() {
    let conflicting = facts().with("rooms", 6, FactKind::Fact, "brochure");
    let outcome = pipeline(ScriptedGenerator::default()).run(conflicting).await;
    let failed = outcome.failure().expect("run must be rejected");

    assert_eq!(failed.stage, FailureStage::Enrichment);
    assert!(failed.gate.is_none());
    assert!(failed.diagnostics.is_empty());
    assert!(failed
        .error
        .as_deref()
        .unwrap()
        .contains("conflicting value for 'rooms'"));
    assert_eq!(
        statuses(&failed.history),
        vec![RunStatus::Pending, RunStatus::Enriching, RunStatus::Failed]
    );
}

#[tokio::test]
async fn missing_facts_become_stated_gaps() {
    let partial = NormalizedFacts::new()
        .with("living_area", 120, FactKind::Fact, "listing")
        .with("asking_price", 485_000, FactKind::Fact, "listing")
        .with("ownership_type", "freehold", FactKind::Fact, "land_registry");
    let outcome = pipeline(ScriptedGenerator::default()).run(partial).await;
    let report = outcome.report().expect("gaps with reasons must not block");

    let ch1 = &report.compositions[0];
    let gaps: Vec<&str> = ch1
        .facts()
        .entries
        .iter()
        .filter(|f| f.is_missing())
        .map(|f| f.key.as_str())
        .collect();
    assert_eq!(gaps, vec!["build_year", "rooms"]);
}

#[tokio::test]
async fn chapter_parallelism_is_bounded() {
    let mut config = config();
    config.runtime.max_parallel_chapters = 2;
    config.chapters.push(chapter("ch5", "Layout", &["rooms"]));
    config.chapters.push(chapter("ch7", "Garden", &["living_area"]));

    let generator = Arc::new(CountingGenerator::default());
    let pipeline = pipeline_with(config, generator.clone());
    let outcome = pipeline.run(facts()).await;

    assert!(outcome.is_delivered());
    let peak = generator.peak.load(Ordering::SeqCst);
    assert!((1..=2).contains(&peak), "peak concurrency was {peak}");
}

#[tokio::test]
async fn pool_preserves_input_order() {
    let pool = RunPool::new(Arc::new(pipeline(ScriptedGenerator::default())), 2);
    assert_eq!(pool.available_permits(), 2);

    let batches = vec![
        facts(),
        facts().with("rooms", 7, FactKind::Fact, "brochure"),
        facts(),
    ];
    let outcomes = pool.run_all(batches).await;

    let delivered: Vec<bool> = outcomes.iter().map(RunOutcome::is_delivered).collect();
    assert_eq!(delivered, vec![true, false, true]);
    let ids: HashSet<_> = outcomes.iter().map(RunOutcome::run_id).collect();
    assert_eq!(ids.len(), 3);
    assert_eq!(pool.available_permits(), 2);
}

#[tokio::test]
async fn submitted_run_can_be_awaited() {
    let pool = RunPool::from_pipeline(Arc::new(pipeline(ScriptedGenerator::default())));
    let handle = pool.submit(facts());
    let outcome = handle.await.unwrap();
    assert!(outcome.is_delivered());
}
