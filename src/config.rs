//! Governance configuration
//!
//! Thresholds for the per-plane rules, runtime limits for the pipeline and
//! (optionally) the chapter table. Loaded once per process and passed
//! explicitly into the validator and pipeline; nothing reads it from global
//! state.
//!
//! Resolution order for [`GovernanceConfig::from_env`]:
//! 1. `DOSSIER_CONFIG` points at a YAML file
//! 2. built-in defaults
//!
//! followed by `DOSSIER_*` scalar overrides.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use dossier_types::ChapterId;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ownership::ChapterDefinition;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    pub narrative: NarrativeLimits,
    pub facts: FactLimits,
    pub visuals: VisualLimits,
    pub preference: PreferenceLimits,
    pub leakage: LeakageConfig,
    pub runtime: RuntimeConfig,
    /// Chapters the gate insists on seeing in every run. Empty means every
    /// chapter in the table.
    pub required_chapters: Vec<ChapterId>,
    /// Persona display names that must never appear in narrative text.
    pub personas: Vec<String>,
    /// Chapter table. Empty means the built-in standard layout.
    pub chapters: Vec<ChapterConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeLimits {
    pub min_words: usize,
    pub max_words: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactLimits {
    /// Below this the fact plane gets a warning, not a failure.
    pub min_facts: usize,
    pub max_facts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualLimits {
    pub max_visuals: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferenceLimits {
    /// Upper bound on key values and on concerns per persona.
    pub max_persona_bullets: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeakageConfig {
    /// Number of `Label: value` lines that make a narrative a fact dump.
    pub label_value_threshold: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub narrative_timeout_secs: u64,
    pub max_parallel_chapters: usize,
    pub max_concurrent_runs: usize,
}

/// One chapter in the configured table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterConfig {
    pub id: ChapterId,
    pub title: String,
    pub allowed_keys: Vec<String>,
    #[serde(default)]
    pub min_words: Option<usize>,
    #[serde(default)]
    pub max_visuals: Option<usize>,
}

/// Thresholds in force for a single chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterPolicy {
    pub min_words: usize,
    pub max_words: usize,
    pub max_visuals: usize,
    pub min_facts: usize,
    pub max_facts: usize,
    pub max_persona_bullets: usize,
}

impl Default for NarrativeLimits {
    fn default() -> Self {
        Self {
            min_words: 300,
            max_words: 2_500,
        }
    }
}

impl Default for FactLimits {
    fn default() -> Self {
        Self {
            min_facts: 5,
            max_facts: 40,
        }
    }
}

impl Default for VisualLimits {
    fn default() -> Self {
        Self { max_visuals: 6 }
    }
}

impl Default for PreferenceLimits {
    fn default() -> Self {
        Self {
            max_persona_bullets: 6,
        }
    }
}

impl Default for LeakageConfig {
    fn default() -> Self {
        Self {
            label_value_threshold: 3,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            narrative_timeout_secs: 60,
            max_parallel_chapters: 4,
            max_concurrent_runs: 8,
        }
    }
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            narrative: NarrativeLimits::default(),
            facts: FactLimits::default(),
            visuals: VisualLimits::default(),
            preference: PreferenceLimits::default(),
            leakage: LeakageConfig::default(),
            runtime: RuntimeConfig::default(),
            required_chapters: Vec::new(),
            personas: Vec::new(),
            chapters: Vec::new(),
        }
    }
}

impl GovernanceConfig {
    /// Load and validate a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading governance configuration from {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: GovernanceConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;

        info!(
            chapters = config.chapters.len(),
            min_words = config.narrative.min_words,
            "Loaded governance configuration"
        );
        Ok(config)
    }

    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var("DOSSIER_CONFIG") {
            Ok(path) => Self::load(path)?,
            Err(_) => Self::default(),
        };

        if let Some(secs) = env_number("DOSSIER_NARRATIVE_TIMEOUT_SECS")? {
            config.runtime.narrative_timeout_secs = secs;
        }
        if let Some(n) = env_number("DOSSIER_MAX_PARALLEL_CHAPTERS")? {
            config.runtime.max_parallel_chapters = n;
        }
        if let Some(n) = env_number("DOSSIER_MAX_CONCURRENT_RUNS")? {
            config.runtime.max_concurrent_runs = n;
        }
        if let Some(n) = env_number("DOSSIER_MIN_WORDS")? {
            config.narrative.min_words = n;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.narrative.min_words == 0 {
            bail!("narrative.min_words must be greater than zero");
        }
        if self.narrative.min_words > self.narrative.max_words {
            bail!(
                "narrative.min_words ({}) exceeds narrative.max_words ({})",
                self.narrative.min_words,
                self.narrative.max_words
            );
        }
        if self.facts.min_facts > self.facts.max_facts {
            bail!(
                "facts.min_facts ({}) exceeds facts.max_facts ({})",
                self.facts.min_facts,
                self.facts.max_facts
            );
        }
        if self.runtime.max_parallel_chapters == 0 || self.runtime.max_concurrent_runs == 0 {
            bail!("runtime concurrency limits must be greater than zero");
        }
        if self.runtime.narrative_timeout_secs == 0 {
            bail!("runtime.narrative_timeout_secs must be greater than zero");
        }
        for chapter in &self.chapters {
            if chapter.allowed_keys.is_empty() {
                bail!("chapter '{}' has no allowed_keys", chapter.id);
            }
            if let Some(min) = chapter.min_words {
                if min > self.narrative.max_words {
                    bail!(
                        "chapter '{}' min_words ({}) exceeds narrative.max_words ({})",
                        chapter.id,
                        min,
                        self.narrative.max_words
                    );
                }
            }
        }
        Ok(())
    }

    pub fn narrative_timeout(&self) -> Duration {
        Duration::from_secs(self.runtime.narrative_timeout_secs)
    }

    /// Global thresholds with the chapter's overrides applied.
    pub fn policy_for(&self, chapter: &ChapterDefinition) -> ChapterPolicy {
        ChapterPolicy {
            min_words: chapter.min_words.unwrap_or(self.narrative.min_words),
            max_words: self.narrative.max_words,
            max_visuals: chapter.max_visuals.unwrap_or(self.visuals.max_visuals),
            min_facts: self.facts.min_facts,
            max_facts: self.facts.max_facts,
            max_persona_bullets: self.preference.max_persona_bullets,
        }
    }
}

impl Default for ChapterPolicy {
    fn default() -> Self {
        GovernanceConfig::default().policy_for(&ChapterDefinition::new(
            crate::ownership::OwnershipScope::new("default", Vec::<String>::new()),
            "default",
        ))
    }
}

fn env_number<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("{key} must be a number, got {raw:?}")),
        Err(_) => Ok(None),
    }
}
