//! Visual plane: charts and gauges, each backed by registry keys.

use std::collections::BTreeSet;

use dossier_types::ChapterId;
use serde::{Deserialize, Serialize};

use crate::config::ChapterPolicy;
use crate::registry::Registry;
use crate::validator::{Violation, ViolationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Line,
    Gauge,
    Radar,
    Map,
    Timeline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualItem {
    pub visual_id: String,
    pub title: String,
    pub chart_kind: ChartKind,
    pub referenced_keys: Vec<String>,
}

impl VisualItem {
    pub fn new<I, K>(
        visual_id: impl Into<String>,
        title: impl Into<String>,
        chart_kind: ChartKind,
        keys: I,
    ) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            visual_id: visual_id.into(),
            title: title.into(),
            chart_kind,
            referenced_keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

/// A candidate visual that could not be produced, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedVisual {
    pub visual_id: String,
    pub reason: String,
}

impl SkippedVisual {
    pub fn new(visual_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            visual_id: visual_id.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualContainer {
    pub items: Vec<VisualItem>,
    pub data_source_ids: BTreeSet<String>,
    pub applicable: bool,
    pub inapplicable_reason: Option<String>,
    #[serde(default)]
    pub skipped_candidates: Vec<SkippedVisual>,
}

impl VisualContainer {
    /// Items with `data_source_ids` derived from what they cite.
    pub fn with_items(items: Vec<VisualItem>) -> Self {
        let data_source_ids = items
            .iter()
            .flat_map(|item| item.referenced_keys.iter().cloned())
            .collect();
        Self {
            applicable: !items.is_empty(),
            items,
            data_source_ids,
            inapplicable_reason: None,
            skipped_candidates: Vec::new(),
        }
    }

    /// No visual could be produced. The reason enumerates every candidate.
    pub fn not_applicable(skipped: Vec<SkippedVisual>) -> Self {
        let reason = skipped
            .iter()
            .map(|s| format!("{}: {}", s.visual_id, s.reason))
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            items: Vec::new(),
            data_source_ids: BTreeSet::new(),
            applicable: false,
            inapplicable_reason: Some(reason),
            skipped_candidates: skipped,
        }
    }

    pub fn referenced_keys(&self) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .flat_map(|item| item.referenced_keys.iter().map(String::as_str))
    }
}

pub fn check(
    visual: &VisualContainer,
    chapter_id: &ChapterId,
    registry: &Registry,
    policy: &ChapterPolicy,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    check_applicability(visual, chapter_id, &mut violations);

    if visual.items.len() > policy.max_visuals {
        violations.push(Violation::fatal(
            chapter_id,
            ViolationKind::VisualTooMany,
            format!(
                "{} visuals exceed the chapter maximum of {}",
                visual.items.len(),
                policy.max_visuals
            ),
        ));
    }

    let mut cited = BTreeSet::new();
    for item in &visual.items {
        if item.referenced_keys.is_empty() {
            violations.push(Violation::fatal(
                chapter_id,
                ViolationKind::VisualNoSource,
                format!("Visual '{}' cites no registry key", item.visual_id),
            ));
        }
        for key in &item.referenced_keys {
            cited.insert(key.as_str());
            if !registry.contains(key) {
                violations.push(Violation::fatal(
                    chapter_id,
                    ViolationKind::VisualUnknownKey,
                    format!(
                        "Visual '{}' cites '{}', which is not in the registry",
                        item.visual_id, key
                    ),
                ));
            }
            if !visual.data_source_ids.contains(key) {
                violations.push(Violation::fatal(
                    chapter_id,
                    ViolationKind::VisualUndeclaredSource,
                    format!(
                        "Visual '{}' cites '{}', which is missing from data_source_ids",
                        item.visual_id, key
                    ),
                ));
            }
        }
    }

    for declared in &visual.data_source_ids {
        if !cited.contains(declared.as_str()) {
            violations.push(Violation::warning(
                chapter_id,
                ViolationKind::VisualUnusedSource,
                format!("data_source_ids lists '{}' but no visual cites it", declared),
            ));
        }
    }

    violations
}

fn check_applicability(
    visual: &VisualContainer,
    chapter_id: &ChapterId,
    violations: &mut Vec<Violation>,
) {
    match (visual.applicable, visual.items.is_empty()) {
        (true, true) => {
            violations.push(Violation::fatal(
                chapter_id,
                ViolationKind::VisualFlagMismatch,
                "Visual plane has no items but is marked applicable",
            ));
            return;
        }
        (false, false) => {
            violations.push(Violation::fatal(
                chapter_id,
                ViolationKind::VisualFlagMismatch,
                format!(
                    "Visual plane is marked inapplicable but carries {} item(s)",
                    visual.items.len()
                ),
            ));
            return;
        }
        (true, false) => return,
        (false, true) => {}
    }

    let reason = visual
        .inapplicable_reason
        .as_deref()
        .map(str::trim)
        .unwrap_or_default();
    if reason.is_empty() {
        violations.push(Violation::fatal(
            chapter_id,
            ViolationKind::VisualReasonMissing,
            "Inapplicable visual plane must state why",
        ));
        return;
    }

    if visual.skipped_candidates.is_empty() {
        violations.push(Violation::fatal(
            chapter_id,
            ViolationKind::VisualReasonGeneric,
            format!("Reason {reason:?} does not enumerate any candidate visual"),
        ));
        return;
    }

    for skipped in &visual.skipped_candidates {
        if skipped.reason.trim().is_empty() || !reason.contains(skipped.visual_id.as_str()) {
            violations.push(Violation::fatal(
                chapter_id,
                ViolationKind::VisualReasonGeneric,
                format!(
                    "Candidate visual '{}' is not explained in the inapplicable reason",
                    skipped.visual_id
                ),
            ));
        }
    }
}
