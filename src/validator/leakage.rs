//! Cross-plane leakage detection
//!
//! Narrative text must interpret, not repeat. Content that belongs to the
//! fact or preference planes (label/value listings, persona names, tables,
//! raw key/value dumps) is a leak.
//!
//! The shipped detector is pattern based and best effort. Anything smarter
//! plugs in through [`LeakageDetector`].

use std::sync::LazyLock;

use regex::Regex;

use super::ViolationKind;
use crate::config::LeakageConfig;

// =============================================================================
// PATTERNS
// =============================================================================

/// Short `Label: value` line, optionally bulleted or bolded
static LABEL_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:[-*•][ \t]*)?(?:\*\*)?[A-Za-z][\w ()/%.'-]{0,40}(?:\*\*)?:(?:\*\*)?[ \t]+[^\n]{1,60}$")
        .unwrap()
});

/// Markdown table row
static PIPE_ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*\|.*\|[ \t]*$").unwrap());

/// Markdown table header separator (`|---|:--:|`)
static TABLE_SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*\|?[ \t]*:?-{3,}:?[ \t]*\|[ \t:|-]*$").unwrap()
});

/// `snake_key=value`
static KEY_EQUALS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*=[^\s=]+").unwrap());

/// `{"key": ...`
static JSON_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\{\s*"[^"\n]+"\s*:"#).unwrap());

const EVIDENCE_CHARS: usize = 60;

// =============================================================================
// DETECTOR
// =============================================================================

/// One leak found in a narrative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeakageFinding {
    pub kind: ViolationKind,
    /// Offending excerpt, truncated.
    pub evidence: String,
}

impl LeakageFinding {
    fn new(kind: ViolationKind, evidence: &str) -> Self {
        let trimmed = evidence.trim();
        let evidence = match trimmed.char_indices().nth(EVIDENCE_CHARS) {
            Some((idx, _)) => format!("{}...", &trimmed[..idx]),
            None => trimmed.to_string(),
        };
        Self { kind, evidence }
    }
}

/// Seam for leakage detection. Implementations must be deterministic for a
/// given input.
pub trait LeakageDetector: Send + Sync {
    fn detect(&self, text: &str, persona_names: &[&str]) -> Vec<LeakageFinding>;
}

/// Regex heuristics. At most one finding per leak kind.
#[derive(Debug, Clone)]
pub struct PatternLeakageDetector {
    label_value_threshold: usize,
}

impl PatternLeakageDetector {
    pub fn new(label_value_threshold: usize) -> Self {
        Self {
            label_value_threshold: label_value_threshold.max(1),
        }
    }

    pub fn from_config(config: &LeakageConfig) -> Self {
        Self::new(config.label_value_threshold)
    }

    fn fact_dump(&self, text: &str) -> Option<LeakageFinding> {
        let lines: Vec<&str> = LABEL_VALUE_RE.find_iter(text).map(|m| m.as_str()).collect();
        if lines.len() >= self.label_value_threshold {
            Some(LeakageFinding::new(
                ViolationKind::LeakageFactDump,
                &format!("{} label/value lines, first: {}", lines.len(), lines[0].trim()),
            ))
        } else {
            None
        }
    }

    /// One case-insensitive alternation over every name. Word boundaries are
    /// only required at edges where the name itself starts or ends with a
    /// word character; `\b` next to `)` or `+` would never match.
    fn persona_name(text: &str, persona_names: &[&str]) -> Option<LeakageFinding> {
        let alternatives: Vec<String> = persona_names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(persona_pattern)
            .collect();
        if alternatives.is_empty() {
            return None;
        }
        let re = Regex::new(&format!("(?i){}", alternatives.join("|"))).ok()?;
        re.find(text)
            .map(|m| LeakageFinding::new(ViolationKind::LeakagePersonaName, m.as_str()))
    }

    fn tabular(text: &str) -> Option<LeakageFinding> {
        if let Some(sep) = TABLE_SEPARATOR_RE.find(text) {
            return Some(LeakageFinding::new(ViolationKind::LeakageTabular, sep.as_str()));
        }
        let rows: Vec<&str> = PIPE_ROW_RE.find_iter(text).map(|m| m.as_str()).collect();
        if rows.len() >= 2 {
            return Some(LeakageFinding::new(ViolationKind::LeakageTabular, rows[0]));
        }

        let mut run = 0;
        for line in text.lines() {
            if line.trim().contains('\t') {
                run += 1;
                if run >= 2 {
                    return Some(LeakageFinding::new(ViolationKind::LeakageTabular, line));
                }
            } else {
                run = 0;
            }
        }
        None
    }

    fn raw_dump(text: &str) -> Option<LeakageFinding> {
        JSON_OBJECT_RE
            .find(text)
            .or_else(|| KEY_EQUALS_RE.find(text))
            .map(|m| LeakageFinding::new(ViolationKind::LeakageRawDump, m.as_str()))
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `Young family` -> `\bYoung family\b`, `Buyer (55+)` -> `\bBuyer \(55\+\)`
fn persona_pattern(name: &str) -> String {
    let lead = if name.starts_with(is_word_char) { r"\b" } else { "" };
    let trail = if name.ends_with(is_word_char) { r"\b" } else { "" };
    format!("(?:{lead}{}{trail})", regex::escape(name))
}

impl Default for PatternLeakageDetector {
    fn default() -> Self {
        Self::from_config(&LeakageConfig::default())
    }
}

impl LeakageDetector for PatternLeakageDetector {
    fn detect(&self, text: &str, persona_names: &[&str]) -> Vec<LeakageFinding> {
        [
            self.fact_dump(text),
            Self::persona_name(text, persona_names),
            Self::tabular(text),
            Self::raw_dump(text),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}
