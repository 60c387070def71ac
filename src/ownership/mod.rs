//! Chapter ownership
//!
//! Static map from chapter to the registry keys it may read or claim. The
//! registry stores truth; this module decides who may see it. The validator
//! consults [`OwnershipResolver::check_access`]; the registry itself never
//! does.

mod scoped;
mod standard;

use std::collections::{BTreeSet, HashMap};

use dossier_types::ChapterId;
use serde::{Deserialize, Serialize};

use crate::config::ChapterConfig;
use crate::error::OwnershipError;

pub use scoped::ScopedFacts;

/// Keys a chapter is authorized to reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipScope {
    pub chapter_id: ChapterId,
    pub allowed_keys: BTreeSet<String>,
}

impl OwnershipScope {
    pub fn new<I, K>(chapter_id: impl Into<ChapterId>, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            chapter_id: chapter_id.into(),
            allowed_keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allows(&self, key: &str) -> bool {
        self.allowed_keys.contains(key)
    }
}

/// A chapter as the resolver knows it: scope plus optional per-chapter
/// overrides of the global thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterDefinition {
    pub scope: OwnershipScope,
    pub title: String,
    pub min_words: Option<usize>,
    pub max_visuals: Option<usize>,
}

impl ChapterDefinition {
    pub fn new(scope: OwnershipScope, title: impl Into<String>) -> Self {
        Self {
            scope,
            title: title.into(),
            min_words: None,
            max_visuals: None,
        }
    }

    pub fn with_min_words(mut self, min_words: usize) -> Self {
        self.min_words = Some(min_words);
        self
    }

    pub fn id(&self) -> &ChapterId {
        &self.scope.chapter_id
    }
}

impl From<&ChapterConfig> for ChapterDefinition {
    fn from(cfg: &ChapterConfig) -> Self {
        Self {
            scope: OwnershipScope::new(cfg.id.clone(), cfg.allowed_keys.iter().cloned()),
            title: cfg.title.clone(),
            min_words: cfg.min_words,
            max_visuals: cfg.max_visuals,
        }
    }
}

/// Resolves chapter ids to their scopes. Chapters keep declaration order.
#[derive(Debug, Clone)]
pub struct OwnershipResolver {
    chapters: Vec<ChapterDefinition>,
    index: HashMap<ChapterId, usize>,
}

impl OwnershipResolver {
    pub fn new(chapters: Vec<ChapterDefinition>) -> Result<Self, OwnershipError> {
        let mut index = HashMap::with_capacity(chapters.len());
        for (i, chapter) in chapters.iter().enumerate() {
            if index.insert(chapter.id().clone(), i).is_some() {
                return Err(OwnershipError::DuplicateChapter(chapter.id().clone()));
            }
        }
        Ok(Self { chapters, index })
    }

    /// Scopes only, no per-chapter overrides.
    pub fn from_scopes(scopes: Vec<OwnershipScope>) -> Result<Self, OwnershipError> {
        Self::new(
            scopes
                .into_iter()
                .map(|scope| {
                    let title = scope.chapter_id.to_string();
                    ChapterDefinition::new(scope, title)
                })
                .collect(),
        )
    }

    /// Build from configured chapters, falling back to the standard table
    /// when none are configured.
    pub fn from_config(chapters: &[ChapterConfig]) -> Result<Self, OwnershipError> {
        if chapters.is_empty() {
            return Ok(Self::standard());
        }
        Self::new(chapters.iter().map(ChapterDefinition::from).collect())
    }

    /// The built-in property report layout.
    pub fn standard() -> Self {
        let chapters = standard::chapters();
        let index = chapters
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id().clone(), i))
            .collect();
        Self { chapters, index }
    }

    pub fn resolve(&self, chapter_id: &ChapterId) -> Result<&OwnershipScope, OwnershipError> {
        self.definition(chapter_id).map(|d| &d.scope)
    }

    pub fn definition(&self, chapter_id: &ChapterId) -> Result<&ChapterDefinition, OwnershipError> {
        self.index
            .get(chapter_id)
            .map(|&i| &self.chapters[i])
            .ok_or_else(|| OwnershipError::UnknownChapter(chapter_id.clone()))
    }

    /// May `chapter_id` reference `key`? Unknown chapters may reference nothing.
    pub fn check_access(&self, chapter_id: &ChapterId, key: &str) -> bool {
        self.resolve(chapter_id)
            .map(|scope| scope.allows(key))
            .unwrap_or(false)
    }

    pub fn chapters(&self) -> impl Iterator<Item = &ChapterId> {
        self.chapters.iter().map(ChapterDefinition::id)
    }

    pub fn definitions(&self) -> &[ChapterDefinition] {
        &self.chapters
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_chapters() -> OwnershipResolver {
        OwnershipResolver::from_scopes(vec![
            OwnershipScope::new("ch1", ["asking_price", "living_area"]),
            OwnershipScope::new("ch9", ["ownership_type"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_resolve_known_chapter() {
        let resolver = two_chapters();
        let scope = resolver.resolve(&ChapterId::from("ch9")).unwrap();
        assert!(scope.allows("ownership_type"));
        assert!(!scope.allows("asking_price"));
    }

    #[test]
    fn test_resolve_unknown_chapter() {
        let resolver = two_chapters();
        assert_eq!(
            resolver.resolve(&ChapterId::from("ch4")).unwrap_err(),
            OwnershipError::UnknownChapter(ChapterId::from("ch4"))
        );
    }

    #[test]
    fn test_check_access() {
        let resolver = two_chapters();
        assert!(resolver.check_access(&"ch1".into(), "asking_price"));
        assert!(!resolver.check_access(&"ch9".into(), "asking_price"));
        assert!(!resolver.check_access(&"ch4".into(), "asking_price"));
    }

    #[test]
    fn test_duplicate_chapter_rejected() {
        let err = OwnershipResolver::from_scopes(vec![
            OwnershipScope::new("ch1", ["a"]),
            OwnershipScope::new("ch1", ["b"]),
        ])
        .unwrap_err();
        assert_eq!(err, OwnershipError::DuplicateChapter(ChapterId::from("ch1")));
    }

    #[test]
    fn test_declaration_order_preserved() {
        let resolver = OwnershipResolver::from_scopes(vec![
            OwnershipScope::new("ch10", ["a"]),
            OwnershipScope::new("ch2", ["b"]),
        ])
        .unwrap();
        let ids: Vec<&str> = resolver.chapters().map(ChapterId::as_str).collect();
        assert_eq!(ids, vec!["ch10", "ch2"]);
    }

    #[test]
    fn test_from_config_falls_back_to_standard() {
        let resolver = OwnershipResolver::from_config(&[]).unwrap();
        assert_eq!(resolver.len(), OwnershipResolver::standard().len());
    }

    #[test]
    fn test_from_config_keeps_overrides() {
        let cfg = ChapterConfig {
            id: ChapterId::from("ch0"),
            title: "Summary".into(),
            allowed_keys: vec!["asking_price".into()],
            min_words: Some(450),
            max_visuals: Some(2),
        };
        let resolver = OwnershipResolver::from_config(&[cfg]).unwrap();
        let def = resolver.definition(&"ch0".into()).unwrap();
        assert_eq!(def.min_words, Some(450));
        assert_eq!(def.max_visuals, Some(2));
        assert!(def.scope.allows("asking_price"));
    }
}
