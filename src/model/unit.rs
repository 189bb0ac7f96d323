//! Text units: translatable content with per-locale targets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{LocaleId, Properties, Skeleton, TextContainer, TextFragment};
use crate::error::{Error, Result};

/// A unit of translatable content.
///
/// A locale missing from the target map means "no target"; a locale mapped
/// to an empty container means "target explicitly empty".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextUnit {
    /// Identifier, unique within the document
    pub id: String,

    /// Optional resource name (e.g. a key or element name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Optional resource type (e.g. `paragraph`, `title`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_type: Option<String>,

    /// Source content
    pub source: TextContainer,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    targets: BTreeMap<LocaleId, TextContainer>,

    /// Resource-level properties
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,

    /// Skeleton surrounding the unit's content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skeleton: Option<Skeleton>,

    /// Whether the content should be translated
    #[serde(default = "default_true")]
    pub translatable: bool,

    /// Whether whitespace is significant
    #[serde(default)]
    pub preserve_whitespace: bool,

    /// Whether the unit is only rendered where another resource refers to it
    #[serde(default)]
    pub referent: bool,
}

fn default_true() -> bool {
    true
}

impl TextUnit {
    /// Create a text unit with the given source text.
    pub fn new(id: impl Into<String>, source: &str) -> Self {
        Self::with_source(id, TextContainer::from_text(source))
    }

    /// Create a text unit with a source fragment.
    pub fn with_fragment(id: impl Into<String>, source: TextFragment) -> Self {
        Self::with_source(id, TextContainer::from_fragment(source))
    }

    /// Create a text unit with a source container.
    pub fn with_source(id: impl Into<String>, source: TextContainer) -> Self {
        Self {
            id: id.into(),
            name: None,
            unit_type: None,
            source,
            targets: BTreeMap::new(),
            properties: Properties::new(),
            skeleton: None,
            translatable: true,
            preserve_whitespace: false,
            referent: false,
        }
    }

    /// Set the skeleton.
    pub fn with_skeleton(mut self, skeleton: Skeleton) -> Self {
        self.skeleton = Some(skeleton);
        self
    }

    /// Set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the unit type.
    pub fn with_type(mut self, unit_type: impl Into<String>) -> Self {
        self.unit_type = Some(unit_type.into());
        self
    }

    /// Mark the unit as a referent.
    pub fn with_referent(mut self, referent: bool) -> Self {
        self.referent = referent;
        self
    }

    /// Check whether a target exists for the locale (possibly empty).
    pub fn has_target(&self, locale: &LocaleId) -> bool {
        self.targets.contains_key(locale)
    }

    /// Get the target for a locale.
    pub fn target(&self, locale: &LocaleId) -> Option<&TextContainer> {
        self.targets.get(locale)
    }

    /// Get the mutable target for a locale.
    ///
    /// Mutations bypass segment validation; call
    /// [`validate_target`](Self::validate_target) afterwards if the target's
    /// segmentation was changed.
    pub fn target_mut(&mut self, locale: &LocaleId) -> Option<&mut TextContainer> {
        self.targets.get_mut(locale)
    }

    /// Set the target for a locale.
    ///
    /// A segmented target whose segment ids are not all source segment ids
    /// is rejected and the previous target is kept.
    pub fn set_target(&mut self, locale: LocaleId, target: TextContainer) -> Result<()> {
        check_segments(&self.id, &self.source, &locale, &target)?;
        self.targets.insert(locale, target);
        Ok(())
    }

    /// Create a target for a locale and return it.
    ///
    /// With `copy_source` the new target is a copy of the source (including
    /// its segmentation), otherwise it is empty. An existing target is only
    /// replaced when `overwrite` is set.
    pub fn create_target(
        &mut self,
        locale: LocaleId,
        copy_source: bool,
        overwrite: bool,
    ) -> &mut TextContainer {
        let fresh = || {
            if copy_source {
                let mut copy = self.source.clone();
                copy.properties = Properties::new();
                copy
            } else {
                TextContainer::new()
            }
        };
        if overwrite || !self.targets.contains_key(&locale) {
            let target = fresh();
            self.targets.insert(locale.clone(), target);
        }
        self.targets.entry(locale).or_default()
    }

    /// Remove the target for a locale.
    pub fn remove_target(&mut self, locale: &LocaleId) -> Option<TextContainer> {
        self.targets.remove(locale)
    }

    /// Check that the target's segments correspond to source segments.
    ///
    /// An absent target is valid.
    pub fn validate_target(&self, locale: &LocaleId) -> Result<()> {
        match self.targets.get(locale) {
            Some(target) => check_segments(&self.id, &self.source, locale, target),
            None => Ok(()),
        }
    }

    /// The locales that have a target.
    pub fn target_locales(&self) -> impl Iterator<Item = &LocaleId> {
        self.targets.keys()
    }

    /// Check if the unit holds no source content.
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }
}

fn check_segments(
    unit: &str,
    source: &TextContainer,
    locale: &LocaleId,
    target: &TextContainer,
) -> Result<()> {
    if !target.is_segmented() {
        return Ok(());
    }
    let source_ids = source.segment_ids();
    let extra: Vec<String> = target
        .segment_ids()
        .into_iter()
        .filter(|id| !source_ids.contains(id))
        .map(str::to_string)
        .collect();

    if extra.is_empty() {
        Ok(())
    } else {
        Err(Error::SegmentMismatch {
            unit: unit.to_string(),
            locale: locale.to_string(),
            ids: extra,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Segment;

    fn fr() -> LocaleId {
        LocaleId::new("fr").unwrap()
    }

    #[test]
    fn test_absent_vs_empty_target() {
        let mut tu = TextUnit::new("1", "Hello");
        assert!(tu.target(&fr()).is_none());
        assert!(!tu.has_target(&fr()));

        tu.create_target(fr(), false, false);
        let target = tu.target(&fr()).unwrap();
        assert!(target.is_empty());
        assert!(tu.has_target(&fr()));

        tu.remove_target(&fr());
        assert!(!tu.has_target(&fr()));
    }

    #[test]
    fn test_create_target_copy_and_overwrite() {
        let mut tu = TextUnit::new("1", "Hello");
        tu.create_target(fr(), true, false);
        assert_eq!(tu.target(&fr()).unwrap().text(), "Hello");

        tu.target_mut(&fr()).unwrap().set_content(TextFragment::from_text("Bonjour"));
        tu.create_target(fr(), true, false);
        assert_eq!(tu.target(&fr()).unwrap().text(), "Bonjour");

        tu.create_target(fr(), false, true);
        assert!(tu.target(&fr()).unwrap().is_empty());
    }

    #[test]
    fn test_target_segments_must_be_subset() {
        let mut tu = TextUnit::new("1", "One. Two.");
        tu.source.create_segments(&[0..4, 5..9]).unwrap();

        let mut good = TextContainer::new();
        good.append_segment(Segment::new("1", TextFragment::from_text("Deux.")));
        assert!(tu.set_target(fr(), good).is_ok());

        let mut bad = TextContainer::new();
        bad.append_segment(Segment::new("7", TextFragment::from_text("Sept.")));
        let err = tu.set_target(fr(), bad).unwrap_err();
        assert!(matches!(err, Error::SegmentMismatch { ref ids, .. } if ids == &["7".to_string()]));
        assert_eq!(tu.target(&fr()).unwrap().text(), "Deux.");

        // Divergence introduced through target_mut is caught by validate_target
        tu.target_mut(&fr())
            .unwrap()
            .append_segment(Segment::new("9", TextFragment::new()));
        assert!(tu.validate_target(&fr()).is_err());
    }

    #[test]
    fn test_unsegmented_target_always_valid() {
        let mut tu = TextUnit::new("1", "One. Two.");
        tu.source.create_segments(&[0..4]).unwrap();
        assert!(tu
            .set_target(fr(), TextContainer::from_text("Un. Deux."))
            .is_ok());
        assert_eq!(tu.target_locales().count(), 1);
    }
}
