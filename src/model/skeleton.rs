//! Skeletons: the non-translatable structure of a document.
//!
//! A skeleton is an ordered list of literal runs and placeholders. At write
//! time each placeholder is resolved against the *current* state of the
//! resource it refers to, so the skeleton never stores translatable text.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::code::{make_property_ref_marker, make_ref_marker};
use super::{LocaleId, PropertyScope};

/// Reference id standing for the resource owning the skeleton.
pub const SELF_REF: &str = "$self$";

/// The resource a placeholder refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "id")]
pub enum Referent {
    /// The resource owning the skeleton
    SelfRef,
    /// Another resource of the same document, by id
    Resource(String),
}

impl Referent {
    /// The id used in reference markers.
    pub fn marker_id(&self) -> &str {
        match self {
            Referent::SelfRef => SELF_REF,
            Referent::Resource(id) => id,
        }
    }
}

/// What a placeholder resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PlaceholderKind {
    /// Text content: the source for `None`, else the target for that locale
    Content {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        locale: Option<LocaleId>,
    },
    /// The value of a named property
    Property {
        name: String,
        scope: PropertyScope,
    },
}

/// A reference resolved at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    /// Resource referred to
    pub referent: Referent,

    /// Value rendered in place of the placeholder
    #[serde(flatten)]
    pub kind: PlaceholderKind,
}

/// One part of a skeleton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "part", content = "value")]
pub enum SkeletonPart {
    /// Literal text, written verbatim
    Text(String),
    /// Placeholder resolved against live resource state
    Placeholder(Placeholder),
}

/// An ordered list of literal parts and placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skeleton {
    parts: Vec<SkeletonPart>,

    /// The next `append` starts a new literal part
    #[serde(skip)]
    create_new: bool,
}

impl Skeleton {
    /// Create an empty skeleton.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a skeleton holding one literal part.
    pub fn from_text(text: impl Into<String>) -> Self {
        let mut skel = Self::new();
        skel.add(text);
        skel
    }

    /// The parts, in order.
    pub fn parts(&self) -> &[SkeletonPart] {
        &self.parts
    }

    /// Append literal text, extending the last literal part when possible.
    pub fn append(&mut self, text: &str) {
        if !self.create_new {
            if let Some(SkeletonPart::Text(last)) = self.parts.last_mut() {
                last.push_str(text);
                return;
            }
        }
        self.parts.push(SkeletonPart::Text(text.to_string()));
        self.create_new = false;
    }

    /// Add literal text as a new part.
    pub fn add(&mut self, text: impl Into<String>) {
        self.parts.push(SkeletonPart::Text(text.into()));
        self.create_new = false;
    }

    /// Add a placeholder for the content of the owning resource.
    pub fn add_content_placeholder(&mut self, locale: Option<LocaleId>) {
        self.add_placeholder(Placeholder {
            referent: Referent::SelfRef,
            kind: PlaceholderKind::Content { locale },
        });
    }

    /// Add a placeholder for a property value of the owning resource.
    pub fn add_property_placeholder(&mut self, name: impl Into<String>, scope: PropertyScope) {
        self.add_placeholder(Placeholder {
            referent: Referent::SelfRef,
            kind: PlaceholderKind::Property {
                name: name.into(),
                scope,
            },
        });
    }

    /// Add a reference to the content of another resource.
    pub fn add_reference(&mut self, id: impl Into<String>) {
        self.add_placeholder(Placeholder {
            referent: Referent::Resource(id.into()),
            kind: PlaceholderKind::Content { locale: None },
        });
    }

    /// Add any placeholder.
    pub fn add_placeholder(&mut self, placeholder: Placeholder) {
        self.parts.push(SkeletonPart::Placeholder(placeholder));
        self.create_new = true;
    }

    /// Append all parts of another skeleton.
    pub fn extend(&mut self, other: Skeleton) {
        self.parts.extend(other.parts);
        self.create_new = other.create_new;
    }

    /// Check whether the skeleton has no parts, or (with `ignore_whitespace`)
    /// nothing but whitespace literals.
    pub fn is_empty(&self, ignore_whitespace: bool) -> bool {
        self.parts.iter().all(|part| match part {
            SkeletonPart::Text(text) => {
                text.is_empty() || ignore_whitespace && text.trim().is_empty()
            }
            SkeletonPart::Placeholder(_) => false,
        })
    }

    /// Check whether the skeleton contains a placeholder for the owner's content.
    pub fn has_content_placeholder(&self) -> bool {
        self.parts.iter().any(|part| {
            matches!(
                part,
                SkeletonPart::Placeholder(Placeholder {
                    referent: Referent::SelfRef,
                    kind: PlaceholderKind::Content { .. },
                })
            )
        })
    }
}

impl fmt::Display for Skeleton {
    /// Renders placeholders as reference markers, for debugging.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                SkeletonPart::Text(text) => f.write_str(text)?,
                SkeletonPart::Placeholder(ph) => match &ph.kind {
                    PlaceholderKind::Content { locale: None } => {
                        f.write_str(&make_ref_marker(ph.referent.marker_id()))?
                    }
                    PlaceholderKind::Content {
                        locale: Some(locale),
                    } => f.write_str(&make_property_ref_marker(
                        ph.referent.marker_id(),
                        &format!("target:{}", locale),
                    ))?,
                    PlaceholderKind::Property { name, .. } => f.write_str(
                        &make_property_ref_marker(ph.referent.marker_id(), name),
                    )?,
                },
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_merges_literals() {
        let mut skel = Skeleton::new();
        skel.append("<p>");
        skel.append(" ");
        assert_eq!(skel.parts().len(), 1);

        skel.add("<x>");
        assert_eq!(skel.parts().len(), 2);
    }

    #[test]
    fn test_placeholder_starts_new_part() {
        let mut skel = Skeleton::new();
        skel.append("<p>");
        skel.add_content_placeholder(None);
        skel.append("</p>");
        skel.append("\n");

        assert_eq!(skel.parts().len(), 3);
        assert_eq!(skel.parts()[2], SkeletonPart::Text("</p>\n".to_string()));
        assert!(skel.has_content_placeholder());
        assert_eq!(skel.to_string(), "<p>[#$$self$]</p>\n");
    }

    #[test]
    fn test_references_and_properties() {
        let mut skel = Skeleton::from_text("<a href=\"");
        skel.add_property_placeholder("href", PropertyScope::Resource);
        skel.append("\">");
        skel.add_reference("fn1");

        assert_eq!(skel.to_string(), "<a href=\"[#$$self$@%href]\">[#$fn1]");
        assert!(!skel.has_content_placeholder());
    }

    #[test]
    fn test_is_empty() {
        let mut skel = Skeleton::new();
        assert!(skel.is_empty(false));
        skel.append("  \n");
        assert!(!skel.is_empty(false));
        assert!(skel.is_empty(true));
        skel.add_content_placeholder(None);
        assert!(!skel.is_empty(true));
    }

    #[test]
    fn test_extend() {
        let mut a = Skeleton::from_text("a");
        let mut b = Skeleton::from_text("b");
        b.add_reference("x");
        a.extend(b);
        a.append("c");
        assert_eq!(a.parts().len(), 4);
        assert_eq!(a.to_string(), "ab[#$x]c");
    }
}
