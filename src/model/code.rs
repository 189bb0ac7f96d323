//! Inline codes: original markup embedded in translatable text.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Marker for an opening code in coded text.
pub const MARKER_OPENING: char = '\u{E101}';
/// Marker for a closing code in coded text.
pub const MARKER_CLOSING: char = '\u{E102}';
/// Marker for a placeholder code in coded text.
pub const MARKER_PLACEHOLDER: char = '\u{E103}';
/// Marker for an isolated (unpaired) code in coded text.
pub const MARKER_ISOLATED: char = '\u{E104}';

/// Base value of the character encoding a code index.
pub const CHAR_BASE: u32 = 0xE110;

/// Start of a reference marker inside skeleton or code data.
pub const REF_MARKER_START: &str = "[#$";
/// End of a reference marker.
pub const REF_MARKER_END: &str = "]";
/// Separator between the referenced id and a property name.
pub const REF_MARKER_SEP: &str = "@%";

/// Kind of inline code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagType {
    /// Start of a paired span (e.g. `<b>`)
    Opening,
    /// End of a paired span (e.g. `</b>`)
    Closing,
    /// Self-contained code (e.g. `<br/>`)
    Placeholder,
    /// Opening or closing code whose partner is outside the fragment
    Isolated,
}

impl TagType {
    /// The marker character used for this tag type in coded text.
    pub fn marker(self) -> char {
        match self {
            TagType::Opening => MARKER_OPENING,
            TagType::Closing => MARKER_CLOSING,
            TagType::Placeholder => MARKER_PLACEHOLDER,
            TagType::Isolated => MARKER_ISOLATED,
        }
    }

    /// The tag type for a marker character.
    pub fn from_marker(c: char) -> Option<Self> {
        match c {
            MARKER_OPENING => Some(TagType::Opening),
            MARKER_CLOSING => Some(TagType::Closing),
            MARKER_PLACEHOLDER => Some(TagType::Placeholder),
            MARKER_ISOLATED => Some(TagType::Isolated),
            _ => None,
        }
    }
}

/// Check if a character is one of the four code markers.
pub fn is_marker(c: char) -> bool {
    TagType::from_marker(c).is_some()
}

/// Encode a code index as its coded-text character.
pub(crate) fn index_to_char(index: usize) -> char {
    // Indices above CHAR_BASE never reach the surrogate range.
    char::from_u32(CHAR_BASE + index as u32).unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// Decode a coded-text index character.
pub(crate) fn char_to_index(c: char) -> Option<usize> {
    (c as u32).checked_sub(CHAR_BASE).map(|i| i as usize)
}

/// A run of original inline markup preserved opaquely through translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    /// Kind of code
    pub tag_type: TagType,

    /// Identifier shared by the opening and closing codes of a pair
    pub id: i32,

    /// Tag name or code type (e.g. `bold`, `br`)
    pub tag: String,

    /// The original literal markup
    pub data: String,

    /// The data contains reference markers to other resources
    #[serde(default)]
    pub has_reference: bool,
}

impl Code {
    /// Create a new code without an assigned id.
    pub fn new(tag_type: TagType, tag: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            tag_type,
            id: -1,
            tag: tag.into(),
            data: data.into(),
            has_reference: false,
        }
    }

    /// Set the code id.
    pub fn with_id(mut self, id: i32) -> Self {
        self.id = id;
        self
    }

    /// Mark the data as containing reference markers.
    pub fn with_reference(mut self, has_reference: bool) -> Self {
        self.has_reference = has_reference;
        self
    }

    /// Resources referenced from this code's data.
    pub fn references(&self) -> Vec<RefMarker> {
        if !self.has_reference {
            return Vec::new();
        }
        find_ref_markers(&self.data)
            .into_iter()
            .map(|(_, marker)| marker)
            .collect()
    }
}

/// A parsed reference marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefMarker {
    /// Referenced resource id (`$self$` for the owning resource)
    pub id: String,

    /// Referenced property, if the marker points at a property value
    pub property: Option<String>,
}

/// Build a reference marker to a resource.
pub fn make_ref_marker(id: &str) -> String {
    format!("{}{}{}", REF_MARKER_START, id, REF_MARKER_END)
}

/// Build a reference marker to a property of a resource.
pub fn make_property_ref_marker(id: &str, property: &str) -> String {
    format!(
        "{}{}{}{}{}",
        REF_MARKER_START, id, REF_MARKER_SEP, property, REF_MARKER_END
    )
}

/// Find every reference marker in a string, with its byte range.
pub fn find_ref_markers(text: &str) -> Vec<(Range<usize>, RefMarker)> {
    let mut found = Vec::new();
    let mut from = 0;

    while let Some(offset) = text[from..].find(REF_MARKER_START) {
        let start = from + offset;
        let body_start = start + REF_MARKER_START.len();
        let Some(body_len) = text[body_start..].find(REF_MARKER_END) else {
            break;
        };
        let body = &text[body_start..body_start + body_len];
        let end = body_start + body_len + REF_MARKER_END.len();

        if !body.is_empty() {
            let marker = match body.split_once(REF_MARKER_SEP) {
                Some((id, property)) => RefMarker {
                    id: id.to_string(),
                    property: Some(property.to_string()),
                },
                None => RefMarker {
                    id: body.to_string(),
                    property: None,
                },
            };
            found.push((start..end, marker));
        }
        from = end;
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_roundtrip() {
        for tag_type in [
            TagType::Opening,
            TagType::Closing,
            TagType::Placeholder,
            TagType::Isolated,
        ] {
            assert_eq!(TagType::from_marker(tag_type.marker()), Some(tag_type));
        }
        assert!(!is_marker('a'));
        assert_eq!(char_to_index(index_to_char(42)), Some(42));
    }

    #[test]
    fn test_ref_markers() {
        assert_eq!(make_ref_marker("tu1"), "[#$tu1]");
        assert_eq!(make_property_ref_marker("dp1", "href"), "[#$dp1@%href]");

        let text = "<a href='[#$dp1@%href]'>[#$tu2]</a>";
        let markers = find_ref_markers(text);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].1.id, "dp1");
        assert_eq!(markers[0].1.property.as_deref(), Some("href"));
        assert_eq!(&text[markers[1].0.clone()], "[#$tu2]");
        assert_eq!(markers[1].1.property, None);
    }

    #[test]
    fn test_code_references_require_flag() {
        let code = Code::new(TagType::Placeholder, "fn", "<fn ref='[#$f1]'/>");
        assert!(code.references().is_empty());

        let code = code.with_reference(true);
        let refs = code.references();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].id, "f1");
    }
}
