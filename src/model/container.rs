//! Text containers: content split into segments and inter-segment text.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use super::{Properties, TextFragment};
use crate::error::{Error, Result};

/// An independently alignable sub-unit of a container's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment identifier, unique within its container
    pub id: String,

    /// Segment content
    pub content: TextFragment,
}

impl Segment {
    /// Create a new segment.
    pub fn new(id: impl Into<String>, content: TextFragment) -> Self {
        Self {
            id: id.into(),
            content,
        }
    }
}

/// One part of a text container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum Part {
    /// Text between segments
    Text(TextFragment),
    /// A segment
    Segment(Segment),
}

impl Part {
    /// Get the fragment of this part.
    pub fn fragment(&self) -> &TextFragment {
        match self {
            Part::Text(tf) => tf,
            Part::Segment(seg) => &seg.content,
        }
    }

    /// Check if this part is a segment.
    pub fn is_segment(&self) -> bool {
        matches!(self, Part::Segment(_))
    }
}

/// Content of a text unit, for the source or one target locale.
///
/// An unsegmented container holds a single text part. After
/// [`create_segments`](Self::create_segments) it alternates inter-segment
/// text and segments; [`merge_all_segments`](Self::merge_all_segments) brings
/// back equivalent content: the same text and codes in the same order, with
/// code indices renumbered in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContainer {
    parts: Vec<Part>,

    /// Container-level properties (source or target scope)
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

impl Default for TextContainer {
    fn default() -> Self {
        Self {
            parts: vec![Part::Text(TextFragment::new())],
            properties: Properties::new(),
        }
    }
}

impl TextContainer {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a container holding plain text.
    pub fn from_text(text: &str) -> Self {
        Self::from_fragment(TextFragment::from_text(text))
    }

    /// Create a container holding a fragment.
    pub fn from_fragment(fragment: TextFragment) -> Self {
        Self {
            parts: vec![Part::Text(fragment)],
            properties: Properties::new(),
        }
    }

    /// The parts, in order.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// The whole content as one fragment, segments merged in order.
    pub fn content(&self) -> TextFragment {
        if let [Part::Text(tf)] = self.parts.as_slice() {
            return tf.clone();
        }
        let mut merged = TextFragment::new();
        for part in &self.parts {
            merged.append_fragment(part.fragment());
        }
        merged
    }

    /// Replace the whole content, dropping any segmentation.
    pub fn set_content(&mut self, fragment: TextFragment) {
        self.parts = vec![Part::Text(fragment)];
    }

    /// The plain text of the whole content (codes stripped).
    pub fn text(&self) -> String {
        self.parts.iter().map(|p| p.fragment().text()).collect()
    }

    /// Check whether the container has no content at all.
    pub fn is_empty(&self) -> bool {
        self.parts.iter().all(|p| p.fragment().is_empty())
    }

    /// Check whether the container holds at least one segment.
    pub fn is_segmented(&self) -> bool {
        self.parts.iter().any(Part::is_segment)
    }

    /// Split the merged content into segments.
    ///
    /// Ranges are byte offsets into the merged coded text; they must be sorted,
    /// non-overlapping and must not cut through a code marker. Segments get
    /// ids `"0"`, `"1"`, ... in order. Any previous segmentation is merged
    /// first. On error the container is left unchanged.
    pub fn create_segments(&mut self, ranges: &[Range<usize>]) -> Result<()> {
        let ids: Vec<String> = (0..ranges.len()).map(|i| i.to_string()).collect();
        self.create_segments_with_ids(ranges, &ids)
    }

    /// Split the merged content into segments with explicit ids.
    pub fn create_segments_with_ids(&mut self, ranges: &[Range<usize>], ids: &[String]) -> Result<()> {
        if ranges.len() != ids.len() {
            return Err(Error::InvalidSegmentation(format!(
                "{} ranges for {} ids",
                ranges.len(),
                ids.len()
            )));
        }
        for (i, id) in ids.iter().enumerate() {
            if ids[..i].contains(id) {
                return Err(Error::InvalidSegmentation(format!("duplicate segment id '{}'", id)));
            }
        }

        let content = self.content();
        let mut parts = Vec::with_capacity(ranges.len() * 2 + 1);
        let mut last = 0;
        for (range, id) in ranges.iter().zip(ids) {
            if range.start < last || range.start > range.end || range.end > content.len() {
                return Err(Error::InvalidSegmentation(format!(
                    "range {:?} is unsorted, overlapping or out of bounds",
                    range
                )));
            }
            if range.start > last {
                parts.push(Part::Text(sub(&content, last..range.start)?));
            }
            parts.push(Part::Segment(Segment::new(
                id.clone(),
                sub(&content, range.clone())?,
            )));
            last = range.end;
        }
        if last < content.len() || parts.is_empty() {
            parts.push(Part::Text(sub(&content, last..content.len())?));
        }

        self.parts = parts;
        Ok(())
    }

    /// Merge all segments and inter-segment text back into a single part.
    ///
    /// Code indices in the merged coded text follow document order, so a
    /// fragment whose codes were stored out of order gets renumbered.
    pub fn merge_all_segments(&mut self) {
        if self.is_segmented() || self.parts.len() != 1 {
            let merged = self.content();
            self.parts = vec![Part::Text(merged)];
        }
    }

    /// Iterate over the segments.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.parts.iter().filter_map(|p| match p {
            Part::Segment(seg) => Some(seg),
            Part::Text(_) => None,
        })
    }

    /// The segment ids, in order.
    pub fn segment_ids(&self) -> Vec<&str> {
        self.segments().map(|s| s.id.as_str()).collect()
    }

    /// Get a segment by id.
    pub fn segment(&self, id: &str) -> Option<&Segment> {
        self.segments().find(|s| s.id == id)
    }

    /// Get a mutable segment by id.
    pub fn segment_mut(&mut self, id: &str) -> Option<&mut Segment> {
        self.parts.iter_mut().find_map(|p| match p {
            Part::Segment(seg) if seg.id == id => Some(seg),
            _ => None,
        })
    }

    /// Append a segment at the end of the container.
    pub fn append_segment(&mut self, segment: Segment) {
        self.drop_empty_unsegmented();
        self.parts.push(Part::Segment(segment));
    }

    /// Append inter-segment text at the end of the container.
    pub fn append_text_part(&mut self, fragment: TextFragment) {
        self.drop_empty_unsegmented();
        self.parts.push(Part::Text(fragment));
    }

    fn drop_empty_unsegmented(&mut self) {
        if let [Part::Text(tf)] = self.parts.as_slice() {
            if tf.is_empty() {
                self.parts.clear();
            }
        }
    }
}

fn sub(content: &TextFragment, range: Range<usize>) -> Result<TextFragment> {
    content
        .sub_fragment(range.clone())
        .map_err(|_| Error::InvalidSegmentation(format!("range {:?} cuts through a code", range)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::code::index_to_char;
    use crate::model::{Code, TagType};

    fn two_sentences() -> TextContainer {
        let mut tf = TextFragment::from_text("First one. ");
        tf.append_code(TagType::Opening, "b", "<b>");
        tf.append_text("Second");
        tf.append_code(TagType::Closing, "b", "</b>");
        tf.append_text(" one.");
        TextContainer::from_fragment(tf)
    }

    #[test]
    fn test_unsegmented_container() {
        let tc = TextContainer::from_text("Hello");
        assert!(!tc.is_segmented());
        assert!(!tc.is_empty());
        assert_eq!(tc.text(), "Hello");
        assert!(TextContainer::new().is_empty());
    }

    #[test]
    fn test_create_and_merge_segments() {
        let mut tc = two_sentences();
        let original = tc.content();
        let coded = original.coded_text().to_string();

        let first_end = coded.find(". ").unwrap() + 1;
        let second_start = first_end + 1;
        tc.create_segments(&[0..first_end, second_start..coded.len()])
            .unwrap();

        assert!(tc.is_segmented());
        assert_eq!(tc.segment_ids(), vec!["0", "1"]);
        assert_eq!(tc.segment("0").unwrap().content.text(), "First one.");
        assert_eq!(tc.segment("1").unwrap().content.to_string(), "<b>Second</b> one.");
        assert_eq!(tc.parts().len(), 3);
        assert_eq!(tc.content(), original);

        tc.merge_all_segments();
        assert!(!tc.is_segmented());
        assert_eq!(tc.content(), original);
    }

    #[test]
    fn test_segmentation_reversible_for_all_splits() {
        let tc = two_sentences();
        let coded = tc.content().coded_text().to_string();
        let boundaries: Vec<usize> = coded
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(coded.len()))
            .collect();

        for &start in &boundaries {
            for &end in boundaries.iter().filter(|&&e| e >= start) {
                let mut copy = tc.clone();
                if copy.create_segments(&[start..end]).is_ok() {
                    assert_eq!(copy.content(), tc.content());
                    copy.merge_all_segments();
                    assert_eq!(copy, tc);
                }
            }
        }
    }

    #[test]
    fn test_merge_renumbers_out_of_order_codes() {
        let x = Code::new(TagType::Placeholder, "x", "<x/>").with_id(1);
        let y = Code::new(TagType::Placeholder, "y", "<y/>").with_id(2);
        // y is stored second but appears first
        let coded = format!(
            "{}{}ab{}{}",
            TagType::Placeholder.marker(),
            index_to_char(1),
            TagType::Placeholder.marker(),
            index_to_char(0)
        );
        let original = TextFragment::from_coded_text(coded, vec![x, y]).unwrap();
        let mut tc = TextContainer::from_fragment(original.clone());

        tc.create_segments(&[0..original.len()]).unwrap();
        tc.merge_all_segments();

        let merged = tc.content();
        assert_eq!(merged.to_generic(), original.to_generic());
        assert_eq!(merged.to_generic(), "<2/>ab<1/>");
        assert_eq!(merged.to_string(), original.to_string());
        assert_eq!(merged.codes()[0].tag, "y");
        assert_eq!(merged.codes()[1].tag, "x");
    }

    #[test]
    fn test_invalid_segmentation_leaves_container_unchanged() {
        let mut tc = two_sentences();
        let before = tc.clone();

        assert!(tc.create_segments(&[5..10, 3..4]).is_err());
        assert!(tc.create_segments(&[0..1000]).is_err());
        // Cuts through the opening code marker
        let marker = tc.content().coded_text().find('\u{E101}').unwrap();
        assert!(tc.create_segments(&[0..marker + 3]).is_err());

        assert_eq!(tc, before);
    }

    #[test]
    fn test_segment_mut_and_append() {
        let mut tc = TextContainer::new();
        tc.append_segment(Segment::new("s1", TextFragment::from_text("Hi.")));
        tc.append_text_part(TextFragment::from_text(" "));
        tc.append_segment(Segment::new("s2", TextFragment::from_text("Bye.")));
        assert_eq!(tc.segment_ids(), vec!["s1", "s2"]);
        assert_eq!(tc.text(), "Hi. Bye.");

        tc.segment_mut("s2").unwrap().content = TextFragment::from_text("Ciao.");
        assert_eq!(tc.text(), "Hi. Ciao.");
    }
}
