//! Text fragments: translatable text with anchored inline codes.
//!
//! A fragment stores its content as *coded text*: plain text in which each
//! inline code is represented by two characters, a marker (one of the
//! `MARKER_*` constants) followed by a character encoding the index of the
//! code in the fragment's code list. The marker count always equals the code
//! list length and the indices form a permutation of `0..codes.len()`.
//!
//! All positions are byte offsets into the coded text.

use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

use super::code::{char_to_index, index_to_char, is_marker, Code, TagType};
use crate::error::{Error, Result};

/// A piece of coded text: either a run of plain text or one code marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Piece<'a> {
    /// Plain text starting at the given byte offset
    Text { start: usize, text: &'a str },
    /// A two-char code marker starting at the given byte offset
    Marker {
        start: usize,
        len: usize,
        tag_type: TagType,
        index: usize,
    },
}

impl Piece<'_> {
    fn range(&self) -> Range<usize> {
        match *self {
            Piece::Text { start, text } => start..start + text.len(),
            Piece::Marker { start, len, .. } => start..start + len,
        }
    }
}

struct Pieces<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Iterator for Pieces<'a> {
    type Item = Piece<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.text[self.pos..];
        let mut chars = rest.chars();
        let first = chars.next()?;
        let start = self.pos;

        if let Some(tag_type) = TagType::from_marker(first) {
            if let Some(index_char) = chars.next() {
                if let Some(index) = char_to_index(index_char) {
                    let len = first.len_utf8() + index_char.len_utf8();
                    self.pos += len;
                    return Some(Piece::Marker {
                        start,
                        len,
                        tag_type,
                        index,
                    });
                }
            }
        }

        // Plain run up to the next marker (a stray marker is consumed as text).
        let skip = first.len_utf8();
        let len = rest[skip..]
            .find(is_marker)
            .map(|i| i + skip)
            .unwrap_or(rest.len());
        self.pos += len;
        Some(Piece::Text {
            start,
            text: &rest[..len],
        })
    }
}

/// An owned piece, used to rebuild fragments.
#[derive(Debug, Clone)]
enum Item {
    Text(String),
    Code(Code),
}

/// Translatable text with inline codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFragment {
    coded_text: String,
    codes: Vec<Code>,
}

impl TextFragment {
    /// Create an empty fragment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fragment holding plain text.
    pub fn from_text(text: &str) -> Self {
        let mut fragment = Self::new();
        fragment.append_text(text);
        fragment
    }

    /// Create a fragment from coded text and codes, validating the invariant.
    pub fn from_coded_text(coded_text: impl Into<String>, codes: Vec<Code>) -> Result<Self> {
        let mut fragment = Self::new();
        fragment.set_coded_text(coded_text, codes)?;
        Ok(fragment)
    }

    /// Parse generic notation (`<1>`, `</1>`, `<2/>`, `<i3/>`) back into a
    /// fragment, taking each code from `codes` by tag type and id.
    ///
    /// This is how a translation expressed against a source fragment's
    /// generic display is turned into a target fragment.
    pub fn from_generic(text: &str, codes: &[Code]) -> Result<Self> {
        let re = Regex::new(r"<i(\d+)/>|<(/?)(\d+)(/?)>")
            .map_err(|e| Error::Other(e.to_string()))?;

        let mut fragment = Self::new();
        let mut last = 0;
        for caps in re.captures_iter(text) {
            let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
            fragment.append_text(&text[last..whole.start]);
            last = whole.end;

            let (tag_type, id) = if let Some(id) = caps.get(1) {
                (TagType::Isolated, id.as_str())
            } else {
                let closing = caps.get(2).map_or(false, |m| !m.is_empty());
                let empty = caps.get(4).map_or(false, |m| !m.is_empty());
                let id = caps.get(3).map_or("", |m| m.as_str());
                match (closing, empty) {
                    (true, _) => (TagType::Closing, id),
                    (false, true) => (TagType::Placeholder, id),
                    (false, false) => (TagType::Opening, id),
                }
            };
            let id: i32 = id
                .parse()
                .map_err(|_| Error::InvalidCodedText(format!("bad code id in '{}'", text)))?;

            let code = codes
                .iter()
                .find(|c| c.tag_type == tag_type && c.id == id)
                .ok_or_else(|| {
                    Error::InvalidCodedText(format!(
                        "no {:?} code with id {} for '{}'",
                        tag_type,
                        id,
                        &text[whole]
                    ))
                })?;
            fragment.push_code(code.clone());
        }
        fragment.append_text(&text[last..]);

        Ok(fragment)
    }

    /// The coded text (plain text with code markers).
    pub fn coded_text(&self) -> &str {
        &self.coded_text
    }

    /// The codes, addressed by the indices in the coded text.
    pub fn codes(&self) -> &[Code] {
        &self.codes
    }

    /// Get a code by index.
    pub fn code(&self, index: usize) -> Option<&Code> {
        self.codes.get(index)
    }

    /// Get a mutable code by index.
    pub fn code_mut(&mut self, index: usize) -> Option<&mut Code> {
        self.codes.get_mut(index)
    }

    /// Find a code by tag type and id.
    pub fn find_code(&self, tag_type: TagType, id: i32) -> Option<&Code> {
        self.codes
            .iter()
            .find(|c| c.tag_type == tag_type && c.id == id)
    }

    /// Replace the content with the given coded text and codes.
    ///
    /// Fails, leaving the fragment unchanged, if the markers do not match the
    /// code list exactly.
    pub fn set_coded_text(&mut self, coded_text: impl Into<String>, codes: Vec<Code>) -> Result<()> {
        let coded_text = coded_text.into();
        validate(&coded_text, codes.len())?;
        self.coded_text = coded_text;
        self.codes = codes;
        Ok(())
    }

    /// Length of the coded text in bytes.
    pub fn len(&self) -> usize {
        self.coded_text.len()
    }

    /// Check if the coded text is empty (no text and no codes).
    pub fn is_empty(&self) -> bool {
        self.coded_text.is_empty()
    }

    /// Check if the fragment contains at least one code.
    pub fn has_code(&self) -> bool {
        !self.codes.is_empty()
    }

    /// Check if the fragment contains text outside of codes.
    ///
    /// With `whitespace_is_text` false, only non-whitespace characters count.
    pub fn has_text(&self, whitespace_is_text: bool) -> bool {
        self.pieces().any(|piece| match piece {
            Piece::Text { text, .. } => {
                whitespace_is_text && !text.is_empty()
                    || text.chars().any(|c| !c.is_whitespace())
            }
            Piece::Marker { .. } => false,
        })
    }

    /// The text without any codes.
    pub fn text(&self) -> String {
        self.pieces()
            .filter_map(|piece| match piece {
                Piece::Text { text, .. } => Some(text),
                Piece::Marker { .. } => None,
            })
            .collect()
    }

    /// Render the fragment in generic notation: `<1>`, `</1>`, `<2/>`, `<i3/>`.
    pub fn to_generic(&self) -> String {
        let mut out = String::with_capacity(self.coded_text.len());
        for piece in self.pieces() {
            match piece {
                Piece::Text { text, .. } => out.push_str(text),
                Piece::Marker { index, .. } => {
                    if let Some(code) = self.codes.get(index) {
                        match code.tag_type {
                            TagType::Opening => out.push_str(&format!("<{}>", code.id)),
                            TagType::Closing => out.push_str(&format!("</{}>", code.id)),
                            TagType::Placeholder => out.push_str(&format!("<{}/>", code.id)),
                            TagType::Isolated => out.push_str(&format!("<i{}/>", code.id)),
                        }
                    }
                }
            }
        }
        out
    }

    /// Append plain text.
    ///
    /// Characters reserved for code markers are dropped.
    pub fn append_text(&mut self, text: &str) {
        if text.contains(is_marker) {
            warn!("dropping reserved marker characters from text");
            self.coded_text.extend(text.chars().filter(|c| !is_marker(*c)));
        } else {
            self.coded_text.push_str(text);
        }
    }

    /// Append a single character.
    pub fn append_char(&mut self, c: char) {
        if is_marker(c) {
            warn!("dropping reserved marker character U+{:04X}", c as u32);
            return;
        }
        self.coded_text.push(c);
    }

    /// Append a new code and return it.
    ///
    /// A closing code takes the id of the nearest unclosed opening code with
    /// the same tag; every other code gets a fresh id.
    pub fn append_code(
        &mut self,
        tag_type: TagType,
        tag: impl Into<String>,
        data: impl Into<String>,
    ) -> &mut Code {
        let tag = tag.into();
        let id = match tag_type {
            TagType::Closing => self
                .unclosed_opening_id(&tag)
                .unwrap_or_else(|| self.next_id()),
            _ => self.next_id(),
        };
        let index = self.push_code(Code::new(tag_type, tag, data).with_id(id));
        &mut self.codes[index]
    }

    /// Append an existing code, keeping its id, and return its index.
    pub fn push_code(&mut self, code: Code) -> usize {
        let index = self.codes.len();
        self.coded_text.push(code.tag_type.marker());
        self.coded_text.push(index_to_char(index));
        self.codes.push(code);
        index
    }

    /// Append another fragment, re-indexing its codes.
    pub fn append_fragment(&mut self, other: &TextFragment) {
        for piece in other.pieces() {
            match piece {
                Piece::Text { text, .. } => self.coded_text.push_str(text),
                Piece::Marker { index, .. } => {
                    if let Some(code) = other.codes.get(index) {
                        self.push_code(code.clone());
                    }
                }
            }
        }
    }

    /// Insert a fragment at a coded-text position.
    pub fn insert(&mut self, position: usize, fragment: &TextFragment) -> Result<()> {
        self.check_position(position)?;
        let mut head = self.items_in(0..position);
        head.extend(fragment.items_in(0..fragment.len()));
        head.extend(self.items_in(position..self.len()));
        *self = Self::from_items(head);
        Ok(())
    }

    /// Remove a coded-text range, together with the codes it contains.
    pub fn remove(&mut self, range: Range<usize>) -> Result<()> {
        self.check_range(&range)?;
        let mut items = self.items_in(0..range.start);
        items.extend(self.items_in(range.end..self.len()));
        *self = Self::from_items(items);
        Ok(())
    }

    /// Copy a coded-text range into a new fragment.
    pub fn sub_fragment(&self, range: Range<usize>) -> Result<TextFragment> {
        self.check_range(&range)?;
        Ok(Self::from_items(self.items_in(range)))
    }

    /// Turn opening and closing codes whose partner is missing into isolated codes.
    pub fn balance_markers(&mut self) {
        let order: Vec<usize> = self
            .pieces()
            .filter_map(|piece| match piece {
                Piece::Marker { index, .. } => Some(index),
                Piece::Text { .. } => None,
            })
            .collect();

        let mut isolate = Vec::new();
        let mut open: Vec<usize> = Vec::new();
        for index in order {
            let code = &self.codes[index];
            match code.tag_type {
                TagType::Opening => open.push(index),
                TagType::Closing => {
                    match open.iter().rposition(|&o| self.codes[o].id == code.id) {
                        Some(pos) => {
                            open.remove(pos);
                        }
                        None => isolate.push(index),
                    }
                }
                _ => {}
            }
        }
        isolate.extend(open);

        if isolate.is_empty() {
            return;
        }
        for index in isolate {
            self.codes[index].tag_type = TagType::Isolated;
        }
        let items = self.items_in(0..self.len());
        *self = Self::from_items(items);
    }

    /// Codes of this fragment that have no counterpart (same tag type and id)
    /// in `reference`.
    pub fn unmatched_codes<'a>(&'a self, reference: &TextFragment) -> Vec<&'a Code> {
        self.codes
            .iter()
            .filter(|c| reference.find_code(c.tag_type, c.id).is_none())
            .collect()
    }

    pub(crate) fn pieces(&self) -> impl Iterator<Item = Piece<'_>> {
        Pieces {
            text: &self.coded_text,
            pos: 0,
        }
    }

    fn next_id(&self) -> i32 {
        self.codes.iter().map(|c| c.id).max().unwrap_or(0) + 1
    }

    fn unclosed_opening_id(&self, tag: &str) -> Option<i32> {
        let mut closed: Vec<i32> = Vec::new();
        let order: Vec<usize> = self
            .pieces()
            .filter_map(|piece| match piece {
                Piece::Marker { index, .. } => Some(index),
                Piece::Text { .. } => None,
            })
            .collect();

        for &index in order.iter().rev() {
            let code = &self.codes[index];
            match code.tag_type {
                TagType::Closing => closed.push(code.id),
                TagType::Opening if code.tag == tag => {
                    if let Some(pos) = closed.iter().position(|&id| id == code.id) {
                        closed.remove(pos);
                    } else {
                        return Some(code.id);
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn check_position(&self, position: usize) -> Result<()> {
        let invalid = || Error::InvalidPosition {
            position,
            len: self.len(),
        };
        if position > self.len() || !self.coded_text.is_char_boundary(position) {
            return Err(invalid());
        }
        let inside_marker = self.pieces().any(|piece| match piece {
            Piece::Marker { start, len, .. } => position > start && position < start + len,
            Piece::Text { .. } => false,
        });
        if inside_marker {
            return Err(invalid());
        }
        Ok(())
    }

    fn check_range(&self, range: &Range<usize>) -> Result<()> {
        if range.start > range.end {
            return Err(Error::InvalidPosition {
                position: range.start,
                len: self.len(),
            });
        }
        self.check_position(range.start)?;
        self.check_position(range.end)
    }

    /// Owned items of a marker-safe range.
    fn items_in(&self, range: Range<usize>) -> Vec<Item> {
        let mut items = Vec::new();
        for piece in self.pieces() {
            let piece_range = piece.range();
            if piece_range.end <= range.start || piece_range.start >= range.end {
                continue;
            }
            match piece {
                Piece::Text { start, text } => {
                    let from = range.start.max(start) - start;
                    let to = range.end.min(start + text.len()) - start;
                    items.push(Item::Text(text[from..to].to_string()));
                }
                Piece::Marker { index, .. } => {
                    if let Some(code) = self.codes.get(index) {
                        items.push(Item::Code(code.clone()));
                    }
                }
            }
        }
        items
    }

    fn from_items(items: impl IntoIterator<Item = Item>) -> Self {
        let mut fragment = Self::new();
        for item in items {
            match item {
                Item::Text(text) => fragment.coded_text.push_str(&text),
                Item::Code(code) => {
                    fragment.push_code(code);
                }
            }
        }
        fragment
    }
}

impl fmt::Display for TextFragment {
    /// Renders the text with each code replaced by its original data.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for piece in self.pieces() {
            match piece {
                Piece::Text { text, .. } => f.write_str(text)?,
                Piece::Marker { index, .. } => {
                    if let Some(code) = self.codes.get(index) {
                        f.write_str(&code.data)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl From<&str> for TextFragment {
    fn from(text: &str) -> Self {
        TextFragment::from_text(text)
    }
}

/// Check that the markers of `coded_text` address each of `code_count`
/// codes exactly once.
fn validate(coded_text: &str, code_count: usize) -> Result<()> {
    let mut seen = vec![false; code_count];
    let mut chars = coded_text.chars();

    while let Some(c) = chars.next() {
        if !is_marker(c) {
            continue;
        }
        let index = chars
            .next()
            .and_then(char_to_index)
            .ok_or_else(|| Error::InvalidCodedText("marker without index".to_string()))?;
        match seen.get_mut(index) {
            Some(slot) if !*slot => *slot = true,
            Some(_) => {
                return Err(Error::InvalidCodedText(format!(
                    "code index {} used twice",
                    index
                )))
            }
            None => {
                return Err(Error::InvalidCodedText(format!(
                    "code index {} out of range ({} codes)",
                    index, code_count
                )))
            }
        }
    }

    if let Some(missing) = seen.iter().position(|s| !s) {
        return Err(Error::InvalidCodedText(format!(
            "code {} has no marker",
            missing
        )));
    }
    Ok(())
}
