//! Line-oriented plain-text filter.
//!
//! Each non-blank line becomes a text unit whose skeleton keeps the leading
//! and trailing whitespace and the line break; blank lines become document
//! parts. With a code pattern, matching markup is turned into inline codes.

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;

use super::encoding;
use super::{Filter, FilterWriter, SkeletonWriter};
use crate::error::{Error, Result};
use crate::event::Event;
use crate::model::{
    DocumentPart, Ending, RawDocument, Skeleton, StartDocument, TagType, TextFragment, TextUnit,
};

/// Pattern matching `<b>`, `</b>` and `<br/>` style markup.
pub const MARKUP_CODE_PATTERN: &str = r"</?[A-Za-z][^<>]*>";

/// Options for the line filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineFilterParameters {
    /// Regular expression matching inline codes; `None` keeps all text as text
    pub code_pattern: Option<String>,

    /// Keep leading and trailing whitespace of each line in the skeleton
    pub trim_whitespace: bool,

    /// Type given to the text units
    pub unit_type: Option<String>,
}

impl Default for LineFilterParameters {
    fn default() -> Self {
        Self {
            code_pattern: None,
            trim_whitespace: true,
            unit_type: None,
        }
    }
}

impl LineFilterParameters {
    /// Create default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters turning `<tag>` markup into inline codes.
    pub fn with_markup_codes() -> Self {
        Self::new().with_code_pattern(MARKUP_CODE_PATTERN)
    }

    /// Set the inline-code pattern.
    pub fn with_code_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.code_pattern = Some(pattern.into());
        self
    }

    /// Set whether surrounding whitespace goes to the skeleton.
    pub fn with_trim_whitespace(mut self, trim: bool) -> Self {
        self.trim_whitespace = trim;
        self
    }

    /// Set the type given to text units.
    pub fn with_unit_type(mut self, unit_type: impl Into<String>) -> Self {
        self.unit_type = Some(unit_type.into());
        self
    }

    /// Parameters as JSON.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Reads plain text line by line.
#[derive(Debug)]
pub struct LineFilter {
    params: LineFilterParameters,
    code_finder: Option<Regex>,
    queue: VecDeque<Event>,
    canceled: bool,
}

impl Default for LineFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFilter {
    /// Filter name.
    pub const NAME: &'static str = "line";

    /// Create a filter with default parameters.
    pub fn new() -> Self {
        Self {
            params: LineFilterParameters::default(),
            code_finder: None,
            queue: VecDeque::new(),
            canceled: false,
        }
    }

    /// Create a filter with the given parameters.
    pub fn with_parameters(params: LineFilterParameters) -> Result<Self> {
        let mut filter = Self::new();
        filter.apply(params)?;
        Ok(filter)
    }

    fn apply(&mut self, params: LineFilterParameters) -> Result<()> {
        self.code_finder = match &params.code_pattern {
            Some(pattern) => Some(
                Regex::new(pattern).map_err(|e| Error::invalid_parameters(Self::NAME, e))?,
            ),
            None => None,
        };
        self.params = params;
        Ok(())
    }

    fn fragment(&self, text: &str) -> TextFragment {
        let Some(finder) = &self.code_finder else {
            return TextFragment::from_text(text);
        };

        let mut fragment = TextFragment::new();
        let mut last = 0;
        for m in finder.find_iter(text) {
            if m.as_str().is_empty() {
                continue;
            }
            fragment.append_text(&text[last..m.start()]);
            let (tag_type, tag) = classify(m.as_str());
            fragment.append_code(tag_type, tag, m.as_str());
            last = m.end();
        }
        fragment.append_text(&text[last..]);
        fragment.balance_markers();
        fragment
    }

    fn parse(&mut self, input: &RawDocument) -> Result<()> {
        let bytes = input.read_bytes()?;
        let decoded = encoding::decode(&bytes, &input.encoding)?;
        let text = decoded.text;

        let mut start = StartDocument::new("sd1", input.source_locale.clone(), input.filter_config_id.clone());
        start.name = Some(input.display_name());
        start.encoding = decoded.encoding.name().to_string();
        start.has_bom = decoded.had_bom;
        start.line_break = if text.contains("\r\n") { "\r\n" } else { "\n" }.to_string();
        start.mime_type = Some("text/plain".to_string());
        self.queue.push_back(Event::StartDocument(start));

        let mut unit_count = 0;
        let mut part_count = 0;
        for line in text.split_inclusive('\n') {
            let (content, line_break) = split_line_break(line);

            if content.trim().is_empty() {
                part_count += 1;
                self.queue.push_back(Event::DocumentPart(DocumentPart::new(
                    format!("dp{}", part_count),
                    Skeleton::from_text(line),
                )));
                continue;
            }

            let (leading, core, trailing) = if self.params.trim_whitespace {
                let core = content.trim();
                let lead_len = content.len() - content.trim_start().len();
                (&content[..lead_len], core, &content[lead_len + core.len()..])
            } else {
                ("", content, "")
            };

            let mut skeleton = Skeleton::new();
            if !leading.is_empty() {
                skeleton.append(leading);
            }
            skeleton.add_content_placeholder(None);
            let tail = format!("{}{}", trailing, line_break);
            if !tail.is_empty() {
                skeleton.append(&tail);
            }

            unit_count += 1;
            let mut unit = TextUnit::with_fragment(unit_count.to_string(), self.fragment(core))
                .with_skeleton(skeleton);
            unit.unit_type = self.params.unit_type.clone();
            unit.preserve_whitespace = !self.params.trim_whitespace;
            self.queue.push_back(Event::TextUnit(unit));
        }

        self.queue.push_back(Event::EndDocument(Ending::new("ed1")));
        debug!(
            "line filter read {} unit(s), {} part(s) from {}",
            unit_count,
            part_count,
            input.display_name()
        );
        Ok(())
    }
}

impl Filter for LineFilter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn open(&mut self, input: &RawDocument) -> Result<()> {
        self.close();
        self.canceled = false;
        let parsed = self.parse(input);
        if parsed.is_err() {
            self.queue.clear();
        }
        parsed
    }

    fn has_next(&self) -> bool {
        !self.canceled && !self.queue.is_empty()
    }

    fn next(&mut self) -> Result<Event> {
        if self.canceled {
            self.queue.clear();
            return Ok(Event::Canceled);
        }
        self.queue
            .pop_front()
            .ok_or_else(|| Error::Other("no more events".to_string()))
    }

    fn close(&mut self) {
        self.queue.clear();
    }

    fn cancel(&mut self) {
        self.canceled = true;
    }

    fn parameters(&self) -> Value {
        self.params.to_value()
    }

    fn set_parameters(&mut self, parameters: &Value) -> Result<()> {
        let params: LineFilterParameters = serde_json::from_value(parameters.clone())
            .map_err(|e| Error::invalid_parameters(Self::NAME, e))?;
        self.apply(params)
    }

    fn create_writer(&self) -> Box<dyn FilterWriter> {
        Box::new(SkeletonWriter::new())
    }
}

/// Split a line into its content and its line break.
fn split_line_break(line: &str) -> (&str, &str) {
    if let Some(content) = line.strip_suffix("\r\n") {
        (content, "\r\n")
    } else if let Some(content) = line.strip_suffix('\n') {
        (content, "\n")
    } else {
        (line, "")
    }
}

/// Tag type and tag name of a piece of markup.
fn classify(markup: &str) -> (TagType, String) {
    let name = |s: &str| -> String {
        s.chars()
            .take_while(|c| c.is_alphanumeric() || *c == '-' || *c == ':' || *c == '_')
            .collect()
    };

    if let Some(rest) = markup.strip_prefix("</") {
        (TagType::Closing, name(rest))
    } else if let Some(rest) = markup.strip_prefix('<') {
        if markup.ends_with("/>") {
            (TagType::Placeholder, name(rest))
        } else {
            (TagType::Opening, name(rest))
        }
    } else {
        (TagType::Placeholder, markup.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LocaleId;

    fn read_all(filter: &mut LineFilter, text: &str) -> Vec<Event> {
        let raw = RawDocument::from_text(text, LocaleId::new("en").unwrap(), "line");
        filter.open(&raw).unwrap();
        let mut events = Vec::new();
        while filter.has_next() {
            events.push(filter.next().unwrap());
        }
        events
    }

    #[test]
    fn test_lines_and_blank_lines() {
        let mut filter = LineFilter::new();
        let events = read_all(&mut filter, "  Hello  \n\nWorld");
        let kinds: Vec<_> = events.iter().map(|e| e.kind().to_string()).collect();
        assert_eq!(
            kinds,
            vec!["start_document", "text_unit", "document_part", "text_unit", "end_document"]
        );

        let hello = events[1].text_unit().unwrap();
        assert_eq!(hello.id, "1");
        assert_eq!(hello.source.text(), "Hello");
        assert_eq!(hello.skeleton.as_ref().unwrap().to_string(), "  [#$$self$]  \n");

        let world = events[3].text_unit().unwrap();
        assert_eq!(world.id, "2");
        assert_eq!(world.skeleton.as_ref().unwrap().to_string(), "[#$$self$]");
    }

    #[test]
    fn test_start_document_properties() {
        let mut filter = LineFilter::new();
        let events = read_all(&mut filter, "\u{FEFF}a\r\nb\r\n");
        match &events[0] {
            Event::StartDocument(sd) => {
                assert_eq!(sd.line_break, "\r\n");
                assert_eq!(sd.encoding, "UTF-8");
                assert_eq!(sd.filter_id, "line");
                assert!(sd.has_bom);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_markup_codes() {
        let mut filter = LineFilter::with_parameters(LineFilterParameters::with_markup_codes()).unwrap();
        let events = read_all(&mut filter, "Hello <b>world</b><br/>, </i>bye\n");
        let tu = events[1].text_unit().unwrap();
        let content = tu.source.content();

        assert_eq!(content.text(), "Hello world, bye");
        assert_eq!(content.to_generic(), "Hello <1>world</1><2/>, <i3/>bye");
        assert_eq!(content.to_string(), "Hello <b>world</b><br/>, </i>bye");
        assert_eq!(content.code(0).unwrap().tag, "b");
    }

    #[test]
    fn test_no_trim() {
        let params = LineFilterParameters::new().with_trim_whitespace(false);
        let mut filter = LineFilter::with_parameters(params).unwrap();
        let events = read_all(&mut filter, " x \n");
        let tu = events[1].text_unit().unwrap();
        assert_eq!(tu.source.text(), " x ");
        assert!(tu.preserve_whitespace);
    }

    #[test]
    fn test_bad_pattern() {
        let params = LineFilterParameters::new().with_code_pattern("(");
        assert!(matches!(
            LineFilter::with_parameters(params),
            Err(Error::InvalidParameters { .. })
        ));
    }

    #[test]
    fn test_cancel() {
        let mut filter = LineFilter::new();
        let raw = RawDocument::from_text("a\nb\n", LocaleId::new("en").unwrap(), "line");
        filter.open(&raw).unwrap();
        filter.next().unwrap();
        filter.cancel();
        assert!(!filter.has_next());
        assert_eq!(filter.next().unwrap(), Event::Canceled);
    }

    #[test]
    fn test_invalid_encoding_is_error() {
        let mut filter = LineFilter::new();
        let raw = RawDocument::new(
            crate::model::DocumentInput::Bytes(b"caf\xE9\n".to_vec()),
            LocaleId::new("en").unwrap(),
            "line",
        );
        assert!(filter.open(&raw).is_err());
        assert!(!filter.has_next());
    }
}
