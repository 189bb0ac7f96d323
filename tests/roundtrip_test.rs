//! Integration tests for extraction and reconstruction.

use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::Value;
use transkel::filter::{
    Filter, FilterConfiguration, FilterRegistry, FilterWriter, LineFilterParameters, SkeletonWriter,
};
use transkel::model::{
    Code, DocumentInput, DocumentPart, Ending, LocaleId, RawDocument, Skeleton, StartDocument,
    TagType, TextContainer, TextFragment, TextUnit,
};
use transkel::pipeline::{
    BatchItem, DocumentData, OutputBuffer, OutputTarget, Pipeline, PipelineConfig,
    PipelineContext, PipelineDriver, Step, StepConfig, StepRegistry,
};
use transkel::{Event, Result};

fn en() -> LocaleId {
    LocaleId::new("en").unwrap()
}

fn fr() -> LocaleId {
    LocaleId::new("fr").unwrap()
}

fn run(
    pipeline: Pipeline,
    filters: FilterRegistry,
    raw: RawDocument,
    output_encoding: Option<&str>,
) -> (Vec<u8>, transkel::BatchReport) {
    let output = OutputBuffer::new();
    let mut doc = DocumentData::new(raw).with_output(OutputTarget::Buffer(output.clone()));
    if let Some(encoding) = output_encoding {
        doc = doc.with_output_encoding(encoding);
    }

    let mut driver = PipelineDriver::new(pipeline, Arc::new(filters));
    driver.add_item(BatchItem::new(doc));
    let report = driver.process_batch().unwrap();
    (output.contents(), report)
}

fn round_trip(raw: RawDocument) -> Vec<u8> {
    let pipeline = StepRegistry::with_defaults()
        .build_pipeline(&PipelineConfig::round_trip())
        .unwrap();
    let (bytes, report) = run(pipeline, FilterRegistry::with_defaults(), raw, None);
    assert!(report.is_success(), "{:?}", report);
    bytes
}

#[test]
fn test_round_trip_identity() {
    let samples = [
        "",
        "single line without break",
        "one\ntwo\n",
        "\n\n  indented  \n\ttabbed\t\n\n",
        "windows\r\nline\r\nbreaks\r\n",
        "mixed\r\nbreaks\nhere",
        "Hello <b>world</b><br/>, </i>stray\n",
        "accents: café, naïve, 日本語\n",
    ];
    for filter in ["line", "line-codes"] {
        for sample in samples {
            let raw = RawDocument::from_text(sample, en(), filter);
            let out = round_trip(raw);
            assert_eq!(String::from_utf8(out).unwrap(), sample, "filter {}", filter);
        }
    }
}

#[test]
fn test_round_trip_keeps_bom() {
    let mut input = b"\xEF\xBB\xBF".to_vec();
    input.extend_from_slice("first\nsecond\n".as_bytes());
    let raw = RawDocument::new(DocumentInput::Bytes(input.clone()), en(), "line");
    assert_eq!(round_trip(raw), input);
}

#[test]
fn test_round_trip_legacy_encoding() {
    let input = b"na\xEFve caf\xE9\n".to_vec();
    let raw = RawDocument::new(DocumentInput::Bytes(input.clone()), en(), "line")
        .with_encoding("ISO-8859-1");
    assert_eq!(round_trip(raw), input);
}

#[test]
fn test_round_trip_utf16_without_bom() {
    let input: Vec<u8> = "a\nb\n".encode_utf16().flat_map(u16::to_le_bytes).collect();
    let raw = RawDocument::new(DocumentInput::Bytes(input.clone()), en(), "line")
        .with_encoding("UTF-16LE");
    assert_eq!(round_trip(raw), input);

    let mut with_bom = b"\xFF\xFE".to_vec();
    with_bom.extend_from_slice(&input);
    let raw = RawDocument::new(DocumentInput::Bytes(with_bom.clone()), en(), "line")
        .with_encoding("UTF-16LE");
    assert_eq!(round_trip(raw), with_bom);
}

#[test]
fn test_output_encoding_conversion() {
    let raw = RawDocument::from_text("café\n", en(), "line");
    let pipeline = StepRegistry::with_defaults()
        .build_pipeline(&PipelineConfig::round_trip())
        .unwrap();
    let (bytes, report) = run(pipeline, FilterRegistry::with_defaults(), raw, Some("UTF-16LE"));

    assert!(report.is_success());
    assert_eq!(
        bytes,
        b"\xFF\xFEc\x00a\x00f\x00\xE9\x00\n\x00".to_vec()
    );
}

/// Sets the French target of every unit, with codes carrying their own data.
struct Translate;

impl Step for Translate {
    fn name(&self) -> &str {
        "translate"
    }

    fn handle_text_unit(&mut self, mut event: Event, _ctx: &PipelineContext) -> Result<Event> {
        if let Some(tu) = event.text_unit_mut() {
            let codes = [
                Code::new(TagType::Opening, "bold", "{bold}").with_id(1),
                Code::new(TagType::Closing, "bold", "{/bold}").with_id(1),
            ];
            let target = TextFragment::from_generic("Bonjour <1>monde</1>.", &codes)?;
            tu.set_target(fr(), TextContainer::from_fragment(target))?;
        }
        Ok(event)
    }
}

#[test]
fn test_target_reuses_source_code_data() {
    let registry = StepRegistry::with_defaults();
    let mut pipeline = Pipeline::new("translate");
    pipeline
        .add_step(registry.create("filter-events", &Value::Null).unwrap())
        .unwrap();
    pipeline.add_step(Box::new(Translate)).unwrap();
    pipeline
        .add_step(registry.create("events-writer", &Value::Null).unwrap())
        .unwrap();

    let raw = RawDocument::from_text("Hello <bold>world</bold>.\n", en(), "line-codes")
        .with_target_locale(fr());
    let (bytes, report) = run(pipeline, FilterRegistry::with_defaults(), raw, None);

    assert!(report.is_success());
    assert!(report.items[0].diagnostics.is_empty());
    assert_eq!(String::from_utf8(bytes).unwrap(), "Bonjour <bold>monde</bold>.\n");
}

#[test]
fn test_pseudo_translation_pipeline() {
    let config = PipelineConfig::new("pseudo")
        .with_step(StepConfig::new("filter-events"))
        .with_step(
            StepConfig::new("pseudo-translate")
                .with_parameters(serde_json::json!({"prefix": "«", "suffix": "»"})),
        )
        .with_step(StepConfig::new("event-log"))
        .with_step(StepConfig::new("events-writer"));
    let pipeline = StepRegistry::with_defaults().build_pipeline(&config).unwrap();

    let raw = RawDocument::from_text("  Open <b>file</b>\n\nQuit\n", en(), "line-codes")
        .with_target_locale(fr());
    let (bytes, report) = run(pipeline, FilterRegistry::with_defaults(), raw, None);

    assert!(report.is_success());
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        "  «Öpéñ <b>fîlé</b>»\n\n«Qüît»\n"
    );
}

#[test]
fn test_only_last_writer_produces_output() {
    let config = PipelineConfig::new("write-twice")
        .with_step(StepConfig::new("filter-events"))
        .with_step(StepConfig::new("events-writer"))
        .with_step(StepConfig::new("pseudo-translate"))
        .with_step(StepConfig::new("events-writer"));
    let pipeline = StepRegistry::with_defaults().build_pipeline(&config).unwrap();

    let raw = RawDocument::from_text("Quit\n", en(), "line").with_target_locale(fr());
    let (bytes, report) = run(pipeline, FilterRegistry::with_defaults(), raw, None);

    assert!(report.is_success());
    assert_eq!(String::from_utf8(bytes).unwrap(), "[Qüît]\n");
}

#[test]
fn test_filter_configuration_parameters() {
    let mut filters = FilterRegistry::with_defaults();
    filters.register(
        FilterConfiguration::new("raw-lines", "Lines kept with their whitespace", Arc::new(line_filter))
            .with_extensions(&["lst"])
            .with_parameters(
                serde_json::to_value(LineFilterParameters::new().with_trim_whitespace(false)).unwrap(),
            ),
    );

    let raw = RawDocument::from_text("  a  \n", en(), "raw-lines");
    let events = {
        let mut filter = filters.create("raw-lines").unwrap();
        filter.open(&raw).unwrap();
        let mut events = Vec::new();
        while filter.has_next() {
            events.push(filter.next().unwrap());
        }
        events
    };
    let tu = events.iter().find_map(|e| e.text_unit()).unwrap();
    assert_eq!(tu.source.text(), "  a  ");
    assert_eq!(filters.get_by_extension("lst").unwrap().id, "raw-lines");
}

fn line_filter() -> Box<dyn Filter> {
    Box::new(transkel::filter::LineFilter::new())
}

/// Filter replaying a fixed event list: a paragraph referring to a footnote
/// that only comes later in the stream.
struct FootnoteFilter {
    events: VecDeque<Event>,
}

impl FootnoteFilter {
    fn create() -> Box<dyn Filter> {
        Box::new(FootnoteFilter {
            events: VecDeque::new(),
        })
    }
}

impl Filter for FootnoteFilter {
    fn name(&self) -> &str {
        "footnotes"
    }

    fn open(&mut self, input: &RawDocument) -> Result<()> {
        let mut para = Skeleton::from_text("<p>");
        para.add_content_placeholder(None);
        para.append("</p>\n");

        let mut text = TextFragment::from_text("See note");
        text.push_code(
            Code::new(TagType::Placeholder, "fn", "<sup>[#$fn1]</sup>")
                .with_id(1)
                .with_reference(true),
        );

        let mut note = Skeleton::from_text("<note>");
        note.add_content_placeholder(None);
        note.append("</note>");

        self.events = VecDeque::from(vec![
            Event::StartDocument(StartDocument::new("d1", input.source_locale.clone(), "footnotes")),
            Event::TextUnit(TextUnit::with_fragment("p1", text).with_skeleton(para)),
            Event::TextUnit(TextUnit::new("fn1", "A note").with_skeleton(note).with_referent(true)),
            Event::DocumentPart(DocumentPart::new("dp1", Skeleton::from_text("<end/>\n"))),
            Event::EndDocument(Ending::new("e1").with_skeleton(Skeleton::from_text("<eof/>"))),
        ]);
        Ok(())
    }

    fn has_next(&self) -> bool {
        !self.events.is_empty()
    }

    fn next(&mut self) -> Result<Event> {
        Ok(self.events.pop_front().unwrap_or(Event::Noop))
    }

    fn close(&mut self) {
        self.events.clear();
    }

    fn cancel(&mut self) {
        self.events.clear();
    }

    fn parameters(&self) -> Value {
        Value::Null
    }

    fn set_parameters(&mut self, _parameters: &Value) -> Result<()> {
        Ok(())
    }

    fn create_writer(&self) -> Box<dyn FilterWriter> {
        Box::new(SkeletonWriter::new())
    }
}

#[test]
fn test_forward_reference_to_referent() {
    let mut filters = FilterRegistry::with_defaults();
    filters.register(FilterConfiguration::new(
        "footnotes",
        "Test format with footnotes",
        Arc::new(FootnoteFilter::create),
    ));

    let pipeline = StepRegistry::with_defaults()
        .build_pipeline(&PipelineConfig::round_trip())
        .unwrap();
    let raw = RawDocument::from_text("", en(), "footnotes");
    let (bytes, report) = run(pipeline, filters, raw, None);

    assert!(report.is_success());
    assert!(report.items[0].diagnostics.is_empty());
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        "<p>See note<sup><note>A note</note></sup></p>\n<end/>\n<eof/>"
    );
}
