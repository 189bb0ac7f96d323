//! Skeleton-driven document reconstruction.
//!
//! The writer walks each resource's skeleton, writes literal parts verbatim
//! and resolves placeholders against the live resource: the source or a
//! target for content placeholders, a property value for property
//! placeholders, and the whole referent for references to other resources.
//!
//! Referents (resources flagged as only rendered where referred to) are held
//! back when they arrive. A reference to a referent that has not arrived yet
//! blocks the output until it does, so forward references come out in
//! document order.

use encoding_rs::{Encoding, UTF_8};
use log::debug;
use std::collections::{HashMap, VecDeque};
use std::io::Write;

use super::encoding;
use super::FilterWriter;
use crate::diagnostic::Diagnostic;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::model::{
    find_ref_markers, Code, LocaleId, Piece, PlaceholderKind, PropertyScope, Referent, Resource,
    Skeleton, SkeletonPart, StartDocument, TextContainer, TextUnit, SELF_REF,
};
use crate::pipeline::OutputTarget;

/// Nesting limit when expanding references, to stop reference cycles.
const MAX_REFERENCE_DEPTH: usize = 16;

/// What a piece of text is, for escaping purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderContext {
    /// Literal skeleton text
    Skeleton,
    /// Translatable text
    Text,
    /// Data of an inline code
    Inline,
}

/// Escapes text for the output format.
pub trait Encoder {
    /// Encode a piece of output.
    fn encode(&self, text: &str, context: EncoderContext) -> String;

    /// Set the line break used by the document.
    fn set_line_break(&mut self, line_break: &str) {
        let _ = line_break;
    }
}

/// Plain-text encoder: leaves everything as is, except that line breaks in
/// translatable text follow the document's line break.
#[derive(Debug, Clone)]
pub struct DefaultEncoder {
    line_break: String,
}

impl Default for DefaultEncoder {
    fn default() -> Self {
        Self {
            line_break: "\n".to_string(),
        }
    }
}

impl DefaultEncoder {
    /// Create an encoder using `\n` line breaks.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Encoder for DefaultEncoder {
    fn encode(&self, text: &str, context: EncoderContext) -> String {
        if context == EncoderContext::Text && self.line_break != "\n" && text.contains('\n') {
            text.replace('\n', &self.line_break)
        } else {
            text.to_string()
        }
    }

    fn set_line_break(&mut self, line_break: &str) {
        self.line_break = line_break.to_string();
    }
}

/// Output not yet written.
#[derive(Debug, Clone)]
enum Chunk {
    /// Encoded text, ready to be converted to the output encoding
    Text(String),
    /// Reference to a resource, or to one of its properties
    Ref {
        id: String,
        property: Option<String>,
        depth: usize,
    },
}

/// A referent group being collected.
#[derive(Debug)]
struct Capture {
    id: String,
    events: Vec<Event>,
    depth: usize,
}

/// Writer rebuilding documents from their skeletons.
pub struct SkeletonWriter {
    encoder: Box<dyn Encoder>,
    output: Option<OutputTarget>,
    out: Option<Box<dyn Write>>,
    locale: Option<LocaleId>,
    requested_encoding: Option<String>,
    encoding: &'static Encoding,
    encoding_name: String,
    document_id: String,
    multilingual: bool,
    pending: VecDeque<Chunk>,
    referents: HashMap<String, Vec<Event>>,
    capture: Option<Capture>,
    unmappable_reported: bool,
    diagnostics: Vec<Diagnostic>,
}

impl Default for SkeletonWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl SkeletonWriter {
    /// Writer name.
    pub const NAME: &'static str = "skeleton-writer";

    /// Create a writer with the [`DefaultEncoder`].
    pub fn new() -> Self {
        Self::with_encoder(Box::new(DefaultEncoder::new()))
    }

    /// Create a writer with a format-specific encoder.
    pub fn with_encoder(encoder: Box<dyn Encoder>) -> Self {
        Self {
            encoder,
            output: None,
            out: None,
            locale: None,
            requested_encoding: None,
            encoding: UTF_8,
            encoding_name: UTF_8.name().to_string(),
            document_id: String::new(),
            multilingual: false,
            pending: VecDeque::new(),
            referents: HashMap::new(),
            capture: None,
            unmappable_reported: false,
            diagnostics: Vec::new(),
        }
    }

    fn start_document(&mut self, sd: &StartDocument) -> Result<()> {
        let output = self
            .output
            .as_ref()
            .ok_or_else(|| Error::Other("writer has no output".to_string()))?;

        self.encoding_name = self
            .requested_encoding
            .clone()
            .unwrap_or_else(|| sd.encoding.clone());
        self.encoding = encoding::lookup(&self.encoding_name)?;
        self.encoder.set_line_break(&sd.line_break);
        self.document_id = sd.id.clone();
        self.multilingual = sd.multilingual;
        self.pending.clear();
        self.referents.clear();
        self.capture = None;
        self.unmappable_reported = false;

        let input_encoding = encoding::lookup(&sd.encoding)?;
        let mut out = output.open()?;
        out.write_all(encoding::output_bom(self.encoding, input_encoding, sd.has_bom))?;
        self.out = Some(out);
        debug!(
            "writing document '{}' to {} as {}",
            sd.id,
            output.display_name(),
            self.encoding_name
        );

        let event = Event::StartDocument(sd.clone());
        self.emit(&event)
    }

    /// Render an event and write whatever is no longer blocked.
    fn emit(&mut self, event: &Event) -> Result<()> {
        let mut chunks = Vec::new();
        self.render_event(event, 0, &mut chunks);
        self.pending.extend(chunks);
        self.drain(false)
    }

    fn render_event(&mut self, event: &Event, depth: usize, chunks: &mut Vec<Chunk>) {
        if let Event::TextUnit(tu) = event {
            if tu.skeleton.is_none() {
                self.render_content(tu, None, depth, chunks);
                return;
            }
        }
        if let Some(skeleton) = event.resource().and_then(|r| r.skeleton()) {
            self.render_skeleton(skeleton, event, depth, chunks);
        }
    }

    fn render_skeleton(
        &mut self,
        skeleton: &Skeleton,
        owner: &Event,
        depth: usize,
        chunks: &mut Vec<Chunk>,
    ) {
        for part in skeleton.parts() {
            match part {
                SkeletonPart::Text(text) => chunks.push(Chunk::Text(
                    self.encoder.encode(text, EncoderContext::Skeleton),
                )),
                SkeletonPart::Placeholder(ph) => match (&ph.referent, &ph.kind) {
                    (Referent::SelfRef, PlaceholderKind::Content { locale }) => {
                        match owner {
                            Event::TextUnit(tu) => {
                                self.render_content(tu, locale.as_ref(), depth, chunks)
                            }
                            _ => self.warn(
                                resource_id(owner),
                                "content placeholder on a resource without content",
                            ),
                        }
                    }
                    (Referent::SelfRef, PlaceholderKind::Property { name, scope }) => {
                        let value = self.property_value(owner, name, scope);
                        chunks.push(Chunk::Text(value));
                    }
                    (Referent::Resource(id), PlaceholderKind::Content { .. }) => {
                        chunks.push(Chunk::Ref {
                            id: id.clone(),
                            property: None,
                            depth: depth + 1,
                        })
                    }
                    (Referent::Resource(id), PlaceholderKind::Property { name, .. }) => {
                        chunks.push(Chunk::Ref {
                            id: id.clone(),
                            property: Some(name.clone()),
                            depth: depth + 1,
                        })
                    }
                },
            }
        }
    }

    /// The container written for a text unit's content.
    fn select_content<'a>(
        &self,
        tu: &'a TextUnit,
        locale: Option<&LocaleId>,
    ) -> (&'a TextContainer, bool) {
        let wanted = match locale {
            Some(locale) => Some(locale),
            None if self.multilingual || !tu.translatable => None,
            None => self.locale.as_ref(),
        };
        match wanted.and_then(|locale| tu.target(locale)) {
            Some(target) => (target, true),
            None => (&tu.source, false),
        }
    }

    fn render_content(
        &mut self,
        tu: &TextUnit,
        locale: Option<&LocaleId>,
        depth: usize,
        chunks: &mut Vec<Chunk>,
    ) {
        let (container, is_target) = self.select_content(tu, locale);
        let content = container.content();
        let source = if is_target {
            let source = tu.source.content();
            for code in content.unmatched_codes(&source) {
                self.warn(
                    &tu.id,
                    format!(
                        "target code {} ({:?} '{}') has no counterpart in the source",
                        code.id, code.tag_type, code.tag
                    ),
                );
            }
            Some(source)
        } else {
            None
        };

        for piece in content.pieces() {
            match piece {
                Piece::Text { text, .. } => {
                    chunks.push(Chunk::Text(self.encoder.encode(text, EncoderContext::Text)))
                }
                Piece::Marker { index, .. } => {
                    let Some(code) = content.code(index) else {
                        continue;
                    };
                    let code = source
                        .as_ref()
                        .and_then(|source| source.find_code(code.tag_type, code.id))
                        .unwrap_or(code);
                    self.render_code(code, tu, depth, chunks);
                }
            }
        }
    }

    fn render_code(&mut self, code: &Code, tu: &TextUnit, depth: usize, chunks: &mut Vec<Chunk>) {
        if !code.has_reference {
            chunks.push(Chunk::Text(
                self.encoder.encode(&code.data, EncoderContext::Inline),
            ));
            return;
        }

        let mut last = 0;
        for (range, marker) in find_ref_markers(&code.data) {
            chunks.push(Chunk::Text(
                self.encoder
                    .encode(&code.data[last..range.start], EncoderContext::Inline),
            ));
            if marker.id == SELF_REF {
                if let Some(name) = &marker.property {
                    let event = Event::TextUnit(tu.clone());
                    let value = self.property_value(&event, name, &PropertyScope::Resource);
                    chunks.push(Chunk::Text(value));
                }
            } else {
                chunks.push(Chunk::Ref {
                    id: marker.id,
                    property: marker.property,
                    depth: depth + 1,
                });
            }
            last = range.end;
        }
        chunks.push(Chunk::Text(
            self.encoder
                .encode(&code.data[last..], EncoderContext::Inline),
        ));
    }

    fn property_value(&mut self, owner: &Event, name: &str, scope: &PropertyScope) -> String {
        if *scope == PropertyScope::Resource {
            match name {
                "encoding" => return self.encoding_name.clone(),
                "language" => {
                    if let Some(locale) = &self.locale {
                        return locale.to_string();
                    }
                }
                _ => {}
            }
        }

        let value = match (owner, scope) {
            (Event::TextUnit(tu), PropertyScope::Source) => {
                tu.source.properties.value(name).map(str::to_string)
            }
            (Event::TextUnit(tu), PropertyScope::Target(locale)) => tu
                .target(locale)
                .and_then(|t| t.properties.value(name))
                .map(str::to_string),
            (_, PropertyScope::Resource) => owner
                .resource()
                .and_then(|r| r.properties().value(name))
                .map(str::to_string),
            _ => None,
        };

        match value {
            Some(value) => self.encoder.encode(&value, EncoderContext::Skeleton),
            None => {
                self.warn(resource_id(owner), format!("missing property '{}'", name));
                String::new()
            }
        }
    }

    /// Write pending output up to the first unresolved reference.
    ///
    /// With `force`, unresolved references are reported and skipped.
    fn drain(&mut self, force: bool) -> Result<()> {
        while let Some(chunk) = self.pending.pop_front() {
            match chunk {
                Chunk::Text(text) => self.write_text(&text)?,
                Chunk::Ref {
                    id,
                    property,
                    depth,
                } => {
                    if depth > MAX_REFERENCE_DEPTH {
                        let doc = self.document_id.clone();
                        self.warn(&doc, format!("reference cycle through '{}'", id));
                        continue;
                    }
                    let Some(events) = self.referents.remove(&id) else {
                        if force {
                            let doc = self.document_id.clone();
                            self.warn(&doc, format!("unresolved reference to '{}'", id));
                            continue;
                        }
                        self.pending.push_front(Chunk::Ref {
                            id,
                            property,
                            depth,
                        });
                        break;
                    };

                    let mut chunks = Vec::new();
                    match &property {
                        Some(name) => {
                            if let Some(first) = events.first() {
                                let value = self.property_value(first, name, &PropertyScope::Resource);
                                chunks.push(Chunk::Text(value));
                            }
                        }
                        None => {
                            for event in &events {
                                self.render_event(event, depth, &mut chunks);
                            }
                        }
                    }
                    self.referents.insert(id, events);
                    for chunk in chunks.into_iter().rev() {
                        self.pending.push_front(chunk);
                    }
                }
            }
        }
        Ok(())
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let (bytes, unmappable) = encoding::encode(text, self.encoding);
        if unmappable && !self.unmappable_reported {
            self.unmappable_reported = true;
            let doc = self.document_id.clone();
            self.warn(
                &doc,
                format!(
                    "some characters cannot be represented in {} and were escaped",
                    self.encoding_name
                ),
            );
        }
        let out = self
            .out
            .as_mut()
            .ok_or_else(|| Error::Other("content written before start of document".to_string()))?;
        out.write_all(&bytes)?;
        Ok(())
    }

    /// Keep a referent for later, or collect it into the current referent group.
    fn hold(&mut self, event: &Event) -> Result<bool> {
        if let Some(capture) = self.capture.as_mut() {
            match event {
                Event::StartGroup(_) => capture.depth += 1,
                Event::EndGroup(_) => capture.depth -= 1,
                _ => {}
            }
            capture.events.push(event.clone());
            if capture.depth == 0 {
                if let Some(done) = self.capture.take() {
                    self.referents.insert(done.id, done.events);
                    self.drain(false)?;
                }
            }
            return Ok(true);
        }

        let Some(resource) = event.resource() else {
            return Ok(false);
        };
        if !resource.is_referent() {
            return Ok(false);
        }

        let id = resource.id().to_string();
        if let Event::StartGroup(_) = event {
            self.capture = Some(Capture {
                id,
                events: vec![event.clone()],
                depth: 1,
            });
        } else {
            self.referents.insert(id, vec![event.clone()]);
            self.drain(false)?;
        }
        Ok(true)
    }

    fn warn(&mut self, resource_id: &str, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::warning(resource_id, message));
    }

    fn finish(&mut self) -> Result<()> {
        self.drain(true)?;
        if let Some(mut out) = self.out.take() {
            out.flush()?;
        }
        Ok(())
    }
}

fn resource_id(event: &Event) -> &str {
    event.resource().map(|r| r.id()).unwrap_or("")
}

impl FilterWriter for SkeletonWriter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn create(
        &mut self,
        output: OutputTarget,
        locale: Option<LocaleId>,
        encoding: Option<String>,
    ) -> Result<()> {
        self.output = Some(output);
        self.locale = locale;
        self.requested_encoding = encoding;
        Ok(())
    }

    fn write_event(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::StartDocument(sd) => self.start_document(sd),
            Event::EndDocument(_) => {
                self.emit(event)?;
                self.finish()
            }
            Event::StartSubDocument(_)
            | Event::EndSubDocument(_)
            | Event::StartGroup(_)
            | Event::EndGroup(_)
            | Event::TextUnit(_)
            | Event::DocumentPart(_) => {
                if self.hold(event)? {
                    return Ok(());
                }
                self.emit(event)
            }
            _ => Ok(()),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.finish()
    }

    fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}
