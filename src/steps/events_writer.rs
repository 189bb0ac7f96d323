//! Filter events to output document.

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::event::Event;
use crate::filter::FilterWriter;
use crate::pipeline::{PipelineContext, Step};

/// Rebuilds each document with the writer of the filter that read it.
///
/// The output target, output locale and output encoding come from the
/// primary document of the current batch item. When a later step in the
/// pipeline also writes outputs, this one passes events through untouched.
pub struct EventsWriterStep {
    writer: Option<Box<dyn FilterWriter>>,
    last_output_step: bool,
}

impl Default for EventsWriterStep {
    fn default() -> Self {
        Self {
            writer: None,
            last_output_step: true,
        }
    }
}

impl EventsWriterStep {
    /// Registered step id.
    pub const ID: &'static str = "events-writer";

    /// Create the step.
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&mut self, event: Event) -> Result<Event> {
        if let Some(writer) = self.writer.as_mut() {
            writer.write_event(&event)?;
        }
        Ok(event)
    }

    fn close(&mut self, ctx: &PipelineContext) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            let closed = writer.close();
            ctx.diagnostics().extend(writer.take_diagnostics());
            closed?;
        }
        Ok(())
    }
}

impl Step for EventsWriterStep {
    fn name(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        "Rebuild documents from their events and write them out"
    }

    fn needs_output(&self, input_index: usize) -> bool {
        input_index == 0
    }

    fn is_last_output_step(&self) -> bool {
        self.last_output_step
    }

    fn set_last_output_step(&mut self, last: bool) {
        self.last_output_step = last;
    }

    fn handle_start_document(&mut self, event: Event, ctx: &PipelineContext) -> Result<Event> {
        let Event::StartDocument(sd) = &event else {
            return Ok(event);
        };
        self.close(ctx)?;
        if !self.last_output_step {
            debug!("'{}' left to a later output step", sd.id);
            return Ok(event);
        }

        let doc = ctx.document(0).ok_or(Error::MissingInput {
            supplied: 0,
            requested: 1,
        })?;
        let output = doc.output.clone().ok_or(Error::MissingOutput(0))?;

        let mut writer = ctx.filters().create_writer(&sd.filter_id)?;
        debug!(
            "writing '{}' with {} to {}",
            sd.id,
            writer.name(),
            output.display_name()
        );
        writer.create(
            output,
            doc.raw.target_locale.clone(),
            doc.output_encoding.clone(),
        )?;
        self.writer = Some(writer);
        self.write(event)
    }

    fn handle_end_document(&mut self, event: Event, ctx: &PipelineContext) -> Result<Event> {
        let event = self.write(event)?;
        self.close(ctx)?;
        Ok(event)
    }

    fn handle_start_sub_document(&mut self, event: Event, _ctx: &PipelineContext) -> Result<Event> {
        self.write(event)
    }

    fn handle_end_sub_document(&mut self, event: Event, _ctx: &PipelineContext) -> Result<Event> {
        self.write(event)
    }

    fn handle_start_group(&mut self, event: Event, _ctx: &PipelineContext) -> Result<Event> {
        self.write(event)
    }

    fn handle_end_group(&mut self, event: Event, _ctx: &PipelineContext) -> Result<Event> {
        self.write(event)
    }

    fn handle_text_unit(&mut self, event: Event, _ctx: &PipelineContext) -> Result<Event> {
        self.write(event)
    }

    fn handle_document_part(&mut self, event: Event, _ctx: &PipelineContext) -> Result<Event> {
        self.write(event)
    }

    fn handle_canceled(&mut self, event: Event, ctx: &PipelineContext) -> Result<Event> {
        self.close(ctx)?;
        Ok(event)
    }

    fn postprocess(&mut self, ctx: &PipelineContext) -> Result<()> {
        // A document left open here was interrupted.
        if self.writer.is_some() {
            if let Err(e) = self.close(ctx) {
                warn!("closing interrupted output failed: {}", e);
            }
        }
        Ok(())
    }

    fn destroy(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.close() {
                warn!("closing output on destroy failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterRegistry;
    use crate::model::{Ending, LocaleId, RawDocument, StartDocument, TextUnit};
    use crate::pipeline::{BatchItem, DocumentData, OutputBuffer, OutputTarget};
    use std::sync::Arc;

    fn ctx_with(output: Option<OutputBuffer>) -> PipelineContext {
        let raw = RawDocument::from_text("", LocaleId::new("en").unwrap(), "line");
        let mut doc = DocumentData::new(raw);
        if let Some(buffer) = output {
            doc = doc.with_output(OutputTarget::Buffer(buffer));
        }
        PipelineContext::new(Arc::new(FilterRegistry::with_defaults()))
            .with_item(BatchItem::new(doc), 0)
    }

    fn start() -> Event {
        Event::StartDocument(StartDocument::new("d1", LocaleId::new("en").unwrap(), "line"))
    }

    #[test]
    fn test_writes_document() {
        let buffer = OutputBuffer::new();
        let ctx = ctx_with(Some(buffer.clone()));
        let mut step = EventsWriterStep::new();
        assert!(step.needs_output(0));
        assert!(!step.needs_output(1));

        step.handle_event(start(), &ctx).unwrap();
        let out = step
            .handle_event(Event::TextUnit(TextUnit::new("1", "Hello")), &ctx)
            .unwrap();
        assert!(out.text_unit().is_some());
        step.handle_event(Event::EndDocument(Ending::new("e1")), &ctx)
            .unwrap();

        assert_eq!(buffer.to_string_lossy(), "Hello");
    }

    #[test]
    fn test_missing_output() {
        let ctx = ctx_with(None);
        let mut step = EventsWriterStep::new();
        let err = step.handle_event(start(), &ctx).unwrap_err();
        assert!(matches!(err, Error::MissingOutput(0)));
    }

    #[test]
    fn test_earlier_output_step_writes_nothing() {
        let buffer = OutputBuffer::new();
        let ctx = ctx_with(Some(buffer.clone()));
        let mut step = EventsWriterStep::new();
        assert!(step.is_last_output_step());
        step.set_last_output_step(false);

        let out = step.handle_event(start(), &ctx).unwrap();
        assert!(matches!(out, Event::StartDocument(_)));
        step.handle_event(Event::TextUnit(TextUnit::new("1", "Hello")), &ctx)
            .unwrap();
        step.handle_event(Event::EndDocument(Ending::new("e1")), &ctx)
            .unwrap();

        assert!(buffer.contents().is_empty());
    }

    #[test]
    fn test_destroy_closes_open_output() {
        let buffer = OutputBuffer::new();
        let ctx = ctx_with(Some(buffer.clone()));
        let mut step = EventsWriterStep::new();

        step.handle_event(start(), &ctx).unwrap();
        step.handle_event(Event::TextUnit(TextUnit::new("1", "Hello")), &ctx)
            .unwrap();
        step.destroy();

        assert!(step.writer.is_none());
        assert_eq!(buffer.to_string_lossy(), "Hello");
        // Nothing left to close.
        step.destroy();
    }
}
