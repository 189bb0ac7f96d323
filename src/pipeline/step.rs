//! The step contract.

use serde_json::Value;

use super::PipelineContext;
use crate::error::Result;
use crate::event::{Event, EventKind};

/// A stage of a pipeline.
///
/// A step receives one event and returns one event, usually the same one
/// after observing or mutating its resource. The default
/// [`handle_event`](Step::handle_event) dispatches to one hook per event
/// kind; every hook passes the event through unchanged, so a step only
/// overrides the kinds it cares about.
///
/// A producing step (for example one wrapping a filter) reports
/// `is_done() == false` while it still has events to emit. It then receives
/// [`Event::Noop`] and answers with its next event. End of input is signalled
/// through `is_done()`, never through an error.
///
/// # Example
///
/// ```
/// use transkel::pipeline::{PipelineContext, Step};
/// use transkel::{Event, Result};
///
/// struct CountUnits(usize);
///
/// impl Step for CountUnits {
///     fn name(&self) -> &str {
///         "count-units"
///     }
///
///     fn handle_text_unit(&mut self, event: Event, _ctx: &PipelineContext) -> Result<Event> {
///         self.0 += 1;
///         Ok(event)
///     }
/// }
/// ```
pub trait Step {
    /// Stable name of the step.
    fn name(&self) -> &str;

    /// Short human-readable description.
    fn description(&self) -> &str {
        ""
    }

    /// Current parameters, as JSON.
    fn parameters(&self) -> Value {
        Value::Null
    }

    /// Apply parameters given as JSON.
    fn set_parameters(&mut self, parameters: &Value) -> Result<()> {
        let _ = parameters;
        Ok(())
    }

    /// Number of parallel input documents this step consumes per batch item.
    fn input_count_requested(&self) -> usize {
        1
    }

    /// Whether this step writes an output for the given input.
    fn needs_output(&self, input_index: usize) -> bool {
        let _ = input_index;
        false
    }

    /// Whether the step has no more events to originate.
    fn is_done(&self) -> bool {
        true
    }

    /// Whether this step is the last one writing outputs.
    fn is_last_output_step(&self) -> bool {
        false
    }

    /// Mark this step as the last one writing outputs.
    fn set_last_output_step(&mut self, last: bool) {
        let _ = last;
    }

    /// Called before each run of the pipeline.
    fn preprocess(&mut self, ctx: &PipelineContext) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Called after each run of the pipeline, even when it failed or was cancelled.
    fn postprocess(&mut self, ctx: &PipelineContext) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Request cancellation of any long-running work.
    fn cancel(&mut self) {}

    /// Release held resources. Called once, when the pipeline is destroyed.
    fn destroy(&mut self) {}

    /// Handle one event and return the event to pass on.
    fn handle_event(&mut self, event: Event, ctx: &PipelineContext) -> Result<Event> {
        match event.kind() {
            EventKind::StartBatch => self.handle_start_batch(event, ctx),
            EventKind::EndBatch => self.handle_end_batch(event, ctx),
            EventKind::StartBatchItem => self.handle_start_batch_item(event, ctx),
            EventKind::EndBatchItem => self.handle_end_batch_item(event, ctx),
            EventKind::RawDocument => self.handle_raw_document(event, ctx),
            EventKind::StartDocument => self.handle_start_document(event, ctx),
            EventKind::EndDocument => self.handle_end_document(event, ctx),
            EventKind::StartSubDocument => self.handle_start_sub_document(event, ctx),
            EventKind::EndSubDocument => self.handle_end_sub_document(event, ctx),
            EventKind::StartGroup => self.handle_start_group(event, ctx),
            EventKind::EndGroup => self.handle_end_group(event, ctx),
            EventKind::TextUnit => self.handle_text_unit(event, ctx),
            EventKind::DocumentPart => self.handle_document_part(event, ctx),
            EventKind::Custom => self.handle_custom(event, ctx),
            EventKind::Finished => self.handle_finished(event, ctx),
            EventKind::Canceled => self.handle_canceled(event, ctx),
            EventKind::Noop => Ok(event),
        }
    }

    fn handle_start_batch(&mut self, event: Event, ctx: &PipelineContext) -> Result<Event> {
        let _ = ctx;
        Ok(event)
    }

    fn handle_end_batch(&mut self, event: Event, ctx: &PipelineContext) -> Result<Event> {
        let _ = ctx;
        Ok(event)
    }

    fn handle_start_batch_item(&mut self, event: Event, ctx: &PipelineContext) -> Result<Event> {
        let _ = ctx;
        Ok(event)
    }

    fn handle_end_batch_item(&mut self, event: Event, ctx: &PipelineContext) -> Result<Event> {
        let _ = ctx;
        Ok(event)
    }

    fn handle_raw_document(&mut self, event: Event, ctx: &PipelineContext) -> Result<Event> {
        let _ = ctx;
        Ok(event)
    }

    fn handle_start_document(&mut self, event: Event, ctx: &PipelineContext) -> Result<Event> {
        let _ = ctx;
        Ok(event)
    }

    fn handle_end_document(&mut self, event: Event, ctx: &PipelineContext) -> Result<Event> {
        let _ = ctx;
        Ok(event)
    }

    fn handle_start_sub_document(&mut self, event: Event, ctx: &PipelineContext) -> Result<Event> {
        let _ = ctx;
        Ok(event)
    }

    fn handle_end_sub_document(&mut self, event: Event, ctx: &PipelineContext) -> Result<Event> {
        let _ = ctx;
        Ok(event)
    }

    fn handle_start_group(&mut self, event: Event, ctx: &PipelineContext) -> Result<Event> {
        let _ = ctx;
        Ok(event)
    }

    fn handle_end_group(&mut self, event: Event, ctx: &PipelineContext) -> Result<Event> {
        let _ = ctx;
        Ok(event)
    }

    fn handle_text_unit(&mut self, event: Event, ctx: &PipelineContext) -> Result<Event> {
        let _ = ctx;
        Ok(event)
    }

    fn handle_document_part(&mut self, event: Event, ctx: &PipelineContext) -> Result<Event> {
        let _ = ctx;
        Ok(event)
    }

    fn handle_custom(&mut self, event: Event, ctx: &PipelineContext) -> Result<Event> {
        let _ = ctx;
        Ok(event)
    }

    fn handle_finished(&mut self, event: Event, ctx: &PipelineContext) -> Result<Event> {
        let _ = ctx;
        Ok(event)
    }

    fn handle_canceled(&mut self, event: Event, ctx: &PipelineContext) -> Result<Event> {
        let _ = ctx;
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterRegistry;
    use crate::model::TextUnit;
    use std::sync::Arc;

    struct Uppercase;

    impl Step for Uppercase {
        fn name(&self) -> &str {
            "uppercase"
        }

        fn handle_text_unit(&mut self, mut event: Event, _ctx: &PipelineContext) -> Result<Event> {
            if let Some(tu) = event.text_unit_mut() {
                let upper = tu.source.text().to_uppercase();
                tu.source = crate::model::TextContainer::from_text(&upper);
            }
            Ok(event)
        }
    }

    #[test]
    fn test_default_hooks_pass_through() {
        let ctx = PipelineContext::new(Arc::new(FilterRegistry::new()));
        let mut step = Uppercase;

        let out = step.handle_event(Event::StartBatch, &ctx).unwrap();
        assert_eq!(out, Event::StartBatch);
        let out = step.handle_event(Event::Noop, &ctx).unwrap();
        assert!(out.is_noop());

        assert!(step.is_done());
        assert_eq!(step.input_count_requested(), 1);
        assert!(!step.needs_output(0));
        assert_eq!(step.parameters(), Value::Null);
    }

    #[test]
    fn test_overridden_hook() {
        let ctx = PipelineContext::new(Arc::new(FilterRegistry::new()));
        let mut step = Uppercase;
        let out = step
            .handle_event(Event::TextUnit(TextUnit::new("1", "abc")), &ctx)
            .unwrap();
        assert_eq!(out.text_unit().unwrap().source.text(), "ABC");
    }
}
