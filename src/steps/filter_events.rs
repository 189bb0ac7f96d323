//! Raw document to filter events.

use log::debug;

use crate::error::Result;
use crate::event::Event;
use crate::filter::Filter;
use crate::model::RawDocument;
use crate::pipeline::{PipelineContext, Step};

/// Opens the raw document with the filter of its configuration and emits the
/// filter's events one per pass.
///
/// The step is not done while the filter has events left, so the pipeline
/// keeps calling it with [`Event::Noop`].
#[derive(Default)]
pub struct FilterEventsStep {
    filter: Option<Box<dyn Filter>>,
}

impl FilterEventsStep {
    /// Registered step id.
    pub const ID: &'static str = "filter-events";

    /// Create the step.
    pub fn new() -> Self {
        Self::default()
    }

    fn open(&mut self, raw: &RawDocument, ctx: &PipelineContext) -> Result<Event> {
        self.close();

        let mut filter = ctx.filters().create(&raw.filter_config_id)?;
        debug!(
            "opening {} with filter '{}'",
            raw.display_name(),
            raw.filter_config_id
        );
        filter.open(raw)?;
        self.filter = Some(filter);

        if ctx.is_cancelled() {
            self.cancel();
        }
        self.next_event()
    }

    fn next_event(&mut self) -> Result<Event> {
        let Some(filter) = self.filter.as_mut() else {
            return Ok(Event::Noop);
        };
        if !filter.has_next() {
            self.close();
            return Ok(Event::Noop);
        }

        let event = filter.next()?;
        if !filter.has_next() {
            self.close();
        }
        Ok(event)
    }

    fn close(&mut self) {
        if let Some(mut filter) = self.filter.take() {
            filter.close();
        }
    }
}

impl Step for FilterEventsStep {
    fn name(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        "Read documents through their filter and emit their events"
    }

    fn is_done(&self) -> bool {
        self.filter.as_ref().map_or(true, |f| !f.has_next())
    }

    fn handle_event(&mut self, event: Event, ctx: &PipelineContext) -> Result<Event> {
        match event {
            Event::RawDocument(raw) => self.open(&raw, ctx),
            Event::Noop => self.next_event(),
            other => Ok(other),
        }
    }

    fn postprocess(&mut self, _ctx: &PipelineContext) -> Result<()> {
        self.close();
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(filter) = self.filter.as_mut() {
            filter.cancel();
        }
    }

    fn destroy(&mut self) {
        self.close();
    }
}
