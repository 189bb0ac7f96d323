//! Event logging.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::event::{Event, EventKind};
use crate::model::Resource;
use crate::pipeline::{PipelineContext, Step};

/// Options for [`EventLogStep`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventLogParameters {
    /// Include the content of text units in the log
    pub show_content: bool,

    /// Log a per-kind count when the batch ends
    pub summary: bool,
}

impl Default for EventLogParameters {
    fn default() -> Self {
        Self {
            show_content: true,
            summary: true,
        }
    }
}

impl EventLogParameters {
    /// Create default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Show or hide text unit content.
    pub fn with_show_content(mut self, show_content: bool) -> Self {
        self.show_content = show_content;
        self
    }

    /// Enable or disable the end-of-batch summary.
    pub fn with_summary(mut self, summary: bool) -> Self {
        self.summary = summary;
        self
    }
}

/// Logs every event going through, and a per-kind count at the end of each
/// batch.
#[derive(Debug, Default)]
pub struct EventLogStep {
    params: EventLogParameters,
    counts: BTreeMap<&'static str, usize>,
}

impl EventLogStep {
    /// Registered step id.
    pub const ID: &'static str = "event-log";

    /// Create the step.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the step with parameters.
    pub fn with_parameters(params: EventLogParameters) -> Self {
        Self {
            params,
            counts: BTreeMap::new(),
        }
    }

    /// Number of events of a kind seen since the batch started.
    pub fn count(&self, kind: EventKind) -> usize {
        self.counts.get(kind.as_str()).copied().unwrap_or(0)
    }

    fn summary(&self) -> String {
        self.counts
            .iter()
            .map(|(kind, count)| format!("{}={}", kind, count))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Step for EventLogStep {
    fn name(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        "Log every event going through the pipeline"
    }

    fn parameters(&self) -> Value {
        serde_json::to_value(&self.params).unwrap_or(Value::Null)
    }

    fn set_parameters(&mut self, parameters: &Value) -> Result<()> {
        self.params = serde_json::from_value(parameters.clone())
            .map_err(|e| Error::invalid_parameters(Self::ID, e))?;
        Ok(())
    }

    fn handle_event(&mut self, event: Event, _ctx: &PipelineContext) -> Result<Event> {
        let kind = event.kind();
        match kind {
            EventKind::Noop => return Ok(event),
            EventKind::StartBatch => self.counts.clear(),
            _ => {}
        }
        *self.counts.entry(kind.as_str()).or_insert(0) += 1;

        match &event {
            Event::TextUnit(tu) if self.params.show_content => {
                debug!("{} {}: {}", kind, tu.id, tu.source.content().to_generic())
            }
            Event::RawDocument(raw) => debug!("{} {}", kind, raw.display_name()),
            _ => match event.resource() {
                Some(resource) => debug!("{} {}", kind, resource.id()),
                None => debug!("{}", kind),
            },
        }

        if kind == EventKind::EndBatch && self.params.summary {
            info!("events: {}", self.summary());
        }
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterRegistry;
    use crate::model::TextUnit;
    use std::sync::Arc;

    #[test]
    fn test_counts_events() {
        let ctx = PipelineContext::new(Arc::new(FilterRegistry::new()));
        let mut step = EventLogStep::new();

        for event in [
            Event::StartBatch,
            Event::TextUnit(TextUnit::new("1", "a")),
            Event::Noop,
            Event::TextUnit(TextUnit::new("2", "b")),
        ] {
            let out = step.handle_event(event.clone(), &ctx).unwrap();
            assert_eq!(out, event);
        }

        assert_eq!(step.count(EventKind::TextUnit), 2);
        assert_eq!(step.count(EventKind::Noop), 0);
        assert_eq!(step.summary(), "start_batch=1, text_unit=2");

        step.handle_event(Event::StartBatch, &ctx).unwrap();
        assert_eq!(step.count(EventKind::TextUnit), 0);
    }

    #[test]
    fn test_parameters() {
        let mut step = EventLogStep::with_parameters(EventLogParameters::new().with_summary(false));
        assert_eq!(step.parameters()["summary"], Value::Bool(false));

        step.set_parameters(&serde_json::json!({"show_content": false}))
            .unwrap();
        assert!(!step.params.show_content);
        assert!(step.params.summary);

        assert!(matches!(
            step.set_parameters(&serde_json::json!({"summary": "yes"})),
            Err(Error::InvalidParameters { .. })
        ));
    }
}
