//! Pipeline observers.

use crate::event::{Event, EventKind};
use std::cell::RefCell;
use std::rc::Rc;

/// Receives every non-noop event leaving the last step of a pipeline.
pub trait PipelineObserver {
    /// Called with each event after it went through all active steps.
    fn update(&mut self, event: &Event);
}

impl<F> PipelineObserver for F
where
    F: FnMut(&Event),
{
    fn update(&mut self, event: &Event) {
        self(event)
    }
}

/// Observer recording the kinds of the events it sees.
///
/// Clones share the same record, so a clone can be handed to the pipeline
/// while the original is inspected.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder(Rc<RefCell<Vec<EventKind>>>);

impl EventRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Kinds seen so far, in order.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.0.borrow().clone()
    }

    /// Number of events of the given kind seen so far.
    pub fn count(&self, kind: EventKind) -> usize {
        self.0.borrow().iter().filter(|k| **k == kind).count()
    }
}

impl PipelineObserver for EventRecorder {
    fn update(&mut self, event: &Event) {
        self.0.borrow_mut().push(event.kind());
    }
}
