//! The pipeline engine.

use log::{debug, warn};
use std::collections::VecDeque;
use std::fmt;

use super::{CancelToken, PipelineContext, PipelineObserver, Step};
use crate::error::{Error, Result};
use crate::event::Event;

/// Lifecycle state of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No run yet
    NotStarted,
    /// A run is in progress
    Running,
    /// The last run completed
    Succeeded,
    /// The last run was cancelled
    Cancelled,
    /// The last run stopped on an error
    Failed,
    /// Steps were destroyed; the pipeline cannot be used anymore
    Destroyed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::NotStarted => "not started",
            PipelineState::Running => "running",
            PipelineState::Succeeded => "succeeded",
            PipelineState::Cancelled => "cancelled",
            PipelineState::Failed => "failed",
            PipelineState::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

/// An ordered chain of steps.
///
/// Events enter at the head step and go through every active step in order.
/// When the head step reports `is_done()`, it is retired and the next step
/// becomes the head; this lets a buffering step act as the producer for the
/// rest of the chain once the real source is exhausted.
///
/// # Example
///
/// ```
/// use transkel::pipeline::Pipeline;
/// use transkel::steps::{EventsWriterStep, FilterEventsStep};
///
/// let mut pipeline = Pipeline::new("extract-merge");
/// pipeline.add_step(Box::new(FilterEventsStep::new())).unwrap();
/// pipeline.add_step(Box::new(EventsWriterStep::new())).unwrap();
/// assert_eq!(pipeline.len(), 2);
/// assert!(pipeline.needs_output(0));
/// ```
pub struct Pipeline {
    id: String,
    steps: VecDeque<Box<dyn Step>>,
    finished_steps: VecDeque<Box<dyn Step>>,
    observers: Vec<Box<dyn PipelineObserver>>,
    cancel: CancelToken,
    state: PipelineState,
}

impl Pipeline {
    /// Create an empty pipeline.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            steps: VecDeque::new(),
            finished_steps: VecDeque::new(),
            observers: Vec::new(),
            cancel: CancelToken::new(),
            state: PipelineState::NotStarted,
        }
    }

    /// Pipeline identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len() + self.finished_steps.len()
    }

    /// Check if the pipeline has no steps.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of the steps, in chain order.
    pub fn step_names(&self) -> Vec<String> {
        self.all_steps().map(|s| s.name().to_string()).collect()
    }

    /// Append a step at the end of the chain.
    pub fn add_step(&mut self, step: Box<dyn Step>) -> Result<()> {
        if self.state == PipelineState::Destroyed {
            return Err(Error::PipelineDestroyed);
        }
        self.reset_steps();
        self.steps.push_back(step);

        // Only the last step writing an output is flagged as such.
        let mut found = false;
        for step in self.steps.iter_mut().rev() {
            let needs = step.needs_output(0);
            step.set_last_output_step(needs && !found);
            found |= needs;
        }
        Ok(())
    }

    /// Register an observer.
    pub fn add_observer(&mut self, observer: Box<dyn PipelineObserver>) {
        self.observers.push(observer);
    }

    /// Remove all observers.
    pub fn clear_observers(&mut self) {
        self.observers.clear();
    }

    /// Largest number of parallel inputs requested by a step.
    pub fn input_count_requested(&self) -> usize {
        self.all_steps()
            .map(|s| s.input_count_requested())
            .max()
            .unwrap_or(1)
    }

    /// Whether any step writes an output for the given input.
    pub fn needs_output(&self, input_index: usize) -> bool {
        self.all_steps().any(|s| s.needs_output(input_index))
    }

    /// A token that cancels this pipeline when triggered.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Request cancellation and tell every step about it.
    ///
    /// A pass already in progress completes; the pipeline stops before
    /// pulling the next event from the head step.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        for step in self.steps.iter_mut().chain(self.finished_steps.iter_mut()) {
            step.cancel();
        }
    }

    /// Send a start-batch event through every step.
    pub fn start_batch(&mut self, ctx: &PipelineContext) -> Result<Event> {
        self.check_not_destroyed()?;
        self.reset_steps();
        self.thread(Event::StartBatch, ctx)
    }

    /// Send an end-batch event through every step.
    pub fn end_batch(&mut self, ctx: &PipelineContext) -> Result<Event> {
        self.check_not_destroyed()?;
        self.reset_steps();
        self.thread(Event::EndBatch, ctx)
    }

    /// Let steps flush whatever they buffered.
    pub fn finish_batch(&mut self, ctx: &PipelineContext) -> Result<Event> {
        self.process(Event::Finished, ctx)
    }

    /// Process the current item of `ctx`, bracketed by start/end batch-item
    /// events.
    ///
    /// The end event is sent even when processing fails, so every started
    /// item is also ended.
    pub fn process_item(&mut self, ctx: &PipelineContext) -> Result<Event> {
        let raw = ctx
            .document(0)
            .map(|doc| doc.raw.clone())
            .ok_or(Error::MissingInput {
                supplied: 0,
                requested: 1,
            })?;

        self.check_not_destroyed()?;
        self.reset_steps();
        self.thread(Event::StartBatchItem, ctx)?;

        let result = self.process(Event::RawDocument(raw), ctx);

        self.reset_steps();
        let ended = self.thread(Event::EndBatchItem, ctx);
        match (result, ended) {
            (Err(e), _) => Err(e),
            (Ok(_), Err(e)) => Err(e),
            (Ok(event), Ok(_)) => Ok(event),
        }
    }

    /// Run the pipeline from a seed event.
    ///
    /// Returns [`Event::Canceled`] when cancellation was requested, the final
    /// event for a [`Event::Finished`] seed, and [`Event::Noop`] otherwise.
    pub fn process(&mut self, seed: Event, ctx: &PipelineContext) -> Result<Event> {
        self.check_not_destroyed()?;
        self.reset_steps();

        if self.is_cancelled(ctx) {
            self.state = PipelineState::Cancelled;
            return Ok(Event::Canceled);
        }

        self.state = PipelineState::Running;
        let result = self.run(seed, ctx);

        // Whatever happened, every step is retired and post-processed.
        while let Some(step) = self.steps.pop_front() {
            self.finished_steps.push_back(step);
        }
        let mut post_error = None;
        for step in self.finished_steps.iter_mut() {
            if let Err(e) = step.postprocess(ctx) {
                warn!("postprocess of step '{}' failed: {}", step.name(), e);
                post_error.get_or_insert(e);
            }
        }

        let result = match (result, post_error) {
            (Ok(event), None) => Ok(event),
            (Ok(_), Some(e)) | (Err(e), _) => Err(e),
        };
        self.state = match &result {
            Ok(Event::Canceled) => PipelineState::Cancelled,
            Ok(_) => PipelineState::Succeeded,
            Err(_) => PipelineState::Failed,
        };
        result
    }

    /// Destroy all steps. Only the first call has an effect.
    pub fn destroy(&mut self) {
        if self.state == PipelineState::Destroyed {
            return;
        }
        self.reset_steps();
        for step in self.steps.iter_mut() {
            debug!("destroying step '{}'", step.name());
            step.destroy();
        }
        self.state = PipelineState::Destroyed;
    }

    fn run(&mut self, seed: Event, ctx: &PipelineContext) -> Result<Event> {
        for step in self.steps.iter_mut() {
            step.preprocess(ctx)?;
        }

        if matches!(seed, Event::Finished) {
            return self.thread(seed, ctx);
        }

        let mut event = seed;
        while !self.steps.is_empty() && !self.is_cancelled(ctx) {
            loop {
                for step in self.steps.iter_mut() {
                    event = step.handle_event(event, ctx)?;
                }
                self.notify(&event);
                event = Event::Noop;

                let head_done = self.steps.front().map_or(true, |s| s.is_done());
                if head_done || self.is_cancelled(ctx) {
                    break;
                }
            }

            // Retire every leading step that has nothing left to emit.
            while self.steps.front().map_or(false, |s| s.is_done()) {
                if let Some(step) = self.steps.pop_front() {
                    debug!("retiring step '{}'", step.name());
                    self.finished_steps.push_back(step);
                }
            }
        }

        if self.is_cancelled(ctx) {
            Ok(Event::Canceled)
        } else {
            Ok(Event::Noop)
        }
    }

    /// Pass one event through every active step, threading the results.
    fn thread(&mut self, mut event: Event, ctx: &PipelineContext) -> Result<Event> {
        for step in self.steps.iter_mut() {
            event = step.handle_event(event, ctx)?;
        }
        self.notify(&event);
        Ok(event)
    }

    fn notify(&mut self, event: &Event) {
        if event.is_noop() {
            return;
        }
        for observer in self.observers.iter_mut() {
            observer.update(event);
        }
    }

    /// Move retired steps back in front of the active ones, restoring chain order.
    fn reset_steps(&mut self) {
        while let Some(step) = self.finished_steps.pop_back() {
            self.steps.push_front(step);
        }
    }

    fn all_steps(&self) -> impl Iterator<Item = &Box<dyn Step>> {
        self.finished_steps.iter().chain(self.steps.iter())
    }

    fn is_cancelled(&self, ctx: &PipelineContext) -> bool {
        self.cancel.is_cancelled() || ctx.is_cancelled()
    }

    fn check_not_destroyed(&self) -> Result<()> {
        if self.state == PipelineState::Destroyed {
            Err(Error::PipelineDestroyed)
        } else {
            Ok(())
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("id", &self.id)
            .field("steps", &self.step_names())
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::filter::FilterRegistry;
    use crate::model::TextUnit;
    use crate::pipeline::EventRecorder;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Emits `remaining` text units, one per pass, once it got a raw document.
    struct Producer {
        started: bool,
        remaining: usize,
        log: Log,
    }

    impl Step for Producer {
        fn name(&self) -> &str {
            "producer"
        }

        fn is_done(&self) -> bool {
            !self.started || self.remaining == 0
        }

        fn handle_event(&mut self, event: Event, _ctx: &PipelineContext) -> Result<Event> {
            if matches!(event, Event::RawDocument(_)) {
                self.started = true;
            }
            let pull = matches!(event, Event::RawDocument(_) | Event::Noop);
            if self.started && pull && self.remaining > 0 {
                self.remaining -= 1;
                let id = format!("tu{}", self.remaining);
                self.log.borrow_mut().push(format!("producer:{}", id));
                return Ok(Event::TextUnit(TextUnit::new(id, "x")));
            }
            Ok(event)
        }
    }

    /// Records every non-noop event it sees.
    struct Tracer {
        name: String,
        log: Log,
        destroyed: Rc<RefCell<usize>>,
    }

    impl Step for Tracer {
        fn name(&self) -> &str {
            &self.name
        }

        fn handle_event(&mut self, event: Event, _ctx: &PipelineContext) -> Result<Event> {
            if !event.is_noop() {
                self.log
                    .borrow_mut()
                    .push(format!("{}:{}", self.name, event.kind()));
            }
            Ok(event)
        }

        fn destroy(&mut self) {
            *self.destroyed.borrow_mut() += 1;
        }
    }

    fn ctx() -> PipelineContext {
        PipelineContext::new(Arc::new(FilterRegistry::new()))
    }

    fn tracer(name: &str, log: &Log, destroyed: &Rc<RefCell<usize>>) -> Box<dyn Step> {
        Box::new(Tracer {
            name: name.to_string(),
            log: log.clone(),
            destroyed: destroyed.clone(),
        })
    }

    #[test]
    fn test_steps_see_events_in_order() {
        let log = Log::default();
        let destroyed = Rc::new(RefCell::new(0));
        let mut pipeline = Pipeline::new("p");
        pipeline
            .add_step(Box::new(Producer {
                started: false,
                remaining: 2,
                log: log.clone(),
            }))
            .unwrap();
        pipeline.add_step(tracer("a", &log, &destroyed)).unwrap();
        pipeline.add_step(tracer("b", &log, &destroyed)).unwrap();

        let out = pipeline
            .process(Event::Custom(crate::model::CustomEvent {
                custom_type: "seed".into(),
                payload: serde_json::Value::Null,
            }), &ctx())
            .unwrap();
        assert!(out.is_noop());

        // The producer ignores custom seeds, so only the seed goes through.
        assert_eq!(*log.borrow(), vec!["a:custom", "b:custom"]);
        assert_eq!(pipeline.state(), PipelineState::Succeeded);
    }

    #[test]
    fn test_producer_drives_the_chain() {
        let log = Log::default();
        let destroyed = Rc::new(RefCell::new(0));
        let mut pipeline = Pipeline::new("p");
        pipeline
            .add_step(Box::new(Producer {
                started: false,
                remaining: 2,
                log: log.clone(),
            }))
            .unwrap();
        pipeline.add_step(tracer("a", &log, &destroyed)).unwrap();

        let raw = crate::model::RawDocument::from_text(
            "",
            crate::model::LocaleId::new("en").unwrap(),
            "line",
        );
        pipeline.process(Event::RawDocument(raw), &ctx()).unwrap();

        assert_eq!(
            *log.borrow(),
            vec!["producer:tu1", "a:text_unit", "producer:tu0", "a:text_unit"]
        );
    }

    #[test]
    fn test_finished_threads_once() {
        let log = Log::default();
        let destroyed = Rc::new(RefCell::new(0));
        let mut pipeline = Pipeline::new("p");
        pipeline.add_step(tracer("a", &log, &destroyed)).unwrap();
        pipeline.add_step(tracer("b", &log, &destroyed)).unwrap();

        let out = pipeline.finish_batch(&ctx()).unwrap();
        assert_eq!(out.kind(), EventKind::Finished);
        assert_eq!(*log.borrow(), vec!["a:finished", "b:finished"]);
    }

    #[test]
    fn test_cancelled_pipeline_invokes_no_step() {
        let log = Log::default();
        let destroyed = Rc::new(RefCell::new(0));
        let mut pipeline = Pipeline::new("p");
        pipeline.add_step(tracer("a", &log, &destroyed)).unwrap();

        pipeline.cancel();
        let out = pipeline.process(Event::StartBatchItem, &ctx()).unwrap();
        assert_eq!(out.kind(), EventKind::Canceled);
        assert!(log.borrow().is_empty());
        assert_eq!(pipeline.state(), PipelineState::Cancelled);
    }

    #[test]
    fn test_destroy_runs_once() {
        let log = Log::default();
        let destroyed = Rc::new(RefCell::new(0));
        {
            let mut pipeline = Pipeline::new("p");
            pipeline.add_step(tracer("a", &log, &destroyed)).unwrap();
            pipeline.add_step(tracer("b", &log, &destroyed)).unwrap();
            pipeline.destroy();
            pipeline.destroy();
            assert_eq!(*destroyed.borrow(), 2);
            assert!(matches!(
                pipeline.add_step(tracer("c", &log, &destroyed)),
                Err(Error::PipelineDestroyed)
            ));
            assert!(pipeline.process(Event::Noop, &ctx()).is_err());
        }
        // Drop does not destroy again
        assert_eq!(*destroyed.borrow(), 2);
    }

    #[test]
    fn test_drop_destroys() {
        let log = Log::default();
        let destroyed = Rc::new(RefCell::new(0));
        {
            let mut pipeline = Pipeline::new("p");
            pipeline.add_step(tracer("a", &log, &destroyed)).unwrap();
        }
        assert_eq!(*destroyed.borrow(), 1);
    }

    #[test]
    fn test_observers_skip_noop() {
        let log = Log::default();
        let destroyed = Rc::new(RefCell::new(0));
        let recorder = EventRecorder::new();
        let mut pipeline = Pipeline::new("p");
        pipeline.add_step(tracer("a", &log, &destroyed)).unwrap();
        pipeline.add_observer(Box::new(recorder.clone()));

        let ctx = ctx();
        pipeline.start_batch(&ctx).unwrap();
        pipeline.process(Event::Noop, &ctx).unwrap();
        pipeline.end_batch(&ctx).unwrap();

        assert_eq!(recorder.kinds(), vec![EventKind::StartBatch, EventKind::EndBatch]);
    }
}
