//! Pipeline engine, steps and batch execution.
//!
//! A [`Pipeline`] is an ordered chain of [`Step`]s. The
//! [`PipelineDriver`] feeds it a batch of [`BatchItem`]s, bracketing the
//! batch and each item with lifecycle events and recording a per-item
//! outcome in a [`BatchReport`].

mod context;
mod driver;
mod engine;
mod item;
mod observer;
mod registry;
mod step;

pub use context::{CancelToken, PipelineContext};
pub use driver::{BatchReport, BatchStatus, ItemOutcome, ItemReport, PipelineDriver};
pub use engine::{Pipeline, PipelineState};
pub use item::{
    BatchItem, BatchItemDescriptor, DocumentData, InputDescriptor, OutputBuffer, OutputTarget,
};
pub use observer::{EventRecorder, PipelineObserver};
pub use registry::{PipelineConfig, StepConfig, StepEntry, StepFactory, StepRegistry};
pub use step::Step;
