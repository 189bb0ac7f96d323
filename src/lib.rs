//! # transkel
//!
//! Extract, transform and rebuild localizable documents.
//!
//! A filter reads a document into a stream of events: translatable content
//! goes into text units, everything else into skeletons. Events then flow
//! through a pipeline of steps that can inspect or modify them, and a writer
//! rebuilds the document from the skeletons and the (possibly translated)
//! content.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use transkel::filter::FilterRegistry;
//! use transkel::model::{LocaleId, RawDocument};
//! use transkel::pipeline::{
//!     BatchItem, DocumentData, OutputBuffer, OutputTarget, PipelineConfig, PipelineDriver,
//!     StepConfig, StepRegistry,
//! };
//!
//! fn main() -> transkel::Result<()> {
//!     let config = PipelineConfig::new("pseudo")
//!         .with_step(StepConfig::new("filter-events"))
//!         .with_step(StepConfig::new("pseudo-translate"))
//!         .with_step(StepConfig::new("events-writer"));
//!     let pipeline = StepRegistry::with_defaults().build_pipeline(&config)?;
//!
//!     let raw = RawDocument::from_text("Hello\n", LocaleId::new("en")?, "line")
//!         .with_target_locale(LocaleId::new("fr")?);
//!     let output = OutputBuffer::new();
//!
//!     let mut driver = PipelineDriver::new(pipeline, Arc::new(FilterRegistry::with_defaults()));
//!     driver.add_item(BatchItem::new(
//!         DocumentData::new(raw).with_output(OutputTarget::Buffer(output.clone())),
//!     ));
//!     let report = driver.process_batch()?;
//!
//!     assert!(report.is_success());
//!     assert_eq!(output.to_string_lossy(), "[Héllô]\n");
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Event model**: batch, document, group and content events
//! - **Pipeline engine**: ordered steps, producer hand-off, cancellation
//! - **Batch driver**: per-item outcomes, failures isolated to their item
//! - **Text model**: fragments with inline codes, segments, per-locale targets
//! - **Skeletons**: placeholder-based reconstruction with forward references

pub mod diagnostic;
pub mod error;
pub mod event;
pub mod filter;
pub mod model;
pub mod pipeline;
pub mod steps;

// Re-export commonly used types
pub use diagnostic::{Diagnostic, Severity};
pub use error::{Error, FaultKind, Result};
pub use event::{Event, EventKind};
pub use filter::{Filter, FilterRegistry, FilterWriter};
pub use model::{
    Code, LocaleId, RawDocument, Segment, Skeleton, TagType, TextContainer, TextFragment,
    TextUnit,
};
pub use pipeline::{
    BatchItem, BatchReport, DocumentData, OutputTarget, Pipeline, PipelineConfig, PipelineContext,
    PipelineDriver, Step, StepRegistry,
};

use std::sync::Arc;

/// Read a document with one of the built-in filters and return all its events.
///
/// # Example
///
/// ```
/// use transkel::{extract, Event, LocaleId, RawDocument};
///
/// let raw = RawDocument::from_text("One\n\nTwo\n", LocaleId::new("en").unwrap(), "line");
/// let events = extract(&raw).unwrap();
/// let units = events.iter().filter(|e| e.text_unit().is_some()).count();
/// assert_eq!(units, 2);
/// ```
pub fn extract(raw: &RawDocument) -> Result<Vec<Event>> {
    let registry = FilterRegistry::with_defaults();
    let mut filter = registry.create(&raw.filter_config_id)?;
    filter.open(raw)?;

    let mut events = Vec::new();
    while filter.has_next() {
        events.push(filter.next()?);
    }
    filter.close();
    Ok(events)
}

/// Run a pipeline configuration over a batch with the built-in steps and
/// filters.
///
/// # Example
///
/// ```no_run
/// use transkel::model::{LocaleId, RawDocument};
/// use transkel::pipeline::{BatchItem, DocumentData, OutputTarget, PipelineConfig};
///
/// let raw = RawDocument::from_path("notes.txt", LocaleId::new("en").unwrap(), "line");
/// let item = BatchItem::new(
///     DocumentData::new(raw).with_output(OutputTarget::Path("out/notes.txt".into())),
/// );
/// let report = transkel::run_batch(&PipelineConfig::round_trip(), vec![item]).unwrap();
/// println!("{}", report.status);
/// ```
pub fn run_batch(config: &PipelineConfig, items: Vec<BatchItem>) -> Result<BatchReport> {
    let pipeline = StepRegistry::with_defaults().build_pipeline(config)?;
    let mut driver = PipelineDriver::new(pipeline, Arc::new(FilterRegistry::with_defaults()));
    for item in items {
        driver.add_item(item);
    }
    driver.process_batch()
}
