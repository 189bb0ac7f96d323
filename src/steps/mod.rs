//! Built-in pipeline steps.
//!
//! - [`FilterEventsStep`]: reads the raw document through its filter and
//!   emits the document's events (the producer at the head of a pipeline).
//! - [`EventsWriterStep`]: rebuilds the document through the filter's writer.
//! - [`PseudoTranslateStep`]: fills targets with an accented copy of the source.
//! - [`EventLogStep`]: logs the events going through.

mod event_log;
mod events_writer;
mod filter_events;
mod pseudo_translate;

pub use event_log::{EventLogParameters, EventLogStep};
pub use events_writer::EventsWriterStep;
pub use filter_events::FilterEventsStep;
pub use pseudo_translate::{PseudoTranslateParameters, PseudoTranslateStep};
