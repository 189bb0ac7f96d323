//! Events flowing through a pipeline.
//!
//! Producers emit events in document order:
//!
//! ```text
//! StartBatch
//!   StartBatchItem
//!     RawDocument -> StartDocument
//!                      (StartGroup ... EndGroup | TextUnit | DocumentPart)*
//!                    EndDocument
//!   EndBatchItem
//!   ...
//! EndBatch
//! ```
//!
//! Content-bearing events own their resource; steps receive the event by
//! value, may mutate the resource and hand the same event on.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{
    CustomEvent, DocumentPart, Ending, RawDocument, Resource, StartDocument, StartGroup,
    StartSubDocument, TextUnit,
};

/// A lifecycle or content notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// A batch is starting.
    StartBatch,
    /// A batch has ended.
    EndBatch,
    /// A batch item is starting.
    StartBatchItem,
    /// A batch item has ended.
    EndBatchItem,
    /// An input document, not yet parsed.
    RawDocument(RawDocument),
    /// Start of a parsed document.
    StartDocument(StartDocument),
    /// End of a document, carrying the trailing skeleton.
    EndDocument(Ending),
    /// Start of an embedded sub-document.
    StartSubDocument(StartSubDocument),
    /// End of an embedded sub-document.
    EndSubDocument(Ending),
    /// Start of a group.
    StartGroup(StartGroup),
    /// End of a group.
    EndGroup(Ending),
    /// Translatable content.
    TextUnit(TextUnit),
    /// Non-translatable content.
    DocumentPart(DocumentPart),
    /// Application-defined payload.
    Custom(CustomEvent),
    /// Steps should flush what they buffered.
    Finished,
    /// Processing was cancelled.
    Canceled,
    /// No event.
    Noop,
}

/// The kind of an [`Event`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    StartBatch,
    EndBatch,
    StartBatchItem,
    EndBatchItem,
    RawDocument,
    StartDocument,
    EndDocument,
    StartSubDocument,
    EndSubDocument,
    StartGroup,
    EndGroup,
    TextUnit,
    DocumentPart,
    Custom,
    Finished,
    Canceled,
    Noop,
}

impl EventKind {
    /// Stable snake_case name, as used in event dumps.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::StartBatch => "start_batch",
            EventKind::EndBatch => "end_batch",
            EventKind::StartBatchItem => "start_batch_item",
            EventKind::EndBatchItem => "end_batch_item",
            EventKind::RawDocument => "raw_document",
            EventKind::StartDocument => "start_document",
            EventKind::EndDocument => "end_document",
            EventKind::StartSubDocument => "start_sub_document",
            EventKind::EndSubDocument => "end_sub_document",
            EventKind::StartGroup => "start_group",
            EventKind::EndGroup => "end_group",
            EventKind::TextUnit => "text_unit",
            EventKind::DocumentPart => "document_part",
            EventKind::Custom => "custom",
            EventKind::Finished => "finished",
            EventKind::Canceled => "canceled",
            EventKind::Noop => "noop",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Event {
    /// The kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::StartBatch => EventKind::StartBatch,
            Event::EndBatch => EventKind::EndBatch,
            Event::StartBatchItem => EventKind::StartBatchItem,
            Event::EndBatchItem => EventKind::EndBatchItem,
            Event::RawDocument(_) => EventKind::RawDocument,
            Event::StartDocument(_) => EventKind::StartDocument,
            Event::EndDocument(_) => EventKind::EndDocument,
            Event::StartSubDocument(_) => EventKind::StartSubDocument,
            Event::EndSubDocument(_) => EventKind::EndSubDocument,
            Event::StartGroup(_) => EventKind::StartGroup,
            Event::EndGroup(_) => EventKind::EndGroup,
            Event::TextUnit(_) => EventKind::TextUnit,
            Event::DocumentPart(_) => EventKind::DocumentPart,
            Event::Custom(_) => EventKind::Custom,
            Event::Finished => EventKind::Finished,
            Event::Canceled => EventKind::Canceled,
            Event::Noop => EventKind::Noop,
        }
    }

    /// The resource carried by this event, if it carries one with a skeleton.
    pub fn resource(&self) -> Option<&dyn Resource> {
        match self {
            Event::StartDocument(r) => Some(r),
            Event::EndDocument(r) | Event::EndSubDocument(r) | Event::EndGroup(r) => Some(r),
            Event::StartSubDocument(r) => Some(r),
            Event::StartGroup(r) => Some(r),
            Event::TextUnit(r) => Some(r),
            Event::DocumentPart(r) => Some(r),
            _ => None,
        }
    }

    /// The mutable resource carried by this event.
    pub fn resource_mut(&mut self) -> Option<&mut dyn Resource> {
        match self {
            Event::StartDocument(r) => Some(r),
            Event::EndDocument(r) | Event::EndSubDocument(r) | Event::EndGroup(r) => Some(r),
            Event::StartSubDocument(r) => Some(r),
            Event::StartGroup(r) => Some(r),
            Event::TextUnit(r) => Some(r),
            Event::DocumentPart(r) => Some(r),
            _ => None,
        }
    }

    /// Get the text unit if this is a text-unit event.
    pub fn text_unit(&self) -> Option<&TextUnit> {
        match self {
            Event::TextUnit(tu) => Some(tu),
            _ => None,
        }
    }

    /// Get the mutable text unit if this is a text-unit event.
    pub fn text_unit_mut(&mut self) -> Option<&mut TextUnit> {
        match self {
            Event::TextUnit(tu) => Some(tu),
            _ => None,
        }
    }

    /// Get the raw document if this is a raw-document event.
    pub fn raw_document(&self) -> Option<&RawDocument> {
        match self {
            Event::RawDocument(raw) => Some(raw),
            _ => None,
        }
    }

    /// Check if this is the no-op event.
    pub fn is_noop(&self) -> bool {
        matches!(self, Event::Noop)
    }

    /// Check if this event carries document content (units, parts, groups).
    pub fn has_content(&self) -> bool {
        matches!(
            self,
            Event::TextUnit(_)
                | Event::DocumentPart(_)
                | Event::StartGroup(_)
                | Event::EndGroup(_)
                | Event::StartSubDocument(_)
                | Event::EndSubDocument(_)
        )
    }

    /// Check if this is a document boundary event.
    pub fn is_document_boundary(&self) -> bool {
        matches!(self, Event::StartDocument(_) | Event::EndDocument(_))
    }

    /// Check if this is a batch or batch-item boundary event.
    pub fn is_batch_boundary(&self) -> bool {
        matches!(
            self,
            Event::StartBatch | Event::EndBatch | Event::StartBatchItem | Event::EndBatchItem
        )
    }
}
