//! Text and skeleton model.
//!
//! Translatable content lives in [`TextUnit`]s made of [`TextContainer`]s
//! and [`TextFragment`]s with inline [`Code`]s. Everything else in a document
//! is kept in [`Skeleton`]s, whose placeholders point back at resources so
//! the writer can rebuild the document from live state.

mod code;
mod container;
mod fragment;
mod locale;
mod property;
mod resource;
mod skeleton;
mod unit;

pub use code::{
    find_ref_markers, is_marker, make_property_ref_marker, make_ref_marker, Code, RefMarker,
    TagType, CHAR_BASE, MARKER_CLOSING, MARKER_ISOLATED, MARKER_OPENING, MARKER_PLACEHOLDER,
    REF_MARKER_END, REF_MARKER_SEP, REF_MARKER_START,
};
pub use container::{Part, Segment, TextContainer};
pub use fragment::TextFragment;
pub(crate) use fragment::Piece;
pub use locale::LocaleId;
pub use property::{Properties, Property, PropertyScope};
pub use resource::{
    CustomEvent, DocumentInput, DocumentPart, Ending, RawDocument, Resource, StartDocument,
    StartGroup, StartSubDocument,
};
pub use skeleton::{Placeholder, PlaceholderKind, Referent, Skeleton, SkeletonPart, SELF_REF};
pub use unit::TextUnit;
