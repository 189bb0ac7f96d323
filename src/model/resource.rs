//! Resources carried by events.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{LocaleId, Properties, Skeleton, TextUnit};
use crate::error::Result;

/// Behaviour shared by every resource carried by an event.
pub trait Resource {
    /// Identifier, unique within the document.
    fn id(&self) -> &str;

    /// Optional resource name.
    fn name(&self) -> Option<&str> {
        None
    }

    /// The skeleton, if any.
    fn skeleton(&self) -> Option<&Skeleton>;

    /// The mutable skeleton slot.
    fn skeleton_mut(&mut self) -> &mut Option<Skeleton>;

    /// Resource-level properties.
    fn properties(&self) -> &Properties;

    /// Whether the resource is only rendered where something refers to it.
    fn is_referent(&self) -> bool {
        false
    }
}

/// Start of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartDocument {
    /// Document identifier
    pub id: String,

    /// Document name (usually the input file name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Source locale
    pub locale: LocaleId,

    /// Encoding the input was decoded with
    pub encoding: String,

    /// The input started with a byte order mark
    #[serde(default)]
    pub has_bom: bool,

    /// Line break used by the input
    pub line_break: String,

    /// Identifier of the filter configuration that produced the events
    pub filter_id: String,

    /// The document holds source and target content (bilingual formats)
    #[serde(default)]
    pub multilingual: bool,

    /// MIME type of the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Skeleton preceding the first content event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skeleton: Option<Skeleton>,

    /// Document properties
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

impl StartDocument {
    /// Create a start-document resource with UTF-8 encoding and `\n` line breaks.
    pub fn new(id: impl Into<String>, locale: LocaleId, filter_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            locale,
            encoding: "UTF-8".to_string(),
            has_bom: false,
            line_break: "\n".to_string(),
            filter_id: filter_id.into(),
            multilingual: false,
            mime_type: None,
            skeleton: None,
            properties: Properties::new(),
        }
    }
}

/// Start of an embedded sub-document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartSubDocument {
    /// Sub-document identifier
    pub id: String,

    /// Id of the parent document
    pub parent_id: String,

    /// Sub-document name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Skeleton preceding the sub-document content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skeleton: Option<Skeleton>,

    /// Sub-document properties
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

/// Start of a group of content (section, list, note...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartGroup {
    /// Group identifier
    pub id: String,

    /// Id of the enclosing group or document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Group name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Group type (e.g. `note`, `list`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_type: Option<String>,

    /// The group is rendered where something refers to it
    #[serde(default)]
    pub referent: bool,

    /// Skeleton opening the group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skeleton: Option<Skeleton>,

    /// Group properties
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

impl StartGroup {
    /// Create a group.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            name: None,
            group_type: None,
            referent: false,
            skeleton: None,
            properties: Properties::new(),
        }
    }
}

/// End of a document, sub-document or group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ending {
    /// Identifier of the ending itself
    pub id: String,

    /// Skeleton closing the construct
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skeleton: Option<Skeleton>,

    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    properties: Properties,
}

impl Ending {
    /// Create an ending.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            skeleton: None,
            properties: Properties::new(),
        }
    }

    /// Set the skeleton.
    pub fn with_skeleton(mut self, skeleton: Skeleton) -> Self {
        self.skeleton = Some(skeleton);
        self
    }
}

/// A non-translatable chunk of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPart {
    /// Identifier
    pub id: String,

    /// Optional name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// The part is rendered where something refers to it
    #[serde(default)]
    pub referent: bool,

    /// Literal bytes of the chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skeleton: Option<Skeleton>,

    /// Properties, possibly referenced by skeleton placeholders
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

impl DocumentPart {
    /// Create a document part with a skeleton.
    pub fn new(id: impl Into<String>, skeleton: Skeleton) -> Self {
        Self {
            id: id.into(),
            name: None,
            referent: false,
            skeleton: Some(skeleton),
            properties: Properties::new(),
        }
    }
}

/// Application-defined payload travelling through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomEvent {
    /// Payload type, chosen by the producing step
    pub custom_type: String,

    /// Payload data
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Where a raw document's content comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum DocumentInput {
    /// A file on disk
    Path(PathBuf),
    /// In-memory text
    Text(String),
    /// In-memory bytes
    Bytes(Vec<u8>),
}

/// An input document not yet parsed by a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    /// Content source
    pub input: DocumentInput,

    /// Declared encoding of the content
    #[serde(default = "default_encoding")]
    pub encoding: String,

    /// Source locale
    pub source_locale: LocaleId,

    /// Target locale, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_locale: Option<LocaleId>,

    /// Filter configuration used to read the content
    pub filter_config_id: String,
}

fn default_encoding() -> String {
    "UTF-8".to_string()
}

impl RawDocument {
    /// Create a raw document from in-memory text.
    pub fn from_text(text: impl Into<String>, source_locale: LocaleId, filter_config_id: impl Into<String>) -> Self {
        Self::new(DocumentInput::Text(text.into()), source_locale, filter_config_id)
    }

    /// Create a raw document from a file.
    pub fn from_path(path: impl Into<PathBuf>, source_locale: LocaleId, filter_config_id: impl Into<String>) -> Self {
        Self::new(DocumentInput::Path(path.into()), source_locale, filter_config_id)
    }

    /// Create a raw document.
    pub fn new(input: DocumentInput, source_locale: LocaleId, filter_config_id: impl Into<String>) -> Self {
        Self {
            input,
            encoding: default_encoding(),
            source_locale,
            target_locale: None,
            filter_config_id: filter_config_id.into(),
        }
    }

    /// Set the declared encoding.
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Set the target locale.
    pub fn with_target_locale(mut self, locale: LocaleId) -> Self {
        self.target_locale = Some(locale);
        self
    }

    /// Read the whole content as bytes.
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        match &self.input {
            DocumentInput::Path(path) => Ok(std::fs::read(path)?),
            DocumentInput::Text(text) => Ok(text.as_bytes().to_vec()),
            DocumentInput::Bytes(bytes) => Ok(bytes.clone()),
        }
    }

    /// A short human-readable name for reports.
    pub fn display_name(&self) -> String {
        match &self.input {
            DocumentInput::Path(path) => path.display().to_string(),
            DocumentInput::Text(_) => "<text>".to_string(),
            DocumentInput::Bytes(_) => "<bytes>".to_string(),
        }
    }
}

macro_rules! impl_resource {
    ($ty:ty, referent = $referent:expr) => {
        impl Resource for $ty {
            fn id(&self) -> &str {
                &self.id
            }

            fn name(&self) -> Option<&str> {
                self.name.as_deref()
            }

            fn skeleton(&self) -> Option<&Skeleton> {
                self.skeleton.as_ref()
            }

            fn skeleton_mut(&mut self) -> &mut Option<Skeleton> {
                &mut self.skeleton
            }

            fn properties(&self) -> &Properties {
                &self.properties
            }

            fn is_referent(&self) -> bool {
                let is_referent: fn(&$ty) -> bool = $referent;
                is_referent(self)
            }
        }
    };
}

impl_resource!(StartDocument, referent = |_| false);
impl_resource!(StartSubDocument, referent = |_| false);
impl_resource!(StartGroup, referent = |r| r.referent);
impl_resource!(DocumentPart, referent = |r| r.referent);
impl_resource!(TextUnit, referent = |r| r.referent);

impl Resource for Ending {
    fn id(&self) -> &str {
        &self.id
    }

    fn skeleton(&self) -> Option<&Skeleton> {
        self.skeleton.as_ref()
    }

    fn skeleton_mut(&mut self) -> &mut Option<Skeleton> {
        &mut self.skeleton
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }
}
