//! Batch items and output targets.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::model::{DocumentInput, LocaleId, RawDocument};

/// An in-memory output shared between the caller and the writer.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer(Rc<RefCell<Vec<u8>>>);

impl OutputBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the bytes written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.0.borrow().clone()
    }

    /// The bytes written so far, decoded as UTF-8 (lossy).
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    /// Discard the content.
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Where a writer sends its output.
#[derive(Debug, Clone)]
pub enum OutputTarget {
    /// A file, created (or truncated) when the writer starts
    Path(PathBuf),
    /// An in-memory buffer
    Buffer(OutputBuffer),
}

impl OutputTarget {
    /// Open the target for writing.
    pub fn open(&self) -> Result<Box<dyn Write>> {
        match self {
            OutputTarget::Path(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                Ok(Box::new(BufWriter::new(File::create(path)?)))
            }
            OutputTarget::Buffer(buffer) => {
                buffer.clear();
                Ok(Box::new(buffer.clone()))
            }
        }
    }

    /// A short human-readable name for reports.
    pub fn display_name(&self) -> String {
        match self {
            OutputTarget::Path(path) => path.display().to_string(),
            OutputTarget::Buffer(_) => "<buffer>".to_string(),
        }
    }
}

/// One input document of a batch item, with its optional output.
#[derive(Debug, Clone)]
pub struct DocumentData {
    /// The input
    pub raw: RawDocument,

    /// Where to write the output, if this input produces one
    pub output: Option<OutputTarget>,

    /// Encoding of the output (defaults to the input encoding)
    pub output_encoding: Option<String>,
}

impl DocumentData {
    /// Create document data without output.
    pub fn new(raw: RawDocument) -> Self {
        Self {
            raw,
            output: None,
            output_encoding: None,
        }
    }

    /// Set the output target.
    pub fn with_output(mut self, output: OutputTarget) -> Self {
        self.output = Some(output);
        self
    }

    /// Set the output encoding.
    pub fn with_output_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.output_encoding = Some(encoding.into());
        self
    }
}

/// One unit of work: one or more parallel input documents.
///
/// The first document is the primary input; it is the one sent into the
/// pipeline as a raw-document event.
#[derive(Debug, Clone)]
pub struct BatchItem {
    /// Input documents, primary first
    pub documents: Vec<DocumentData>,
}

impl BatchItem {
    /// Create an item with a single input.
    pub fn new(primary: DocumentData) -> Self {
        Self {
            documents: vec![primary],
        }
    }

    /// Add a secondary input.
    pub fn with_secondary(mut self, document: DocumentData) -> Self {
        self.documents.push(document);
        self
    }

    /// The primary input.
    pub fn primary(&self) -> Option<&DocumentData> {
        self.documents.first()
    }

    /// Get an input by index.
    pub fn document(&self, index: usize) -> Option<&DocumentData> {
        self.documents.get(index)
    }

    /// A short human-readable name for reports.
    pub fn display_name(&self) -> String {
        self.primary()
            .map(|d| d.raw.display_name())
            .unwrap_or_else(|| "<empty>".to_string())
    }
}

/// Serialized description of one input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDescriptor {
    /// Path of the input file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<PathBuf>,

    /// Inline input text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Declared encoding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,

    /// Source locale
    pub source_locale: LocaleId,

    /// Target locale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_locale: Option<LocaleId>,
}

impl InputDescriptor {
    fn into_raw(self, format_config_id: &str) -> Result<RawDocument> {
        let input = match (self.uri, self.text) {
            (Some(uri), None) => DocumentInput::Path(uri),
            (None, Some(text)) => DocumentInput::Text(text),
            _ => {
                return Err(Error::invalid_parameters(
                    "batch item",
                    "each input needs exactly one of 'uri' or 'text'",
                ))
            }
        };
        let mut raw = RawDocument::new(input, self.source_locale, format_config_id);
        if let Some(encoding) = self.encoding {
            raw = raw.with_encoding(encoding);
        }
        raw.target_locale = self.target_locale;
        Ok(raw)
    }
}

/// Serialized description of a batch item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItemDescriptor {
    /// The primary input
    pub primary_input: InputDescriptor,

    /// Filter configuration for all inputs
    pub format_config_id: String,

    /// Additional parallel inputs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secondary_inputs: Vec<InputDescriptor>,

    /// Output file for the primary input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_uri: Option<PathBuf>,

    /// Output encoding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_encoding: Option<String>,
}

impl BatchItemDescriptor {
    /// Build the batch item described.
    pub fn into_batch_item(self) -> Result<BatchItem> {
        let format = self.format_config_id;
        let mut primary = DocumentData::new(self.primary_input.into_raw(&format)?);
        primary.output = self.output_uri.map(OutputTarget::Path);
        primary.output_encoding = self.output_encoding;

        let mut item = BatchItem::new(primary);
        for secondary in self.secondary_inputs {
            item = item.with_secondary(DocumentData::new(secondary.into_raw(&format)?));
        }
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_buffer_shared() {
        let buffer = OutputBuffer::new();
        let target = OutputTarget::Buffer(buffer.clone());
        {
            let mut out = target.open().unwrap();
            out.write_all(b"hello").unwrap();
        }
        assert_eq!(buffer.to_string_lossy(), "hello");
    }

    #[test]
    fn test_output_path_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/sub/file.txt");
        {
            let mut out = OutputTarget::Path(path.clone()).open().unwrap();
            out.write_all(b"x").unwrap();
            out.flush().unwrap();
        }
        assert_eq!(std::fs::read(&path).unwrap(), b"x");
    }

    #[test]
    fn test_descriptor_into_item() {
        let json = r#"{
            "primary_input": {"text": "Hello", "source_locale": "en", "target_locale": "fr"},
            "format_config_id": "line",
            "secondary_inputs": [{"text": "Bonjour", "source_locale": "fr"}],
            "output_uri": "out.txt",
            "output_encoding": "ISO-8859-1"
        }"#;
        let descriptor: BatchItemDescriptor = serde_json::from_str(json).unwrap();
        let item = descriptor.into_batch_item().unwrap();

        assert_eq!(item.documents.len(), 2);
        let primary = item.primary().unwrap();
        assert_eq!(primary.raw.filter_config_id, "line");
        assert_eq!(primary.raw.target_locale.as_ref().unwrap().as_str(), "fr");
        assert_eq!(primary.output_encoding.as_deref(), Some("ISO-8859-1"));
        assert!(matches!(primary.output, Some(OutputTarget::Path(_))));
        assert!(item.document(1).unwrap().output.is_none());
    }

    #[test]
    fn test_descriptor_needs_one_source() {
        let json = r#"{
            "primary_input": {"source_locale": "en"},
            "format_config_id": "line"
        }"#;
        let descriptor: BatchItemDescriptor = serde_json::from_str(json).unwrap();
        assert!(descriptor.into_batch_item().is_err());
    }
}
