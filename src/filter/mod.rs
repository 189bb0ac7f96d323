//! Filters read documents into events; filter writers rebuild them.
//!
//! A [`Filter`] turns a [`RawDocument`] into a stream of events. Its
//! [`FilterWriter`] consumes the (possibly modified) events and writes the
//! reconstructed document. Filter configurations are registered in a
//! [`FilterRegistry`] under a format identifier.
//!
//! # Example
//!
//! ```
//! use transkel::filter::FilterRegistry;
//! use transkel::model::{LocaleId, RawDocument};
//!
//! fn main() -> transkel::Result<()> {
//!     let registry = FilterRegistry::with_defaults();
//!     let mut filter = registry.create("line")?;
//!
//!     let raw = RawDocument::from_text("Hello\nWorld\n", LocaleId::new("en")?, "line");
//!     filter.open(&raw)?;
//!     let mut units = 0;
//!     while filter.has_next() {
//!         if filter.next()?.text_unit().is_some() {
//!             units += 1;
//!         }
//!     }
//!     filter.close();
//!     assert_eq!(units, 2);
//!     Ok(())
//! }
//! ```

pub mod encoding;
mod line;
mod skeleton_writer;

pub use line::{LineFilter, LineFilterParameters};
pub use skeleton_writer::{DefaultEncoder, Encoder, EncoderContext, SkeletonWriter};

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::diagnostic::Diagnostic;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::model::{LocaleId, RawDocument};
use crate::pipeline::OutputTarget;

/// Reads a document and emits its events.
pub trait Filter {
    /// Name of the filter.
    fn name(&self) -> &str;

    /// Open a document. Any previously open document is closed first.
    fn open(&mut self, input: &RawDocument) -> Result<()>;

    /// Whether more events are available.
    fn has_next(&self) -> bool;

    /// The next event.
    fn next(&mut self) -> Result<Event>;

    /// Close the current document.
    fn close(&mut self);

    /// Stop emitting events: the next event is [`Event::Canceled`].
    fn cancel(&mut self);

    /// Current parameters, as JSON.
    fn parameters(&self) -> Value;

    /// Apply parameters given as JSON.
    fn set_parameters(&mut self, parameters: &Value) -> Result<()>;

    /// Create the writer able to rebuild documents read by this filter.
    fn create_writer(&self) -> Box<dyn FilterWriter>;
}

/// Rebuilds a document from its events.
pub trait FilterWriter {
    /// Name of the writer.
    fn name(&self) -> &str;

    /// Set the output, the output locale and an optional output encoding
    /// (defaults to the input encoding).
    fn create(
        &mut self,
        output: OutputTarget,
        locale: Option<LocaleId>,
        encoding: Option<String>,
    ) -> Result<()>;

    /// Write one event.
    fn write_event(&mut self, event: &Event) -> Result<()>;

    /// Flush and release the output.
    fn close(&mut self) -> Result<()>;

    /// Diagnostics found since the last call.
    fn take_diagnostics(&mut self) -> Vec<Diagnostic>;
}

/// Constructor of a filter.
pub type FilterFactory = Arc<dyn Fn() -> Box<dyn Filter> + Send + Sync>;

/// A named filter configuration: a filter plus its parameters.
#[derive(Clone)]
pub struct FilterConfiguration {
    /// Configuration id (the format identifier of batch items)
    pub id: String,

    /// Short description
    pub description: String,

    /// File extensions handled, lowercase without dot
    pub extensions: Vec<String>,

    /// Parameters applied to each created filter
    pub parameters: Value,

    factory: FilterFactory,
}

impl FilterConfiguration {
    /// Create a configuration.
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        factory: FilterFactory,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            extensions: Vec::new(),
            parameters: Value::Null,
            factory,
        }
    }

    /// Set the handled file extensions.
    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|e| e.to_lowercase()).collect();
        self
    }

    /// Set the parameters.
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }
}

impl fmt::Debug for FilterConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterConfiguration")
            .field("id", &self.id)
            .field("extensions", &self.extensions)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// Filter configurations keyed by id and file extension.
#[derive(Debug, Clone, Default)]
pub struct FilterRegistry {
    configurations: HashMap<String, FilterConfiguration>,
    by_extension: HashMap<String, String>,
}

impl FilterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in configurations (`line`, `line-codes`).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            FilterConfiguration::new(
                "line",
                "Plain text, one text unit per non-blank line",
                Arc::new(line_filter),
            )
            .with_extensions(&["txt"]),
        );
        registry.register(
            FilterConfiguration::new(
                "line-codes",
                "Plain text with <tag> markup kept as inline codes",
                Arc::new(line_filter),
            )
            .with_parameters(LineFilterParameters::with_markup_codes().to_value()),
        );
        registry
    }

    /// Register a configuration, replacing any with the same id.
    pub fn register(&mut self, configuration: FilterConfiguration) {
        for ext in &configuration.extensions {
            self.by_extension
                .insert(ext.clone(), configuration.id.clone());
        }
        self.configurations
            .insert(configuration.id.clone(), configuration);
    }

    /// Get a configuration by id.
    pub fn get(&self, id: &str) -> Option<&FilterConfiguration> {
        self.configurations.get(id)
    }

    /// Get the configuration handling a file extension.
    pub fn get_by_extension(&self, ext: &str) -> Option<&FilterConfiguration> {
        let ext = ext.trim_start_matches('.').to_lowercase();
        self.by_extension
            .get(&ext)
            .and_then(|id| self.configurations.get(id))
    }

    /// Get the configuration for a file, by its extension.
    pub fn get_for_path(&self, path: &Path) -> Option<&FilterConfiguration> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| self.get_by_extension(e))
    }

    /// Configuration ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.configurations.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over the configurations, sorted by id.
    pub fn configurations(&self) -> Vec<&FilterConfiguration> {
        let mut configs: Vec<_> = self.configurations.values().collect();
        configs.sort_by(|a, b| a.id.cmp(&b.id));
        configs
    }

    /// Create a filter for a configuration, with its parameters applied.
    pub fn create(&self, id: &str) -> Result<Box<dyn Filter>> {
        let configuration = self
            .configurations
            .get(id)
            .ok_or_else(|| Error::UnknownFilter(id.to_string()))?;
        let mut filter = (configuration.factory)();
        if !configuration.parameters.is_null() {
            filter.set_parameters(&configuration.parameters)?;
        }
        Ok(filter)
    }

    /// Create the writer for a configuration.
    pub fn create_writer(&self, id: &str) -> Result<Box<dyn FilterWriter>> {
        Ok(self.create(id)?.create_writer())
    }
}

fn line_filter() -> Box<dyn Filter> {
    Box::new(LineFilter::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_defaults() {
        let registry = FilterRegistry::with_defaults();
        assert_eq!(registry.ids(), vec!["line", "line-codes"]);
        assert_eq!(registry.get_by_extension(".TXT").unwrap().id, "line");
        assert_eq!(
            registry.get_for_path(Path::new("notes/readme.txt")).unwrap().id,
            "line"
        );
        assert!(registry.get_by_extension("xml").is_none());
    }

    #[test]
    fn test_unknown_filter() {
        let registry = FilterRegistry::with_defaults();
        assert!(matches!(
            registry.create("xliff").err(),
            Some(Error::UnknownFilter(_))
        ));
    }

    #[test]
    fn test_configuration_parameters_applied() {
        let registry = FilterRegistry::with_defaults();
        let filter = registry.create("line-codes").unwrap();
        assert!(filter.parameters()["code_pattern"].is_string());
        let filter = registry.create("line").unwrap();
        assert!(filter.parameters()["code_pattern"].is_null());
    }
}
