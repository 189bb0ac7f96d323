//! Static step registry and serialized pipeline configurations.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use super::{Pipeline, Step};
use crate::error::{Error, Result};
use crate::steps::{EventLogStep, EventsWriterStep, FilterEventsStep, PseudoTranslateStep};

/// Constructor of a step.
pub type StepFactory = fn() -> Box<dyn Step>;

/// A registered step.
#[derive(Debug, Clone)]
pub struct StepEntry {
    /// Stable step identifier
    pub id: &'static str,
    /// Short description
    pub description: &'static str,
    /// Constructor
    pub factory: StepFactory,
}

/// Maps stable step identifiers to constructors.
///
/// Steps are resolved when a pipeline is built, so an unknown identifier is
/// reported before any document is processed.
#[derive(Debug, Clone, Default)]
pub struct StepRegistry {
    entries: BTreeMap<&'static str, StepEntry>,
}

impl StepRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in steps.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            FilterEventsStep::ID,
            "Read documents through their filter and emit their events",
            || Box::new(FilterEventsStep::new()),
        );
        registry.register(
            EventsWriterStep::ID,
            "Rebuild documents from their events and write them out",
            || Box::new(EventsWriterStep::new()),
        );
        registry.register(
            PseudoTranslateStep::ID,
            "Fill targets with a pseudo-translation of the source",
            || Box::new(PseudoTranslateStep::new()),
        );
        registry.register(
            EventLogStep::ID,
            "Log every event going through the pipeline",
            || Box::new(EventLogStep::new()),
        );
        registry
    }

    /// Register a step constructor, replacing any entry with the same id.
    pub fn register(&mut self, id: &'static str, description: &'static str, factory: StepFactory) {
        self.entries.insert(
            id,
            StepEntry {
                id,
                description,
                factory,
            },
        );
    }

    /// Check whether a step id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Iterate over the registered steps, sorted by id.
    pub fn entries(&self) -> impl Iterator<Item = &StepEntry> {
        self.entries.values()
    }

    /// Build a step and apply its parameters (`null` keeps the defaults).
    pub fn create(&self, id: &str, parameters: &Value) -> Result<Box<dyn Step>> {
        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| Error::UnknownStep(id.to_string()))?;
        let mut step = (entry.factory)();
        if !parameters.is_null() {
            step.set_parameters(parameters)?;
        }
        Ok(step)
    }

    /// Build a pipeline from a configuration.
    pub fn build_pipeline(&self, config: &PipelineConfig) -> Result<Pipeline> {
        let mut pipeline = Pipeline::new(config.id.clone());
        for step in &config.steps {
            pipeline.add_step(self.create(&step.id, &step.parameters)?)?;
        }
        Ok(pipeline)
    }
}

/// One step of a pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    /// Registered step id
    pub id: String,

    /// Step parameters
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub parameters: Value,
}

impl StepConfig {
    /// Create a step configuration with default parameters.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parameters: Value::Null,
        }
    }

    /// Set the parameters.
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }
}

/// An ordered list of step ids with their parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline id
    pub id: String,

    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Steps, in chain order
    pub steps: Vec<StepConfig>,
}

impl PipelineConfig {
    /// Create an empty configuration.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
            steps: Vec::new(),
        }
    }

    /// Append a step.
    pub fn with_step(mut self, step: StepConfig) -> Self {
        self.steps.push(step);
        self
    }

    /// The classic extraction/merge round trip: read, then write back.
    pub fn round_trip() -> Self {
        Self::new("round-trip")
            .with_step(StepConfig::new(FilterEventsStep::ID))
            .with_step(StepConfig::new(EventsWriterStep::ID))
    }

    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serialize the configuration as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_defaults() {
        let registry = StepRegistry::with_defaults();
        let ids: Vec<_> = registry.entries().map(|e| e.id).collect();
        assert_eq!(
            ids,
            vec!["event-log", "events-writer", "filter-events", "pseudo-translate"]
        );
        assert!(registry.contains("pseudo-translate"));
    }

    #[test]
    fn test_unknown_step() {
        let registry = StepRegistry::with_defaults();
        let err = registry.create("segmentation", &Value::Null).err().unwrap();
        assert!(matches!(err, Error::UnknownStep(ref id) if id == "segmentation"));
    }

    #[test]
    fn test_build_pipeline_from_json() {
        let config = PipelineConfig::from_json(
            r#"{
                "id": "pseudo",
                "steps": [
                    {"id": "filter-events"},
                    {"id": "pseudo-translate", "parameters": {"prefix": "[", "suffix": "]"}},
                    {"id": "events-writer"}
                ]
            }"#,
        )
        .unwrap();

        let pipeline = StepRegistry::with_defaults().build_pipeline(&config).unwrap();
        assert_eq!(pipeline.id(), "pseudo");
        assert_eq!(
            pipeline.step_names(),
            vec!["filter-events", "pseudo-translate", "events-writer"]
        );
    }

    #[test]
    fn test_bad_parameters_rejected() {
        let registry = StepRegistry::with_defaults();
        let result = registry.create("pseudo-translate", &json!({"prefix": 42}));
        assert!(matches!(result, Err(Error::InvalidParameters { .. })));
    }

    #[test]
    fn test_config_round_trip() {
        let config = PipelineConfig::round_trip();
        let json = config.to_json().unwrap();
        assert_eq!(PipelineConfig::from_json(&json).unwrap(), config);
    }
}
