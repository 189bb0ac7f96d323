//! Structured diagnostics for recoverable faults.
//!
//! Content round-trip problems (a target code with no source counterpart, a
//! reference that never resolves...) do not abort a batch item. The code that
//! detects them logs a warning and records a [`Diagnostic`] instead.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A recoverable problem, attached to the resource where it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity
    pub severity: Severity,

    /// Id of the resource concerned, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,

    /// Human-readable description
    pub message: String,
}

impl Diagnostic {
    /// Create a warning about a resource.
    pub fn warning(resource_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            resource_id: Some(resource_id.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource_id {
            Some(id) => write!(f, "{} [{}]: {}", self.severity, id, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Collects diagnostics for one batch item.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: RefCell<Vec<Diagnostic>>,
}

impl Diagnostics {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic, logging it at the matching level.
    pub fn report(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Info => info!("{}", diagnostic),
            Severity::Warning | Severity::Error => warn!("{}", diagnostic),
        }
        self.items.borrow_mut().push(diagnostic);
    }

    /// Record several diagnostics.
    pub fn extend(&self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.report(diagnostic);
        }
    }

    /// Number of recorded diagnostics.
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    /// Check if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Take all recorded diagnostics, leaving the sink empty.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.items.borrow_mut())
    }
}
