//! Batch execution.

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::{BatchItem, Pipeline, PipelineContext};
use crate::diagnostic::Diagnostic;
use crate::error::{Error, FaultKind, Result};
use crate::event::Event;
use crate::filter::FilterRegistry;

/// Outcome of one batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ItemOutcome {
    /// The item was fully processed
    Succeeded,
    /// The item stopped on a fatal fault
    Failed {
        /// Fault classification
        kind: FaultKind,
        /// Error message
        message: String,
    },
    /// The batch was cancelled before or while processing the item
    Cancelled,
}

impl ItemOutcome {
    fn from_error(error: &Error) -> Self {
        ItemOutcome::Failed {
            kind: error.fault_kind(),
            message: error.to_string(),
        }
    }
}

/// Report for one batch item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemReport {
    /// Position of the item in the batch
    pub index: usize,

    /// Name of the primary input
    pub name: String,

    /// Outcome
    #[serde(flatten)]
    pub outcome: ItemOutcome,

    /// Recoverable problems found while processing the item
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Overall status of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Every item succeeded
    Succeeded,
    /// At least one item failed
    PartialFailure,
    /// The batch was cancelled
    Cancelled,
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchStatus::Succeeded => write!(f, "succeeded"),
            BatchStatus::PartialFailure => write!(f, "partial failure"),
            BatchStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Overall status
    pub status: BatchStatus,

    /// One report per item, in batch order
    pub items: Vec<ItemReport>,

    /// When the batch started
    pub started: DateTime<Utc>,

    /// When the batch ended
    pub finished: DateTime<Utc>,
}

impl BatchReport {
    /// Number of items that succeeded.
    pub fn succeeded_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Succeeded))
    }

    /// Number of items that failed.
    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed { .. }))
    }

    /// Number of items not processed because of cancellation.
    pub fn cancelled_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Cancelled))
    }

    /// Check whether every item succeeded.
    pub fn is_success(&self) -> bool {
        self.status == BatchStatus::Succeeded
    }

    /// Duration of the batch in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        (self.finished - self.started).num_milliseconds()
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|i| pred(&i.outcome)).count()
    }
}

/// Runs a pipeline over a batch of items.
///
/// Every item is attempted: a fatal fault in one item is recorded against it
/// and the driver moves on to the next one.
pub struct PipelineDriver {
    pipeline: Pipeline,
    filters: Arc<FilterRegistry>,
    items: Vec<BatchItem>,
}

impl PipelineDriver {
    /// Create a driver for a pipeline.
    pub fn new(pipeline: Pipeline, filters: Arc<FilterRegistry>) -> Self {
        Self {
            pipeline,
            filters,
            items: Vec::new(),
        }
    }

    /// The driven pipeline.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// The mutable driven pipeline (to add observers or cancel).
    pub fn pipeline_mut(&mut self) -> &mut Pipeline {
        &mut self.pipeline
    }

    /// Add a batch item.
    pub fn add_item(&mut self, item: BatchItem) {
        self.items.push(item);
    }

    /// Remove all batch items.
    pub fn clear_items(&mut self) {
        self.items.clear();
    }

    /// The batch items.
    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    /// Number of parallel inputs each item must supply.
    pub fn input_count_requested(&self) -> usize {
        self.pipeline.input_count_requested()
    }

    /// Whether the pipeline writes an output for the given input.
    pub fn needs_output(&self, input_index: usize) -> bool {
        self.pipeline.needs_output(input_index)
    }

    /// Process every item of the batch.
    ///
    /// Only faults in the batch-level start and end events are returned as
    /// errors; item faults are recorded in the report.
    ///
    /// A cancellation only ends the batch it interrupted: the pipeline's
    /// token is cleared when the next batch starts.
    pub fn process_batch(&mut self) -> Result<BatchReport> {
        let started = Utc::now();
        let cancel = self.pipeline.cancel_token();
        cancel.reset();
        let batch_ctx = PipelineContext::new(self.filters.clone()).with_cancel_token(cancel.clone());

        info!(
            "starting batch of {} item(s) with pipeline '{}'",
            self.items.len(),
            self.pipeline.id()
        );
        self.pipeline.start_batch(&batch_ctx)?;

        let mut reports = Vec::with_capacity(self.items.len());
        for (index, item) in self.items.iter().enumerate() {
            let name = item.display_name();

            if cancel.is_cancelled() {
                reports.push(ItemReport {
                    index,
                    name,
                    outcome: ItemOutcome::Cancelled,
                    diagnostics: Vec::new(),
                });
                continue;
            }

            if let Err(e) = self.validate(item) {
                warn!("item {} ({}) rejected: {}", index + 1, name, e);
                reports.push(ItemReport {
                    index,
                    name,
                    outcome: ItemOutcome::from_error(&e),
                    diagnostics: Vec::new(),
                });
                continue;
            }

            info!("processing item {} ({})", index + 1, name);
            let ctx = PipelineContext::new(self.filters.clone())
                .with_item(item.clone(), index)
                .with_cancel_token(cancel.clone());

            let outcome = match self.pipeline.process_item(&ctx) {
                Ok(Event::Canceled) => ItemOutcome::Cancelled,
                Ok(_) => ItemOutcome::Succeeded,
                Err(e) => {
                    warn!("item {} ({}) failed: {}", index + 1, name, e);
                    ItemOutcome::from_error(&e)
                }
            };
            reports.push(ItemReport {
                index,
                name,
                outcome,
                diagnostics: ctx.diagnostics().take(),
            });
        }

        self.pipeline.finish_batch(&batch_ctx)?;
        self.pipeline.end_batch(&batch_ctx)?;

        let status = if reports.iter().any(|r| r.outcome == ItemOutcome::Cancelled) {
            BatchStatus::Cancelled
        } else if reports.iter().any(|r| matches!(r.outcome, ItemOutcome::Failed { .. })) {
            BatchStatus::PartialFailure
        } else {
            BatchStatus::Succeeded
        };
        info!("batch {}", status);

        Ok(BatchReport {
            status,
            items: reports,
            started,
            finished: Utc::now(),
        })
    }

    /// Check that an item supplies what the pipeline needs.
    fn validate(&self, item: &BatchItem) -> Result<()> {
        let requested = self.pipeline.input_count_requested();
        if item.documents.len() < requested {
            return Err(Error::MissingInput {
                supplied: item.documents.len(),
                requested,
            });
        }
        for (i, doc) in item.documents.iter().enumerate().take(requested) {
            if self.pipeline.needs_output(i) && doc.output.is_none() {
                return Err(Error::MissingOutput(i));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LocaleId, RawDocument};
    use crate::pipeline::DocumentData;

    fn item(text: &str) -> BatchItem {
        let raw = RawDocument::from_text(text, LocaleId::new("en").unwrap(), "line");
        BatchItem::new(DocumentData::new(raw))
    }

    #[test]
    fn test_empty_pipeline_batch() {
        let mut driver = PipelineDriver::new(
            Pipeline::new("empty"),
            Arc::new(FilterRegistry::with_defaults()),
        );
        driver.add_item(item("a"));
        driver.add_item(item("b"));

        let report = driver.process_batch().unwrap();
        assert_eq!(report.status, BatchStatus::Succeeded);
        assert_eq!(report.succeeded_count(), 2);
        assert!(report.duration_ms() >= 0);
    }

    #[test]
    fn test_report_serialization() {
        let report = BatchReport {
            status: BatchStatus::PartialFailure,
            items: vec![ItemReport {
                index: 1,
                name: "b.txt".to_string(),
                outcome: ItemOutcome::Failed {
                    kind: FaultKind::Malformed,
                    message: "bad".to_string(),
                },
                diagnostics: Vec::new(),
            }],
            started: Utc::now(),
            finished: Utc::now(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "partial_failure");
        assert_eq!(json["items"][0]["status"], "failed");
        assert_eq!(json["items"][0]["kind"], "malformed");
    }
}
