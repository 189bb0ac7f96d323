//! Per-run context handed to every step call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{BatchItem, DocumentData};
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::filter::FilterRegistry;

/// Cooperative cancellation flag, shareable across threads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a previous cancellation request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Everything a step may consult while handling an event.
///
/// The context is built by the caller for each run and passed explicitly;
/// steps never store it.
#[derive(Debug)]
pub struct PipelineContext {
    filters: Arc<FilterRegistry>,
    item: Option<BatchItem>,
    item_index: usize,
    diagnostics: Diagnostics,
    cancel: CancelToken,
}

impl PipelineContext {
    /// Create a context with no current batch item.
    pub fn new(filters: Arc<FilterRegistry>) -> Self {
        Self {
            filters,
            item: None,
            item_index: 0,
            diagnostics: Diagnostics::new(),
            cancel: CancelToken::new(),
        }
    }

    /// Set the current batch item and its position in the batch.
    pub fn with_item(mut self, item: BatchItem, index: usize) -> Self {
        self.item = Some(item);
        self.item_index = index;
        self
    }

    /// Share a cancellation token with the caller.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Registered filter configurations.
    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    /// The current batch item.
    pub fn item(&self) -> Option<&BatchItem> {
        self.item.as_ref()
    }

    /// Position of the current item in the batch.
    pub fn item_index(&self) -> usize {
        self.item_index
    }

    /// Input document `index` of the current item.
    pub fn document(&self, index: usize) -> Option<&DocumentData> {
        self.item.as_ref().and_then(|item| item.document(index))
    }

    /// Diagnostic sink for the current run.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Record a diagnostic.
    pub fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.report(diagnostic);
    }

    /// The cancellation token.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Check whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
