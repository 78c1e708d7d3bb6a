//! Per-request logging context.

use std::sync::Arc;

use parking_lot::Mutex;

/// State carried by one request for the duration of its handling.
///
/// The correlation identifier is fixed when the context is created; the
/// trace middleware creates one per request with the next counter value.
/// Annotations are appended by handlers and read back when the completion
/// line is written. Clones share the annotation list, which is how the
/// middleware sees what a handler attached to the copy it was given.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    id: Option<u64>,
    annotations: Arc<Mutex<Vec<String>>>,
}

impl RequestContext {
    /// A context with no correlation identifier. Context-aware log calls
    /// made with it are emitted unmodified.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_correlation_id(id: u64) -> Self {
        Self { id: Some(id), annotations: Arc::default() }
    }

    pub fn correlation_id(&self) -> Option<u64> {
        self.id
    }

    /// Attaches a non-fatal note (typically an error a handler recovered
    /// from) to be reported in the completion line's `comment` field.
    pub fn annotate(&self, note: impl Into<String>) {
        self.annotations.lock().push(note.into());
    }

    pub fn annotations(&self) -> Vec<String> {
        self.annotations.lock().clone()
    }

    /// All annotations rendered as one string, `""` when there are none.
    ///
    /// ```rust
    /// let ctx = reqlog::RequestContext::new();
    /// ctx.annotate("cache miss");
    /// ctx.annotate("upstream slow");
    /// assert_eq!(ctx.comment(), "Error #01: cache miss\nError #02: upstream slow");
    /// ```
    pub fn comment(&self) -> String {
        self.annotations
            .lock()
            .iter()
            .enumerate()
            .map(|(i, note)| format!("Error #{:02}: {note}", i + 1))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
