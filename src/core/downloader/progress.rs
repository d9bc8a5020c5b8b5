// ─── Progress ───
// Per-category counters shared by concurrent download tasks.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::warn;

/// Which counter a progress update belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressCategory {
    /// Client jar, libraries, natives, asset index, logging config.
    Core,
    /// Content-addressed asset objects.
    Resources,
    /// Loader post-install processors.
    Processors,
}

/// Payload handed to the progress sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    pub category: ProgressCategory,
    pub label: String,
    pub completed: usize,
    pub total: usize,
}

/// Receives progress from the engine's worker tasks. Implementations must
/// marshal to their own display thread; no thread affinity is guaranteed.
pub trait ProgressSink: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        self(update)
    }
}

/// Sink that drops every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _update: ProgressUpdate) {}
}

/// Snapshot of one category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryState {
    pub completed: usize,
    pub total: usize,
    pub current_label: String,
}

/// Snapshot of both download categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DownloadState {
    pub core: CategoryState,
    pub resources: CategoryState,
}

/// Monotonic counter for one category.
///
/// Increment and report happen under one lock so the sink never observes
/// `completed` going backwards.
pub struct ProgressTracker {
    category: ProgressCategory,
    sink: Arc<dyn ProgressSink>,
    state: Mutex<CategoryState>,
}

impl ProgressTracker {
    pub fn new(category: ProgressCategory, total: usize, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            category,
            sink,
            state: Mutex::new(CategoryState {
                completed: 0,
                total,
                current_label: String::new(),
            }),
        }
    }

    pub fn category(&self) -> ProgressCategory {
        self.category
    }

    /// Start a new run with a fresh total.
    pub fn reset(&self, total: usize) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = CategoryState {
            completed: 0,
            total,
            current_label: String::new(),
        };
    }

    /// Record one finished unit of work and notify the sink.
    pub fn complete(&self, label: &str) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.completed < state.total {
            state.completed += 1;
        } else {
            warn!(
                "{:?} progress overflow on {} ({} of {})",
                self.category, label, state.completed, state.total
            );
        }
        state.current_label = label.to_string();
        self.sink.report(ProgressUpdate {
            category: self.category,
            label: label.to_string(),
            completed: state.completed,
            total: state.total,
        });
    }

    /// Report a unit of work that is about to start (`position` is 1-based).
    pub fn starting(&self, label: &str, position: usize) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.completed = position.min(state.total).max(state.completed);
        state.current_label = label.to_string();
        self.sink.report(ProgressUpdate {
            category: self.category,
            label: label.to_string(),
            completed: state.completed,
            total: state.total,
        });
    }

    pub fn snapshot(&self) -> CategoryState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("category", &self.category)
            .field("state", &self.snapshot())
            .finish()
    }
}
