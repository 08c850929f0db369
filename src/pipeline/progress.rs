//! Progress tracking for pipeline runs.

use crate::core::error::{PipelineError, PipelineResult, Stage};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// A progress update event.
#[derive(Debug, Clone)]
pub enum ProgressUpdate {
    /// The run has started.
    Started,
    /// A stage has started.
    StageStarted {
        stage: Stage,
    },
    /// A stage has completed.
    StageCompleted {
        stage: Stage,
        duration_ms: u64,
    },
    /// The run has completed.
    Completed {
        total_duration_ms: u64,
    },
    /// A stage failed; the run is aborted.
    Failed {
        stage: Stage,
        kind: &'static str,
        message: String,
    },
}

/// Callback type for progress updates.
pub type ProgressCallback = Box<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Wall-clock time spent in one stage entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageTiming {
    /// Stage that ran.
    pub stage: Stage,
    /// Elapsed milliseconds (fractional).
    pub duration_ms: f64,
}

/// Tracks stage timings and reports them to an optional callback.
pub struct ProgressTracker {
    /// Start time.
    start_time: parking_lot::Mutex<Option<Instant>>,
    /// Completed stage entries, in order.
    timings: parking_lot::Mutex<Vec<StageTiming>>,
    /// Progress callback.
    callback: Option<Arc<ProgressCallback>>,
}

impl ProgressTracker {
    /// Create a new progress tracker.
    pub fn new() -> Self {
        Self {
            start_time: parking_lot::Mutex::new(None),
            timings: parking_lot::Mutex::new(Vec::new()),
            callback: None,
        }
    }

    /// Set a callback for progress updates.
    pub fn with_callback(mut self, callback: Option<Arc<ProgressCallback>>) -> Self {
        self.callback = callback;
        self
    }

    /// Start tracking.
    pub fn start(&self) {
        *self.start_time.lock() = Some(Instant::now());
        self.send_update(ProgressUpdate::Started);
    }

    /// Whether `start` has been called.
    pub fn is_started(&self) -> bool {
        self.start_time.lock().is_some()
    }

    /// Run `op` as `stage`, recording its duration or reporting its failure.
    pub fn track<T>(
        &self,
        stage: Stage,
        op: impl FnOnce() -> PipelineResult<T>,
    ) -> PipelineResult<T> {
        log::debug!("entering {} stage", stage);
        self.send_update(ProgressUpdate::StageStarted { stage });
        let started = Instant::now();

        match op() {
            Ok(value) => {
                let elapsed = started.elapsed();
                self.timings.lock().push(StageTiming {
                    stage,
                    duration_ms: elapsed.as_secs_f64() * 1000.0,
                });
                self.send_update(ProgressUpdate::StageCompleted {
                    stage,
                    duration_ms: elapsed.as_millis() as u64,
                });
                Ok(value)
            }
            Err(err) => {
                self.report_error(stage, &err);
                Err(err)
            }
        }
    }

    /// Report a failure in `stage`.
    pub fn report_error(&self, stage: Stage, err: &PipelineError) {
        self.send_update(ProgressUpdate::Failed {
            stage,
            kind: err.kind(),
            message: err.to_string(),
        });
    }

    /// Complete tracking.
    pub fn complete(&self) {
        self.send_update(ProgressUpdate::Completed {
            total_duration_ms: self.elapsed_ms() as u64,
        });
    }

    /// Milliseconds since `start`, or 0 if not started.
    pub fn elapsed_ms(&self) -> f64 {
        let start = *self.start_time.lock();
        start
            .map(|t| t.elapsed().as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }

    /// Timings recorded so far.
    pub fn timings(&self) -> Vec<StageTiming> {
        self.timings.lock().clone()
    }

    fn send_update(&self, update: ProgressUpdate) {
        if let Some(ref callback) = self.callback {
            callback(update);
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("timings", &self.timings.lock().len())
            .field("callback", &self.callback.as_ref().map(|_| "<callback>"))
            .finish()
    }
}
