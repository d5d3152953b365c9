//! Progress reporting for backup and restore operations
//!
//! A [`ProgressReporter`] owns a single "current state" cell. The running
//! operation is the only writer; any number of observers may read it
//! concurrently. Observers always see the latest value, so a slow observer
//! can miss intermediate stages but never the terminal one, which is final
//! until the next operation begins.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

/// Named phase of an export or import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressStage {
    #[default]
    Idle,
    Preparing,
    Reading,
    Processing,
    Encrypting,
    Writing,
    Restoring,
    Validating,
    Cleanup,
    WritingDatabase,
    Completed,
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Preparing => "Preparing",
            Self::Reading => "Reading",
            Self::Processing => "Processing",
            Self::Encrypting => "Encrypting",
            Self::Writing => "Writing",
            Self::Restoring => "Restoring",
            Self::Validating => "Validating",
            Self::Cleanup => "Cleanup",
            Self::WritingDatabase => "Writing database",
            Self::Completed => "Completed",
        };
        write!(f, "{}", name)
    }
}

/// Snapshot of an operation's progress
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ProgressState {
    pub stage: ProgressStage,
    /// 0..=100, non-decreasing within an operation
    pub percent: u8,
    pub current_item: usize,
    pub total_items: usize,
    pub message: String,
    pub is_completed: bool,
    /// Set iff the operation failed
    pub error: Option<String>,
    /// Linear extrapolation from elapsed time; an estimate only
    pub estimated_time_left_ms: u64,
}

impl ProgressState {
    /// Whether this is a failed terminal state
    pub fn is_failed(&self) -> bool {
        self.is_completed && self.error.is_some()
    }
}

/// Synchronous receiver of every progress emission, in order
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, state: &ProgressState);
}

struct Cell {
    state: ProgressState,
    generation: u64,
    started_at: Instant,
}

struct Shared {
    cell: Mutex<Cell>,
    changed: Condvar,
    sinks: Mutex<Vec<Arc<dyn ProgressSink>>>,
}

impl Shared {
    fn cell(&self) -> MutexGuard<'_, Cell> {
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Publishes the progress of one operation at a time
///
/// Cloning yields another handle to the same cell.
#[derive(Clone)]
pub struct ProgressReporter {
    shared: Arc<Shared>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    /// Create an idle reporter
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                cell: Mutex::new(Cell {
                    state: ProgressState::default(),
                    generation: 0,
                    started_at: Instant::now(),
                }),
                changed: Condvar::new(),
                sinks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Register a sink that receives every emission
    pub fn add_sink(&self, sink: Arc<dyn ProgressSink>) {
        self.shared
            .sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sink);
    }

    /// Create an observer of the latest state
    ///
    /// An observer created after an operation finished waits for the next
    /// operation's terminal state.
    pub fn subscribe(&self) -> ProgressObserver {
        let cell = self.shared.cell();
        ProgressObserver {
            shared: Arc::clone(&self.shared),
            seen: cell.generation,
            finished_before: cell.state.is_completed.then_some(cell.generation),
        }
    }

    /// Current state
    pub fn snapshot(&self) -> ProgressState {
        self.shared.cell().state.clone()
    }

    /// Reset the cell for a new operation
    pub fn begin(&self) {
        {
            let mut cell = self.shared.cell();
            cell.state = ProgressState::default();
            cell.started_at = Instant::now();
            cell.generation += 1;
        }
        self.shared.changed.notify_all();
    }

    /// Report a stage without item counters
    pub fn report(&self, stage: ProgressStage, percent: u8, message: impl Into<String>) {
        self.report_items(stage, percent, message, 0, 0);
    }

    /// Report a stage with item counters
    pub fn report_items(
        &self,
        stage: ProgressStage,
        percent: u8,
        message: impl Into<String>,
        current_item: usize,
        total_items: usize,
    ) {
        self.publish(|state, elapsed| {
            let percent = percent.min(100).max(state.percent);
            *state = ProgressState {
                stage,
                percent,
                current_item,
                total_items,
                message: message.into(),
                is_completed: false,
                error: None,
                estimated_time_left_ms: estimate_time_left(elapsed, percent),
            };
        });
    }

    /// Terminal emission for a successful operation
    pub fn complete(&self, message: impl Into<String>) {
        self.publish(|state, _| {
            *state = ProgressState {
                stage: ProgressStage::Completed,
                percent: 100,
                current_item: state.total_items,
                total_items: state.total_items,
                message: message.into(),
                is_completed: true,
                error: None,
                estimated_time_left_ms: 0,
            };
        });
    }

    /// Terminal emission for a failed operation
    pub fn fail(&self, error: impl fmt::Display) {
        let error = error.to_string();
        self.publish(|state, _| {
            *state = ProgressState {
                stage: ProgressStage::Completed,
                percent: state.percent,
                current_item: state.current_item,
                total_items: state.total_items,
                message: format!("Failed: {}", error),
                is_completed: true,
                error: Some(error),
                estimated_time_left_ms: 0,
            };
        });
    }

    fn publish(&self, update: impl FnOnce(&mut ProgressState, Duration)) {
        let snapshot = {
            let mut cell = self.shared.cell();
            if cell.state.is_completed {
                debug!("Ignoring progress update after terminal state");
                return;
            }
            let elapsed = cell.started_at.elapsed();
            update(&mut cell.state, elapsed);
            cell.generation += 1;
            cell.state.clone()
        };
        self.shared.changed.notify_all();

        debug!(
            stage = %snapshot.stage,
            percent = snapshot.percent,
            current = snapshot.current_item,
            total = snapshot.total_items,
            "progress"
        );

        let sinks = self
            .shared
            .sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for sink in sinks {
            sink.on_progress(&snapshot);
        }
    }
}

/// Read-only view of a reporter's latest state
pub struct ProgressObserver {
    shared: Arc<Shared>,
    seen: u64,
    /// Generation of a terminal state already present at subscription
    finished_before: Option<u64>,
}

impl ProgressObserver {
    /// Latest state, marking it as seen
    pub fn latest(&mut self) -> ProgressState {
        let cell = self.shared.cell();
        self.seen = cell.generation;
        cell.state.clone()
    }

    /// Whether a state newer than the last one seen was published
    pub fn has_update(&self) -> bool {
        self.shared.cell().generation > self.seen
    }

    /// Wait for a state newer than the last one seen
    ///
    /// Returns `None` on timeout.
    pub fn wait_for_update(&mut self, timeout: Duration) -> Option<ProgressState> {
        let seen = self.seen;
        let cell = self.shared.cell();
        let (cell, result) = self
            .shared
            .changed
            .wait_timeout_while(cell, timeout, |c| c.generation <= seen)
            .unwrap_or_else(PoisonError::into_inner);

        if result.timed_out() {
            return None;
        }
        self.seen = cell.generation;
        Some(cell.state.clone())
    }

    /// Wait until the operation reaches its terminal state
    pub fn wait_for_completion(&mut self, timeout: Duration) -> Option<ProgressState> {
        let deadline = Instant::now() + timeout;
        loop {
            let (state, generation) = {
                let cell = self.shared.cell();
                (cell.state.clone(), cell.generation)
            };
            self.seen = generation;
            if state.is_completed && self.finished_before != Some(generation) {
                return Some(state);
            }
            let remaining = deadline.checked_duration_since(Instant::now())?;
            self.wait_for_update(remaining)?;
        }
    }
}

/// `elapsed * (100 - percent) / percent`, or 0 when nothing is done yet
pub fn estimate_time_left(elapsed: Duration, percent: u8) -> u64 {
    if percent == 0 {
        return 0;
    }
    let percent = u128::from(percent.min(100));
    let remaining = elapsed.as_millis() * (100 - percent) / percent;
    u64::try_from(remaining).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[derive(Default)]
    struct Recorder {
        states: Mutex<Vec<ProgressState>>,
    }

    impl ProgressSink for Recorder {
        fn on_progress(&self, state: &ProgressState) {
            self.states.lock().unwrap().push(state.clone());
        }
    }

    #[test]
    fn test_estimate_time_left() {
        assert_eq!(estimate_time_left(Duration::from_millis(1000), 0), 0);
        assert_eq!(estimate_time_left(Duration::from_millis(1000), 50), 1000);
        assert_eq!(estimate_time_left(Duration::from_millis(1000), 25), 3000);
        assert_eq!(estimate_time_left(Duration::from_millis(1000), 100), 0);
    }

    #[test]
    fn test_percent_never_decreases() {
        let reporter = ProgressReporter::new();
        reporter.begin();
        reporter.report(ProgressStage::Processing, 40, "a");
        reporter.report(ProgressStage::Processing, 30, "b");

        assert_eq!(reporter.snapshot().percent, 40);

        reporter.report(ProgressStage::Writing, 250, "c");
        assert_eq!(reporter.snapshot().percent, 100);
    }

    #[test]
    fn test_terminal_state_is_final() {
        let reporter = ProgressReporter::new();
        let recorder = Arc::new(Recorder::default());
        reporter.add_sink(recorder.clone());

        reporter.begin();
        reporter.report(ProgressStage::Preparing, 0, "start");
        reporter.complete("done");
        reporter.report(ProgressStage::Writing, 80, "late");
        reporter.fail("late failure");

        let state = reporter.snapshot();
        assert!(state.is_completed);
        assert!(state.error.is_none());
        assert_eq!(state.message, "done");

        let states = recorder.states.lock().unwrap();
        assert_eq!(states.len(), 2);
        assert_eq!(states.iter().filter(|s| s.is_completed).count(), 1);
    }

    #[test]
    fn test_fail_keeps_percent_and_sets_error() {
        let reporter = ProgressReporter::new();
        reporter.begin();
        reporter.report(ProgressStage::Validating, 20, "checking");
        reporter.fail("bad checksum");

        let state = reporter.snapshot();
        assert!(state.is_failed());
        assert_eq!(state.percent, 20);
        assert_eq!(state.error.as_deref(), Some("bad checksum"));
        assert_eq!(state.stage, ProgressStage::Completed);
    }

    #[test]
    fn test_begin_resets_after_completion() {
        let reporter = ProgressReporter::new();
        reporter.begin();
        reporter.complete("first");

        reporter.begin();
        assert_eq!(reporter.snapshot(), ProgressState::default());
        reporter.report(ProgressStage::Restoring, 0, "second");
        assert_eq!(reporter.snapshot().stage, ProgressStage::Restoring);
    }

    #[test]
    fn test_begin_wakes_observers() {
        let reporter = ProgressReporter::new();
        reporter.complete("first");
        let mut observer = reporter.subscribe();

        reporter.begin();
        assert!(observer.has_update());
        let state = observer.wait_for_update(Duration::from_millis(10)).unwrap();
        assert!(!state.is_completed);
    }

    #[test]
    fn test_observer_between_operations_waits_for_next_one() {
        let reporter = ProgressReporter::new();
        reporter.begin();
        reporter.complete("first");

        let mut observer = reporter.subscribe();
        assert!(observer
            .wait_for_completion(Duration::from_millis(10))
            .is_none());

        let writer = reporter.clone();
        let handle = thread::spawn(move || {
            writer.begin();
            writer.report(ProgressStage::Restoring, 50, "halfway");
            writer.complete("second");
        });

        let state = observer
            .wait_for_completion(Duration::from_secs(5))
            .expect("terminal state");
        handle.join().unwrap();
        assert_eq!(state.message, "second");
    }

    #[test]
    fn test_observer_sees_terminal_state_from_other_thread() {
        let reporter = ProgressReporter::new();
        let mut observer = reporter.subscribe();
        assert!(!observer.has_update());

        let writer = reporter.clone();
        let handle = thread::spawn(move || {
            writer.begin();
            for p in (0..=90).step_by(10) {
                writer.report(ProgressStage::Processing, p, "working");
            }
            writer.complete("all done");
        });

        let state = observer
            .wait_for_completion(Duration::from_secs(5))
            .expect("terminal state");
        handle.join().unwrap();

        assert!(state.is_completed);
        assert_eq!(state.percent, 100);
        assert!(!observer.has_update());
    }

    #[test]
    fn test_wait_for_update_times_out() {
        let reporter = ProgressReporter::new();
        let mut observer = reporter.subscribe();
        assert!(observer.wait_for_update(Duration::from_millis(10)).is_none());
    }
}
