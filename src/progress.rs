use std::sync::{Arc, Mutex};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedSender;

use crate::installer::InstallCallbacks;

/// Latest install progress. `current` may briefly exceed `max` while the
/// installer resets its counters between steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressState {
    pub current: u64,
    pub max: u64,
    pub label: String,
}

impl ProgressState {
    pub fn percentage(&self) -> u16 {
        if self.max == 0 {
            0
        } else {
            ((self.current.min(self.max) as f64 / self.max as f64) * 100.0) as u16
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchEvent {
    BusyChanged(bool),
    Progress(ProgressState),
    Failed(String),
}

/// Receives busy-state and progress snapshots from a launch task.
///
/// Callbacks only run on the context that drains the task's
/// [`LaunchHandle`](crate::launch::LaunchHandle), in the order the task
/// produced them.
pub trait ProgressObserver: Send + Sync {
    fn on_busy_changed(&self, busy: bool);

    fn on_progress(&self, current: u64, max: u64, label: &str);

    fn on_error(&self, _message: &str) {}
}

pub(crate) fn deliver(observers: &[Arc<dyn ProgressObserver>], event: &LaunchEvent) {
    for observer in observers {
        match event {
            LaunchEvent::BusyChanged(busy) => observer.on_busy_changed(*busy),
            LaunchEvent::Progress(state) => {
                observer.on_progress(state.current, state.max, &state.label)
            }
            LaunchEvent::Failed(message) => observer.on_error(message),
        }
    }
}

/// Folds the installer's three channels into one snapshot and resends the
/// whole snapshot on every change.
pub(crate) struct ProgressTracker {
    state: Mutex<ProgressState>,
    events: UnboundedSender<LaunchEvent>,
}

impl ProgressTracker {
    pub(crate) fn new(events: UnboundedSender<LaunchEvent>) -> Self {
        Self {
            state: Mutex::new(ProgressState::default()),
            events,
        }
    }

    fn update<F>(&self, setter: F)
    where
        F: FnOnce(&mut ProgressState),
    {
        let snapshot = match self.state.lock() {
            Ok(mut state) => {
                setter(&mut state);
                state.clone()
            }
            Err(poisoned) => {
                let mut state = poisoned.into_inner();
                setter(&mut state);
                state.clone()
            }
        };
        // The receiver only goes away when the handle was dropped.
        let _ = self.events.send(LaunchEvent::Progress(snapshot));
    }
}

impl InstallCallbacks for ProgressTracker {
    fn set_status(&self, label: &str) {
        self.update(|state| state.label = label.to_string());
    }

    fn set_progress(&self, current: u64) {
        self.update(|state| state.current = current);
    }

    fn set_max(&self, max: u64) {
        self.update(|state| state.max = max);
    }
}

/// Terminal progress bar for the command line front-end.
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        Self { bar }
    }

    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for ConsoleProgress {
    fn on_busy_changed(&self, busy: bool) {
        if busy {
            self.bar.reset();
            self.bar.set_message("Preparing...");
            self.bar.enable_steady_tick(Duration::from_millis(100));
        } else {
            self.bar.finish_with_message("Game closed");
        }
    }

    fn on_progress(&self, current: u64, max: u64, label: &str) {
        self.bar.set_length(max);
        self.bar.set_position(current);
        self.bar.set_message(label.to_string());
    }

    fn on_error(&self, message: &str) {
        self.bar.println(format!("Launch failed: {}", message));
    }
}
