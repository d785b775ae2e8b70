use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};

/// Aggregate progress signal forwarded to listener channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressEvent {
    /// Fired on the 0 -> 1 transition of the active reporter count.
    Started,
    /// Mean percent over all active reporters, 0-100.
    Progress(f32),
    /// Fired on the 1 -> 0 transition of the active reporter count.
    Finished,
}

struct ReporterSlot {
    id: usize,
    name: String,
    percent: f32,
    report_progress: bool,
}

struct MonitorState {
    next_id: usize,
    active: Vec<ReporterSlot>,
    listeners: Vec<Sender<ProgressEvent>>,
}

/// Aggregates the progress of all concurrently running units of work.
///
/// Constructed explicitly and handed (cloned) to whoever spawns workers;
/// workers push updates through their `ProgressReporter` handle and the
/// monitor forwards the recomputed aggregate to every subscribed channel.
/// The mutex covers only the active-set bookkeeping and the event send,
/// never the work itself.
#[derive(Clone)]
pub struct ProgressMonitor {
    state: Arc<Mutex<MonitorState>>,
}

impl ProgressMonitor {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MonitorState {
                next_id: 0,
                active: Vec::new(),
                listeners: Vec::new(),
            })),
        }
    }

    /// Register a new unit of work. Fires `Started` if this is the first
    /// active reporter.
    pub fn begin_task(&self, name: impl Into<String>) -> ProgressReporter {
        self.begin_task_with(name, true)
    }

    /// As `begin_task`, but a reporter created with `report_progress = false`
    /// never emits `Progress` events (it still counts toward the mean at 0%).
    pub fn begin_task_with(
        &self,
        name: impl Into<String>,
        report_progress: bool,
    ) -> ProgressReporter {
        let name = name.into();
        let mut state = self.lock();
        if state.active.is_empty() {
            emit(&mut state.listeners, ProgressEvent::Started);
        }
        let id = state.next_id;
        state.next_id += 1;
        state.active.push(ReporterSlot {
            id,
            name: name.clone(),
            percent: 0.0,
            report_progress,
        });
        drop(state);
        ProgressReporter {
            id,
            name,
            monitor: self.clone(),
        }
    }

    /// Subscribe to aggregate events. A listener that goes away is pruned on
    /// the next send.
    pub fn subscribe(&self) -> Receiver<ProgressEvent> {
        let (tx, rx) = mpsc::channel();
        self.lock().listeners.push(tx);
        rx
    }

    pub fn active_count(&self) -> usize {
        self.lock().active.len()
    }

    fn update(&self, id: usize, percent: f32) {
        let mut state = self.lock();
        let Some(idx) = state.active.iter().position(|s| s.id == id) else {
            return;
        };
        if !state.active[idx].report_progress {
            return;
        }
        state.active[idx].percent = percent.clamp(0.0, 100.0);
        log::debug!(
            "{}: {:.2}%",
            state.active[idx].name,
            state.active[idx].percent
        );
        // Recomputed fresh each time so the aggregate cannot drift.
        let mean =
            state.active.iter().map(|s| s.percent).sum::<f32>() / state.active.len() as f32;
        emit(&mut state.listeners, ProgressEvent::Progress(mean));
    }

    fn remove(&self, id: usize) {
        let mut state = self.lock();
        let before = state.active.len();
        state.active.retain(|s| s.id != id);
        if state.active.len() < before && state.active.is_empty() {
            emit(&mut state.listeners, ProgressEvent::Finished);
        }
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        // A worker that panicked mid-report leaves consistent state behind.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn emit(listeners: &mut Vec<Sender<ProgressEvent>>, event: ProgressEvent) {
    listeners.retain(|tx| tx.send(event).is_ok());
}

impl Default for ProgressMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for one unit of work. Owned by exactly one worker thread; dropping
/// it (or calling `finish`) deregisters the work from the monitor, so a
/// reporter cannot outlive its registration or be ended twice.
pub struct ProgressReporter {
    id: usize,
    name: String,
    monitor: ProgressMonitor,
}

impl ProgressReporter {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Report completion of this unit of work as a percent in [0, 100].
    pub fn report(&self, percent: f32) {
        self.monitor.update(self.id, percent);
    }

    pub fn finish(self) {
        // Deregistration happens in Drop.
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.monitor.remove(self.id);
    }
}
