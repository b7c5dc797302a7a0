//! Background model building.
//!
//! The full corpus analysis is a long batch job that runs off the request
//! path. [`ModelWorker`] moves a [`TagModelService`] onto one background
//! thread, builds once at spawn, and rebuilds on demand. The published
//! model lives behind a single-assignment slot: readers block only until
//! the first build lands, and every later rebuild swaps a fresh `Arc` in
//! while readers keep whatever snapshot they already hold. Rebuild
//! requests queue on a channel and coalesce, so two refreshes never run
//! concurrently against the same cache.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crate::model::TagModels;
use crate::service::TagModelService;

enum Command {
    Refresh,
    Shutdown,
}

/// Slot holding the currently published model.
struct Slot {
    current: Mutex<Option<Arc<TagModels>>>,
    ready: Condvar,
}

/// Handle to the background build thread.
///
/// Dropping the worker shuts the thread down after any in-flight build
/// completes.
pub struct ModelWorker {
    slot: Arc<Slot>,
    sender: Sender<Command>,
    handle: Option<JoinHandle<()>>,
}

impl ModelWorker {
    /// Spawns the worker and starts the first build immediately.
    #[must_use]
    pub fn spawn(service: TagModelService) -> Self {
        let slot = Arc::new(Slot {
            current: Mutex::new(None),
            ready: Condvar::new(),
        });
        let (sender, receiver) = mpsc::channel();

        let thread_slot = Arc::clone(&slot);
        let handle = thread::spawn(move || run(&service, &thread_slot, &receiver));

        Self {
            slot,
            sender,
            handle: Some(handle),
        }
    }

    /// Returns the published model, blocking until the first build lands.
    ///
    /// After that first build this never blocks again: refreshes swap the
    /// slot atomically and callers keep the snapshot they were handed.
    #[must_use]
    pub fn models(&self) -> Arc<TagModels> {
        let mut current = self.slot.current.lock().expect("model slot poisoned");
        loop {
            if let Some(models) = current.as_ref() {
                return Arc::clone(models);
            }
            current = self
                .slot
                .ready
                .wait(current)
                .expect("model slot poisoned");
        }
    }

    /// Returns the published model if the first build has completed.
    #[must_use]
    pub fn try_models(&self) -> Option<Arc<TagModels>> {
        self.slot
            .current
            .lock()
            .expect("model slot poisoned")
            .clone()
    }

    /// Requests a rebuild.
    ///
    /// Returns immediately; the new model becomes visible once the rebuild
    /// completes. Multiple pending requests collapse into one rebuild.
    pub fn refresh(&self) {
        let _ = self.sender.send(Command::Refresh);
    }
}

impl Drop for ModelWorker {
    fn drop(&mut self) {
        let _ = self.sender.send(Command::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(service: &TagModelService, slot: &Slot, receiver: &Receiver<Command>) {
    publish(slot, build(service));

    loop {
        match receiver.recv() {
            Ok(Command::Refresh) => {
                // Drain queued refreshes before rebuilding once.
                loop {
                    match receiver.try_recv() {
                        Ok(Command::Refresh) => {}
                        Ok(Command::Shutdown) | Err(TryRecvError::Disconnected) => return,
                        Err(TryRecvError::Empty) => break,
                    }
                }
                publish(slot, build(service));
            }
            Ok(Command::Shutdown) | Err(_) => return,
        }
    }
}

/// Runs one build, degrading to an empty model on failure so readers are
/// never left blocking on a build that will not come.
fn build(service: &TagModelService) -> TagModels {
    match service.build_models() {
        Ok(models) => models,
        Err(e) => {
            eprintln!("model build failed: {e:#}");
            TagModels::default()
        }
    }
}

fn publish(slot: &Slot, models: TagModels) {
    let mut current = slot.current.lock().expect("model slot poisoned");
    *current = Some(Arc::new(models));
    slot.ready.notify_all();
}
