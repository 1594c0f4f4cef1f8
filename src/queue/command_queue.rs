use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, error, info};

use crate::error::BridgeError;

/// Unit of device work. Runs on the worker with exclusive access to the
/// worker-owned state.
pub type TaskFn<S> = Box<dyn FnOnce(&mut S) -> Result<(), BridgeError> + Send>;

pub struct Task<S> {
    pub label: String,
    pub run: TaskFn<S>,
}

enum Envelope<S> {
    Run(Task<S>),
    Stop,
}

/// Cloneable producer side of the queue.
pub struct QueueHandle<S> {
    sender: Sender<Envelope<S>>,
}

impl<S> Clone for QueueHandle<S> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<S> QueueHandle<S> {
    /// Append a task. Returns `false` if the worker is gone.
    pub fn enqueue<F>(&self, label: impl Into<String>, run: F) -> bool
    where
        F: FnOnce(&mut S) -> Result<(), BridgeError> + Send + 'static,
    {
        let label = label.into();
        debug!(task = %label, "queued");
        self.sender
            .send(Envelope::Run(Task {
                label,
                run: Box::new(run),
            }))
            .is_ok()
    }

    /// Ask the worker to exit after the tasks already queued.
    pub fn stop(&self) -> bool {
        self.sender.send(Envelope::Stop).is_ok()
    }

    pub fn pending(&self) -> usize {
        self.sender.len()
    }
}

/// Single-consumer FIFO that serializes all device interaction.
///
/// The worker thread owns the state `S`; producers only ever hand it
/// closures. Tasks run strictly one after another, in enqueue order. A task
/// that returns `Err` or panics is logged and the worker moves on.
pub struct CommandQueue<S> {
    handle: QueueHandle<S>,
    receiver: Receiver<Envelope<S>>,
}

impl<S: Send + 'static> CommandQueue<S> {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            handle: QueueHandle { sender },
            receiver,
        }
    }

    pub fn handle(&self) -> QueueHandle<S> {
        self.handle.clone()
    }

    /// Spawn the worker. The join handle yields the state back once the
    /// worker has been stopped.
    pub fn start_worker(self, state: S) -> Result<JoinHandle<S>, BridgeError> {
        let receiver = self.receiver;
        let handle = thread::Builder::new()
            .name("command-queue".into())
            .spawn(move || run_worker(receiver, state))?;
        Ok(handle)
    }
}

impl<S: Send + 'static> Default for CommandQueue<S> {
    fn default() -> Self {
        Self::new()
    }
}

fn run_worker<S>(receiver: Receiver<Envelope<S>>, mut state: S) -> S {
    info!("command queue worker started");
    while let Ok(envelope) = receiver.recv() {
        let task = match envelope {
            Envelope::Run(task) => task,
            Envelope::Stop => break,
        };

        debug!(task = %task.label, "running");
        let run = task.run;
        match panic::catch_unwind(AssertUnwindSafe(|| run(&mut state))) {
            Ok(Ok(())) => debug!(task = %task.label, "done"),
            Ok(Err(e)) => error!(task = %task.label, "task failed: {}", e),
            Err(payload) => error!(task = %task.label, "task panicked: {}", panic_message(&*payload)),
        }
    }
    info!("command queue worker stopped");
    state
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
