use std::thread;
use std::time::Duration;

use crossbeam_channel::{Sender, after, bounded, select};
use tracing::{debug, error, info};

use crate::error::BridgeError;
use crate::queue::command_queue::QueueHandle;

/// One-shot timer that feeds a task into the command queue.
///
/// At most one timer is pending: scheduling again cancels the previous one.
/// The timer thread never touches the state itself, it only enqueues.
pub struct RefreshTimer<S> {
    queue: QueueHandle<S>,
    cancel: Option<Sender<()>>,
    delay: Option<Duration>,
}

impl<S: 'static> RefreshTimer<S> {
    pub fn new(queue: QueueHandle<S>) -> Self {
        Self {
            queue,
            cancel: None,
            delay: None,
        }
    }

    pub fn schedule(
        &mut self,
        label: &'static str,
        delay: Duration,
        task: fn(&mut S) -> Result<(), BridgeError>,
    ) {
        self.cancel();

        let (cancel_tx, cancel_rx) = bounded::<()>(0);
        let queue = self.queue.clone();
        let spawned = thread::Builder::new()
            .name("refresh-timer".into())
            .spawn(move || {
                select! {
                    // Fires on an explicit cancel and when the sender is dropped.
                    recv(cancel_rx) -> _ => debug!(task = label, "timer cancelled"),
                    recv(after(delay)) -> _ => {
                        queue.enqueue(label, task);
                    }
                }
            });

        match spawned {
            Ok(_) => {
                info!(task = label, delay_secs = delay.as_secs_f64(), "next run scheduled");
                self.cancel = Some(cancel_tx);
                self.delay = Some(delay);
            }
            Err(e) => error!(task = label, "failed to spawn timer: {}", e),
        }
    }

    /// Drop the pending timer, if any.
    pub fn cancel(&mut self) {
        // Dropping the sender disconnects the channel and wakes the thread.
        self.cancel.take();
        self.delay = None;
    }

    /// Whether a timer was scheduled and not cancelled since. Stays set
    /// after the timer fires until the next `schedule` or `cancel`.
    pub fn is_armed(&self) -> bool {
        self.cancel.is_some()
    }

    /// Delay the armed timer was scheduled with.
    pub fn armed_delay(&self) -> Option<Duration> {
        self.delay
    }
}
