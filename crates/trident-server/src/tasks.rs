//! Serialized execution of server work on a single dedicated thread.
//!
//! Every state-mutating piece of work (packet handlers, logouts, game
//! logic) is submitted as a [`Task`]. Tasks run one at a time, in the order
//! the queue received them, so they need no locking among themselves.
//!
//! Shutdown combines two signals: a cancellation token that wakes the
//! worker if it is parked on an empty queue, and a final `Stop` marker
//! queued behind all previously submitted work.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::{fmt, io};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Result, ServerError};

/// Error type returned by a failing task.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Outcome of a task.
pub type TaskResult = std::result::Result<(), BoxError>;

/// A unit of work for the server thread.
pub type Task = Box<dyn FnOnce() -> TaskResult + Send>;

enum Message {
    Run(Task),
    Stop,
}

/// Multi-producer FIFO queue drained by one worker thread.
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<Message>,
    wake: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TaskQueue {
    /// Spawn the worker thread under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker's runtime or thread cannot be created.
    pub fn start(name: &str) -> io::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let wake = CancellationToken::new();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let worker_wake = wake.clone();
        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || runtime.block_on(run(rx, worker_wake)))?;

        info!(thread = name, "Task queue started");

        Ok(Self {
            tx,
            wake,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Enqueue `task` without blocking. Safe to call from any thread,
    /// including from inside another task.
    ///
    /// A call that races a concurrent [`TaskQueue::shutdown`] may return
    /// `Ok` and still land behind the stop marker. Such a task never runs;
    /// the worker discards it and logs a warning.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::ShutDown`] once shutdown has been requested.
    pub fn submit<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() -> TaskResult + Send + 'static,
    {
        if self.wake.is_cancelled() {
            return Err(ServerError::ShutDown);
        }
        self.tx
            .send(Message::Run(Box::new(task)))
            .map_err(|_| ServerError::ShutDown)
    }

    /// Request shutdown.
    ///
    /// Tasks already queued still run; the worker exits once it reaches the
    /// stop marker. Calling this more than once is harmless.
    pub fn shutdown(&self) {
        if self.wake.is_cancelled() {
            return;
        }
        self.wake.cancel();
        let _ = self.tx.send(Message::Stop);
        debug!("Task queue shutdown requested");
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.wake.is_cancelled()
    }

    /// Wait for the worker thread to exit.
    ///
    /// Returns immediately if the worker was already joined, or when called
    /// from the worker thread itself.
    pub fn join(&self) {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);

        if worker
            .as_ref()
            .is_some_and(|handle| handle.thread().id() == thread::current().id())
        {
            return;
        }

        if worker.take().is_some_and(|handle| handle.join().is_err()) {
            error!("Task queue worker panicked");
        }
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

async fn run(mut rx: mpsc::UnboundedReceiver<Message>, wake: CancellationToken) {
    loop {
        // Queued messages are always taken before the wake-up signal, so
        // the loop only leaves via the wake branch once the queue is empty.
        let message = tokio::select! {
            biased;
            message = rx.recv() => message,
            () = wake.cancelled() => rx.try_recv().ok(),
        };

        match message {
            Some(Message::Run(task)) => run_task(task),
            Some(Message::Stop) | None => break,
        }
    }

    // Anything still buffered was submitted after the stop marker.
    rx.close();
    let mut discarded = 0usize;
    while let Ok(message) = rx.try_recv() {
        if matches!(message, Message::Run(_)) {
            discarded += 1;
        }
    }
    if discarded > 0 {
        warn!(discarded, "Discarded tasks submitted during shutdown");
    }

    info!("Task queue stopped");
}

fn run_task(task: Task) {
    match panic::catch_unwind(AssertUnwindSafe(task)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Task failed: {e}"),
        Err(payload) => error!("Task panicked: {}", panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}
