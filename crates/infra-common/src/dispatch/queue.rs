use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::errors::{Error, Result};

/// Unit of work executed on the serialization domain
pub type Task = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Task),
    Shutdown,
}

/// Factory for a dispatcher handle and its task queue
pub struct Dispatcher;

impl Dispatcher {
    /// Create a new serialization domain
    ///
    /// The returned handle posts work, the queue runs it. Keep exactly one
    /// queue owner; tasks run in the order they were posted.
    pub fn new(name: impl Into<String>) -> (DispatcherHandle, TaskQueue) {
        let name: Arc<str> = Arc::from(name.into());
        let (sender, receiver) = mpsc::unbounded_channel();
        let posted = Arc::new(AtomicU64::new(0));

        let handle = DispatcherHandle {
            name: name.clone(),
            sender,
            posted: posted.clone(),
        };
        let queue = TaskQueue {
            name,
            receiver,
            executed: 0,
            posted,
        };

        (handle, queue)
    }
}

/// Cloneable, thread-safe handle used to post work onto a dispatcher
#[derive(Clone)]
pub struct DispatcherHandle {
    name: Arc<str>,
    sender: mpsc::UnboundedSender<Message>,
    posted: Arc<AtomicU64>,
}

impl fmt::Debug for DispatcherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherHandle")
            .field("name", &self.name)
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

impl DispatcherHandle {
    /// Post a task to run later on the serialization domain
    ///
    /// Never runs the task inline, even when called from the domain itself.
    pub fn post<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender
            .send(Message::Run(Box::new(task)))
            .map_err(|_| Error::dispatcher_closed(self.name.as_ref()))?;
        self.posted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Ask the queue to stop after the tasks already posted
    pub fn shutdown(&self) -> Result<()> {
        self.sender
            .send(Message::Shutdown)
            .map_err(|_| Error::dispatcher_closed(self.name.as_ref()))
    }

    /// Name of the dispatcher, used in logs and errors
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the queue has gone away
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Total number of tasks accepted so far
    pub fn posted_count(&self) -> u64 {
        self.posted.load(Ordering::Relaxed)
    }
}

/// Receiving side of a dispatcher
pub struct TaskQueue {
    name: Arc<str>,
    receiver: mpsc::UnboundedReceiver<Message>,
    executed: u64,
    posted: Arc<AtomicU64>,
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("name", &self.name)
            .field("executed", &self.executed)
            .finish()
    }
}

impl TaskQueue {
    /// Run every task currently queued, including tasks posted by those tasks
    ///
    /// Returns the number of tasks executed. Stops early at a shutdown
    /// request, dropping whatever was queued behind it.
    pub fn run_until_idle(&mut self) -> usize {
        let mut ran = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(Message::Run(task)) => {
                    self.execute(task);
                    ran += 1;
                }
                Ok(Message::Shutdown) => {
                    self.close();
                    break;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        ran
    }

    /// Drain the queue until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        debug!("Dispatcher '{}' started", self.name);

        while let Some(message) = self.receiver.recv().await {
            match message {
                Message::Run(task) => self.execute(task),
                Message::Shutdown => {
                    self.close();
                    break;
                }
            }
        }

        debug!("Dispatcher '{}' stopped after {} tasks", self.name, self.executed);
    }

    /// Run the queue as a tokio task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Number of tasks waiting to run
    pub fn pending(&self) -> u64 {
        self.posted.load(Ordering::Relaxed).saturating_sub(self.executed)
    }

    /// Number of tasks executed by this queue
    pub fn executed(&self) -> u64 {
        self.executed
    }

    fn execute(&mut self, task: Task) {
        trace!("Dispatcher '{}' running task #{}", self.name, self.executed + 1);
        self.executed += 1;
        task();
    }

    fn close(&mut self) {
        self.receiver.close();
        let mut dropped = 0;
        while let Ok(message) = self.receiver.try_recv() {
            if let Message::Run(_) = message {
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!("Dispatcher '{}' dropped {} tasks queued after shutdown", self.name, dropped);
        }
    }
}
