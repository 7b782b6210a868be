//! Serial task execution contexts.
//!
//! A [`Context`] is a serial task executor with stable identity: a dedicated
//! named thread draining submitted tasks in submission order. Every pooled
//! connection is bound to one context for its whole lifetime and all of its
//! I/O callbacks run there; the pool prefers handing a caller a connection
//! that is already bound to the caller's context.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crate::error::Error;

type Task = Box<dyn FnOnce() + Send + 'static>;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(0);

/// A serial task executor with stable identity.
///
/// Cloning yields another handle to the same executor; equality compares
/// executor identity, not handle identity. The executor thread exits once
/// the last handle is dropped and the queued tasks have run.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

struct Inner {
    id: u64,
    name: String,
    tasks: crossbeam_channel::Sender<Task>,
}

impl Context {
    /// Spawn a new context backed by a named executor thread.
    pub fn new(name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        let (tasks, work) = crossbeam_channel::unbounded::<Task>();
        // Detached: the thread exits once every handle (and so the sender)
        // is gone and the queued tasks have run.
        let _worker = thread::Builder::new().name(name.clone()).spawn(move || {
            while let Ok(task) = work.recv() {
                task();
            }
        })?;
        let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        Ok(Self {
            inner: Arc::new(Inner { id, name, tasks }),
        })
    }

    /// Submit a unit of work. It runs on the executor thread after
    /// everything submitted before it. Submitting to a stopped executor is
    /// a no-op.
    pub fn run(&self, task: impl FnOnce() + Send + 'static) {
        let _ = self.inner.tasks.send(Box::new(task));
    }

    /// Process-unique identity of the executor.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Name of the executor thread.
    pub fn name(&self) -> &str {
        &self.inner.name
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Context {}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}
