//! Shared access to one [`Engine`] from many threads.
//!
//! The engine runs every request to completion and takes `&mut self`, so the
//! interface keeps it behind a mutex: requests are admitted one at a time and
//! a query never observes a schema that a concurrent load has half written.
//! Each submitted request gets an id and is timed.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::aggregate::Reply;
use crate::engine::{Engine, Request};
use crate::error::{KeyschemaError, Result};
use crate::schema::Dimension;
use crate::store::Store;

/// Opaque request identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);
impl RequestId {
    pub fn value(&self) -> u64 {
        self.0
    }
}
impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The result of one submitted request.
#[derive(Debug)]
pub struct Outcome {
    pub id: RequestId,
    pub elapsed: Duration,
    pub result: Result<Reply>,
}
impl Outcome {
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

pub struct RequestInterface<S> {
    engine: Mutex<Engine<S>>,
    next_id: AtomicU64,
}

impl<S: Store> RequestInterface<S> {
    pub fn new(engine: Engine<S>) -> Self {
        Self { engine: Mutex::new(engine), next_id: AtomicU64::new(0) }
    }

    fn allocate_id(&self) -> RequestId {
        RequestId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Engine<S>>> {
        self.engine
            .lock()
            .map_err(|e| KeyschemaError::Lock(e.to_string()))
    }

    /// Parse `command` and run it; a command that cannot be parsed still gets an id.
    pub fn submit(&self, command: &str, document: Option<String>) -> Outcome {
        let id = self.allocate_id();
        let started = Instant::now();
        let result = Request::from_command(command, document)
            .and_then(|request| self.lock()?.execute(&request));
        Outcome { id, elapsed: started.elapsed(), result }
    }

    pub fn execute(&self, request: &Request) -> Outcome {
        let id = self.allocate_id();
        let started = Instant::now();
        let result = self.lock().and_then(|mut engine| engine.execute(request));
        Outcome { id, elapsed: started.elapsed(), result }
    }

    pub fn dimensions(&self) -> Result<Vec<Dimension>> {
        self.lock()?.dimensions()
    }

    pub fn into_engine(self) -> Result<Engine<S>> {
        self.engine
            .into_inner()
            .map_err(|e| KeyschemaError::Lock(e.to_string()))
    }
}
