//! Worker pool and per-run shared state.
//!
//! A fixed number of OS threads pull rule positions from the dispatch
//! queue, compute the rule's output, write it, and cascade. Workers never
//! block on a full queue: rules they make ready that do not fit are kept in
//! a local backlog and fired by the same worker. Only the seeding thread
//! blocks on a full queue.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use kindle_foundation::{Error, Result};

use crate::agenda::{Agenda, StoreBindings};
use crate::outcome::Recorder;
use crate::queue::{DispatchQueue, PushError};
use crate::quiescence::Quiescence;

// =============================================================================
// Run State
// =============================================================================

/// Everything the workers and the orchestrator share during one run.
pub(crate) struct RunState {
    pub(crate) agenda: Agenda,
    pub(crate) queue: DispatchQueue<usize>,
    pub(crate) quiescence: Quiescence,
    pub(crate) recorder: Recorder,
    fatal: Mutex<Option<Error>>,
    timeout: Option<(Instant, Duration)>,
}

impl RunState {
    pub(crate) fn new(agenda: Agenda, queue_capacity: usize) -> Self {
        Self {
            agenda,
            queue: DispatchQueue::new(queue_capacity),
            quiescence: Quiescence::new(),
            recorder: Recorder::default(),
            fatal: Mutex::new(None),
            timeout: None,
        }
    }

    /// Bounds seeding by `deadline`, reported as a `timeout` overrun.
    #[must_use]
    pub(crate) fn with_timeout(mut self, deadline: Instant, timeout: Duration) -> Self {
        self.timeout = Some((deadline, timeout));
        self
    }

    /// Records a run-fatal error and stops the run. The first error wins.
    pub(crate) fn abort(&self, err: Error) {
        {
            let mut fatal = self.fatal.lock();
            if fatal.is_none() {
                tracing::error!(error = %err, "run aborted");
                *fatal = Some(err);
            }
        }
        self.queue.close();
        self.quiescence.abort();
    }

    /// Takes the fatal error, if one was recorded.
    pub(crate) fn take_fatal(&self) -> Option<Error> {
        self.fatal.lock().take()
    }

    /// Cascades `fact` and hands every newly ready rule to the queue,
    /// blocking while it is full. Used by the seeding thread.
    ///
    /// # Errors
    /// Returns a store error from the agenda, or a timeout error if the
    /// queue stays full past the run deadline.
    pub(crate) fn seed(&self, fact: &str) -> Result<()> {
        let ready = self
            .agenda
            .on_fact_ready(fact, &self.quiescence, &self.recorder)?;
        for (i, &position) in ready.iter().enumerate() {
            self.log_dispatch(position);
            let pushed = match self.timeout {
                Some((deadline, _)) => self.queue.push_until(position, deadline),
                None => self.queue.push(position).map_err(PushError::Closed),
            };
            match pushed {
                Ok(()) => {}
                Err(PushError::Closed(_)) => self.quiescence.finish(),
                Err(PushError::Full(_)) => {
                    // This rule and the rest of the batch never reach a worker.
                    for _ in i..ready.len() {
                        self.quiescence.finish();
                    }
                    let timeout = self.timeout.map_or(Duration::ZERO, |(_, t)| t);
                    return Err(Error::timeout(timeout));
                }
            }
        }
        Ok(())
    }

    /// Fires the rule at `position`. Always counts one unit of work done.
    fn execute(&self, position: usize, backlog: &mut VecDeque<usize>) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.fire(position, backlog)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => self.abort(err),
            Err(_) => {
                let rule = self.agenda.rule(position).rule();
                self.abort(
                    Error::internal("worker panicked while firing rule")
                        .in_rule(rule.id().to_string()),
                );
            }
        }
        self.quiescence.finish();
    }

    /// Computes, writes and cascades. Returns only run-fatal errors.
    fn fire(&self, position: usize, backlog: &mut VecDeque<usize>) -> Result<()> {
        let rule = self.agenda.rule(position).rule();
        let compiled = self.agenda.rule(position);

        let bindings = StoreBindings::new(self.agenda.store());
        let produced = compiled.produce(&bindings, self.agenda.functions());
        if let Some(err) = bindings.take_error() {
            return Err(err.in_rule(rule.id().to_string()));
        }
        let value = match produced {
            Ok(value) => value,
            Err(err) => {
                let err = err.in_rule(rule.id().to_string());
                tracing::warn!(rule = %rule.id(), output = %rule.output(), error = %err, "rule failed");
                self.recorder.failed(rule.id(), rule.output(), &err);
                return Ok(());
            }
        };

        self.agenda
            .store()
            .set(rule.output(), value)
            .map_err(|e| e.in_rule(rule.id().to_string()).at_fact(rule.output()))?;
        tracing::debug!(rule = %rule.id(), fact = %rule.output(), "wrote fact");
        self.recorder.fired(rule.id(), rule.output());

        let ready = self
            .agenda
            .on_fact_ready(rule.output(), &self.quiescence, &self.recorder)?;
        for next in ready {
            self.log_dispatch(next);
            match self.queue.try_push(next) {
                Ok(()) => {}
                Err(PushError::Full(next)) => backlog.push_back(next),
                Err(PushError::Closed(_)) => self.quiescence.finish(),
            }
        }
        Ok(())
    }

    fn log_dispatch(&self, position: usize) {
        let rule = self.agenda.rule(position).rule();
        tracing::debug!(rule = %rule.id(), output = %rule.output(), "dispatched rule");
    }
}

// =============================================================================
// Worker Pool
// =============================================================================

/// Fixed set of worker threads bound to one run.
pub(crate) struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Starts `count` workers.
    ///
    /// # Errors
    /// Returns an internal error if a thread cannot be spawned; workers
    /// already started are stopped and joined first.
    pub(crate) fn spawn(count: usize, run: &Arc<RunState>) -> Result<Self> {
        let mut pool = Self {
            handles: Vec::with_capacity(count),
        };
        for n in 0..count {
            let worker_run = Arc::clone(run);
            let spawned = thread::Builder::new()
                .name(format!("kindle-worker-{n}"))
                .spawn(move || work(&worker_run));
            match spawned {
                Ok(handle) => pool.handles.push(handle),
                Err(err) => {
                    run.queue.close();
                    pool.join();
                    return Err(Error::internal(format!("failed to spawn worker: {err}")));
                }
            }
        }
        Ok(pool)
    }

    /// Returns the number of workers.
    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }

    /// Waits for every worker to exit. The queue must be closed first.
    pub(crate) fn join(self) {
        for handle in self.handles {
            if handle.join().is_err() {
                tracing::error!("worker thread panicked outside rule execution");
            }
        }
    }
}

fn work(run: &RunState) {
    let mut backlog = VecDeque::new();
    loop {
        let position = match backlog.pop_front() {
            Some(position) => {
                if run.queue.is_closed() {
                    break;
                }
                position
            }
            None => match run.queue.pop() {
                Some(position) => position,
                None => break,
            },
        };
        run.execute(position, &mut backlog);
    }
}
