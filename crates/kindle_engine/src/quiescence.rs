//! Termination detection.
//!
//! Outstanding work is counted up when a rule is dispatched and down when
//! it completes. The agenda counts up inside its critical section, and a
//! worker cascades its output before counting down, so the count cannot
//! touch zero while more work is about to be produced.

use std::time::Instant;

use parking_lot::{Condvar, Mutex};

/// How a wait on the detector ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Settled {
    /// No work is outstanding.
    Quiescent,
    /// The run was aborted by a fatal error.
    Aborted,
    /// The deadline passed first.
    TimedOut,
}

#[derive(Default)]
struct Counter {
    outstanding: usize,
    aborted: bool,
}

/// Outstanding-work counter with a blocking wait for zero.
#[derive(Default)]
pub struct Quiescence {
    counter: Mutex<Counter>,
    settled: Condvar,
}

impl Quiescence {
    /// Creates a detector with nothing outstanding.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `n` units of dispatched work.
    pub fn begin(&self, n: usize) {
        if n > 0 {
            self.counter.lock().outstanding += n;
        }
    }

    /// Records one unit of completed work.
    pub fn finish(&self) {
        let mut counter = self.counter.lock();
        debug_assert!(counter.outstanding > 0, "finish without begin");
        counter.outstanding = counter.outstanding.saturating_sub(1);
        if counter.outstanding == 0 {
            self.settled.notify_all();
        }
    }

    /// Wakes the waiter with [`Settled::Aborted`].
    pub fn abort(&self) {
        self.counter.lock().aborted = true;
        self.settled.notify_all();
    }

    /// Returns the outstanding count.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.counter.lock().outstanding
    }

    /// Blocks until nothing is outstanding, the run aborts, or `deadline`
    /// passes.
    pub fn wait(&self, deadline: Option<Instant>) -> Settled {
        let mut counter = self.counter.lock();
        loop {
            if counter.aborted {
                return Settled::Aborted;
            }
            if counter.outstanding == 0 {
                return Settled::Quiescent;
            }
            match deadline {
                Some(deadline) => {
                    if self.settled.wait_until(&mut counter, deadline).timed_out() {
                        if counter.aborted {
                            return Settled::Aborted;
                        }
                        if counter.outstanding == 0 {
                            return Settled::Quiescent;
                        }
                        return Settled::TimedOut;
                    }
                }
                None => self.settled.wait(&mut counter),
            }
        }
    }
}

impl std::fmt::Debug for Quiescence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counter = self.counter.lock();
        f.debug_struct("Quiescence")
            .field("outstanding", &counter.outstanding)
            .field("aborted", &counter.aborted)
            .finish()
    }
}
