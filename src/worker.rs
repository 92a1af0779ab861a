use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
};

use crate::{
    error::Fault,
    state::{CoordinationState, Deposit, Withdrawal},
    trace::{debug, error, trace},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Producer,
    Consumer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Producer => f.write_str("producer"),
            Role::Consumer => f.write_str("consumer"),
        }
    }
}

/// Identifies a worker within a run. `index` starts at 1 for each role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId {
    pub role: Role,
    pub index: usize,
}

impl WorkerId {
    pub fn new(role: Role, index: usize) -> Self {
        Self { role, index }
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.role, self.index)
    }
}

/// Per-worker totals reported after a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Items queued by a producer, or delivered by a consumer.
    pub handled: usize,
    /// Items a producer made after the quota was already met.
    pub discarded: usize,
}

enum Behavior<'a, P, C> {
    Produce(&'a P),
    Consume(&'a C),
}

pub(crate) struct Worker<'a, T, P, C> {
    id: WorkerId,
    state: &'a CoordinationState<T>,
    behavior: Behavior<'a, P, C>,
}

impl<'a, T, P, C> Worker<'a, T, P, C>
where
    P: Fn() -> T,
    C: Fn(T),
{
    pub(crate) fn producer(index: usize, state: &'a CoordinationState<T>, produce: &'a P) -> Self {
        Self {
            id: WorkerId::new(Role::Producer, index),
            state,
            behavior: Behavior::Produce(produce),
        }
    }

    pub(crate) fn consumer(index: usize, state: &'a CoordinationState<T>, consume: &'a C) -> Self {
        Self {
            id: WorkerId::new(Role::Consumer, index),
            state,
            behavior: Behavior::Consume(consume),
        }
    }

    pub(crate) fn id(&self) -> WorkerId {
        self.id
    }

    /// Runs the worker loop to completion.
    ///
    /// A fault, including a panic in the user function, interrupts the whole
    /// run before it is returned.
    pub(crate) fn run(self) -> Result<WorkerStats, Fault> {
        debug!(worker = %self.id, "worker started");
        let result = match panic::catch_unwind(AssertUnwindSafe(|| self.drive())) {
            Ok(result) => result,
            Err(payload) => Err(Fault::panicked(payload)),
        };

        match &result {
            Ok(stats) => {
                debug!(
                    worker = %self.id,
                    handled = stats.handled,
                    discarded = stats.discarded,
                    "worker finished"
                );
            }
            Err(fault) if fault.is_interrupted() => {
                debug!(worker = %self.id, "worker interrupted");
                self.state.interrupt();
            }
            Err(fault) => {
                error!(worker = %self.id, %fault, "worker failed");
                self.state.interrupt();
            }
        }
        result
    }

    fn drive(&self) -> Result<WorkerStats, Fault> {
        match self.behavior {
            Behavior::Produce(produce) => self.produce_loop(produce),
            Behavior::Consume(consume) => self.consume_loop(consume),
        }
    }

    fn produce_loop(&self, produce: &P) -> Result<WorkerStats, Fault> {
        let mut stats = WorkerStats::default();
        loop {
            if self.state.producers_done() {
                self.state.retire_producer();
                return Ok(stats);
            }

            let item = produce();
            match self.state.deposit(item)? {
                Deposit::Queued => {
                    stats.handled += 1;
                    trace!(worker = %self.id, "item queued");
                }
                Deposit::QuotaReached => {
                    stats.discarded += 1;
                    debug!(worker = %self.id, "quota reached, item discarded");
                }
            }
        }
    }

    fn consume_loop(&self, consume: &C) -> Result<WorkerStats, Fault> {
        let mut stats = WorkerStats::default();
        loop {
            if self.state.consumers_done() {
                self.state.retire_consumer();
                return Ok(stats);
            }

            match self.state.withdraw()? {
                Withdrawal::Item(item) => {
                    trace!(worker = %self.id, "delivering item");
                    consume(item);
                    stats.handled += 1;
                }
                Withdrawal::Drained => {
                    trace!(worker = %self.id, "woken after quota");
                }
            }
        }
    }
}
