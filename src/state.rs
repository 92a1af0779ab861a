use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    bounded_queue::BoundedQueue,
    error::Fault,
    mutex::PermitMutex,
    semaphore::Semaphore,
    trace::debug,
};

/// Everything guarded by the queue lock.
#[derive(Debug)]
pub(crate) struct Ledger<T> {
    pub(crate) queue: BoundedQueue<T>,
    pub(crate) produced: usize,
    pub(crate) consumed: usize,
    pub(crate) peak_len: usize,
}

/// Result of a producer's attempt to deposit an item.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Deposit {
    Queued,
    /// The quota was already met. The item was dropped and the free slot
    /// stays taken until the producer retires.
    QuotaReached,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Withdrawal<T> {
    Item(T),
    /// Woken by a retiring peer after the quota was met; nothing to deliver.
    Drained,
}

/// Shared synchronization state for one run, borrowed by every worker.
pub(crate) struct CoordinationState<T> {
    free_slots: Semaphore,
    available_items: Semaphore,
    ledger: PermitMutex<Ledger<T>>,
    producers_done: AtomicBool,
    consumers_done: AtomicBool,
    max_items: usize,
}

impl<T> CoordinationState<T> {
    pub(crate) fn new(capacity: usize, max_items: usize) -> Self {
        Self {
            free_slots: Semaphore::new(capacity),
            available_items: Semaphore::new(0),
            ledger: PermitMutex::new(Ledger {
                queue: BoundedQueue::new(capacity),
                produced: 0,
                consumed: 0,
                peak_len: 0,
            }),
            producers_done: AtomicBool::new(false),
            consumers_done: AtomicBool::new(false),
            max_items,
        }
    }

    pub(crate) fn producers_done(&self) -> bool {
        self.producers_done.load(Ordering::Acquire)
    }

    pub(crate) fn consumers_done(&self) -> bool {
        self.consumers_done.load(Ordering::Acquire)
    }

    /// Hands a free slot on to the next producer before this one exits.
    pub(crate) fn retire_producer(&self) {
        self.free_slots.release();
    }

    /// Hands an item permit on to the next consumer before this one exits.
    pub(crate) fn retire_consumer(&self) {
        self.available_items.release();
    }

    pub(crate) fn deposit(&self, item: T) -> Result<Deposit, Fault> {
        self.free_slots.acquire()?;

        let mut ledger = self.ledger.lock()?;
        if ledger.produced == self.max_items {
            self.producers_done.store(true, Ordering::Release);
            return Ok(Deposit::QuotaReached);
        }

        ledger.queue.push(item);
        ledger.produced += 1;
        let len = ledger.queue.len();
        debug_assert!(len <= ledger.queue.capacity());
        ledger.peak_len = ledger.peak_len.max(len);
        self.available_items.release();
        Ok(Deposit::Queued)
    }

    pub(crate) fn withdraw(&self) -> Result<Withdrawal<T>, Fault> {
        self.available_items.acquire()?;

        let (item, consumed) = {
            let mut ledger = self.ledger.lock()?;
            let item = ledger.queue.pop();
            if item.is_some() {
                ledger.consumed += 1;
                self.free_slots.release();
            }
            (item, ledger.consumed)
        };

        if consumed == self.max_items {
            self.consumers_done.store(true, Ordering::Release);
        }

        match item {
            Some(item) => Ok(Withdrawal::Item(item)),
            None if consumed == self.max_items => Ok(Withdrawal::Drained),
            None => Err(Fault::Inconsistent {
                consumed,
                max_items: self.max_items,
            }),
        }
    }

    /// Fails every blocked and future permit acquisition so that all workers
    /// return promptly.
    pub(crate) fn interrupt(&self) {
        debug!("interrupting run");
        self.free_slots.interrupt();
        self.available_items.interrupt();
        self.ledger.interrupt();
    }

    pub(crate) fn into_ledger(self) -> Ledger<T> {
        let ledger = self.ledger.into_inner();
        debug!(
            produced = ledger.produced,
            consumed = ledger.consumed,
            left = ledger.queue.len(),
            "run state released"
        );
        ledger
    }
}
