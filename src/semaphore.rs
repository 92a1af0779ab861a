use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

/// Returned by a blocking acquire that was woken by [`Semaphore::interrupt`]
/// instead of by a permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("interrupted while waiting for a permit")]
pub struct Interrupted;

#[derive(Debug)]
struct Permits {
    count: usize,
    interrupted: bool,
}

/// Counting semaphore built on a mutex-protected count and a condition variable.
#[derive(Debug)]
pub struct Semaphore {
    value: Mutex<Permits>,
    cond_var: Condvar,
}

impl Semaphore {
    pub fn new(value: usize) -> Self {
        Self {
            value: Mutex::new(Permits {
                count: value,
                interrupted: false,
            }),
            cond_var: Condvar::new(),
        }
    }

    /// Blocks until a permit is available and takes it.
    ///
    /// Once the semaphore has been interrupted every call fails, including
    /// calls that find a permit available.
    pub fn acquire(&self) -> Result<(), Interrupted> {
        let mut guard = self.value.lock().map_err(|_| Interrupted)?;
        loop {
            if guard.interrupted {
                return Err(Interrupted);
            }
            if guard.count > 0 {
                guard.count -= 1;
                return Ok(());
            }
            guard = self.cond_var.wait(guard).map_err(|_| Interrupted)?;
        }
    }

    /// Returns one permit and wakes at most one waiter.
    pub fn release(&self) {
        self.permits().count += 1;
        self.cond_var.notify_one();
    }

    /// Fails every current and future [`acquire`](Self::acquire).
    pub fn interrupt(&self) {
        self.permits().interrupted = true;
        self.cond_var.notify_all();
    }

    pub fn available(&self) -> usize {
        self.permits().count
    }

    pub fn is_interrupted(&self) -> bool {
        self.permits().interrupted
    }

    // The count is only touched by the non-panicking code above, so a poisoned
    // lock still holds a consistent value.
    fn permits(&self) -> MutexGuard<'_, Permits> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        thread,
        time::Duration,
    };

    use super::*;

    #[test]
    fn test_basic_semaphore() {
        let capacity = 5;
        let sem = Arc::new(Semaphore::new(capacity));
        let mut handles = vec![];

        for _ in 0..capacity {
            let sem_clone = Arc::clone(&sem);
            handles.push(thread::spawn(move || {
                sem_clone.acquire().unwrap();
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(sem.available(), 0);
    }

    #[test]
    fn test_release_wakes_blocked_acquire() {
        let sem = Semaphore::new(0);
        let acquired = AtomicUsize::new(0);

        thread::scope(|s| {
            s.spawn(|| {
                sem.acquire().unwrap();
                acquired.fetch_add(1, Ordering::SeqCst);
            });
            thread::sleep(Duration::from_millis(20));
            assert_eq!(acquired.load(Ordering::SeqCst), 0);
            sem.release();
        });

        assert_eq!(acquired.load(Ordering::SeqCst), 1);
        assert_eq!(sem.available(), 0);
    }

    #[test]
    fn test_bounds_concurrent_holders() {
        let sem = Semaphore::new(2);
        let holders = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    sem.acquire().unwrap();
                    let now = holders.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    holders.fetch_sub(1, Ordering::SeqCst);
                    sem.release();
                });
            }
        });

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(sem.available(), 2);
    }

    #[test]
    fn test_interrupt_wakes_every_waiter() {
        let sem = Semaphore::new(0);

        let results: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(|| sem.acquire())).collect();
            thread::sleep(Duration::from_millis(20));
            sem.interrupt();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(results.iter().all(|r| *r == Err(Interrupted)));
        assert!(sem.is_interrupted());
    }

    #[test]
    fn test_interrupt_is_sticky() {
        let sem = Semaphore::new(3);
        sem.interrupt();
        assert_eq!(sem.acquire(), Err(Interrupted));
        sem.release();
        assert_eq!(sem.available(), 4);
        assert_eq!(sem.acquire(), Err(Interrupted));
    }
}
