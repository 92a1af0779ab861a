use std::{
    cell::UnsafeCell,
    ops::{Deref, DerefMut},
};

use crate::semaphore::{Interrupted, Semaphore};

/// Mutual exclusion over `T` using a semaphore that starts with one permit.
///
/// Unlike `std::sync::Mutex`, waiting for the lock can be interrupted, which
/// lets a faulting worker release every peer parked on it.
pub struct PermitMutex<T> {
    permit: Semaphore,
    value: UnsafeCell<T>,
}

unsafe impl<T> Send for PermitMutex<T> where T: Send {}
unsafe impl<T> Sync for PermitMutex<T> where T: Send {}

impl<T> PermitMutex<T> {
    pub fn new(value: T) -> Self {
        Self {
            permit: Semaphore::new(1),
            value: UnsafeCell::new(value),
        }
    }

    pub fn lock(&self) -> Result<PermitGuard<'_, T>, Interrupted> {
        self.permit.acquire()?;
        Ok(PermitGuard { lock: self })
    }

    /// Fails every pending and future [`lock`](Self::lock). A guard that is
    /// already held stays valid until dropped.
    pub fn interrupt(&self) {
        self.permit.interrupt();
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

pub struct PermitGuard<'a, T> {
    lock: &'a PermitMutex<T>,
}

impl<T> Deref for PermitGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        // SAFETY: holding the only permit gives exclusive access to the value.
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> DerefMut for PermitGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: as above.
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<T> Drop for PermitGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.permit.release();
    }
}
