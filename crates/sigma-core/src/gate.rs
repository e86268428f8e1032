//! Admission gate bounding the number of engine calls in flight
//!
//! Permits are tokens in a bounded channel: acquiring takes one out, dropping the
//! `Permit` puts it back, so every exit path releases. Waiters poll so that
//! `interrupt_waiters` can fail them with `ConcurrencyInterrupted`.

use crate::error::{PipelineError, PipelineResult};
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, bounded};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

#[derive(Debug)]
pub struct AdmissionGate {
    release: Sender<()>,
    acquire: Receiver<()>,
    capacity: usize,
    poll_interval: Duration,
    /// Bumped on every interrupt; waiters that saw an older value give up
    interrupts: AtomicU64,
}

/// A held permit. Dropping it returns the permit to the gate.
#[must_use = "the permit is released as soon as it is dropped"]
#[derive(Debug)]
pub struct Permit<'a> {
    gate: &'a AdmissionGate,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        // The gate owns both channel ends, so the send only fails if it is already full
        let _ = self.gate.release.try_send(());
    }
}

impl AdmissionGate {
    pub fn new(capacity: usize, poll_interval: Duration) -> PipelineResult<Self> {
        if capacity == 0 {
            return Err(PipelineError::configuration("gate.max_in_flight", "must be at least 1"));
        }
        let (release, acquire) = bounded(capacity);
        for _ in 0..capacity {
            release.try_send(()).map_err(|_| {
                PipelineError::configuration("gate.max_in_flight", "could not fill permit pool")
            })?;
        }
        Ok(Self {
            release,
            acquire,
            capacity,
            poll_interval,
            interrupts: AtomicU64::new(0),
        })
    }

    /// Block until a permit is free.
    ///
    /// Fails with `ConcurrencyInterrupted` if `interrupt_waiters` is called while waiting.
    pub fn acquire(&self, operation: &str) -> PipelineResult<Permit<'_>> {
        let seen = self.interrupts.load(Ordering::SeqCst);
        if self.acquire.try_recv().is_ok() {
            return Ok(Permit { gate: self });
        }

        debug!(operation, capacity = self.capacity, "waiting for engine permit");
        loop {
            match self.acquire.recv_timeout(self.poll_interval) {
                Ok(()) => {
                    let permit = Permit { gate: self };
                    if self.interrupts.load(Ordering::SeqCst) != seen {
                        return Err(PipelineError::interrupted(operation));
                    }
                    return Ok(permit);
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.interrupts.load(Ordering::SeqCst) != seen {
                        return Err(PipelineError::interrupted(operation));
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(PipelineError::interrupted(operation));
                }
            }
        }
    }

    /// Fail every caller currently blocked in `acquire`.
    pub fn interrupt_waiters(&self) {
        self.interrupts.fetch_add(1, Ordering::SeqCst);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently held
    pub fn in_flight(&self) -> usize {
        self.capacity.saturating_sub(self.acquire.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn permits_return_on_drop() {
        let gate = AdmissionGate::new(2, Duration::from_millis(5)).unwrap();
        let first = gate.acquire("evaluate").unwrap();
        let second = gate.acquire("evaluate").unwrap();
        assert_eq!(gate.in_flight(), 2);

        drop(first);
        assert_eq!(gate.in_flight(), 1);
        drop(second);
        assert_eq!(gate.in_flight(), 0);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(AdmissionGate::new(0, Duration::from_millis(5)).is_err());
    }

    #[test]
    fn interrupt_fails_blocked_waiters() {
        let gate = Arc::new(AdmissionGate::new(1, Duration::from_millis(5)).unwrap());
        let held = gate.acquire("draw").unwrap();

        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.acquire("evaluate").map(|_| ()))
        };
        while !waiter.is_finished() {
            gate.interrupt_waiters();
            thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(waiter.join().unwrap(), Err(PipelineError::interrupted("evaluate")));
        drop(held);
        assert!(gate.acquire("evaluate").is_ok());
    }
}
