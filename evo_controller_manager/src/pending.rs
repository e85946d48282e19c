//! Single-entry request slots and their completion handles.
//!
//! A caller submits a request into a [`PendingSlot`] and blocks on the
//! returned [`Completion`]. The update loop takes the request, applies it,
//! and fulfils the completion exactly once. Each request carries its own
//! completion, so a late waiter can never observe the result of a later
//! request.

use std::sync::Arc;
use std::time::{Duration, Instant};

use evo_common::controller::ControllerError;
use parking_lot::{Condvar, Mutex};

/// Outcome delivered to a blocked caller.
pub type Outcome = Result<(), ControllerError>;

/// One-shot result cell shared by the submitting caller and the update loop.
#[derive(Debug, Default)]
pub struct Completion {
    result: Mutex<Option<Outcome>>,
    done: Condvar,
}

impl Completion {
    /// Empty, unfulfilled completion.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the outcome and wake the waiter. Later calls are ignored.
    pub fn fulfill(&self, outcome: Outcome) {
        let mut slot = self.result.lock();
        if slot.is_none() {
            *slot = Some(outcome);
            self.done.notify_all();
        }
    }

    /// Block until fulfilled, or until `timeout` elapses.
    ///
    /// # Errors
    /// `ControllerError::Timeout(kind)` if the deadline passes first; the
    /// request itself stays queued.
    pub fn wait(&self, timeout: Option<Duration>, kind: &'static str) -> Outcome {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut slot = self.result.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            match deadline {
                None => self.done.wait(&mut slot),
                Some(deadline) => {
                    if self.done.wait_until(&mut slot, deadline).timed_out() {
                        return match slot.as_ref() {
                            Some(outcome) => outcome.clone(),
                            None => Err(ControllerError::Timeout(kind)),
                        };
                    }
                }
            }
        }
    }
}

/// At most one outstanding request of one kind.
#[derive(Debug)]
pub struct PendingSlot<T> {
    kind: &'static str,
    entry: Mutex<Option<(T, Arc<Completion>)>>,
}

impl<T> PendingSlot<T> {
    /// Empty slot; `kind` names the request in errors ("switch", "unload").
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entry: Mutex::new(None),
        }
    }

    /// Request kind.
    #[inline]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Queue `request`; returns the handle its caller waits on.
    ///
    /// # Errors
    /// `ControllerError::AlreadyPending` if a request is already queued.
    pub fn submit(&self, request: T) -> Result<Arc<Completion>, ControllerError> {
        let mut entry = self.entry.lock();
        if entry.is_some() {
            return Err(ControllerError::AlreadyPending(self.kind));
        }
        let completion = Arc::new(Completion::new());
        *entry = Some((request, Arc::clone(&completion)));
        Ok(completion)
    }

    /// Remove the queued request, if any, for application.
    pub fn take(&self) -> Option<(T, Arc<Completion>)> {
        self.entry.lock().take()
    }

    /// True while a request waits for the update loop.
    pub fn is_pending(&self) -> bool {
        self.entry.lock().is_some()
    }
}
