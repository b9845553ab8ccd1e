//! Readiness gate
//!
//! Single-assignment cell for the loaded engine: `Empty -> Loading -> Ready`.
//! Subscribers that arrive before the transition are queued and woken when the
//! engine is published; later subscribers get it immediately. The load routine
//! is the only writer and the first published engine wins. `on_ready`
//! callbacks run before any `ready()` waiter is woken, so setup done in a
//! callback is visible to every waiter.
//!
//! A failed load moves the gate to `Failed`, which is visible through
//! `status()` but never wakes `ready()` subscribers: they stay pending.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::channel::oneshot;

use crate::engine::EngineHandle;

type Callback = Box<dyn FnOnce(EngineHandle) + Send>;

/// Observable state of the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateStatus {
    Empty,
    Loading,
    Ready,
    /// Loading ended with an error; the gate will never become ready
    Failed(String),
}

enum State {
    Empty,
    Loading,
    Ready(EngineHandle),
    Failed(String),
}

struct Inner {
    state: State,
    waiters: Vec<oneshot::Sender<EngineHandle>>,
    callbacks: Vec<Callback>,
}

pub struct ReadyGate {
    inner: Mutex<Inner>,
}

impl ReadyGate {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: State::Empty,
                waiters: Vec::new(),
                callbacks: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> GateStatus {
        match &self.lock().state {
            State::Empty => GateStatus::Empty,
            State::Loading => GateStatus::Loading,
            State::Ready(_) => GateStatus::Ready,
            State::Failed(reason) => GateStatus::Failed(reason.clone()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.lock().state, State::Ready(_))
    }

    /// The engine, if already published
    pub fn engine(&self) -> Option<EngineHandle> {
        match &self.lock().state {
            State::Ready(engine) => Some(Arc::clone(engine)),
            _ => None,
        }
    }

    /// `Empty -> Loading`. Returns false if loading already started or finished.
    pub(crate) fn begin_loading(&self) -> bool {
        let mut inner = self.lock();
        if matches!(inner.state, State::Empty) {
            inner.state = State::Loading;
            true
        } else {
            false
        }
    }

    /// Publish the engine. Only the first call has any effect.
    pub(crate) fn publish(&self, engine: EngineHandle) -> bool {
        let (waiters, callbacks) = {
            let mut inner = self.lock();
            if matches!(inner.state, State::Ready(_) | State::Failed(_)) {
                tracing::debug!("Engine already settled, ignoring second publish");
                return false;
            }
            inner.state = State::Ready(Arc::clone(&engine));
            (
                std::mem::take(&mut inner.waiters),
                std::mem::take(&mut inner.callbacks),
            )
        };

        tracing::debug!(
            "Engine ready, waking {} waiters and {} callbacks",
            waiters.len(),
            callbacks.len()
        );
        for callback in callbacks {
            callback(Arc::clone(&engine));
        }
        for waiter in waiters {
            // A dropped receiver just means the caller lost interest
            let _ = waiter.send(Arc::clone(&engine));
        }
        true
    }

    /// Record a permanent load failure. Waiters are kept and never woken.
    pub(crate) fn fail(&self, reason: impl Into<String>) {
        let mut inner = self.lock();
        if !matches!(inner.state, State::Ready(_)) {
            inner.state = State::Failed(reason.into());
        }
    }

    /// Wait for the engine. Resolves immediately once the gate is ready.
    pub async fn ready(&self) -> EngineHandle {
        let receiver = {
            let mut inner = self.lock();
            if let State::Ready(engine) = &inner.state {
                return Arc::clone(engine);
            }
            inner.waiters.retain(|w| !w.is_canceled());
            let (sender, receiver) = oneshot::channel();
            inner.waiters.push(sender);
            receiver
        };

        match receiver.await {
            Ok(engine) => engine,
            // Only happens if the gate itself is dropped
            Err(_) => std::future::pending().await,
        }
    }

    /// Run `callback` once the engine is ready, immediately if it already is
    pub fn on_ready<F>(&self, callback: F)
    where
        F: FnOnce(EngineHandle) + Send + 'static,
    {
        let engine = {
            let mut inner = self.lock();
            let ready = match &inner.state {
                State::Ready(engine) => Some(Arc::clone(engine)),
                _ => None,
            };
            match ready {
                Some(engine) => engine,
                None => {
                    inner.callbacks.push(Box::new(callback));
                    return;
                }
            }
        };
        callback(engine);
    }

    /// Number of subscribers still waiting
    pub fn pending(&self) -> usize {
        let inner = self.lock();
        inner.waiters.iter().filter(|w| !w.is_canceled()).count() + inner.callbacks.len()
    }
}

impl Default for ReadyGate {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReadyGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadyGate")
            .field("status", &self.status())
            .field("pending", &self.pending())
            .finish()
    }
}
