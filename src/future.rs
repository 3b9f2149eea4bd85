//! Single-assignment asynchronous values with callback dispatch.
//!
//! A [`Future`] is created pending and is completed exactly once through its
//! [`Completer`]. Callbacks registered before completion are queued and fire
//! in registration order on the completing thread; callbacks registered
//! afterwards run immediately on the registering thread.
//!
//! Derived futures (`map`, `try_map`, `flat_map`) only capture the derived
//! future's completer inside a callback queued on the parent. Nothing points
//! back from child to parent, and the queue is dropped once drained.

use std::any::type_name;
use std::fmt;
use std::mem;
use std::sync::{Arc, mpsc};

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::trace;

use crate::result::{Cause, CauseKind, Result};

type Callback<A> = Box<dyn FnOnce(&Arc<Result<A>>) + Send + 'static>;

enum State<A> {
    Pending(SmallVec<[Callback<A>; 2]>),
    Completed(Arc<Result<A>>),
}

/// A value that becomes available at most once.
///
/// Clones share the same underlying state.
pub struct Future<A> {
    state: Arc<Mutex<State<A>>>,
}

/// The one-shot completion sink handed to a future's producer.
///
/// Clones complete the same future, so a completer can be moved into a
/// worker thread while another handle stays behind. Completing twice is a
/// contract violation and panics.
pub struct Completer<A> {
    state: Arc<Mutex<State<A>>>,
}

impl<A: Send + Sync + 'static> Future<A> {
    /// Create a pending future and immediately run `start` with its completer.
    pub fn new<S>(start: S) -> Self
    where
        S: FnOnce(Completer<A>),
    {
        let state = Arc::new(Mutex::new(State::Pending(SmallVec::new())));
        start(Completer {
            state: Arc::clone(&state),
        });
        Future { state }
    }

    pub fn from_result(result: Result<A>) -> Self {
        Future::new(|done| done.complete(result))
    }

    pub fn ready(value: A) -> Self {
        Future::from_result(Ok(value))
    }

    pub fn failed(cause: Cause) -> Self {
        Future::from_result(Err(cause))
    }

    pub fn is_completed(&self) -> bool {
        matches!(*self.state.lock(), State::Completed(_))
    }

    /// Register `callback` to receive the outcome.
    ///
    /// Runs synchronously if the future is already complete.
    pub fn on_result<F>(&self, callback: F)
    where
        F: FnOnce(&Result<A>) + Send + 'static,
    {
        self.subscribe(Box::new(move |shared: &Arc<Result<A>>| callback(&**shared)));
    }

    /// Derive a future by applying `transform` to a successful value.
    ///
    /// A `None` from the transform fails the derived future with a
    /// [`CauseKind::Transform`] cause naming the transform and the input.
    /// Upstream errors are forwarded and the transform is never called.
    pub fn map<B, F>(&self, transform: F) -> Future<B>
    where
        A: fmt::Debug,
        B: Send + Sync + 'static,
        F: FnOnce(&A) -> Option<B> + Send + 'static,
    {
        let name = type_name::<F>();
        self.chain(move |result, done| match &**result {
            Ok(value) => match transform(value) {
                Some(mapped) => done.succeed(mapped),
                None => done.fail(Cause::transform(format!(
                    "transform `{name}` produced no value for {value:?}"
                ))),
            },
            Err(cause) => done.fail(cause.clone()),
        })
    }

    /// Like [`Future::map`], but the transform reports why it failed.
    pub fn try_map<B, F>(&self, transform: F) -> Future<B>
    where
        B: Send + Sync + 'static,
        F: FnOnce(&A) -> anyhow::Result<B> + Send + 'static,
    {
        self.chain(move |result, done| match &**result {
            Ok(value) => match transform(value) {
                Ok(mapped) => done.succeed(mapped),
                Err(err) => done.fail(Cause::from_error(CauseKind::Transform, &err)),
            },
            Err(cause) => done.fail(cause.clone()),
        })
    }

    /// Sequence a dependent future produced from a successful value.
    pub fn flat_map<B, F>(&self, transform: F) -> Future<B>
    where
        B: Send + Sync + 'static,
        F: FnOnce(&A) -> Future<B> + Send + 'static,
    {
        self.chain(move |result, done| match &**result {
            Ok(value) => transform(value).subscribe(Box::new(move |inner: &Arc<Result<B>>| {
                done.settle(Arc::clone(inner));
            })),
            Err(cause) => done.fail(cause.clone()),
        })
    }

    /// Snapshot of the outcome, if any.
    pub fn peek(&self) -> Option<Result<A>>
    where
        A: Clone,
    {
        match &*self.state.lock() {
            State::Pending(_) => None,
            State::Completed(result) => Some((**result).clone()),
        }
    }

    /// Block the calling thread until the future completes.
    ///
    /// A future whose producer never completes it blocks forever.
    pub fn wait(&self) -> Result<A>
    where
        A: Clone,
    {
        let (tx, rx) = mpsc::channel();
        self.on_result(move |result| {
            let _ = tx.send(result.clone());
        });
        rx.recv()
            .unwrap_or_else(|_| Err(Cause::new(CauseKind::Other, "future was abandoned")))
    }

    fn subscribe(&self, callback: Callback<A>) {
        let ready = {
            let mut state = self.state.lock();
            match &mut *state {
                State::Pending(queue) => {
                    queue.push(callback);
                    return;
                }
                State::Completed(result) => Arc::clone(result),
            }
        };
        callback(&ready);
    }

    fn chain<B, F>(&self, step: F) -> Future<B>
    where
        B: Send + Sync + 'static,
        F: FnOnce(&Arc<Result<A>>, Completer<B>) + Send + 'static,
    {
        Future::new(|done| {
            self.subscribe(Box::new(move |result: &Arc<Result<A>>| step(result, done)));
        })
    }
}

impl<A: Send + Sync + 'static> Completer<A> {
    /// Deliver the outcome and fire every queued callback in order.
    ///
    /// # Panics
    ///
    /// Panics if the future was already completed. The first outcome is kept.
    pub fn complete(&self, result: Result<A>) {
        self.settle(Arc::new(result));
    }

    pub fn succeed(&self, value: A) {
        self.complete(Ok(value));
    }

    pub fn fail(&self, cause: Cause) {
        self.complete(Err(cause));
    }

    pub fn is_completed(&self) -> bool {
        matches!(*self.state.lock(), State::Completed(_))
    }

    fn settle(&self, result: Arc<Result<A>>) {
        let pending = {
            let mut state = self.state.lock();
            match mem::replace(&mut *state, State::Completed(Arc::clone(&result))) {
                State::Pending(queue) => Some(queue),
                State::Completed(first) => {
                    *state = State::Completed(first);
                    None
                }
            }
        };
        let Some(pending) = pending else {
            panic!("future completed twice; a producer must complete its future exactly once");
        };
        trace!(
            callbacks = pending.len(),
            ok = result.is_ok(),
            "future completed"
        );
        for callback in pending {
            callback(&result);
        }
    }
}

impl<A> Clone for Future<A> {
    fn clone(&self) -> Self {
        Future {
            state: Arc::clone(&self.state),
        }
    }
}

impl<A> Clone for Completer<A> {
    fn clone(&self) -> Self {
        Completer {
            state: Arc::clone(&self.state),
        }
    }
}

impl<A: fmt::Debug> fmt::Debug for Future<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.state.lock() {
            State::Pending(queue) => f
                .debug_struct("Future")
                .field("pending", &queue.len())
                .finish(),
            State::Completed(result) => f.debug_struct("Future").field("result", result).finish(),
        }
    }
}

impl<A> fmt::Debug for Completer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer").finish_non_exhaustive()
    }
}
