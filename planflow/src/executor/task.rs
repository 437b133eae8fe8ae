//! Spawned task owned by an executor.

use parking_lot::{Mutex, MutexGuard};
use std::future::{poll_fn, Future};
use std::pin::Pin;
use std::task::Poll;
use tokio::task::{JoinError, JoinHandle};

/// Holds the `JoinHandle` of an executor's background task.
///
/// The handle stays in the slot while it is polled and is only removed once
/// it resolves, so a wait that is dropped part-way leaves it in place for the
/// next caller.
#[derive(Debug)]
pub(crate) struct TaskSlot<T> {
    handle: Mutex<Option<JoinHandle<T>>>,
}

impl<T> TaskSlot<T> {
    pub(crate) fn new() -> Self {
        Self {
            handle: Mutex::new(None),
        }
    }

    /// Locks the slot. `execute()` holds this across the phase change so a
    /// waiter never finds a running executor with an empty slot.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Option<JoinHandle<T>>> {
        self.handle.lock()
    }

    /// Resolves with the task's result, or `None` if no task was stored.
    pub(crate) async fn join(&self) -> Option<Result<T, JoinError>> {
        poll_fn(|cx| {
            let mut slot = self.handle.lock();
            let Some(handle) = slot.as_mut() else {
                return Poll::Ready(None);
            };
            match Pin::new(handle).poll(cx) {
                Poll::Ready(joined) => {
                    *slot = None;
                    Poll::Ready(Some(joined))
                }
                Poll::Pending => Poll::Pending,
            }
        })
        .await
    }
}
