//! Live views of a user's expense collection.

use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
    task::{Context, Poll},
};

use tokio::{
    sync::watch,
    time::{Instant, Sleep, sleep_until},
};
use tokio_stream::{Stream, wrappers::WatchStream};

use crate::{auth::UserID, expense::Expense};

/// A full copy of a user's expense collection.
pub type Snapshot = Arc<[Expense]>;

pub(super) type Channels = Arc<Mutex<HashMap<UserID, watch::Sender<Snapshot>>>>;

/// Keeps a user's snapshot channel alive.
///
/// When the last registration for a user is dropped, the channel is removed
/// from the store. The receiver it guards must be dropped first so that the
/// receiver count is accurate.
#[derive(Debug)]
pub(super) struct Registration {
    user_id: UserID,
    channels: Channels,
}

impl Registration {
    pub(super) fn new(user_id: UserID, channels: Channels) -> Self {
        Self { user_id, channels }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let mut channels = match self.channels.lock() {
            Ok(channels) => channels,
            Err(poisoned) => poisoned.into_inner(),
        };

        let is_unused = channels
            .get(&self.user_id)
            .is_some_and(|sender| sender.receiver_count() == 0);

        if is_unused {
            channels.remove(&self.user_id);
            tracing::debug!(
                "closed live subscription to users/{}/expenses",
                self.user_id
            );
        }
    }
}

/// A standing subscription to a user's expense collection.
///
/// The subscription starts with the current snapshot and then sees a new
/// snapshot after every change to the collection. Dropping it unsubscribes.
#[derive(Debug)]
pub struct ExpenseSubscription {
    // Field order matters: the receiver must drop before the registration.
    receiver: watch::Receiver<Snapshot>,
    _registration: Registration,
}

impl ExpenseSubscription {
    pub(super) fn new(receiver: watch::Receiver<Snapshot>, registration: Registration) -> Self {
        Self {
            receiver,
            _registration: registration,
        }
    }

    /// The latest snapshot, without waiting for a change.
    pub fn current(&mut self) -> Snapshot {
        self.receiver.borrow_and_update().clone()
    }

    /// Wait for the collection to change and return the new snapshot.
    ///
    /// Returns `None` if the store has stopped publishing snapshots.
    pub async fn next_change(&mut self) -> Option<Snapshot> {
        self.receiver.changed().await.ok()?;

        Some(self.receiver.borrow_and_update().clone())
    }

    /// Turn the subscription into a stream of snapshots, starting with the
    /// current one.
    ///
    /// The stream ends at `deadline` if one is given, e.g. when the session the
    /// subscription was opened for expires.
    pub fn into_stream(self, deadline: Option<Instant>) -> SnapshotStream {
        let Self {
            receiver,
            _registration: registration,
        } = self;

        SnapshotStream {
            snapshots: WatchStream::new(receiver),
            deadline: deadline.map(|deadline| Box::pin(sleep_until(deadline))),
            _registration: registration,
        }
    }
}

/// A stream of snapshots that owns its subscription.
///
/// Dropping the stream, e.g. when an SSE client disconnects, unsubscribes.
pub struct SnapshotStream {
    snapshots: WatchStream<Snapshot>,
    deadline: Option<Pin<Box<Sleep>>>,
    _registration: Registration,
}

impl Stream for SnapshotStream {
    type Item = Snapshot;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if let Some(deadline) = this.deadline.as_mut() {
            if deadline.as_mut().poll(cx).is_ready() {
                return Poll::Ready(None);
            }
        }

        Pin::new(&mut this.snapshots).poll_next(cx)
    }
}
