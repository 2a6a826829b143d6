//! Live subscription handles.

use std::future::Future;

use futures_util::StreamExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use fflow_firestore::SnapshotStream;
use fflow_models::Document;

/// Handle to a running subscription.
///
/// The listener runs until `unsubscribe` is called or the handle is
/// dropped; either way the background task is aborted and its remote
/// stream closed.
///
/// Listeners run on the current Tokio runtime. Subscribing outside a
/// runtime returns a handle that is already inactive.
#[must_use = "dropping a Subscription cancels it"]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn spawn<F>(listener: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match Handle::try_current() {
            Ok(runtime) => Self {
                task: Some(runtime.spawn(listener)),
            },
            Err(e) => {
                warn!(error = %e, "No Tokio runtime; subscription not started");
                Self { task: None }
            }
        }
    }

    /// Deliver every snapshot of `snapshots` to `callback`.
    pub(crate) fn forward<F>(label: String, mut snapshots: SnapshotStream, mut callback: F) -> Self
    where
        F: FnMut(Vec<Document>) + Send + 'static,
    {
        Self::spawn(async move {
            while let Some(next) = snapshots.next().await {
                match next {
                    Ok(docs) => {
                        debug!(subscription = %label, count = docs.len(), "Snapshot");
                        callback(docs);
                    }
                    Err(e) => {
                        warn!(subscription = %label, error = %e, "Subscription stopped");
                        break;
                    }
                }
            }
        })
    }

    /// Stop listening.
    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    /// Whether the listener is still running.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
