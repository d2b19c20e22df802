//! Single-assignment rendezvous between a host completion callback and the
//! thread waiting on it.

use std::sync::Arc;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use crate::{Error, Result};

/// Producer side, handed to the host callback.
pub struct CompletionSource {
    sender: Mutex<Option<oneshot::Sender<Result<String>>>>,
}

impl CompletionSource {
    /// Resolve the operation. Only the first call has any effect; returns
    /// whether this call delivered the result.
    pub fn complete(&self, result: Result<String>) -> bool {
        match self.sender.lock().take() {
            Some(sender) => sender.send(result).is_ok(),
            None => false,
        }
    }

    /// Drop the sender without a result; the waiter sees `Cancelled`.
    pub fn cancel(&self) {
        self.sender.lock().take();
    }
}

/// Consumer side, owned by the caller of the host API.
pub struct PendingResult {
    receiver: Option<oneshot::Receiver<Result<String>>>,
}

impl PendingResult {
    /// Block until the operation completes and take its result document.
    ///
    /// There is no timeout. A second call fails with `ResultConsumed`.
    ///
    /// # Panics
    ///
    /// Panics when called from inside an async runtime; run it on a plain
    /// thread or under `tokio::task::spawn_blocking`.
    pub fn wait(&mut self) -> Result<String> {
        let receiver = self.receiver.take().ok_or(Error::ResultConsumed)?;
        receiver.blocking_recv().map_err(|_| Error::Cancelled)?
    }

    pub fn is_consumed(&self) -> bool {
        self.receiver.is_none()
    }
}

/// Create a connected source/result pair
pub fn completion() -> (Arc<CompletionSource>, PendingResult) {
    let (tx, rx) = oneshot::channel();
    (
        Arc::new(CompletionSource {
            sender: Mutex::new(Some(tx)),
        }),
        PendingResult { receiver: Some(rx) },
    )
}
