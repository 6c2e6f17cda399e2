//! Cooperative cancellation for in-flight requests.
//!
//! The lifecycle owner (the host, an embedder, a test) holds a
//! [`CancelSource`]; each request observes a [`CancelSignal`] subscribed to
//! it. Built on `tokio::sync::watch`, so signals are cheap to clone and
//! awaiting cancellation never polls.

use std::sync::Arc;

use tokio::sync::watch;

/// Fires cancellation for every signal subscribed to it. Idempotent.
#[derive(Clone)]
pub struct CancelSource {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSource {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe a new observer.
    #[must_use]
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: self.tx.subscribe(),
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Observer half. Once fired it stays fired.
#[derive(Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that can never fire.
    #[must_use]
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve when cancellation fires. Never resolves if the source is
    /// dropped without firing, matching a lifecycle owner that simply
    /// outlives the request.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
