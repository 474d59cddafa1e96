//! Run cancellation
//!
//! A run observes its token only while suspended on a collaborator call.

use std::sync::Arc;

use tokio::sync::watch;

/// Creates a connected handle/token pair
pub fn cancellation() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Arc::new(tx) }, CancelToken { rx })
}

/// Requests cancellation of every run holding a matching token
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observed by a run
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that is never cancelled
    pub fn never() -> Self {
        let (_, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested; pends forever if the handle
    /// is gone without cancelling.
    pub async fn cancelled(&mut self) {
        let requested = self.rx.wait_for(|cancelled| *cancelled).await.is_ok();
        if !requested {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_token() {
        let (handle, mut token) = cancellation();
        assert!(!token.is_cancelled());

        handle.cancel();
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_never_token_pends() {
        let mut token = CancelToken::never();
        let waited = tokio::time::timeout(Duration::from_millis(20), token.cancelled()).await;
        assert!(waited.is_err());
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cloned_tokens_share_handle() {
        let (handle, token) = cancellation();
        let other = token.clone();
        handle.cancel();
        assert!(token.is_cancelled());
        assert!(other.is_cancelled());
    }
}
