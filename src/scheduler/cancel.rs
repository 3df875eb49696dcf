use std::sync::Arc;
use tokio::sync::watch;

/// Create a linked cancellation pair.
///
/// Built on a `watch` channel holding `false` until cancellation is requested. The
/// controller keeps the [`CancelHandle`]; the worker polls its [`CancelToken`] at
/// checkpoints.
pub fn cancellation() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Arc::new(tx) }, CancelToken { rx })
}

/// Requests cancellation. Cloneable, so a signal handler can hold one too.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Request cancellation. Idempotent; the worker acknowledges it with a
    /// `Cancelled` terminal event.
    pub fn cancel(&self) {
        if !self.tx.send_replace(true) {
            tracing::info!("Cancellation requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Worker side of the cancellation pair.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that is never cancelled, for running a pipeline to completion.
    pub fn never() -> Self {
        let (_, token) = cancellation();
        token
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_reaches_token() {
        let (handle, token) = cancellation();
        assert!(!token.is_cancelled());

        handle.cancel();
        assert!(token.is_cancelled());
        assert!(handle.is_cancelled());

        // Idempotent
        handle.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cloned_handles_share_state() {
        let (handle, token) = cancellation();
        let for_signal = handle.clone();
        for_signal.cancel();
        assert!(token.clone().is_cancelled());
    }

    #[test]
    fn test_never_token_stays_clear() {
        let token = CancelToken::never();
        assert!(!token.is_cancelled());
    }
}
