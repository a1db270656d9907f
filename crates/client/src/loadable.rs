//! Loading/error/data triads and cancellation of in-flight requests.

use crate::error::ClientError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Result of a remote fetch as seen by a view.
#[derive(Debug, Clone, PartialEq)]
pub struct Loadable<T> {
    pub data: T,
    pub is_loading: bool,
    /// Message of the last failed fetch, cleared when a new fetch starts.
    pub error: Option<String>,
}

impl<T: Default> Default for Loadable<T> {
    /// Starts loading, as a view does on mount.
    fn default() -> Self {
        Self {
            data: T::default(),
            is_loading: true,
            error: None,
        }
    }
}

impl<T> Loadable<T> {
    pub fn ready(data: T) -> Self {
        Self {
            data,
            is_loading: false,
            error: None,
        }
    }

    /// A fetch started. Previous data stays visible.
    pub fn begin(&mut self) {
        self.is_loading = true;
        self.error = None;
    }

    pub fn finish_ok(&mut self, data: T) {
        self.data = data;
        self.is_loading = false;
        self.error = None;
    }

    /// A fetch failed. Previous data is kept for when the user retries.
    pub fn finish_err(&mut self, error: &ClientError) {
        self.is_loading = false;
        self.error = Some(error.to_string());
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Lifetime of a consuming view. Work run inside the scope resolves to
/// `ClientError::Cancelled` once the scope is cancelled, and its result is dropped.
#[derive(Debug, Clone)]
pub struct CancelScope {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelScope {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelScope {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Run `fut` unless the scope is cancelled first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, ClientError> {
        if self.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(ClientError::Cancelled),
            output = fut => {
                if self.is_cancelled() {
                    Err(ClientError::Cancelled)
                } else {
                    Ok(output)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn test_failure_keeps_previous_data() {
        let mut state: Loadable<Vec<u32>> = Loadable::default();
        assert!(state.is_loading);
        state.finish_ok(vec![1, 2]);

        state.begin();
        state.finish_err(&ClientError::MissingIdentity);
        assert_eq!(state.data, vec![1, 2]);
        assert!(!state.is_loading);
        assert!(state.has_error());

        state.begin();
        assert_eq!(state.error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_late_result() {
        let scope = CancelScope::new();
        let task_scope = scope.clone();
        let handle = tokio::spawn(async move {
            task_scope
                .run(async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    7
                })
                .await
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        scope.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(ClientError::Cancelled)));
    }

    #[tokio::test]
    async fn test_run_completes_when_not_cancelled() {
        let scope = CancelScope::new();
        assert_eq!(scope.run(async { 3 }).await.unwrap(), 3);

        scope.cancel();
        assert!(scope.run(async { 3 }).await.is_err());
    }
}
