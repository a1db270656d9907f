//! Admin edit and close flow for a single signal.

use crate::collections::SignalsStore;
use crate::error::ClientError;
use crate::platform::{HostPlatform, NotificationKind};
use signaldesk_core::{parse_price, Entry, Signal, SignalUpdate, Target};
use tracing::{debug, error, info, instrument};

/// In-progress edit of a signal's levels and comment.
#[derive(Debug, Clone, PartialEq)]
pub struct EditBuffer {
    pub entries: Vec<Entry>,
    pub targets: Vec<Target>,
    pub stop_loss: f64,
    pub comment: String,
}

impl EditBuffer {
    pub fn from_signal(signal: &Signal) -> Self {
        Self {
            entries: signal.entries.clone(),
            targets: signal.targets.clone(),
            stop_loss: signal.stop_loss,
            comment: signal.comment.clone().unwrap_or_default(),
        }
    }

    /// Full replacement payload. Entries and targets must stay non-empty.
    pub fn to_update(&self) -> Result<SignalUpdate, ClientError> {
        if self.entries.is_empty() {
            return Err(ClientError::InvalidEdit("at least one entry is required".to_string()));
        }
        if self.targets.is_empty() {
            return Err(ClientError::InvalidEdit("at least one target is required".to_string()));
        }
        if self.stop_loss <= 0.0 {
            return Err(ClientError::InvalidEdit("stop loss must be positive".to_string()));
        }

        Ok(SignalUpdate {
            entries: Some(self.entries.clone()),
            targets: Some(self.targets.clone()),
            stop_loss: Some(self.stop_loss),
            comment: Some(self.comment.trim().to_string()),
            status: None,
        })
    }
}

pub struct SignalEditor {
    signal_id: String,
    symbol: String,
    original: EditBuffer,
    buffer: EditBuffer,
    editing: bool,
}

impl SignalEditor {
    pub fn new(signal: &Signal) -> Self {
        let buffer = EditBuffer::from_signal(signal);
        Self {
            signal_id: signal.id.clone(),
            symbol: signal.symbol.to_string(),
            original: buffer.clone(),
            buffer,
            editing: false,
        }
    }

    pub fn signal_id(&self) -> &str {
        &self.signal_id
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn begin(&mut self) {
        self.editing = true;
    }

    /// Leave edit mode and drop unsaved changes.
    pub fn discard(&mut self) {
        self.buffer = self.original.clone();
        self.editing = false;
    }

    pub fn buffer(&self) -> &EditBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut EditBuffer {
        &mut self.buffer
    }

    pub fn is_dirty(&self) -> bool {
        self.buffer != self.original
    }

    pub fn set_entry_price(&mut self, index: usize, input: &str) -> Result<(), ClientError> {
        let price = parse_price(input).map_err(|e| ClientError::InvalidEdit(e.to_string()))?;
        let entry = self
            .buffer
            .entries
            .get_mut(index)
            .ok_or_else(|| ClientError::InvalidEdit(format!("no entry #{}", index + 1)))?;
        entry.price = price;
        Ok(())
    }

    pub fn set_target_price(&mut self, index: usize, input: &str) -> Result<(), ClientError> {
        let price = parse_price(input).map_err(|e| ClientError::InvalidEdit(e.to_string()))?;
        let target = self
            .buffer
            .targets
            .get_mut(index)
            .ok_or_else(|| ClientError::InvalidEdit(format!("no target #{}", index + 1)))?;
        target.price = price;
        Ok(())
    }

    pub fn set_stop_loss(&mut self, input: &str) -> Result<(), ClientError> {
        self.buffer.stop_loss =
            parse_price(input).map_err(|e| ClientError::InvalidEdit(e.to_string()))?;
        Ok(())
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.buffer.comment = comment.into();
    }

    /// Send the buffer as a full replacement, refetch the list and leave edit mode.
    ///
    /// On failure the host shows an error notification and alert, and the
    /// buffer is kept so the admin can retry.
    #[instrument(skip_all, fields(signal_id = %self.signal_id))]
    pub async fn save(
        &mut self,
        store: &SignalsStore,
        platform: &dyn HostPlatform,
    ) -> Result<(), ClientError> {
        let result = match self.buffer.to_update() {
            Ok(update) => store
                .backend()
                .update_signal(&self.signal_id, &update)
                .await
                .map_err(ClientError::from),
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            error!(error = %e, "Failed to save signal");
            platform.notify(NotificationKind::Error);
            platform.alert(&format!("Failed to save {}: {e}", self.symbol));
            return Err(e);
        }

        info!("Signal updated");
        platform.notify(NotificationKind::Success);
        if let Err(e) = store.refetch().await {
            debug!(error = %e, "Refetch after save failed");
        }
        self.original = self.buffer.clone();
        self.editing = false;
        Ok(())
    }

    /// Ask for confirmation, then close the signal and refetch the list.
    /// Returns false when the admin declined.
    #[instrument(skip_all, fields(signal_id = %self.signal_id))]
    pub async fn close(
        &self,
        store: &SignalsStore,
        platform: &dyn HostPlatform,
    ) -> Result<bool, ClientError> {
        let question = format!("Close {} signal?", self.symbol);
        if !platform.confirm(&question).await {
            debug!("Close declined");
            return Ok(false);
        }

        if let Err(e) = store.backend().close_signal(&self.signal_id).await {
            error!(error = %e, "Failed to close signal");
            platform.notify(NotificationKind::Error);
            platform.alert(&format!("Failed to close {}: {e}", self.symbol));
            return Err(e.into());
        }

        info!("Signal closed");
        platform.notify(NotificationKind::Success);
        if let Err(e) = store.refetch().await {
            debug!(error = %e, "Refetch after close failed");
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::testing::{Call, RecordingPlatform};
    use pretty_assertions::assert_eq;
    use signaldesk_core::SignalStatus;
    use signaldesk_gateway::{MemoryBackend, SignalFilter};
    use std::sync::Arc;

    async fn setup() -> (Arc<MemoryBackend>, SignalsStore, Signal) {
        let backend = Arc::new(MemoryBackend::demo(1).await);
        let store = SignalsStore::new(backend.clone(), SignalFilter::default());
        store.refetch().await.unwrap();
        let signal = backend.signal("signal-1").await.unwrap();
        (backend, store, signal)
    }

    #[tokio::test]
    async fn test_save_updates_and_refetches() {
        let (backend, store, signal) = setup().await;
        let platform = RecordingPlatform::default();
        let mut editor = SignalEditor::new(&signal);
        editor.begin();
        editor.set_entry_price(0, "63000").unwrap();
        editor.set_stop_loss("59000").unwrap();
        editor.set_comment("Moved stop");
        assert!(editor.is_dirty());

        editor.save(&store, &platform).await.unwrap();

        assert!(!editor.is_editing());
        let stored = backend.signal("signal-1").await.unwrap();
        assert_eq!(stored.entries[0].price, 63000.0);
        assert_eq!(stored.stop_loss, 59000.0);
        assert_eq!(stored.comment.as_deref(), Some("Moved stop"));

        let listed = store.items().await;
        let listed = listed.iter().find(|s| s.id == "signal-1").unwrap();
        assert_eq!(listed.stop_loss, 59000.0);
        assert_eq!(platform.calls(), vec![Call::Notify(NotificationKind::Success)]);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_buffer() {
        let (backend, store, signal) = setup().await;
        let platform = RecordingPlatform::default();
        let mut editor = SignalEditor::new(&signal);
        editor.begin();
        editor.set_stop_loss("58000").unwrap();

        backend.set_failing(true);
        assert!(editor.save(&store, &platform).await.is_err());

        assert!(editor.is_editing());
        assert_eq!(editor.buffer().stop_loss, 58000.0);
        let calls = platform.calls();
        assert_eq!(calls[0], Call::Notify(NotificationKind::Error));
        assert!(matches!(calls[1], Call::Alert(_)));
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected() {
        let (_, _, signal) = setup().await;
        let mut editor = SignalEditor::new(&signal);
        assert!(editor.set_entry_price(0, "abc").is_err());
        assert!(editor.set_target_price(9, "100").is_err());

        editor.buffer_mut().targets.clear();
        assert!(editor.buffer().to_update().is_err());

        editor.discard();
        assert!(!editor.is_dirty());
    }

    #[tokio::test]
    async fn test_close_requires_confirmation() {
        let (backend, store, signal) = setup().await;
        let platform = RecordingPlatform::default();
        let editor = SignalEditor::new(&signal);

        platform.reply_to_confirm(false);
        let requests = backend.request_count();
        assert!(!editor.close(&store, &platform).await.unwrap());
        assert_eq!(backend.request_count(), requests);
        assert_eq!(backend.signal("signal-1").await.unwrap().status, SignalStatus::Active);

        platform.reply_to_confirm(true);
        assert!(editor.close(&store, &platform).await.unwrap());
        assert_eq!(backend.signal("signal-1").await.unwrap().status, SignalStatus::Closed);
        assert!(store.items().await.iter().all(|s| s.id != "signal-1"));
    }
}
