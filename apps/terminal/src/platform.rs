//! Host platform backed by the terminal UI.
//!
//! Dialogs and feedback are forwarded to the UI loop over a channel; confirm
//! waits for the user's answer on a oneshot.

use async_trait::async_trait;
use signaldesk_client::{HostPlatform, ImpactStyle, NotificationKind};
use signaldesk_core::TelegramUser;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

#[derive(Debug)]
pub enum PlatformRequest {
    Alert(String),
    Confirm {
        message: String,
        reply: oneshot::Sender<bool>,
    },
    Notify(NotificationKind),
}

pub struct TerminalPlatform {
    user: Option<TelegramUser>,
    tx: mpsc::UnboundedSender<PlatformRequest>,
}

impl TerminalPlatform {
    pub fn new(user: Option<TelegramUser>) -> (Self, mpsc::UnboundedReceiver<PlatformRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { user, tx }, rx)
    }
}

#[async_trait]
impl HostPlatform for TerminalPlatform {
    fn user(&self) -> Option<TelegramUser> {
        self.user.clone()
    }

    fn ready(&self) {
        debug!("Terminal host ready");
    }

    fn impact(&self, style: ImpactStyle) {
        trace!(style = style.as_str(), "Impact");
    }

    fn notify(&self, kind: NotificationKind) {
        let _ = self.tx.send(PlatformRequest::Notify(kind));
    }

    fn alert(&self, message: &str) {
        let _ = self.tx.send(PlatformRequest::Alert(message.to_string()));
    }

    /// Resolves to false if the UI is gone.
    async fn confirm(&self, message: &str) -> bool {
        let (reply, answer) = oneshot::channel();
        let request = PlatformRequest::Confirm {
            message: message.to_string(),
            reply,
        };
        if self.tx.send(request).is_err() {
            return false;
        }
        answer.await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_confirm_round_trip() {
        let (platform, mut rx) = TerminalPlatform::new(None);

        let ui = tokio::spawn(async move {
            match rx.recv().await {
                Some(PlatformRequest::Confirm { message, reply }) => {
                    assert_eq!(message, "Close BTCUSDT signal?");
                    let _ = reply.send(true);
                }
                other => panic!("unexpected request: {other:?}"),
            }
        });

        assert!(platform.confirm("Close BTCUSDT signal?").await);
        ui.await.unwrap();
    }

    #[tokio::test]
    async fn test_confirm_without_ui_declines() {
        let (platform, rx) = TerminalPlatform::new(None);
        drop(rx);
        assert!(!platform.confirm("Close?").await);
    }

    #[tokio::test]
    async fn test_dropped_reply_declines() {
        let (platform, mut rx) = TerminalPlatform::new(None);
        let ui = tokio::spawn(async move {
            // Dismissed without an answer.
            let _ = rx.recv().await;
        });
        assert!(!platform.confirm("Close?").await);
        ui.await.unwrap();
    }
}
