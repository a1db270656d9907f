//! Host platform capabilities: identity, haptics and dialogs.
//!
//! Every capability has a no-op default so a front-end running outside the
//! chat host still works, just without feedback.

use async_trait::async_trait;
use signaldesk_core::TelegramUser;
use tracing::debug;

/// Haptic impact strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImpactStyle {
    Light,
    Medium,
    Heavy,
}

impl ImpactStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            ImpactStyle::Light => "light",
            ImpactStyle::Medium => "medium",
            ImpactStyle::Heavy => "heavy",
        }
    }
}

/// Outcome notification feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
        }
    }
}

/// Capability interface to the host the app is embedded in.
#[async_trait]
pub trait HostPlatform: Send + Sync {
    /// Identity resolved by the host, if any.
    fn user(&self) -> Option<TelegramUser>;

    fn ready(&self) {}

    fn expand(&self) {}

    fn set_header_color(&self, _color: &str) {}

    fn set_background_color(&self, _color: &str) {}

    fn impact(&self, _style: ImpactStyle) {}

    fn selection_changed(&self) {}

    fn notify(&self, _kind: NotificationKind) {}

    /// Non-blocking message to the user.
    fn alert(&self, message: &str);

    /// Ask the user to confirm. Resolves once the dialog is dismissed.
    async fn confirm(&self, message: &str) -> bool;
}

/// Platform used when no host is present.
#[derive(Debug, Clone, Default)]
pub struct NoopPlatform {
    user: Option<TelegramUser>,
}

impl NoopPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// No host bridge, but an identity supplied from elsewhere (e.g., verified init data).
    pub fn with_user(user: TelegramUser) -> Self {
        Self { user: Some(user) }
    }
}

#[async_trait]
impl HostPlatform for NoopPlatform {
    fn user(&self) -> Option<TelegramUser> {
        self.user.clone()
    }

    fn alert(&self, message: &str) {
        debug!(message, "Alert without host platform");
    }

    async fn confirm(&self, message: &str) -> bool {
        debug!(message, "Confirm without host platform, declining");
        false
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Ready,
        Expand,
        HeaderColor(String),
        BackgroundColor(String),
        Impact(ImpactStyle),
        Selection,
        Notify(NotificationKind),
        Alert(String),
        Confirm(String),
    }

    /// Records every call and answers confirms with a fixed reply.
    #[derive(Debug, Default)]
    pub struct RecordingPlatform {
        pub user: Option<TelegramUser>,
        confirm_reply: AtomicBool,
        calls: Mutex<Vec<Call>>,
    }

    impl RecordingPlatform {
        pub fn with_user(id: i64) -> Self {
            Self {
                user: Some(TelegramUser::new(id, "Tester")),
                ..Default::default()
            }
        }

        pub fn reply_to_confirm(&self, reply: bool) {
            self.confirm_reply.store(reply, Ordering::SeqCst);
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl HostPlatform for RecordingPlatform {
        fn user(&self) -> Option<TelegramUser> {
            self.user.clone()
        }

        fn ready(&self) {
            self.record(Call::Ready);
        }

        fn expand(&self) {
            self.record(Call::Expand);
        }

        fn set_header_color(&self, color: &str) {
            self.record(Call::HeaderColor(color.to_string()));
        }

        fn set_background_color(&self, color: &str) {
            self.record(Call::BackgroundColor(color.to_string()));
        }

        fn impact(&self, style: ImpactStyle) {
            self.record(Call::Impact(style));
        }

        fn selection_changed(&self) {
            self.record(Call::Selection);
        }

        fn notify(&self, kind: NotificationKind) {
            self.record(Call::Notify(kind));
        }

        fn alert(&self, message: &str) {
            self.record(Call::Alert(message.to_string()));
        }

        async fn confirm(&self, message: &str) -> bool {
            self.record(Call::Confirm(message.to_string()));
            self.confirm_reply.load(Ordering::SeqCst)
        }
    }
}
