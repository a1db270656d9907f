//! Platform session: host handshake and resolved identity.

use crate::platform::{HostPlatform, ImpactStyle};
use signaldesk_core::TelegramUser;
use std::sync::Arc;
use tracing::info;

/// Header and background color applied on start.
pub const THEME_COLOR: &str = "#0a0a0f";

pub struct Session {
    platform: Arc<dyn HostPlatform>,
    user: Option<TelegramUser>,
    ready: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("ready", &self.ready)
            .finish()
    }
}

impl Session {
    /// Signal readiness to the host, apply the theme and capture the user.
    /// The session is ready afterwards even when the host supplied no user.
    pub fn start(platform: Arc<dyn HostPlatform>) -> Self {
        platform.ready();
        platform.expand();
        platform.set_header_color(THEME_COLOR);
        platform.set_background_color(THEME_COLOR);

        let user = platform.user();
        match &user {
            Some(u) => info!(user_id = u.id, name = %u.display_name(), "Session started"),
            None => info!("Session started without user identity"),
        }

        Self {
            platform,
            user,
            ready: true,
        }
    }

    pub fn user(&self) -> Option<&TelegramUser> {
        self.user.as_ref()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.id)
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn platform(&self) -> &Arc<dyn HostPlatform> {
        &self.platform
    }

    pub fn haptic(&self, style: ImpactStyle) {
        self.platform.impact(style);
    }

    pub fn show_alert(&self, message: &str) {
        self.platform.alert(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::testing::{Call, RecordingPlatform};
    use crate::platform::NoopPlatform;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_start_handshake() {
        let platform = Arc::new(RecordingPlatform::with_user(42));
        let session = Session::start(platform.clone());

        assert!(session.is_ready());
        assert_eq!(session.user_id(), Some(42));
        assert_eq!(
            platform.calls(),
            vec![
                Call::Ready,
                Call::Expand,
                Call::HeaderColor(THEME_COLOR.to_string()),
                Call::BackgroundColor(THEME_COLOR.to_string()),
            ]
        );
    }

    #[test]
    fn test_alert_and_haptics_forwarded() {
        let platform = Arc::new(RecordingPlatform::with_user(7));
        let session = Session::start(platform.clone());
        session.haptic(ImpactStyle::Medium);
        session.show_alert("Saved");

        let calls = platform.calls();
        assert_eq!(
            calls[calls.len() - 2..].to_vec(),
            vec![Call::Impact(ImpactStyle::Medium), Call::Alert("Saved".to_string())]
        );
    }

    #[test]
    fn test_ready_without_host() {
        let session = Session::start(Arc::new(NoopPlatform::new()));
        assert!(session.is_ready());
        assert_eq!(session.user_id(), None);
    }
}
