//! Admission check: admins first, then the whitelist.

use signaldesk_core::Admin;
use signaldesk_gateway::Backend;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Outcome of the access check.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessState {
    /// Identity not resolved yet. Never treated as a denial.
    Loading,
    Denied,
    Allowed { admin: Option<Admin> },
}

impl AccessState {
    pub fn is_loading(&self) -> bool {
        matches!(self, AccessState::Loading)
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessState::Allowed { .. })
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, AccessState::Allowed { admin: Some(_) })
    }

    pub fn admin(&self) -> Option<&Admin> {
        match self {
            AccessState::Allowed { admin } => admin.as_ref(),
            _ => None,
        }
    }
}

pub struct AccessGate {
    backend: Arc<dyn Backend>,
}

impl AccessGate {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Admins are admitted as admins; active whitelist entries as plain users.
    /// A failed lookup is logged and counts as "not found". No retry.
    #[instrument(skip(self))]
    pub async fn check(&self, user_id: Option<i64>) -> AccessState {
        let Some(user_id) = user_id else {
            return AccessState::Loading;
        };

        match self.backend.check_admin(user_id).await {
            Ok(Some(admin)) => {
                debug!(user_id, admin = %admin.display_name, "Admitted as admin");
                return AccessState::Allowed { admin: Some(admin) };
            }
            Ok(None) => {}
            Err(e) => warn!(user_id, error = %e, "Admin check failed"),
        }

        match self.backend.check_whitelist(user_id).await {
            Ok(true) => {
                debug!(user_id, "Admitted from whitelist");
                AccessState::Allowed { admin: None }
            }
            Ok(false) => {
                debug!(user_id, "Not whitelisted");
                AccessState::Denied
            }
            Err(e) => {
                warn!(user_id, error = %e, "Whitelist check failed, denying access");
                AccessState::Denied
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signaldesk_gateway::MemoryBackend;

    fn admin(telegram_id: i64, is_active: bool) -> Admin {
        Admin {
            id: format!("admin-{telegram_id}"),
            telegram_id,
            username: None,
            display_name: "Desk".to_string(),
            is_super_admin: false,
            is_active,
        }
    }

    async fn gate() -> (Arc<MemoryBackend>, AccessGate) {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_admin(admin(1, true)).await;
        backend.add_admin(admin(2, false)).await;
        backend.add_whitelist(3, true).await;
        backend.add_whitelist(4, false).await;
        (backend.clone(), AccessGate::new(backend))
    }

    #[tokio::test]
    async fn test_admin_is_allowed_and_admin() {
        let (_, gate) = gate().await;
        let state = gate.check(Some(1)).await;
        assert!(state.is_allowed());
        assert!(state.is_admin());
        assert_eq!(state.admin().map(|a| a.telegram_id), Some(1));
    }

    #[tokio::test]
    async fn test_whitelisted_is_allowed_not_admin() {
        let (_, gate) = gate().await;
        let state = gate.check(Some(3)).await;
        assert!(state.is_allowed());
        assert!(!state.is_admin());
    }

    #[tokio::test]
    async fn test_unknown_or_inactive_is_denied() {
        let (_, gate) = gate().await;
        assert_eq!(gate.check(Some(99)).await, AccessState::Denied);
        assert_eq!(gate.check(Some(2)).await, AccessState::Denied);
        assert_eq!(gate.check(Some(4)).await, AccessState::Denied);
    }

    #[tokio::test]
    async fn test_missing_identity_is_loading() {
        let (backend, gate) = gate().await;
        let state = gate.check(None).await;
        assert!(state.is_loading());
        assert!(!state.is_allowed());
        assert_eq!(backend.request_count(), 0);
    }

    #[tokio::test]
    async fn test_backend_failure_denies() {
        let (backend, gate) = gate().await;
        backend.set_failing(true);
        assert_eq!(gate.check(Some(1)).await, AccessState::Denied);
    }
}
