//! Signal desk administrators.

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// An admin who publishes and manages signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admin {
    pub id: String,
    pub telegram_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    pub display_name: String,
    #[serde(default)]
    pub is_super_admin: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Look up the platform user id behind an admin row id.
pub fn admin_telegram_id(admins: &[Admin], admin_id: &str) -> Option<i64> {
    admins
        .iter()
        .find(|a| a.id == admin_id)
        .map(|a| a.telegram_id)
}
