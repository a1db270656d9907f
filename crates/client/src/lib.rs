//! Client state layer for the signal desk.
//!
//! ## Architecture
//!
//! - `platform` - Host capabilities (identity, haptics, dialogs) behind a trait
//! - `init_data` - Signed launch parameters from the chat host
//! - `session` - Host handshake and resolved user
//! - `access` - Admin/whitelist admission gate
//! - `collections` - Signals, events and admins with refetch
//! - `subscriptions` - Subscription sets with confirm-then-update toggles
//! - `editor` - Admin edit/close flow for a signal
//! - `loadable` - Loading/error/data state and cancellation scopes

pub mod access;
pub mod collections;
pub mod editor;
pub mod error;
pub mod init_data;
pub mod loadable;
pub mod platform;
pub mod session;
pub mod subscriptions;

pub use access::{AccessGate, AccessState};
pub use collections::{
    Admins, AdminsStore, Collection, CollectionStore, Events, EventsStore, Signals, SignalsStore,
};
pub use editor::{EditBuffer, SignalEditor};
pub use error::ClientError;
pub use init_data::InitData;
pub use loadable::{CancelScope, Loadable};
pub use platform::{HostPlatform, ImpactStyle, NoopPlatform, NotificationKind};
pub use session::{Session, THEME_COLOR};
pub use subscriptions::{
    EventKind, EventSubscriptions, SignalKind, SignalSubscriptions, SubscriptionKind,
    SubscriptionStore,
};
