//! Core data types for the signal desk client.

pub mod admin;
pub mod error;
pub mod event;
pub mod signal;
pub mod subscription;
pub mod user;

pub use admin::*;
pub use error::*;
pub use event::*;
pub use signal::*;
pub use subscription::*;
pub use user::*;
