//! Remote data gateway for the hosted signal desk tables.
//!
//! This crate provides:
//! - A PostgREST-style REST client with filter query building
//! - Typed API functions over the signal, event, subscription and access tables
//! - The `Backend` trait consumed by the client state layer
//! - An in-memory backend with the same mutation semantics for demo mode and tests

pub mod api;
pub mod backend;
pub mod client;
pub mod error;
pub mod memory;
pub mod query;

pub use api::Api;
pub use backend::{Backend, EventQuery, SignalFilter};
pub use client::{GatewayConfig, RestClient};
pub use error::GatewayError;
pub use memory::MemoryBackend;
pub use query::Query;
