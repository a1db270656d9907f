//! Live price quotes for the symbols currently on screen.
//!
//! ## Architecture
//!
//! - `ticker` - Batched REST quote source and the `PriceSource` trait
//! - `simulated` - Deterministic quote source for demo mode
//! - `poller` - Interval polling that republishes a symbol -> price map

pub mod error;
pub mod poller;
pub mod simulated;
pub mod ticker;

pub use error::*;
pub use poller::*;
pub use simulated::*;
pub use ticker::*;
