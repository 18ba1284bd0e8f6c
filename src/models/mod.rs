//! Data models for the queue and signage backend.
//!
//! Field names serialize in camelCase for the web clients.

mod account;
mod display;
mod playlist;
mod service_type;
mod snapshot;
mod ticket;
mod views;

pub use account::*;
pub use display::*;
pub use playlist::*;
pub use service_type::*;
pub use snapshot::*;
pub use ticket::*;
pub use views::*;
