//! Ticket queue core: numbering, lifecycle rules and projections.

pub mod lifecycle;
pub mod projection;
pub mod sequence;

pub use sequence::{format_number, DayWindow, NumberingMode};
