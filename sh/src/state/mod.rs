//! State holder with actor pattern
//!
//! A single worker task owns the key-value map and processes messages via
//! channels; StateController wraps it with a start/stop lifecycle and
//! request/response calls.

mod config;
mod controller;
mod messages;
mod trace;
mod worker;

pub use config::{StateConfig, WriteMode};
pub use controller::StateController;
pub use messages::{Operation, StateCommand, StateError, StateResponse};
pub use trace::{event_logging_enabled, set_event_logging};
