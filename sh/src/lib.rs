//! stateholder - single-writer key-value state over message passing
//!
//! One worker task owns a `HashMap<String, V>`. Reads, writes and resets are
//! sent to it as messages with per-request reply channels, so the map is
//! never shared and every operation is applied in a single total order.
//!
//! # Example
//!
//! ```ignore
//! use stateholder::{StateConfig, StateController};
//!
//! let state = StateController::<String>::new(StateConfig::default());
//! state.start().await?;
//! state.write("Foo", "Bar".to_string()).await?;
//! assert_eq!(state.read("Foo").await?, Some("Bar".to_string()));
//! state.stop().await?;
//! ```
//!
//! # Modules
//!
//! - [`state`] - worker, controller, messages and errors
//! - [`config`] - configuration file loading
//! - [`script`] - line-oriented command scripts
//! - [`stress`] - concurrent load verification
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod script;
pub mod state;
pub mod stress;

pub use config::Config;
pub use state::{
    Operation, StateCommand, StateConfig, StateController, StateError, StateResponse, WriteMode,
    event_logging_enabled, set_event_logging,
};
