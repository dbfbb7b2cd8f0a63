//! Line-oriented command scripts driving a StateController
//!
//! One command per line:
//!
//! ```text
//! start | stop | restart | reset
//! set KEY VALUE      # VALUE is JSON, or a bare string
//! get KEY
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::state::{StateController, StateResponse};

/// Errors from parsing a script line
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing {arg} for '{command}'")]
    MissingArgument { command: &'static str, arg: &'static str },
}

/// A single parsed script command
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptCommand {
    Start,
    Stop,
    Restart,
    Reset,
    Set { key: String, value: Value },
    Get { key: String },
}

/// Parse one line; `Ok(None)` for blank lines and comments
pub fn parse_line(line: &str) -> Result<Option<ScriptCommand>, ScriptError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    debug!(%verb, %rest, "parse_line: called");

    let cmd = match verb.to_lowercase().as_str() {
        "start" => ScriptCommand::Start,
        "stop" => ScriptCommand::Stop,
        "restart" => ScriptCommand::Restart,
        "reset" => ScriptCommand::Reset,
        "get" => {
            if rest.is_empty() {
                return Err(ScriptError::MissingArgument {
                    command: "get",
                    arg: "key",
                });
            }
            ScriptCommand::Get { key: rest.to_string() }
        }
        "set" => {
            let (key, raw) = match rest.split_once(char::is_whitespace) {
                Some((key, raw)) => (key, raw.trim()),
                None if rest.is_empty() => {
                    return Err(ScriptError::MissingArgument {
                        command: "set",
                        arg: "key",
                    });
                }
                None => {
                    return Err(ScriptError::MissingArgument {
                        command: "set",
                        arg: "value",
                    });
                }
            };
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
            ScriptCommand::Set {
                key: key.to_string(),
                value,
            }
        }
        other => return Err(ScriptError::UnknownCommand(other.to_string())),
    };

    Ok(Some(cmd))
}

/// What a successfully executed command produced
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Lifecycle or reset command applied
    Done,
    /// Value returned by a read or acknowledged write; `None` is the empty sentinel
    Value(Option<Value>),
    /// Fire-and-forget write queued
    Queued,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Done => f.write_str("OK"),
            Self::Value(Some(value)) => write!(f, "{}", value),
            Self::Value(None) => f.write_str("(nil)"),
            Self::Queued => f.write_str("queued"),
        }
    }
}

/// Run one command against the controller
pub async fn execute(controller: &StateController<Value>, cmd: ScriptCommand) -> StateResponse<Outcome> {
    debug!(?cmd, "execute: called");
    match cmd {
        ScriptCommand::Start => controller.start().await.map(|_| Outcome::Done),
        ScriptCommand::Stop => controller.stop().await.map(|_| Outcome::Done),
        ScriptCommand::Restart => controller.restart().await.map(|_| Outcome::Done),
        ScriptCommand::Reset => controller.reset().await.map(|_| Outcome::Done),
        ScriptCommand::Set { key, value } => match controller.write(key, value).await? {
            Some(stored) => Ok(Outcome::Value(Some(stored))),
            None => Ok(Outcome::Queued),
        },
        ScriptCommand::Get { key } => controller.read(key).await.map(Outcome::Value),
    }
}
