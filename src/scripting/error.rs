use bevy_ecs::prelude::Entity;
use rhai::EvalAltResult;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::scripting::Trigger;

/// Failures raised while building the host or binding map actors. Script
/// failures at runtime never surface here; they are escalated instead.
#[derive(Debug, Error)]
pub enum ScriptHostError {
    #[error("'{0}' is not a valid global name")]
    InvalidGlobalName(String),
    #[error("Global '{0}' is declared more than once")]
    DuplicateGlobal(String),
    #[error("Command '{member}' is declared by both '{first}' and '{second}'")]
    DuplicateCommand { member: String, first: &'static str, second: &'static str },
    #[error("Failed to read script {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to compile script '{source_name}': {message}")]
    Parse { source_name: String, message: String },
    #[error("Failed to load scripts: {0}")]
    Load(String),
    #[error("The global name '{0}' is reserved, and may not be used by a map actor")]
    NameCollision(String),
    #[error("Actor {0:?} does not exist")]
    UnknownActor(Entity),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriggerError {
    #[error("{} has no internal notification", .0.script_name())]
    NoInternalNotification(Trigger),
}

/// Bad arguments passed from a script into a native command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    #[error("Expected {expected} for '{name}', got {actual}")]
    WrongType { name: &'static str, expected: &'static str, actual: String },
    #[error("Value {value} for '{name}' is out of range")]
    OutOfRange { name: &'static str, value: i64 },
    #[error("{0}")]
    Invalid(String),
}

impl ArgError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ArgError::Invalid(message.into())
    }
}

impl From<ArgError> for Box<EvalAltResult> {
    fn from(err: ArgError) -> Self {
        err.to_string().into()
    }
}
