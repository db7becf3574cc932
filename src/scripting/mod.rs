//! Embedded rhai host: command catalogue, capability filtering, trigger
//! dispatch and fatal-error containment.

pub mod actor;
pub mod callback;
pub mod capability;
pub mod catalogue;
pub mod error;
mod fatal;
pub mod globals;
pub mod host;
pub mod properties;
pub mod triggers;
pub mod value;

pub use actor::{ScriptActor, ScriptPlayer};
pub use callback::ScriptCallback;
pub use capability::CapabilityFilter;
pub use catalogue::{CommandCatalogue, CommandGroupDescriptor, CommandScope, GlobalDescriptor};
pub use error::{ArgError, ScriptHostError, TriggerError};
pub use host::{HostContext, ScriptHost, ScriptSource};
pub use triggers::{route, RoutedDispatch, Trigger, TriggerRegistry};
pub use value::ScriptValue;

/// Log channel for script output and fatal script errors.
pub const SCRIPT_LOG_TARGET: &str = "script";

/// Log channel for host lifecycle messages.
pub const HOST_LOG_TARGET: &str = "script_host";

pub type ScriptResult<T> = Result<T, Box<rhai::EvalAltResult>>;
