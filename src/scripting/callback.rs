use rhai::FnPtr;
use std::fmt;
use std::rc::Weak;

use crate::scripting::{ScriptHost, ScriptValue};

/// A script function queued to run later, either as an actor activity or a
/// delayed frame-end action. Cancelling releases the captured closure.
pub struct ScriptCallback {
    function: Option<FnPtr>,
    host: Weak<ScriptHost>,
    args: Vec<ScriptValue>,
}

impl ScriptCallback {
    pub fn new(function: FnPtr, host: Weak<ScriptHost>, args: Vec<ScriptValue>) -> Self {
        Self { function: Some(function), host, args }
    }

    pub fn is_cancelled(&self) -> bool {
        self.function.is_none()
    }

    pub fn cancel(&mut self) {
        self.function = None;
    }

    /// Runs on the owning host. Errors go to that host's fatal-error path.
    pub fn run(self) {
        let ScriptCallback { function, host, args } = self;
        let (Some(function), Some(host)) = (function, host.upgrade()) else {
            return;
        };
        host.invoke_contained(&function, &args);
    }
}

impl fmt::Debug for ScriptCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.function {
            Some(function) => write!(f, "ScriptCallback({})", function.fn_name()),
            None => write!(f, "ScriptCallback(cancelled)"),
        }
    }
}
