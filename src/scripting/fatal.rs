use std::backtrace::Backtrace;
use tracing::{error, warn};

use crate::scripting::host::HostState;
use crate::scripting::SCRIPT_LOG_TARGET;
use crate::world::DeferredAction;

/// Records an unrecoverable script failure and halts the match. Only the first
/// report on a host queues the halt; later ones are logged.
pub(crate) fn escalate(state: &HostState, message: &str) {
    let trace = Backtrace::force_capture();
    error!(target: SCRIPT_LOG_TARGET, "Fatal script error: {message}");
    error!(target: SCRIPT_LOG_TARGET, "{trace}");
    eprintln!("Fatal script error: {message}");
    eprintln!("{trace}");
    state.push_log(format!("Fatal script error: {message}"));

    if state.fatal_error.replace(true) {
        return;
    }
    let Some(world) = state.world.upgrade() else {
        warn!(target: SCRIPT_LOG_TARGET, "world already gone; match halt not queued");
        return;
    };
    let borrowed = world.try_borrow_mut();
    match borrowed {
        Some(mut world) => world.queue_frame_end(DeferredAction::HaltMatch),
        None => error!(target: SCRIPT_LOG_TARGET, "world busy; match halt not queued"),
    };
}
