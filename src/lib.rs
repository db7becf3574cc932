//! Mission scripting for a deterministic RTS simulation: an embedded rhai
//! host, per-actor trigger dispatch and the world it drives.

pub mod cli;
pub mod config;
pub mod events;
pub mod game;
pub mod geometry;
pub mod harness;
pub mod logging;
pub mod profiler;
pub mod rules;
pub mod scripting;
pub mod viewport;
pub mod world;

pub use game::Match;
pub use scripting::{CommandCatalogue, ScriptHost, ScriptSource};
