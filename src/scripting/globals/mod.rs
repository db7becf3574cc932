//! World-scoped singletons bound as script globals.

pub mod camera;
pub mod cell;
pub mod player;
pub mod reinforcements;
pub mod trigger;
pub mod utils;

use crate::scripting::GlobalDescriptor;

pub const BUILTIN: [GlobalDescriptor; 7] = [
    trigger::GLOBAL,
    utils::GLOBAL,
    reinforcements::GLOBAL,
    cell::CPOS_GLOBAL,
    cell::CVEC_GLOBAL,
    player::GLOBAL,
    camera::GLOBAL,
];
