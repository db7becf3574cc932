//! Command groups exposed on actor and player values.

pub mod chronosphere;
pub mod general;
pub mod health;
pub mod mobile;
pub mod objectives;
pub mod player;
pub mod production;

use crate::scripting::CommandGroupDescriptor;

pub const BUILTIN: [CommandGroupDescriptor; 7] = [
    general::GROUP,
    health::GROUP,
    mobile::GROUP,
    production::GROUP,
    chronosphere::GROUP,
    player::GROUP,
    objectives::GROUP,
];
