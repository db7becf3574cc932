use rhai::{Dynamic, Engine};

use crate::rules::behavior;
use crate::scripting::value::{expect_cell, expect_cells};
use crate::scripting::{CommandGroupDescriptor, CommandScope, ScriptActor, ScriptResult};
use crate::world::{Activity, DeferredAction};

pub const GROUP: CommandGroupDescriptor = CommandGroupDescriptor {
    name: "Movement",
    scope: CommandScope::Actor,
    requires: &[behavior::MOBILE],
    commands: &["Move", "MoveThrough"],
    exposed_for_destroyed: false,
    register,
};

fn register(engine: &mut Engine) {
    engine.register_fn("Move", |actor: ScriptActor, cell: Dynamic| -> ScriptResult<()> {
        actor.require("Move")?;
        let destination = expect_cell(&cell, "cell")?;
        actor.queue(DeferredAction::QueueActivity { actor: actor.entity(), activity: Activity::Move { destination } })
    });
    engine.register_fn("MoveThrough", |actor: ScriptActor, cells: Dynamic| -> ScriptResult<()> {
        actor.require("MoveThrough")?;
        for destination in expect_cells(&cells, "cells")? {
            actor.queue(DeferredAction::QueueActivity {
                actor: actor.entity(),
                activity: Activity::Move { destination },
            })?;
        }
        Ok(())
    });
}
