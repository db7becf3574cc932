use rhai::{Array, Engine, INT};

use crate::geometry::CPos;
use crate::rules::behavior;
use crate::scripting::value::{expect_actor, expect_array, expect_cell};
use crate::scripting::{ArgError, CommandGroupDescriptor, CommandScope, ScriptActor, ScriptResult};
use crate::world::DeferredAction;

pub const GROUP: CommandGroupDescriptor = CommandGroupDescriptor {
    name: "Support Powers",
    scope: CommandScope::Actor,
    requires: &[behavior::CHRONOSHIFT_POWER],
    commands: &["Chronoshift"],
    exposed_for_destroyed: false,
    register,
};

fn register(engine: &mut Engine) {
    engine.register_fn("Chronoshift", |actor: ScriptActor, pairs: Array| chronoshift(&actor, pairs, 0));
    engine.register_fn("Chronoshift", |actor: ScriptActor, pairs: Array, duration: INT| {
        chronoshift(&actor, pairs, duration)
    });
}

/// Teleports every `[actor, cell]` pair. With a positive duration the units
/// are returned to where they started once it elapses.
fn chronoshift(power: &ScriptActor, pairs: Array, duration: INT) -> ScriptResult<()> {
    power.require("Chronoshift")?;
    let mut targets: Vec<(ScriptActor, CPos)> = Vec::with_capacity(pairs.len());
    for pair in &pairs {
        let pair = expect_array(pair, "pairs")?;
        let [target, cell] = pair.as_slice() else {
            return Err(ArgError::invalid("Chronoshift expects [actor, cell] pairs").into());
        };
        targets.push((expect_actor(target, "actor")?, expect_cell(cell, "cell")?));
    }

    let world = power.context().world()?;
    let mut world = world.borrow_mut();
    for (target, cell) in targets {
        let actor = target.entity();
        let origin = world.location(actor);
        world.queue_frame_end(DeferredAction::CancelActivities { actor });
        world.queue_frame_end(DeferredAction::Teleport { actor, cell });
        if let (Some(origin), true) = (origin, duration > 0) {
            world.queue_delayed(duration as u64, DeferredAction::Teleport { actor, cell: origin });
        }
    }
    Ok(())
}
