use rhai::{Engine, INT};

use crate::rules::behavior;
use crate::scripting::{CommandGroupDescriptor, CommandScope, ScriptActor, ScriptResult};
use crate::world::{DeferredAction, Health};

pub const GROUP: CommandGroupDescriptor = CommandGroupDescriptor {
    name: "Health",
    scope: CommandScope::Actor,
    requires: &[behavior::HEALTH],
    commands: &["Health", "MaxHealth", "Kill"],
    exposed_for_destroyed: false,
    register,
};

fn register(engine: &mut Engine) {
    engine.register_get("Health", |actor: &mut ScriptActor| -> ScriptResult<INT> {
        actor.require("Health")?;
        Ok(health(actor)?.hp as INT)
    });
    // Setting health inflicts the difference as untraced damage.
    engine.register_set("Health", |actor: &mut ScriptActor, value: INT| -> ScriptResult<()> {
        actor.require("Health")?;
        let current = health(actor)?;
        let target = value.clamp(0, current.max as INT) as i32;
        actor.queue(DeferredAction::Damage { actor: actor.entity(), attacker: None, amount: current.hp - target })
    });
    engine.register_get("MaxHealth", |actor: &mut ScriptActor| -> ScriptResult<INT> {
        actor.require("MaxHealth")?;
        Ok(health(actor)?.max as INT)
    });
    engine.register_fn("Kill", |actor: ScriptActor| -> ScriptResult<()> {
        actor.require("Kill")?;
        actor.queue(DeferredAction::Kill { actor: actor.entity(), attacker: None })
    });
}

fn health(actor: &ScriptActor) -> ScriptResult<Health> {
    let health = actor.context().world()?.borrow().health(actor.entity());
    health.ok_or_else(|| format!("{actor} has no health").into())
}
