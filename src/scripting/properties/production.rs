use rhai::Engine;

use crate::rules::behavior;
use crate::scripting::{CommandGroupDescriptor, CommandScope, ScriptActor, ScriptResult};
use crate::world::DeferredAction;

pub const GROUP: CommandGroupDescriptor = CommandGroupDescriptor {
    name: "Production",
    scope: CommandScope::Actor,
    requires: &[behavior::PRODUCTION],
    commands: &["Produce"],
    exposed_for_destroyed: false,
    register,
};

fn register(engine: &mut Engine) {
    engine.register_fn("Produce", |actor: ScriptActor, actor_type: &str| -> ScriptResult<()> {
        actor.require("Produce")?;
        if actor.context().world()?.borrow().rules().get(actor_type).is_none() {
            return Err(format!("Unknown actor type '{actor_type}'").into());
        }
        actor.queue(DeferredAction::Produce { producer: actor.entity(), actor_type: actor_type.to_string() })
    });
}
