use rhai::{Dynamic, Engine, FnPtr, INT};

use crate::geometry::CPos;
use crate::scripting::{CommandGroupDescriptor, CommandScope, ScriptActor, ScriptCallback, ScriptResult};
use crate::world::{Activity, DeferredAction};

pub const GROUP: CommandGroupDescriptor = CommandGroupDescriptor {
    name: "General",
    scope: CommandScope::Actor,
    requires: &[],
    commands: &["Type", "Owner", "Location", "IsDead", "IsInWorld", "HasProperty", "Stop", "Wait", "CallFunc", "Destroy"],
    exposed_for_destroyed: true,
    register,
};

fn register(engine: &mut Engine) {
    engine.register_type_with_name::<ScriptActor>("Actor");
    engine.register_fn("to_string", |actor: &mut ScriptActor| actor.to_string());
    engine.register_fn("to_debug", |actor: &mut ScriptActor| actor.to_string());
    engine.register_fn("==", |a: ScriptActor, b: ScriptActor| a == b);
    engine.register_fn("!=", |a: ScriptActor, b: ScriptActor| a != b);

    engine.register_get("Type", |actor: &mut ScriptActor| actor.info().name.clone());
    engine.register_get("Owner", owner);
    engine.register_get("Location", location);
    engine.register_get("IsDead", |actor: &mut ScriptActor| actor.is_dead());
    engine.register_get("IsInWorld", is_in_world);
    engine.register_fn("HasProperty", |actor: ScriptActor, name: &str| actor.has_property(name));

    engine.register_fn("Stop", |actor: ScriptActor| -> ScriptResult<()> {
        actor.queue(DeferredAction::CancelActivities { actor: actor.entity() })
    });
    engine.register_fn("Wait", |actor: ScriptActor, ticks: INT| -> ScriptResult<()> {
        let activity = Activity::Wait { remaining: ticks.clamp(0, u32::MAX as INT) as u32 };
        actor.queue(DeferredAction::QueueActivity { actor: actor.entity(), activity })
    });
    engine.register_fn("CallFunc", |actor: ScriptActor, function: FnPtr| -> ScriptResult<()> {
        let callback = ScriptCallback::new(function, actor.context().host(), Vec::new());
        actor.queue(DeferredAction::QueueActivity { actor: actor.entity(), activity: Activity::CallScript(callback) })
    });
    engine.register_fn("Destroy", |actor: ScriptActor| -> ScriptResult<()> {
        actor.queue(DeferredAction::Dispose { actor: actor.entity() })
    });
}

fn owner(actor: &mut ScriptActor) -> ScriptResult<Dynamic> {
    let owner = actor.context().world()?.borrow().owner(actor.entity());
    Ok(owner.map_or(Dynamic::UNIT, |player| actor.context().player_value(player)))
}

fn location(actor: &mut ScriptActor) -> ScriptResult<CPos> {
    let location = actor.context().world()?.borrow().location(actor.entity());
    location.ok_or_else(|| format!("{actor} has no location").into())
}

fn is_in_world(actor: &mut ScriptActor) -> ScriptResult<bool> {
    Ok(actor.context().world()?.borrow().is_in_world(actor.entity()))
}
