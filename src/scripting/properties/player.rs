use rhai::{Array, Dynamic, Engine};

use crate::scripting::{CommandGroupDescriptor, CommandScope, ScriptPlayer, ScriptResult};
use crate::world::Player;

pub const GROUP: CommandGroupDescriptor = CommandGroupDescriptor {
    name: "Player",
    scope: CommandScope::Player,
    requires: &[],
    commands: &["Name", "InternalName", "IsLocalPlayer", "GetActors", "GetActorsByType"],
    exposed_for_destroyed: true,
    register,
};

fn register(engine: &mut Engine) {
    engine.register_type_with_name::<ScriptPlayer>("Player");
    engine.register_fn("to_string", |player: &mut ScriptPlayer| describe(player));
    engine.register_fn("to_debug", |player: &mut ScriptPlayer| describe(player));
    engine.register_fn("==", |a: ScriptPlayer, b: ScriptPlayer| a == b);
    engine.register_fn("!=", |a: ScriptPlayer, b: ScriptPlayer| a != b);

    engine.register_get("Name", |player: &mut ScriptPlayer| with_player(player, |p| p.name.clone()));
    engine.register_get("InternalName", |player: &mut ScriptPlayer| {
        with_player(player, |p| p.internal_name.clone())
    });
    engine.register_get("IsLocalPlayer", |player: &mut ScriptPlayer| with_player(player, |p| p.is_local));
    engine.register_fn("GetActors", |player: ScriptPlayer| actors(&player, None));
    engine.register_fn("GetActorsByType", |player: ScriptPlayer, actor_type: &str| {
        actors(&player, Some(actor_type))
    });
}

pub(crate) fn with_player<T>(player: &ScriptPlayer, f: impl FnOnce(&Player) -> T) -> ScriptResult<T> {
    let world = player.context().world()?;
    let world = world.borrow();
    let p = world.player(player.id()).ok_or_else(|| format!("Player {} does not exist", player.id().0))?;
    Ok(f(p))
}

fn describe(player: &ScriptPlayer) -> String {
    match with_player(player, |p| p.internal_name.clone()) {
        Ok(name) => format!("Player ({name})"),
        Err(_) => format!("Player ({})", player.id().0),
    }
}

/// In-world actors owned by the player, in spawn order.
fn actors(player: &ScriptPlayer, actor_type: Option<&str>) -> ScriptResult<Array> {
    let world = player.context().world()?;
    let entities: Vec<_> = {
        let mut world = world.borrow_mut();
        world
            .actors_in_world()
            .into_iter()
            .filter(|&actor| world.owner(actor) == Some(player.id()))
            .filter(|&actor| {
                actor_type.map_or(true, |wanted| world.actor_info(actor).is_some_and(|info| info.name == wanted))
            })
            .collect()
    };
    Ok(entities.into_iter().map(|actor| player.context().actor_value(actor)).filter(|v: &Dynamic| !v.is_unit()).collect())
}
