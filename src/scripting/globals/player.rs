use rhai::{Array, Dynamic, Engine};

use crate::scripting::{GlobalDescriptor, HostContext, ScriptResult};
use crate::world::PlayerId;

pub const GLOBAL: GlobalDescriptor = GlobalDescriptor { name: "Player", register, create };

#[derive(Clone)]
pub struct PlayerGlobal {
    ctx: HostContext,
}

fn create(ctx: &HostContext) -> Dynamic {
    Dynamic::from(PlayerGlobal { ctx: ctx.clone() })
}

fn register(engine: &mut Engine) {
    engine.register_type_with_name::<PlayerGlobal>("PlayerGlobal");
    // Unknown names yield unit so scripts can probe optional slots.
    engine.register_fn("GetPlayer", |this: PlayerGlobal, name: &str| -> ScriptResult<Dynamic> {
        let id = this.ctx.world()?.borrow().player_by_name(name).map(|p| p.id);
        Ok(id.map_or(Dynamic::UNIT, |id| this.ctx.player_value(id)))
    });
    engine.register_fn("GetPlayers", |this: PlayerGlobal| -> ScriptResult<Array> {
        let ids: Vec<PlayerId> = this.ctx.world()?.borrow().players().iter().map(|p| p.id).collect();
        Ok(ids.into_iter().map(|id| this.ctx.player_value(id)).collect())
    });
}
