use rhai::{Array, Dynamic, Engine, FnPtr, INT};

use crate::rules::behavior;
use crate::scripting::value::{expect_cells, expect_player, expect_strings};
use crate::scripting::{ArgError, GlobalDescriptor, HostContext, ScriptCallback, ScriptResult, ScriptValue};
use crate::world::{Activity, DeferredAction};

pub const GLOBAL: GlobalDescriptor = GlobalDescriptor { name: "Reinforcements", register, create };

/// Ticks between consecutive arrivals when the script gives no interval.
pub const DEFAULT_INTERVAL: INT = 25;

#[derive(Clone)]
pub struct ReinforcementsGlobal {
    ctx: HostContext,
}

fn create(ctx: &HostContext) -> Dynamic {
    Dynamic::from(ReinforcementsGlobal { ctx: ctx.clone() })
}

fn register(engine: &mut Engine) {
    engine.register_type_with_name::<ReinforcementsGlobal>("ReinforcementsGlobal");
    engine.register_fn("Reinforce", |this: ReinforcementsGlobal, owner: Dynamic, types: Dynamic, path: Dynamic| {
        this.reinforce(&owner, &types, &path, DEFAULT_INTERVAL, None)
    });
    engine.register_fn(
        "Reinforce",
        |this: ReinforcementsGlobal, owner: Dynamic, types: Dynamic, path: Dynamic, interval: INT| {
            this.reinforce(&owner, &types, &path, interval, None)
        },
    );
    engine.register_fn(
        "Reinforce",
        |this: ReinforcementsGlobal, owner: Dynamic, types: Dynamic, path: Dynamic, interval: INT, func: FnPtr| {
            this.reinforce(&owner, &types, &path, interval, Some(func))
        },
    );
}

impl ReinforcementsGlobal {
    /// Creates one actor per type at the head of `path`, outside the world.
    /// The i-th actor enters the world `i * interval` ticks later, walks the
    /// rest of the path and then runs `func(actor)`.
    fn reinforce(
        &self,
        owner: &Dynamic,
        types: &Dynamic,
        path: &Dynamic,
        interval: INT,
        func: Option<FnPtr>,
    ) -> ScriptResult<Array> {
        let owner = expect_player(owner, "owner")?;
        let types = expect_strings(types, "actorTypes")?;
        let path = expect_cells(path, "entryPath")?;
        let Some((&entry, waypoints)) = path.split_first() else {
            return Err(ArgError::invalid("entryPath must contain at least one cell").into());
        };
        let interval = interval.max(0) as u64;
        let host = self.ctx.host();

        let world = self.ctx.world()?;
        let mut created = Vec::with_capacity(types.len());
        {
            let mut world = world.borrow_mut();
            if let Some(unknown) = types.iter().find(|t| world.rules().get(t.as_str()).is_none()) {
                return Err(format!("Unknown actor type '{unknown}'").into());
            }
            for (i, actor_type) in types.iter().enumerate() {
                let actor = world.create_actor(actor_type, owner.id(), entry, false).map_err(|err| err.to_string())?;
                let delay = (i as u64).saturating_mul(interval);
                world.queue_delayed(delay, DeferredAction::AddToWorld { actor });
                let can_move = world
                    .actor_info(actor)
                    .is_some_and(|info| info.has_behavior(behavior::MOBILE) || info.has_behavior(behavior::AIRCRAFT));
                if can_move {
                    for &destination in waypoints {
                        world.queue_delayed(
                            delay,
                            DeferredAction::QueueActivity { actor, activity: Activity::Move { destination } },
                        );
                    }
                }
                if let Some(function) = &func {
                    let callback = ScriptCallback::new(function.clone(), host.clone(), vec![ScriptValue::Actor(actor)]);
                    world.queue_delayed(
                        delay,
                        DeferredAction::QueueActivity { actor, activity: Activity::CallScript(callback) },
                    );
                }
                created.push(actor);
            }
        }
        Ok(created.into_iter().map(|actor| self.ctx.actor_value(actor)).collect())
    }
}
