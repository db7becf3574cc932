use bevy_ecs::prelude::Entity;
use rhai::{Dynamic, Engine, FnPtr, INT};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::scripting::value::{describe, expect_actor, expect_actors, expect_function, expect_player};
use crate::scripting::{
    ArgError, GlobalDescriptor, HostContext, ScriptActor, ScriptCallback, ScriptPlayer, ScriptResult, Trigger,
    TriggerRegistry,
};
use crate::world::DeferredAction;

pub const GLOBAL: GlobalDescriptor = GlobalDescriptor { name: "Trigger", register, create };

/// `Trigger.*`: registers script callbacks on actor and player trigger registries.
#[derive(Clone)]
pub struct TriggerGlobal {
    ctx: HostContext,
}

fn create(ctx: &HostContext) -> Dynamic {
    Dynamic::from(TriggerGlobal { ctx: ctx.clone() })
}

fn register(engine: &mut Engine) {
    engine.register_type_with_name::<TriggerGlobal>("TriggerGlobal");
    for trigger in Trigger::ALL {
        engine.register_fn(trigger.script_name(), move |this: TriggerGlobal, target: Dynamic, func: Dynamic| {
            this.subscribe(trigger, &target, &func)
        });
    }
    engine.register_fn("OnAllKilled", |this: TriggerGlobal, actors: Dynamic, func: Dynamic| {
        this.on_all_killed(&actors, &func)
    });
    engine.register_fn("AfterDelay", |this: TriggerGlobal, delay: INT, func: FnPtr| this.after_delay(delay, func));
    engine.register_fn("Clear", |this: TriggerGlobal, target: Dynamic, name: &str| -> ScriptResult<()> {
        let trigger = Trigger::from_script_name(name).ok_or_else(|| format!("Unknown trigger '{name}'"))?;
        this.registry_for(&target)?.clear(trigger);
        Ok(())
    });
    engine.register_fn("ClearAll", |this: TriggerGlobal, target: Dynamic| -> ScriptResult<()> {
        this.registry_for(&target)?.clear_all();
        Ok(())
    });
}

fn is_player_trigger(trigger: Trigger) -> bool {
    matches!(
        trigger,
        Trigger::OnPlayerWon
            | Trigger::OnPlayerLost
            | Trigger::OnObjectiveAdded
            | Trigger::OnObjectiveCompleted
            | Trigger::OnObjectiveFailed
            | Trigger::OnPlayerDiscovered
    )
}

#[derive(Default)]
struct AllKilled {
    remaining: BTreeSet<Entity>,
    callback: Option<ScriptCallback>,
}

impl TriggerGlobal {
    fn subscribe(&self, trigger: Trigger, target: &Dynamic, func: &Dynamic) -> ScriptResult<()> {
        let function = expect_function(func, "func")?;
        let registry = if is_player_trigger(trigger) {
            self.player_registry(&expect_player(target, "player")?)?
        } else {
            self.actor_registry(&expect_actor(target, "actor")?)?
        };
        registry.register_callback(trigger, function, self.ctx.host());
        Ok(())
    }

    /// Calls `func` once, after every listed actor has been killed.
    fn on_all_killed(&self, actors: &Dynamic, func: &Dynamic) -> ScriptResult<()> {
        let function = expect_function(func, "func")?;
        let actors = expect_actors(actors, "actors")?;
        if actors.is_empty() {
            return Err(ArgError::invalid("OnAllKilled requires at least one actor").into());
        }
        let registries = actors.iter().map(|actor| self.actor_registry(actor)).collect::<ScriptResult<Vec<_>>>()?;
        let state = Rc::new(RefCell::new(AllKilled {
            remaining: actors.iter().map(ScriptActor::entity).collect(),
            callback: Some(ScriptCallback::new(function, self.ctx.host(), Vec::new())),
        }));
        for registry in registries {
            let state = state.clone();
            registry
                .register_internal(Trigger::OnKilled, move |owner, _| {
                    let ready = {
                        let mut state = state.borrow_mut();
                        state.remaining.remove(&owner);
                        if state.remaining.is_empty() {
                            state.callback.take()
                        } else {
                            None
                        }
                    };
                    if let Some(callback) = ready {
                        callback.run();
                    }
                })
                .map_err(|err| err.to_string())?;
        }
        Ok(())
    }

    fn after_delay(&self, delay: INT, function: FnPtr) -> ScriptResult<()> {
        let callback = ScriptCallback::new(function, self.ctx.host(), Vec::new());
        self.ctx.world()?.borrow_mut().queue_delayed(delay.max(0) as u64, DeferredAction::Callback(callback));
        Ok(())
    }

    fn registry_for(&self, target: &Dynamic) -> ScriptResult<Rc<TriggerRegistry>> {
        if let Some(actor) = target.clone().try_cast::<ScriptActor>() {
            self.actor_registry(&actor)
        } else if let Some(player) = target.clone().try_cast::<ScriptPlayer>() {
            self.player_registry(&player)
        } else {
            Err(ArgError::WrongType { name: "target", expected: "Actor or Player", actual: describe(target) }.into())
        }
    }

    fn actor_registry(&self, actor: &ScriptActor) -> ScriptResult<Rc<TriggerRegistry>> {
        let registry = self.ctx.world()?.borrow().triggers(actor.entity());
        registry.ok_or_else(|| format!("{actor} no longer accepts triggers").into())
    }

    fn player_registry(&self, player: &ScriptPlayer) -> ScriptResult<Rc<TriggerRegistry>> {
        let world = self.ctx.world()?;
        let world = world.borrow();
        world
            .player(player.id())
            .and_then(|p| world.triggers(p.actor))
            .ok_or_else(|| format!("Player {} has no triggers", player.id().0).into())
    }
}
