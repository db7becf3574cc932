use bevy_ecs::prelude::Entity;
use rhai::EvalAltResult;
use std::fmt;
use std::sync::Arc;

use crate::rules::ActorInfo;
use crate::scripting::HostContext;
use crate::world::{DeferredAction, PlayerId};

/// Script view of an actor. Members come from the command groups its type qualifies for.
#[derive(Clone)]
pub struct ScriptActor {
    entity: Entity,
    info: Arc<ActorInfo>,
    ctx: HostContext,
}

impl ScriptActor {
    pub(crate) fn new(entity: Entity, info: Arc<ActorInfo>, ctx: HostContext) -> Self {
        Self { entity, info, ctx }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn info(&self) -> &ActorInfo {
        &self.info
    }

    pub(crate) fn context(&self) -> &HostContext {
        &self.ctx
    }

    pub fn has_property(&self, member: &str) -> bool {
        self.ctx.command_groups(&self.info).iter().any(|group| group.defines(member))
    }

    pub fn is_dead(&self) -> bool {
        self.ctx.world().map_or(true, |world| world.borrow().is_dead(self.entity))
    }

    /// Fails unless `member` belongs to a group this actor's type exposes and,
    /// for groups hidden from destroyed actors, the actor is still alive.
    pub(crate) fn require(&self, member: &str) -> Result<(), Box<EvalAltResult>> {
        let groups = self.ctx.command_groups(&self.info);
        let Some(group) = groups.iter().find(|group| group.defines(member)) else {
            return Err(format!("Actor '{}' does not define a property '{member}'", self.info.name).into());
        };
        if !group.exposed_for_destroyed && self.is_dead() {
            return Err(format!("Actor '{}' is dead and cannot use '{member}'", self.info.name).into());
        }
        Ok(())
    }

    pub(crate) fn queue(&self, action: DeferredAction) -> Result<(), Box<EvalAltResult>> {
        self.ctx.world()?.borrow_mut().queue_frame_end(action);
        Ok(())
    }
}

impl PartialEq for ScriptActor {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity
    }
}

impl fmt::Display for ScriptActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Actor ({} {})", self.info.name, self.entity.index())
    }
}

/// Script view of a player.
#[derive(Clone)]
pub struct ScriptPlayer {
    id: PlayerId,
    ctx: HostContext,
}

impl ScriptPlayer {
    pub(crate) fn new(id: PlayerId, ctx: HostContext) -> Self {
        Self { id, ctx }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub(crate) fn context(&self) -> &HostContext {
        &self.ctx
    }
}

impl PartialEq for ScriptPlayer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
