use rhai::{Engine, INT};

use crate::scripting::properties::player::with_player;
use crate::scripting::{CommandGroupDescriptor, CommandScope, ScriptPlayer, ScriptResult};
use crate::world::{DeferredAction, ObjectiveKind, ObjectiveState};

pub const GROUP: CommandGroupDescriptor = CommandGroupDescriptor {
    name: "MissionObjectives",
    scope: CommandScope::Player,
    requires: &[],
    commands: &[
        "AddPrimaryObjective",
        "AddSecondaryObjective",
        "MarkCompletedObjective",
        "MarkFailedObjective",
        "IsObjectiveCompleted",
        "IsObjectiveFailed",
    ],
    exposed_for_destroyed: true,
    register,
};

fn register(engine: &mut Engine) {
    engine.register_fn("AddPrimaryObjective", |player: ScriptPlayer, description: &str| {
        add(&player, description, ObjectiveKind::Primary)
    });
    engine.register_fn("AddSecondaryObjective", |player: ScriptPlayer, description: &str| {
        add(&player, description, ObjectiveKind::Secondary)
    });
    engine.register_fn("MarkCompletedObjective", |player: ScriptPlayer, id: INT| {
        mark(&player, id, ObjectiveState::Completed)
    });
    engine.register_fn("MarkFailedObjective", |player: ScriptPlayer, id: INT| {
        mark(&player, id, ObjectiveState::Failed)
    });
    engine.register_fn("IsObjectiveCompleted", |player: ScriptPlayer, id: INT| -> ScriptResult<bool> {
        Ok(state(&player, id)? == ObjectiveState::Completed)
    });
    engine.register_fn("IsObjectiveFailed", |player: ScriptPlayer, id: INT| -> ScriptResult<bool> {
        Ok(state(&player, id)? == ObjectiveState::Failed)
    });
}

fn add(player: &ScriptPlayer, description: &str, kind: ObjectiveKind) -> ScriptResult<INT> {
    let world = player.context().world()?;
    let id = world.borrow_mut().add_objective(player.id(), description, kind);
    id.map(|id| id as INT).ok_or_else(|| format!("Player {} does not exist", player.id().0).into())
}

fn mark(player: &ScriptPlayer, id: INT, state_to: ObjectiveState) -> ScriptResult<()> {
    state(player, id)?;
    let world = player.context().world()?;
    world.borrow_mut().queue_frame_end(DeferredAction::SetObjectiveState {
        player: player.id(),
        id: id as usize,
        state: state_to,
    });
    Ok(())
}

fn state(player: &ScriptPlayer, id: INT) -> ScriptResult<ObjectiveState> {
    let state = with_player(player, |p| usize::try_from(id).ok().and_then(|id| p.objective_state(id)))?;
    state.ok_or_else(|| format!("Objective ID {id} is out of range.").into())
}
