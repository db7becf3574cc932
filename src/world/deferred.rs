use bevy_ecs::prelude::Entity;
use std::fmt;
use std::rc::Rc;

use crate::events::DomainEvent;
use crate::geometry::CPos;
use crate::scripting::{ScriptCallback, Trigger, TriggerRegistry};
use crate::world::{Activity, ObjectiveState, PlayerId};

/// A world mutation requested outside native iteration, applied at a frame end.
pub enum DeferredAction {
    /// End the match, pause it and lock the pause state.
    HaltMatch,
    ClearTriggers { registry: Rc<TriggerRegistry>, trigger: Trigger },
    AddToWorld { actor: Entity },
    RemoveFromWorld { actor: Entity },
    QueueActivity { actor: Entity, activity: Activity },
    CancelActivities { actor: Entity },
    Damage { actor: Entity, attacker: Option<Entity>, amount: i32 },
    Kill { actor: Entity, attacker: Option<Entity> },
    /// Remove from the world and mark dead; the entity is released one frame later.
    Dispose { actor: Entity },
    Release { actor: Entity },
    Teleport { actor: Entity, cell: CPos },
    Produce { producer: Entity, actor_type: String },
    Capture { actor: Entity, captor: Entity },
    Infiltrate { actor: Entity, infiltrator: Entity },
    Discover { actor: Entity, discoverer: PlayerId },
    SetObjectiveState { player: PlayerId, id: usize, state: ObjectiveState },
    Notify(DomainEvent),
    /// Runs a script callback once the world borrow is released.
    Callback(ScriptCallback),
}

impl fmt::Debug for DeferredAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeferredAction::HaltMatch => write!(f, "HaltMatch"),
            DeferredAction::ClearTriggers { registry, trigger } => {
                write!(f, "ClearTriggers owner={} trigger={}", registry.owner().index(), trigger.script_name())
            }
            DeferredAction::AddToWorld { actor } => write!(f, "AddToWorld actor={}", actor.index()),
            DeferredAction::RemoveFromWorld { actor } => write!(f, "RemoveFromWorld actor={}", actor.index()),
            DeferredAction::QueueActivity { actor, activity } => {
                write!(f, "QueueActivity actor={} activity={activity:?}", actor.index())
            }
            DeferredAction::CancelActivities { actor } => write!(f, "CancelActivities actor={}", actor.index()),
            DeferredAction::Damage { actor, amount, .. } => {
                write!(f, "Damage actor={} amount={amount}", actor.index())
            }
            DeferredAction::Kill { actor, .. } => write!(f, "Kill actor={}", actor.index()),
            DeferredAction::Dispose { actor } => write!(f, "Dispose actor={}", actor.index()),
            DeferredAction::Release { actor } => write!(f, "Release actor={}", actor.index()),
            DeferredAction::Teleport { actor, cell } => write!(f, "Teleport actor={} cell={cell}", actor.index()),
            DeferredAction::Produce { producer, actor_type } => {
                write!(f, "Produce producer={} type={actor_type}", producer.index())
            }
            DeferredAction::Capture { actor, captor } => {
                write!(f, "Capture actor={} captor={}", actor.index(), captor.index())
            }
            DeferredAction::Infiltrate { actor, infiltrator } => {
                write!(f, "Infiltrate actor={} infiltrator={}", actor.index(), infiltrator.index())
            }
            DeferredAction::Discover { actor, discoverer } => {
                write!(f, "Discover actor={} discoverer={}", actor.index(), discoverer.0)
            }
            DeferredAction::SetObjectiveState { player, id, state } => {
                write!(f, "SetObjectiveState player={} id={id} state={state:?}", player.0)
            }
            DeferredAction::Notify(event) => write!(f, "Notify {event}"),
            DeferredAction::Callback(_) => write!(f, "Callback"),
        }
    }
}

struct Scheduled {
    due: u64,
    action: DeferredAction,
}

/// Actions waiting for a frame end, kept in submission order.
#[derive(Default)]
pub struct FrameEndQueue {
    pending: Vec<Scheduled>,
}

impl FrameEndQueue {
    pub fn push(&mut self, now: u64, delay: u64, action: DeferredAction) {
        self.pending.push(Scheduled { due: now.saturating_add(delay), action });
    }

    /// Removes everything due at or before `now`. Actions pushed while the
    /// returned batch is applied wait for the next call.
    pub fn take_due(&mut self, now: u64) -> Vec<DeferredAction> {
        let mut due = Vec::new();
        let mut waiting = Vec::with_capacity(self.pending.len());
        for scheduled in self.pending.drain(..) {
            if scheduled.due <= now {
                due.push(scheduled.action);
            } else {
                waiting.push(scheduled);
            }
        }
        self.pending = waiting;
        due
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(action: &DeferredAction) -> String {
        format!("{action:?}")
    }

    #[test]
    fn delayed_actions_wait_for_their_tick() {
        let mut queue = FrameEndQueue::default();
        queue.push(10, 0, DeferredAction::HaltMatch);
        queue.push(10, 5, DeferredAction::Notify(DomainEvent::PlayerWon { player: PlayerId(1) }));
        let due = queue.take_due(10);
        assert_eq!(due.iter().map(label).collect::<Vec<_>>(), vec!["HaltMatch".to_string()]);
        assert!(queue.take_due(14).is_empty());
        assert_eq!(queue.take_due(15).len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn due_actions_keep_submission_order() {
        let mut queue = FrameEndQueue::default();
        queue.push(0, 2, DeferredAction::Notify(DomainEvent::PlayerLost { player: PlayerId(0) }));
        queue.push(1, 0, DeferredAction::HaltMatch);
        let due = queue.take_due(2);
        assert_eq!(
            due.iter().map(label).collect::<Vec<_>>(),
            vec!["Notify PlayerLost player=0".to_string(), "HaltMatch".to_string()]
        );
    }
}
