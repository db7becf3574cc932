use bevy_ecs::prelude::{Entity, Resource};
use std::fmt;

use crate::world::PlayerId;

/// Notifications raised by the simulation for trigger dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    Idle { actor: Entity },
    Damaged { actor: Entity, attacker: Option<Entity>, amount: i32 },
    Killed { actor: Entity, attacker: Option<Entity> },
    Produced { producer: Entity, produced: Entity },
    Captured { actor: Entity, captor: Entity, old_owner: PlayerId, new_owner: PlayerId },
    Infiltrated { actor: Entity, infiltrator: Entity },
    AddedToWorld { actor: Entity },
    RemovedFromWorld { actor: Entity },
    Discovered { actor: Entity, discoverer: PlayerId },
    ObjectiveAdded { player: PlayerId, id: usize },
    ObjectiveCompleted { player: PlayerId, id: usize },
    ObjectiveFailed { player: PlayerId, id: usize },
    PlayerWon { player: PlayerId },
    PlayerLost { player: PlayerId },
}

impl fmt::Display for DomainEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainEvent::Idle { actor } => write!(f, "Idle actor={}", actor.index()),
            DomainEvent::Damaged { actor, attacker, amount } => {
                write!(f, "Damaged actor={} attacker={} amount={amount}", actor.index(), fmt_entity(*attacker))
            }
            DomainEvent::Killed { actor, attacker } => {
                write!(f, "Killed actor={} attacker={}", actor.index(), fmt_entity(*attacker))
            }
            DomainEvent::Produced { producer, produced } => {
                write!(f, "Produced producer={} produced={}", producer.index(), produced.index())
            }
            DomainEvent::Captured { actor, captor, old_owner, new_owner } => {
                write!(
                    f,
                    "Captured actor={} captor={} old_owner={} new_owner={}",
                    actor.index(),
                    captor.index(),
                    old_owner.0,
                    new_owner.0
                )
            }
            DomainEvent::Infiltrated { actor, infiltrator } => {
                write!(f, "Infiltrated actor={} infiltrator={}", actor.index(), infiltrator.index())
            }
            DomainEvent::AddedToWorld { actor } => write!(f, "AddedToWorld actor={}", actor.index()),
            DomainEvent::RemovedFromWorld { actor } => write!(f, "RemovedFromWorld actor={}", actor.index()),
            DomainEvent::Discovered { actor, discoverer } => {
                write!(f, "Discovered actor={} discoverer={}", actor.index(), discoverer.0)
            }
            DomainEvent::ObjectiveAdded { player, id } => write!(f, "ObjectiveAdded player={} id={id}", player.0),
            DomainEvent::ObjectiveCompleted { player, id } => {
                write!(f, "ObjectiveCompleted player={} id={id}", player.0)
            }
            DomainEvent::ObjectiveFailed { player, id } => write!(f, "ObjectiveFailed player={} id={id}", player.0),
            DomainEvent::PlayerWon { player } => write!(f, "PlayerWon player={}", player.0),
            DomainEvent::PlayerLost { player } => write!(f, "PlayerLost player={}", player.0),
        }
    }
}

fn fmt_entity(entity: Option<Entity>) -> String {
    entity.map(|e| e.index().to_string()).unwrap_or_else(|| "none".to_string())
}

#[derive(Default, Resource)]
pub struct EventBus {
    events: Vec<DomainEvent>,
}

impl EventBus {
    pub fn push(&mut self, event: DomainEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<DomainEvent> {
        self.events.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
