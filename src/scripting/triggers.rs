use bevy_ecs::prelude::Entity;
use rhai::FnPtr;
use smallvec::{smallvec, SmallVec};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::debug;

use crate::events::DomainEvent;
use crate::scripting::{ScriptHost, ScriptValue, TriggerError, HOST_LOG_TARGET};
use crate::world::{DeferredAction, SimWorld, WeakWorld};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Trigger {
    OnIdle,
    OnDamaged,
    OnKilled,
    OnProduction,
    OnOtherProduction,
    OnPlayerWon,
    OnPlayerLost,
    OnObjectiveAdded,
    OnObjectiveCompleted,
    OnObjectiveFailed,
    OnCapture,
    OnInfiltrated,
    OnAddedToWorld,
    OnRemovedFromWorld,
    OnDiscovered,
    OnPlayerDiscovered,
}

impl Trigger {
    pub const COUNT: usize = 16;

    pub const ALL: [Trigger; Trigger::COUNT] = [
        Trigger::OnIdle,
        Trigger::OnDamaged,
        Trigger::OnKilled,
        Trigger::OnProduction,
        Trigger::OnOtherProduction,
        Trigger::OnPlayerWon,
        Trigger::OnPlayerLost,
        Trigger::OnObjectiveAdded,
        Trigger::OnObjectiveCompleted,
        Trigger::OnObjectiveFailed,
        Trigger::OnCapture,
        Trigger::OnInfiltrated,
        Trigger::OnAddedToWorld,
        Trigger::OnRemovedFromWorld,
        Trigger::OnDiscovered,
        Trigger::OnPlayerDiscovered,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn script_name(self) -> &'static str {
        match self {
            Trigger::OnIdle => "OnIdle",
            Trigger::OnDamaged => "OnDamaged",
            Trigger::OnKilled => "OnKilled",
            Trigger::OnProduction => "OnProduction",
            Trigger::OnOtherProduction => "OnOtherProduction",
            Trigger::OnPlayerWon => "OnPlayerWon",
            Trigger::OnPlayerLost => "OnPlayerLost",
            Trigger::OnObjectiveAdded => "OnObjectiveAdded",
            Trigger::OnObjectiveCompleted => "OnObjectiveCompleted",
            Trigger::OnObjectiveFailed => "OnObjectiveFailed",
            Trigger::OnCapture => "OnCapture",
            Trigger::OnInfiltrated => "OnInfiltrated",
            Trigger::OnAddedToWorld => "OnAddedToWorld",
            Trigger::OnRemovedFromWorld => "OnRemovedFromWorld",
            Trigger::OnDiscovered => "OnDiscovered",
            Trigger::OnPlayerDiscovered => "OnPlayerDiscovered",
        }
    }

    pub fn from_script_name(name: &str) -> Option<Trigger> {
        Trigger::ALL.into_iter().find(|trigger| trigger.script_name() == name)
    }

    /// Categories that also notify native subscribers after the script callbacks.
    pub fn has_internal_notification(self) -> bool {
        matches!(
            self,
            Trigger::OnKilled
                | Trigger::OnProduction
                | Trigger::OnOtherProduction
                | Trigger::OnCapture
                | Trigger::OnRemovedFromWorld
        )
    }
}

/// Native subscriber. Receives the registry owner and the dispatch arguments.
pub type InternalHook = Rc<dyn Fn(Entity, &[ScriptValue])>;

#[derive(Clone)]
struct TriggerEntry {
    callback: FnPtr,
    host: Weak<ScriptHost>,
}

/// Per-entity table of script callbacks, one ordered list per trigger.
pub struct TriggerRegistry {
    owner: Entity,
    world: WeakWorld,
    callbacks: RefCell<[Vec<TriggerEntry>; Trigger::COUNT]>,
    internal: RefCell<Vec<(Trigger, InternalHook)>>,
}

impl TriggerRegistry {
    pub fn new(owner: Entity, world: WeakWorld) -> Rc<Self> {
        Rc::new(Self {
            owner,
            world,
            callbacks: RefCell::new(std::array::from_fn(|_| Vec::new())),
            internal: RefCell::new(Vec::new()),
        })
    }

    pub fn owner(&self) -> Entity {
        self.owner
    }

    pub fn register_callback(&self, trigger: Trigger, callback: FnPtr, host: Weak<ScriptHost>) {
        self.callbacks.borrow_mut()[trigger.index()].push(TriggerEntry { callback, host });
    }

    pub fn register_internal(
        &self,
        trigger: Trigger,
        hook: impl Fn(Entity, &[ScriptValue]) + 'static,
    ) -> Result<(), TriggerError> {
        if !trigger.has_internal_notification() {
            return Err(TriggerError::NoInternalNotification(trigger));
        }
        self.internal.borrow_mut().push((trigger, Rc::new(hook)));
        Ok(())
    }

    pub fn callback_count(&self, trigger: Trigger) -> usize {
        self.callbacks.borrow()[trigger.index()].len()
    }

    /// True when dispatching `trigger` would reach a script callback or native hook.
    pub fn is_subscribed(&self, trigger: Trigger) -> bool {
        self.callback_count(trigger) > 0 || self.internal.borrow().iter().any(|(t, _)| *t == trigger)
    }

    /// Runs the callbacks for `trigger` in registration order. The first failing
    /// callback is reported to its own host and ends the script part of the
    /// dispatch; native hooks still run.
    pub fn dispatch(&self, trigger: Trigger, args: &[ScriptValue]) {
        if self.world.is_disposing() {
            return;
        }
        let entries: Vec<TriggerEntry> = self.callbacks.borrow()[trigger.index()].clone();
        for entry in &entries {
            let Some(host) = entry.host.upgrade() else {
                continue;
            };
            if let Err(err) = host.invoke(&entry.callback, args) {
                host.report_fatal_error(&err.to_string());
                break;
            }
        }
        if trigger.has_internal_notification() {
            let hooks: Vec<InternalHook> = self
                .internal
                .borrow()
                .iter()
                .filter(|(t, _)| *t == trigger)
                .map(|(_, hook)| hook.clone())
                .collect();
            for hook in hooks {
                hook(self.owner, args);
            }
        }
    }

    /// Removes every callback for `trigger` at the next frame end.
    pub fn clear(self: &Rc<Self>, trigger: Trigger) {
        self.defer(self.clear_actions(&[trigger]));
    }

    pub fn clear_all(self: &Rc<Self>) {
        self.defer(self.clear_actions(&Trigger::ALL));
    }

    pub fn dispose(self: &Rc<Self>) {
        self.clear_all();
    }

    pub fn clear_actions(self: &Rc<Self>, triggers: &[Trigger]) -> Vec<DeferredAction> {
        triggers.iter().map(|&trigger| DeferredAction::ClearTriggers { registry: self.clone(), trigger }).collect()
    }

    fn defer(&self, actions: Vec<DeferredAction>) {
        match self.world.upgrade() {
            Some(world) => {
                let mut world = world.borrow_mut();
                for action in actions {
                    world.queue_frame_end(action);
                }
            }
            None => {
                for action in actions {
                    if let DeferredAction::ClearTriggers { trigger, .. } = action {
                        self.clear_now(trigger);
                    }
                }
            }
        }
    }

    pub(crate) fn clear_now(&self, trigger: Trigger) {
        let removed = std::mem::take(&mut self.callbacks.borrow_mut()[trigger.index()]);
        if !removed.is_empty() {
            debug!(
                target: HOST_LOG_TARGET,
                owner = self.owner.index(),
                trigger = trigger.script_name(),
                count = removed.len(),
                "cleared trigger callbacks"
            );
        }
    }
}

/// One registry dispatch derived from a domain event.
pub struct RoutedDispatch {
    pub registry: Rc<TriggerRegistry>,
    pub trigger: Trigger,
    pub args: SmallVec<[ScriptValue; 4]>,
}

impl RoutedDispatch {
    pub fn run(&self) {
        self.registry.dispatch(self.trigger, &self.args);
    }
}

/// Maps a domain event onto the registries and triggers it concerns.
pub fn route(world: &SimWorld, event: &DomainEvent) -> Vec<RoutedDispatch> {
    let mut out = Vec::new();
    let mut push = |entity: Entity, trigger: Trigger, args: SmallVec<[ScriptValue; 4]>| {
        if let Some(registry) = world.triggers(entity) {
            out.push(RoutedDispatch { registry, trigger, args });
        }
    };
    let player_actor = |player| world.player(player).map(|p| p.actor);
    match *event {
        DomainEvent::Idle { actor } => push(actor, Trigger::OnIdle, smallvec![ScriptValue::Actor(actor)]),
        DomainEvent::Damaged { actor, attacker, .. } => push(
            actor,
            Trigger::OnDamaged,
            smallvec![ScriptValue::Actor(actor), ScriptValue::actor_or_unit(attacker)],
        ),
        DomainEvent::Killed { actor, attacker } => push(
            actor,
            Trigger::OnKilled,
            smallvec![ScriptValue::Actor(actor), ScriptValue::actor_or_unit(attacker)],
        ),
        DomainEvent::Produced { producer, produced } => {
            push(
                producer,
                Trigger::OnProduction,
                smallvec![ScriptValue::Actor(producer), ScriptValue::Actor(produced)],
            );
            let others: Vec<Entity> = world
                .trigger_registries()
                .filter(|registry| registry.owner() != producer && registry.is_subscribed(Trigger::OnOtherProduction))
                .map(|registry| registry.owner())
                .collect();
            for other in others {
                push(
                    other,
                    Trigger::OnOtherProduction,
                    smallvec![ScriptValue::Actor(producer), ScriptValue::Actor(produced)],
                );
            }
        }
        DomainEvent::Captured { actor, captor, old_owner, new_owner } => push(
            actor,
            Trigger::OnCapture,
            smallvec![
                ScriptValue::Actor(actor),
                ScriptValue::Actor(captor),
                ScriptValue::Player(old_owner),
                ScriptValue::Player(new_owner)
            ],
        ),
        DomainEvent::Infiltrated { actor, infiltrator } => push(
            actor,
            Trigger::OnInfiltrated,
            smallvec![ScriptValue::Actor(actor), ScriptValue::Actor(infiltrator)],
        ),
        DomainEvent::AddedToWorld { actor } => {
            push(actor, Trigger::OnAddedToWorld, smallvec![ScriptValue::Actor(actor)])
        }
        DomainEvent::RemovedFromWorld { actor } => {
            push(actor, Trigger::OnRemovedFromWorld, smallvec![ScriptValue::Actor(actor)])
        }
        DomainEvent::Discovered { actor, discoverer } => {
            push(actor, Trigger::OnDiscovered, smallvec![ScriptValue::Actor(actor), ScriptValue::Player(discoverer)]);
            if let Some(owner) = world.owner(actor) {
                if let Some(owner_actor) = player_actor(owner) {
                    push(
                        owner_actor,
                        Trigger::OnPlayerDiscovered,
                        smallvec![ScriptValue::Player(owner), ScriptValue::Player(discoverer), ScriptValue::Actor(actor)],
                    );
                }
            }
        }
        DomainEvent::ObjectiveAdded { player, id }
        | DomainEvent::ObjectiveCompleted { player, id }
        | DomainEvent::ObjectiveFailed { player, id } => {
            let trigger = match event {
                DomainEvent::ObjectiveAdded { .. } => Trigger::OnObjectiveAdded,
                DomainEvent::ObjectiveCompleted { .. } => Trigger::OnObjectiveCompleted,
                _ => Trigger::OnObjectiveFailed,
            };
            if let Some(owner_actor) = player_actor(player) {
                push(owner_actor, trigger, smallvec![ScriptValue::Player(player), ScriptValue::Int(id as i64)]);
            }
        }
        DomainEvent::PlayerWon { player } => {
            if let Some(owner_actor) = player_actor(player) {
                push(owner_actor, Trigger::OnPlayerWon, smallvec![ScriptValue::Player(player)]);
            }
        }
        DomainEvent::PlayerLost { player } => {
            if let Some(owner_actor) = player_actor(player) {
                push(owner_actor, Trigger::OnPlayerLost, smallvec![ScriptValue::Player(player)]);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn script_names_round_trip() {
        for trigger in Trigger::ALL {
            assert_eq!(Trigger::from_script_name(trigger.script_name()), Some(trigger));
        }
        assert_eq!(Trigger::from_script_name("OnExploded"), None);
        assert_eq!(Trigger::ALL.iter().filter(|t| t.has_internal_notification()).count(), 5);
    }

    #[test]
    fn internal_hooks_are_limited_to_notifying_triggers() {
        let registry = TriggerRegistry::new(Entity::from_raw(3), WeakWorld::default());
        let err = registry.register_internal(Trigger::OnIdle, |_, _| {}).unwrap_err();
        assert_eq!(err, TriggerError::NoInternalNotification(Trigger::OnIdle));
        assert_eq!(err.to_string(), "OnIdle has no internal notification");
        registry.register_internal(Trigger::OnKilled, |_, _| {}).expect("killed hooks allowed");
        assert!(registry.is_subscribed(Trigger::OnKilled));
    }

    #[test]
    fn dispose_is_idempotent() {
        let registry = TriggerRegistry::new(Entity::from_raw(2), WeakWorld::default());
        let callback = FnPtr::new("on_idle").expect("valid function name");
        registry.register_callback(Trigger::OnIdle, callback, Weak::new());
        assert_eq!(registry.callback_count(Trigger::OnIdle), 1);
        registry.dispose();
        registry.dispose();
        assert_eq!(registry.callback_count(Trigger::OnIdle), 0);
    }

    #[test]
    fn discovery_routes_to_the_actor_and_its_owner() {
        use crate::geometry::CPos;
        use crate::rules::{ActorInfo, Rules};
        use crate::world::{PlayerSpec, WorldHandle};

        let world = WorldHandle::new(Rules::from_infos([ActorInfo::new("e1", Vec::<String>::new())]), 1);
        let mut w = world.borrow_mut();
        let greece = w.add_player(&PlayerSpec::new("Greece"));
        let ussr = w.add_player(&PlayerSpec::new("USSR"));
        let actor = w.create_actor("e1", greece, CPos::new(0, 0), true).expect("spawn e1");
        let owner_actor = w.player(greece).expect("greece").actor;

        let routed = route(&w, &DomainEvent::Discovered { actor, discoverer: ussr });
        let targets: Vec<_> = routed.iter().map(|r| (r.registry.owner(), r.trigger)).collect();
        assert_eq!(targets, vec![(actor, Trigger::OnDiscovered), (owner_actor, Trigger::OnPlayerDiscovered)]);
    }

    #[test]
    fn dispatch_is_skipped_without_a_live_world() {
        let registry = TriggerRegistry::new(Entity::from_raw(1), WeakWorld::default());
        let fired = Rc::new(Cell::new(0));
        let seen = fired.clone();
        registry.register_internal(Trigger::OnKilled, move |_, _| seen.set(seen.get() + 1)).expect("hook");
        registry.dispatch(Trigger::OnKilled, &[]);
        assert_eq!(fired.get(), 0);
    }
}
