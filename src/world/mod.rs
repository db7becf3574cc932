//! Minimal simulation the scripting host runs against: actors, players,
//! activities, the frame-end queue and the domain-event bus.

pub mod activity;
pub mod deferred;
pub mod player;

use bevy_ecs::prelude::{Component, Entity, With, World};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use activity::{Activity, ActivityQueue};
pub use deferred::{DeferredAction, FrameEndQueue};
pub use player::{Objective, ObjectiveKind, ObjectiveState, Outcome, Player, PlayerActor, PlayerId, PlayerSpec};

use crate::events::{DomainEvent, EventBus};
use crate::geometry::CPos;
use crate::rules::{behavior, ActorInfo, Rules};
use crate::scripting::{ScriptCallback, Trigger, TriggerRegistry};

const LOG_TARGET: &str = "world";

#[derive(Component, Debug, Clone)]
pub struct ActorRef {
    pub info: Arc<ActorInfo>,
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner(pub PlayerId);

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location(pub CPos);

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health {
    pub hp: i32,
    pub max: i32,
}

/// Present while the actor takes part in the simulation.
#[derive(Component, Debug, Clone, Copy)]
pub struct InWorld;

#[derive(Component, Debug, Clone, Copy)]
pub struct Dead;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchState {
    pub ended: bool,
    pub paused: bool,
    pub pause_locked: bool,
    pub disposing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("Unknown actor type '{0}'")]
    UnknownActorType(String),
    #[error("Unknown player {0:?}")]
    UnknownPlayer(PlayerId),
}

pub struct SimWorld {
    ecs: World,
    rules: Rules,
    players: Vec<Player>,
    triggers: BTreeMap<Entity, Rc<TriggerRegistry>>,
    activities: BTreeMap<Entity, ActivityQueue>,
    frame_end: FrameEndQueue,
    state: MatchState,
    tick: u64,
    rng: StdRng,
    handle: WeakWorld,
}

impl SimWorld {
    fn new(rules: Rules, seed: u64, handle: WeakWorld) -> Self {
        let mut ecs = World::new();
        ecs.insert_resource(EventBus::default());
        Self {
            ecs,
            rules,
            players: Vec::new(),
            triggers: BTreeMap::new(),
            activities: BTreeMap::new(),
            frame_end: FrameEndQueue::default(),
            state: MatchState::default(),
            tick: 0,
            rng: StdRng::seed_from_u64(seed),
            handle,
        }
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn handle(&self) -> WeakWorld {
        self.handle.clone()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn begin_tick(&mut self) {
        self.tick += 1;
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    pub fn is_disposing(&self) -> bool {
        self.state.disposing
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    pub fn has_ended(&self) -> bool {
        self.state.ended
    }

    pub fn end_game(&mut self) {
        if !self.state.ended {
            info!(target: LOG_TARGET, tick = self.tick, "match ended");
        }
        self.state.ended = true;
    }

    /// Returns false when the pause state is locked and the request was refused.
    pub fn set_pause_state(&mut self, paused: bool) -> bool {
        if self.state.pause_locked {
            return self.state.paused == paused;
        }
        self.state.paused = paused;
        true
    }

    pub fn lock_pause_state(&mut self) {
        self.state.pause_locked = true;
    }

    pub fn begin_disposing(&mut self) {
        self.state.disposing = true;
    }

    pub fn add_player(&mut self, spec: &PlayerSpec) -> PlayerId {
        let id = PlayerId(self.players.len() as u32);
        let actor = self.ecs.spawn(PlayerActor(id)).id();
        self.triggers.insert(actor, TriggerRegistry::new(actor, self.handle.clone()));
        self.players.push(Player::new(id, spec, actor));
        id
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id.0 as usize)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id.0 as usize)
    }

    pub fn player_by_name(&self, internal_name: &str) -> Option<&Player> {
        self.players.iter().find(|player| player.internal_name == internal_name)
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Adds an objective right away so its id can be returned; the notification waits for the frame end.
    pub fn add_objective(&mut self, player: PlayerId, description: &str, kind: ObjectiveKind) -> Option<usize> {
        let id = self.player_mut(player)?.add_objective(description, kind);
        self.queue_frame_end(DeferredAction::Notify(DomainEvent::ObjectiveAdded { player, id }));
        Some(id)
    }

    /// Spawns an actor record. When `add_to_world` is false the actor exists but is not
    /// simulated until an `AddToWorld` action is applied.
    pub fn create_actor(
        &mut self,
        actor_type: &str,
        owner: PlayerId,
        location: CPos,
        add_to_world: bool,
    ) -> Result<Entity, WorldError> {
        let info = self.rules.get(actor_type).ok_or_else(|| WorldError::UnknownActorType(actor_type.to_string()))?;
        if self.player(owner).is_none() {
            return Err(WorldError::UnknownPlayer(owner));
        }
        let mut entity = self.ecs.spawn((ActorRef { info: info.clone() }, Owner(owner), Location(location)));
        if info.has_behavior(behavior::HEALTH) {
            entity.insert(Health { hp: info.max_health, max: info.max_health });
        }
        let id = entity.id();
        self.triggers.insert(id, TriggerRegistry::new(id, self.handle.clone()));
        debug!(target: LOG_TARGET, actor = id.index(), actor_type, "created actor");
        if add_to_world {
            self.add_to_world(id);
        }
        Ok(id)
    }

    pub fn exists(&self, actor: Entity) -> bool {
        self.ecs.get::<ActorRef>(actor).is_some()
    }

    pub fn actor_info(&self, actor: Entity) -> Option<Arc<ActorInfo>> {
        self.ecs.get::<ActorRef>(actor).map(|r| r.info.clone())
    }

    pub fn owner(&self, actor: Entity) -> Option<PlayerId> {
        self.ecs.get::<Owner>(actor).map(|o| o.0)
    }

    pub fn location(&self, actor: Entity) -> Option<CPos> {
        self.ecs.get::<Location>(actor).map(|l| l.0)
    }

    pub fn health(&self, actor: Entity) -> Option<Health> {
        self.ecs.get::<Health>(actor).copied()
    }

    pub fn is_in_world(&self, actor: Entity) -> bool {
        self.ecs.get::<InWorld>(actor).is_some()
    }

    /// Killed, disposed or already released.
    pub fn is_dead(&self, actor: Entity) -> bool {
        !self.exists(actor) || self.ecs.get::<Dead>(actor).is_some()
    }

    pub fn actors_in_world(&mut self) -> Vec<Entity> {
        let mut query = self.ecs.query_filtered::<Entity, (With<InWorld>, With<ActorRef>)>();
        let mut actors: Vec<Entity> = query.iter(&self.ecs).collect();
        actors.sort();
        actors
    }

    pub fn all_actors(&mut self) -> Vec<Entity> {
        let mut query = self.ecs.query_filtered::<Entity, With<ActorRef>>();
        let mut actors: Vec<Entity> = query.iter(&self.ecs).collect();
        actors.sort();
        actors
    }

    pub fn triggers(&self, actor: Entity) -> Option<Rc<TriggerRegistry>> {
        self.triggers.get(&actor).cloned()
    }

    pub fn trigger_registries(&self) -> impl Iterator<Item = &Rc<TriggerRegistry>> {
        self.triggers.values()
    }

    pub fn activity_count(&self, actor: Entity) -> usize {
        self.activities.get(&actor).map_or(0, ActivityQueue::len)
    }

    pub fn queue_frame_end(&mut self, action: DeferredAction) {
        self.frame_end.push(self.tick, 0, action);
    }

    pub fn queue_delayed(&mut self, delay: u64, action: DeferredAction) {
        self.frame_end.push(self.tick, delay, action);
    }

    pub fn pending_actions(&self) -> usize {
        self.frame_end.len()
    }

    pub fn emit(&mut self, event: DomainEvent) {
        self.ecs.resource_mut::<EventBus>().push(event);
    }

    pub fn drain_events(&mut self) -> Vec<DomainEvent> {
        self.ecs.resource_mut::<EventBus>().drain()
    }

    /// Applies every action due this tick. Script callbacks are handed back so the
    /// caller can run them without holding the world borrow.
    pub fn apply_frame_end(&mut self) -> Vec<ScriptCallback> {
        let mut callbacks = Vec::new();
        for action in self.frame_end.take_due(self.tick) {
            self.apply(action, &mut callbacks);
        }
        callbacks
    }

    fn apply(&mut self, action: DeferredAction, callbacks: &mut Vec<ScriptCallback>) {
        match action {
            DeferredAction::HaltMatch => {
                self.end_game();
                self.set_pause_state(true);
                self.lock_pause_state();
            }
            DeferredAction::ClearTriggers { registry, trigger } => registry.clear_now(trigger),
            DeferredAction::AddToWorld { actor } => self.add_to_world(actor),
            DeferredAction::RemoveFromWorld { actor } => self.remove_from_world(actor),
            DeferredAction::QueueActivity { actor, activity } => {
                if self.is_dead(actor) {
                    debug!(target: LOG_TARGET, actor = actor.index(), "dropping activity for dead actor");
                    return;
                }
                self.activities.entry(actor).or_default().push(activity);
            }
            DeferredAction::CancelActivities { actor } => self.cancel_activities(actor),
            DeferredAction::Damage { actor, attacker, amount } => self.damage(actor, attacker, amount),
            DeferredAction::Kill { actor, attacker } => self.kill(actor, attacker),
            DeferredAction::Dispose { actor } => self.dispose(actor),
            DeferredAction::Release { actor } => self.release(actor),
            DeferredAction::Teleport { actor, cell } => {
                if let Some(mut location) = self.ecs.get_mut::<Location>(actor) {
                    location.0 = cell;
                }
            }
            DeferredAction::Produce { producer, actor_type } => self.produce(producer, &actor_type),
            DeferredAction::Capture { actor, captor } => self.capture(actor, captor),
            DeferredAction::Infiltrate { actor, infiltrator } => {
                if self.exists(actor) && self.exists(infiltrator) {
                    self.emit(DomainEvent::Infiltrated { actor, infiltrator });
                }
            }
            DeferredAction::Discover { actor, discoverer } => {
                if self.exists(actor) {
                    self.emit(DomainEvent::Discovered { actor, discoverer });
                }
            }
            DeferredAction::SetObjectiveState { player, id, state } => self.set_objective_state(player, id, state),
            DeferredAction::Notify(event) => self.emit(event),
            DeferredAction::Callback(callback) => callbacks.push(callback),
        }
    }

    fn add_to_world(&mut self, actor: Entity) {
        if !self.exists(actor) || self.is_in_world(actor) || self.is_dead(actor) {
            return;
        }
        self.ecs.entity_mut(actor).insert(InWorld);
        self.emit(DomainEvent::AddedToWorld { actor });
    }

    fn remove_from_world(&mut self, actor: Entity) {
        if !self.is_in_world(actor) {
            return;
        }
        self.ecs.entity_mut(actor).remove::<InWorld>();
        self.cancel_activities(actor);
        self.emit(DomainEvent::RemovedFromWorld { actor });
    }

    fn cancel_activities(&mut self, actor: Entity) {
        if let Some(mut queue) = self.activities.remove(&actor) {
            queue.cancel();
        }
    }

    fn damage(&mut self, actor: Entity, attacker: Option<Entity>, amount: i32) {
        if self.is_dead(actor) {
            return;
        }
        let Some(mut health) = self.ecs.get_mut::<Health>(actor) else {
            return;
        };
        health.hp = health.hp.saturating_sub(amount).clamp(0, health.max);
        let remaining = health.hp;
        self.emit(DomainEvent::Damaged { actor, attacker, amount });
        if remaining == 0 {
            self.kill(actor, attacker);
        }
    }

    fn kill(&mut self, actor: Entity, attacker: Option<Entity>) {
        if self.is_dead(actor) {
            return;
        }
        if let Some(mut health) = self.ecs.get_mut::<Health>(actor) {
            health.hp = 0;
        }
        self.ecs.entity_mut(actor).insert(Dead);
        self.emit(DomainEvent::Killed { actor, attacker });
        self.remove_from_world(actor);
        self.queue_frame_end(DeferredAction::Release { actor });
    }

    fn dispose(&mut self, actor: Entity) {
        if !self.exists(actor) {
            return;
        }
        self.remove_from_world(actor);
        if self.ecs.get::<Dead>(actor).is_none() {
            self.ecs.entity_mut(actor).insert(Dead);
            self.queue_frame_end(DeferredAction::Release { actor });
        }
    }

    fn release(&mut self, actor: Entity) {
        self.cancel_activities(actor);
        if let Some(registry) = self.triggers.remove(&actor) {
            for action in registry.clear_actions(&Trigger::ALL) {
                self.queue_frame_end(action);
            }
        }
        if self.exists(actor) {
            self.ecs.despawn(actor);
        }
    }

    fn produce(&mut self, producer: Entity, actor_type: &str) {
        if !self.is_in_world(producer) || self.is_dead(producer) {
            return;
        }
        let (Some(owner), Some(location)) = (self.owner(producer), self.location(producer)) else {
            return;
        };
        match self.create_actor(actor_type, owner, location, true) {
            Ok(produced) => self.emit(DomainEvent::Produced { producer, produced }),
            Err(err) => warn!(target: LOG_TARGET, producer = producer.index(), "production failed: {err}"),
        }
    }

    fn capture(&mut self, actor: Entity, captor: Entity) {
        if self.is_dead(actor) || !self.exists(captor) {
            return;
        }
        let (Some(old_owner), Some(new_owner)) = (self.owner(actor), self.owner(captor)) else {
            return;
        };
        if old_owner == new_owner {
            return;
        }
        if let Some(mut owner) = self.ecs.get_mut::<Owner>(actor) {
            owner.0 = new_owner;
        }
        self.emit(DomainEvent::Captured { actor, captor, old_owner, new_owner });
    }

    fn set_objective_state(&mut self, player: PlayerId, id: usize, state: ObjectiveState) {
        let Some(p) = self.player_mut(player) else {
            return;
        };
        if !p.resolve_objective(id, state) {
            return;
        }
        let outcome = p.evaluate_outcome();
        if let Some(outcome) = outcome {
            p.outcome = Some(outcome);
        }
        match state {
            ObjectiveState::Completed => self.emit(DomainEvent::ObjectiveCompleted { player, id }),
            ObjectiveState::Failed => self.emit(DomainEvent::ObjectiveFailed { player, id }),
            ObjectiveState::Incomplete => {}
        }
        match outcome {
            Some(Outcome::Won) => self.emit(DomainEvent::PlayerWon { player }),
            Some(Outcome::Lost) => self.emit(DomainEvent::PlayerLost { player }),
            None => {}
        }
    }

    /// Advances every in-world actor's activity queue by one tick and raises idle
    /// notifications for actors with nothing left to do.
    pub fn tick_activities(&mut self) -> Vec<ScriptCallback> {
        let mut ready = Vec::new();
        let mut leaving = Vec::new();
        let actors: Vec<Entity> = self.activities.keys().copied().collect();
        for actor in actors {
            if !self.is_in_world(actor) || self.is_dead(actor) {
                continue;
            }
            let Some(queue) = self.activities.get_mut(&actor) else {
                continue;
            };
            while let Some(activity) = queue.front_mut() {
                match activity {
                    Activity::Move { destination } => {
                        let destination = *destination;
                        let Some(mut location) = self.ecs.get_mut::<Location>(actor) else {
                            queue.pop();
                            continue;
                        };
                        if location.0 == destination {
                            queue.pop();
                            continue;
                        }
                        location.0 = location.0.step_towards(destination);
                        if location.0 == destination {
                            queue.pop();
                        }
                        break;
                    }
                    Activity::Wait { remaining } => {
                        if *remaining == 0 {
                            queue.pop();
                            continue;
                        }
                        *remaining -= 1;
                        if *remaining == 0 {
                            queue.pop();
                        }
                        break;
                    }
                    Activity::CallScript(_) => {
                        if let Some(Activity::CallScript(callback)) = queue.pop() {
                            ready.push(callback);
                        }
                    }
                    Activity::RemoveSelf => {
                        queue.pop();
                        leaving.push(actor);
                        break;
                    }
                }
            }
        }
        self.activities.retain(|_, queue| !queue.is_empty());
        for actor in leaving {
            self.queue_frame_end(DeferredAction::Dispose { actor });
        }

        let idle: Vec<Entity> = self
            .triggers
            .iter()
            .filter(|(actor, registry)| {
                registry.callback_count(Trigger::OnIdle) > 0
                    && !self.activities.contains_key(*actor)
                    && self.is_in_world(**actor)
                    && !self.is_dead(**actor)
            })
            .map(|(actor, _)| *actor)
            .collect();
        for actor in idle {
            self.emit(DomainEvent::Idle { actor });
        }
        ready
    }
}

/// Shared handle to the simulation.
#[derive(Clone)]
pub struct WorldHandle(Rc<RefCell<SimWorld>>);

impl WorldHandle {
    pub fn new(rules: Rules, seed: u64) -> Self {
        Self(Rc::new_cyclic(|weak| RefCell::new(SimWorld::new(rules, seed, WeakWorld(weak.clone())))))
    }

    pub fn borrow(&self) -> Ref<'_, SimWorld> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, SimWorld> {
        self.0.borrow_mut()
    }

    pub fn try_borrow_mut(&self) -> Option<RefMut<'_, SimWorld>> {
        self.0.try_borrow_mut().ok()
    }

    pub fn downgrade(&self) -> WeakWorld {
        WeakWorld(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &WorldHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Clone, Default)]
pub struct WeakWorld(Weak<RefCell<SimWorld>>);

impl WeakWorld {
    pub fn upgrade(&self) -> Option<WorldHandle> {
        self.0.upgrade().map(WorldHandle)
    }

    /// A dropped world counts as tearing down. A world that is mutably
    /// borrowed is mid-update and not tearing down.
    pub fn is_disposing(&self) -> bool {
        match self.0.upgrade() {
            Some(world) => {
                let disposing = world.try_borrow().is_ok_and(|world| world.is_disposing());
                disposing
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> (WorldHandle, PlayerId) {
        let rules = Rules::from_infos([
            ActorInfo::new("e1", [behavior::HEALTH, behavior::MOBILE]).with_max_health(50),
            ActorInfo::new("fact", [behavior::HEALTH, behavior::PRODUCTION]),
            ActorInfo::new("mine", Vec::<String>::new()),
        ]);
        let world = WorldHandle::new(rules, 7);
        let player = world.borrow_mut().add_player(&PlayerSpec::new("Greece"));
        (world, player)
    }

    #[test]
    fn create_actor_rejects_unknown_types() {
        let (world, player) = world();
        let err = world.borrow_mut().create_actor("tank", player, CPos::new(0, 0), true).unwrap_err();
        assert_eq!(err, WorldError::UnknownActorType("tank".into()));
    }

    #[test]
    fn move_steps_one_cell_per_tick() {
        let (world, player) = world();
        let mut w = world.borrow_mut();
        let actor = w.create_actor("e1", player, CPos::new(0, 0), true).expect("spawn e1");
        w.queue_frame_end(DeferredAction::QueueActivity {
            actor,
            activity: Activity::Move { destination: CPos::new(2, 0) },
        });
        w.apply_frame_end();
        w.tick_activities();
        assert_eq!(w.location(actor), Some(CPos::new(1, 0)));
        w.tick_activities();
        assert_eq!(w.location(actor), Some(CPos::new(2, 0)));
        assert_eq!(w.activity_count(actor), 0);
    }

    #[test]
    fn lethal_damage_kills_and_removes_from_world() {
        let (world, player) = world();
        let mut w = world.borrow_mut();
        let actor = w.create_actor("e1", player, CPos::new(0, 0), true).expect("spawn e1");
        w.drain_events();
        w.queue_frame_end(DeferredAction::Damage { actor, attacker: None, amount: 80 });
        w.apply_frame_end();
        let events = w.drain_events();
        assert_eq!(
            events,
            vec![
                DomainEvent::Damaged { actor, attacker: None, amount: 80 },
                DomainEvent::Killed { actor, attacker: None },
                DomainEvent::RemovedFromWorld { actor },
            ]
        );
        assert!(w.is_dead(actor));
        assert!(w.exists(actor), "released on the following frame end");
        w.begin_tick();
        w.apply_frame_end();
        assert!(!w.exists(actor));
        assert!(w.triggers(actor).is_none());
    }

    #[test]
    fn remove_self_disposes_the_actor() {
        let (world, player) = world();
        let mut w = world.borrow_mut();
        let actor = w.create_actor("e1", player, CPos::new(0, 0), true).expect("spawn e1");
        w.queue_frame_end(DeferredAction::QueueActivity { actor, activity: Activity::RemoveSelf });
        w.apply_frame_end();
        w.tick_activities();
        assert!(w.is_in_world(actor), "disposal waits for the frame end");
        w.apply_frame_end();
        assert!(!w.is_in_world(actor));
        assert!(w.is_dead(actor));
        w.begin_tick();
        w.apply_frame_end();
        assert!(!w.exists(actor));
    }

    #[test]
    fn halt_locks_the_pause_state() {
        let (world, _) = world();
        let mut w = world.borrow_mut();
        w.queue_frame_end(DeferredAction::HaltMatch);
        w.apply_frame_end();
        let state = w.state();
        assert!(state.ended && state.paused && state.pause_locked);
        assert!(!w.set_pause_state(false), "unpausing must be refused once locked");
        assert!(w.is_paused());
    }

    #[test]
    fn production_spawns_next_to_the_producer() {
        let (world, player) = world();
        let mut w = world.borrow_mut();
        let factory = w.create_actor("fact", player, CPos::new(4, 4), true).expect("spawn fact");
        w.drain_events();
        w.queue_frame_end(DeferredAction::Produce { producer: factory, actor_type: "e1".into() });
        w.apply_frame_end();
        let events = w.drain_events();
        let produced = match events.as_slice() {
            [DomainEvent::AddedToWorld { actor }, DomainEvent::Produced { producer, produced }] => {
                assert_eq!(actor, produced);
                assert_eq!(*producer, factory);
                *produced
            }
            other => panic!("unexpected events {other:?}"),
        };
        assert_eq!(w.location(produced), Some(CPos::new(4, 4)));
        assert_eq!(w.owner(produced), Some(player));
    }
}
