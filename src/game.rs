use bevy_ecs::prelude::Entity;
use std::rc::Rc;
use tracing::{debug, info};

use crate::config::{MatchConfig, ScriptingConfig};
use crate::geometry::CPos;
use crate::rules::Rules;
use crate::scripting::{route, CommandCatalogue, RoutedDispatch, ScriptCallback, ScriptHost, ScriptHostError, ScriptSource};
use crate::viewport::ViewportHandle;
use crate::world::{PlayerId, PlayerSpec, WorldError, WorldHandle};

const LOG_TARGET: &str = "match";

/// Reads every configured script from disk, in order.
pub fn load_sources(config: &ScriptingConfig) -> Result<Vec<ScriptSource>, ScriptHostError> {
    config.scripts.iter().map(ScriptSource::from_file).collect()
}

/// One running mission: the world, its viewport and the script host that
/// drives it.
pub struct Match {
    world: WorldHandle,
    viewport: ViewportHandle,
    config: MatchConfig,
    host: Option<Rc<ScriptHost>>,
    shut_down: bool,
}

impl Match {
    pub fn new(rules: Rules, config: MatchConfig) -> Self {
        let world = WorldHandle::new(rules, config.seed);
        Self { world, viewport: ViewportHandle::default(), config, host: None, shut_down: false }
    }

    pub fn world(&self) -> &WorldHandle {
        &self.world
    }

    pub fn viewport(&self) -> &ViewportHandle {
        &self.viewport
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn host(&self) -> Option<&Rc<ScriptHost>> {
        self.host.as_ref()
    }

    pub fn add_player(&self, spec: &PlayerSpec) -> PlayerId {
        self.world.borrow_mut().add_player(spec)
    }

    /// Places an actor directly in the world, as map population does.
    pub fn spawn_actor(&self, actor_type: &str, owner: PlayerId, location: CPos) -> Result<Entity, WorldError> {
        self.world.borrow_mut().create_actor(actor_type, owner, location, true)
    }

    /// Builds the script host once the world is populated. Events raised by
    /// population predate every subscription and are dropped.
    pub fn start(&mut self, sources: &[ScriptSource], catalogue: CommandCatalogue) -> Result<Rc<ScriptHost>, ScriptHostError> {
        self.world.borrow_mut().drain_events();
        let host = ScriptHost::new(&self.world, self.viewport.clone(), sources, catalogue, &self.config.scripting)?;
        self.host = Some(host.clone());
        info!(target: LOG_TARGET, sources = sources.len(), "match scripts started");
        Ok(host)
    }

    /// `start` with the scripts listed in the match configuration.
    pub fn start_from_config(&mut self, catalogue: CommandCatalogue) -> Result<Rc<ScriptHost>, ScriptHostError> {
        let sources = load_sources(&self.config.scripting)?;
        self.start(&sources, catalogue)
    }

    pub fn register_map_actor(&self, name: &str, actor: Entity) -> Result<(), ScriptHostError> {
        match &self.host {
            Some(host) => host.register_entity_handle(name, actor),
            None => Err(ScriptHostError::Load("scripts have not been started".to_string())),
        }
    }

    pub fn world_loaded(&self) {
        if let Some(host) = &self.host {
            host.notify_world_loaded();
        }
        self.dispatch_events();
    }

    /// One simulation frame. Does nothing while the world is paused.
    pub fn tick(&self) {
        if self.shut_down || self.world.borrow().is_paused() {
            return;
        }
        let ready = {
            let mut world = self.world.borrow_mut();
            world.begin_tick();
            world.tick_activities()
        };
        run_callbacks(ready);
        if let Some(host) = &self.host {
            host.tick();
        }
        let due = self.world.borrow_mut().apply_frame_end();
        run_callbacks(due);
        self.dispatch_events();
    }

    /// Idempotent.
    pub fn shutdown(&mut self) {
        if std::mem::replace(&mut self.shut_down, true) {
            return;
        }
        if let Some(host) = &self.host {
            host.dispose();
        }
        let registries: Vec<_> = {
            let mut world = self.world.borrow_mut();
            world.begin_disposing();
            world.trigger_registries().cloned().collect()
        };
        for registry in &registries {
            registry.dispose();
        }
        // Flush the clears; callbacks scheduled for later frames never run.
        let dropped = self.world.borrow_mut().apply_frame_end();
        debug!(target: LOG_TARGET, registries = registries.len(), dropped_callbacks = dropped.len(), "match shut down");
    }

    fn dispatch_events(&self) {
        let routed: Vec<RoutedDispatch> = {
            let mut world = self.world.borrow_mut();
            let events = world.drain_events();
            events.iter().flat_map(|event| route(&world, event)).collect()
        };
        for dispatch in routed {
            dispatch.run();
        }
    }
}

impl Drop for Match {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_callbacks(callbacks: Vec<ScriptCallback>) {
    for callback in callbacks {
        callback.run();
    }
}
