//! Headless mission runner used by the `mission_harness` binary and the
//! integration tests. A fixture describes rules, players, map actors and
//! scripts; the output is a deterministic summary suitable for golden files.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use bevy_ecs::prelude::Entity;
use serde::{Deserialize, Serialize};

use crate::config::MatchConfig;
use crate::game::Match;
use crate::geometry::CPos;
use crate::rules::{ActorInfo, Rules};
use crate::scripting::{CommandCatalogue, ScriptSource};
use crate::world::{Objective, Outcome, PlayerId, PlayerSpec};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MissionFixture {
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub rules: Vec<ActorInfo>,
    pub players: Vec<PlayerSpec>,
    #[serde(default)]
    pub actors: Vec<FixtureActor>,
    pub scripts: Vec<FixtureScript>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixtureActor {
    /// Script-visible global name, for map actors.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub actor_type: String,
    pub owner: String,
    pub location: [i32; 2],
}

/// Either inline `code` or a `path` relative to the fixture file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixtureScript {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HarnessOutput {
    pub ticks: u64,
    pub logs: Vec<String>,
    pub fatal_error: bool,
    pub ended: bool,
    pub paused: bool,
    pub players: Vec<PlayerSummary>,
    pub actors: Vec<ActorSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerSummary {
    pub internal_name: String,
    pub objectives: Vec<Objective>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActorSummary {
    pub entity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub actor_type: String,
    pub owner: String,
    pub location: [i32; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<i32>,
    pub in_world: bool,
    pub dead: bool,
}

fn default_ticks() -> u64 {
    100
}

impl FixtureScript {
    pub fn inline(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self { name: Some(name.into()), path: None, code: Some(code.into()) }
    }

    fn to_source(&self, index: usize) -> Result<ScriptSource> {
        match (&self.code, &self.path) {
            (Some(code), _) => {
                let name = self.name.clone().unwrap_or_else(|| format!("script_{index}"));
                Ok(ScriptSource::new(name, code.clone()))
            }
            (None, Some(path)) => {
                let mut source = ScriptSource::from_file(path)?;
                if let Some(name) = &self.name {
                    source.name = name.clone();
                }
                Ok(source)
            }
            (None, None) => Err(anyhow!("script #{index} has neither 'code' nor 'path'")),
        }
    }
}

/// Parses a fixture and resolves relative script paths against its directory.
pub fn load_fixture(path: &Path) -> Result<MissionFixture> {
    let file = File::open(path).with_context(|| format!("opening fixture '{}'", path.display()))?;
    let mut fixture: MissionFixture =
        serde_json::from_reader(file).with_context(|| format!("parsing fixture '{}'", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    for script in &mut fixture.scripts {
        if let Some(script_path) = &mut script.path {
            if script_path.is_relative() {
                *script_path = base.join(&*script_path);
            }
        }
    }
    Ok(fixture)
}

pub fn run_fixture(fixture: &MissionFixture) -> Result<HarnessOutput> {
    let config = MatchConfig { seed: fixture.seed, ..MatchConfig::default() };
    run_fixture_with_config(fixture, config)
}

/// Runs the fixture for its tick count. Script failures do not fail the run;
/// they show up as `fatal_error` and in `logs`.
pub fn run_fixture_with_config(fixture: &MissionFixture, config: MatchConfig) -> Result<HarnessOutput> {
    let mut game = Match::new(Rules::from_infos(fixture.rules.iter().cloned()), config);

    let mut players: BTreeMap<String, PlayerId> = BTreeMap::new();
    for spec in &fixture.players {
        players.insert(spec.internal_name.clone(), game.add_player(spec));
    }

    let mut map_actors: Vec<(String, Entity)> = Vec::new();
    for actor in &fixture.actors {
        let owner = *players
            .get(&actor.owner)
            .ok_or_else(|| anyhow!("actor owner '{}' is not a fixture player", actor.owner))?;
        let [x, y] = actor.location;
        let entity = game
            .spawn_actor(&actor.actor_type, owner, CPos::new(x, y))
            .with_context(|| format!("spawning map actor of type '{}'", actor.actor_type))?;
        if let Some(name) = &actor.name {
            map_actors.push((name.clone(), entity));
        }
    }

    let sources = fixture
        .scripts
        .iter()
        .enumerate()
        .map(|(index, script)| script.to_source(index))
        .collect::<Result<Vec<_>>>()?;
    let host = game.start(&sources, CommandCatalogue::builtin()).context("starting mission scripts")?;
    for (name, entity) in &map_actors {
        game.register_map_actor(name, *entity).with_context(|| format!("binding map actor '{name}'"))?;
    }
    game.world_loaded();

    for _ in 0..fixture.ticks {
        game.tick();
    }

    let names: BTreeMap<Entity, String> = map_actors.into_iter().map(|(name, entity)| (entity, name)).collect();
    let output = summarize(&game, &names, fixture.ticks, host.take_logs(), host.fatal_error_occurred());
    game.shutdown();
    Ok(output)
}

fn summarize(
    game: &Match,
    names: &BTreeMap<Entity, String>,
    ticks: u64,
    logs: Vec<String>,
    fatal_error: bool,
) -> HarnessOutput {
    let mut world = game.world().borrow_mut();
    let state = world.state();
    let players = world
        .players()
        .iter()
        .map(|player| PlayerSummary {
            internal_name: player.internal_name.clone(),
            objectives: player.objectives.clone(),
            outcome: player.outcome,
        })
        .collect();
    let actors = world
        .all_actors()
        .into_iter()
        .filter_map(|entity| {
            let info = world.actor_info(entity)?;
            let owner = world.owner(entity).and_then(|id| world.player(id)).map(|p| p.internal_name.clone())?;
            let location = world.location(entity).unwrap_or_default();
            Some(ActorSummary {
                entity: entity.index(),
                name: names.get(&entity).cloned(),
                actor_type: info.name.clone(),
                owner,
                location: [location.x, location.y],
                health: world.health(entity).map(|health| health.hp),
                in_world: world.is_in_world(entity),
                dead: world.is_dead(entity),
            })
        })
        .collect();
    HarnessOutput { ticks, logs, fatal_error, ended: state.ended, paused: state.paused, players, actors }
}
