#![allow(dead_code)]

use std::rc::Rc;

use bevy_ecs::prelude::Entity;
use sortie_script::config::MatchConfig;
use sortie_script::geometry::CPos;
use sortie_script::rules::{ActorInfo, Rules};
use sortie_script::scripting::{CommandCatalogue, ScriptHost, ScriptSource};
use sortie_script::world::{PlayerId, PlayerSpec};
use sortie_script::Match;

pub fn rules() -> Rules {
    Rules::from_infos([
        ActorInfo::new("e1", ["Health", "Mobile"]).with_max_health(50),
        ActorInfo::new("2tnk", ["Health", "Mobile"]),
        ActorInfo::new("yak", ["Health", "Aircraft"]),
        ActorInfo::new("weap", ["Health", "Production"]),
        ActorInfo::new("pdox", ["Health", "ChronoshiftPower"]),
        ActorInfo::new("mine", Vec::<String>::new()),
    ])
}

/// A populated match: Greece owns a tank, a rifleman and a factory; USSR owns a yak.
pub struct Mission {
    pub game: Match,
    pub greece: PlayerId,
    pub ussr: PlayerId,
    pub tank: Entity,
    pub rifle: Entity,
    pub factory: Entity,
    pub yak: Entity,
}

impl Mission {
    pub fn new() -> Self {
        let game = Match::new(rules(), MatchConfig::default());
        let greece = game.add_player(&PlayerSpec::new("Greece").local());
        let ussr = game.add_player(&PlayerSpec::new("USSR"));
        let tank = game.spawn_actor("2tnk", greece, CPos::new(2, 2)).expect("spawn tank");
        let rifle = game.spawn_actor("e1", greece, CPos::new(3, 2)).expect("spawn rifle");
        let factory = game.spawn_actor("weap", greece, CPos::new(8, 8)).expect("spawn factory");
        let yak = game.spawn_actor("yak", ussr, CPos::new(20, 20)).expect("spawn yak");
        Self { game, greece, ussr, tank, rifle, factory, yak }
    }

    /// Loads `code`, binds the map actors and fires `WorldLoaded`.
    pub fn start(&mut self, code: &str) -> Rc<ScriptHost> {
        let host = self
            .game
            .start(&[ScriptSource::new("mission.rhai", code)], CommandCatalogue::builtin())
            .expect("mission scripts load");
        for (name, actor) in [("tank", self.tank), ("rifle", self.rifle), ("factory", self.factory), ("yak", self.yak)] {
            self.game.register_map_actor(name, actor).expect("bind map actor");
        }
        self.game.world_loaded();
        host
    }

    pub fn ticks(&self, count: usize) {
        for _ in 0..count {
            self.game.tick();
        }
    }
}

pub fn fatal_lines(logs: &[String]) -> Vec<&String> {
    logs.iter().filter(|line| line.starts_with("Fatal script error")).collect()
}
