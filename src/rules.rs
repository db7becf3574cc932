use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Behaviour names actor types can declare.
pub mod behavior {
    pub const HEALTH: &str = "Health";
    pub const MOBILE: &str = "Mobile";
    pub const AIRCRAFT: &str = "Aircraft";
    pub const PRODUCTION: &str = "Production";
    pub const CHRONOSHIFT_POWER: &str = "ChronoshiftPower";
}

/// Static description of an actor type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorInfo {
    pub name: String,
    #[serde(default)]
    pub behaviors: BTreeSet<String>,
    #[serde(default = "ActorInfo::default_max_health")]
    pub max_health: i32,
}

impl ActorInfo {
    const fn default_max_health() -> i32 {
        100
    }

    pub fn new<I, S>(name: impl Into<String>, behaviors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            behaviors: behaviors.into_iter().map(Into::into).collect(),
            max_health: Self::default_max_health(),
        }
    }

    pub fn with_max_health(mut self, max_health: i32) -> Self {
        self.max_health = max_health;
        self
    }

    pub fn has_behavior(&self, behavior: &str) -> bool {
        self.behaviors.contains(behavior)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Rules {
    actors: BTreeMap<String, Arc<ActorInfo>>,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_infos(infos: impl IntoIterator<Item = ActorInfo>) -> Self {
        let mut rules = Self::new();
        for info in infos {
            rules.insert(info);
        }
        rules
    }

    /// Later definitions replace earlier ones with the same name.
    pub fn insert(&mut self, info: ActorInfo) {
        self.actors.insert(info.name.clone(), Arc::new(info));
    }

    pub fn get(&self, name: &str) -> Option<Arc<ActorInfo>> {
        self.actors.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_deserialize_with_defaults() {
        let json = r#"[{"name": "e1", "behaviors": ["Health", "Mobile"]}, {"name": "mine"}]"#;
        let infos: Vec<ActorInfo> = serde_json::from_str(json).expect("parse rules");
        let rules = Rules::from_infos(infos);
        let e1 = rules.get("e1").expect("e1 rules");
        assert!(e1.has_behavior(behavior::MOBILE));
        assert_eq!(e1.max_health, 100);
        assert!(rules.get("mine").expect("mine rules").behaviors.is_empty());
        assert!(rules.get("tank").is_none());
    }
}
