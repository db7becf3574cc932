use bevy_ecs::prelude::{Component, Entity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

/// Marks the entity that carries a player's triggers.
#[derive(Component, Debug, Clone, Copy)]
pub struct PlayerActor(pub PlayerId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSpec {
    pub internal_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_local: bool,
}

impl PlayerSpec {
    pub fn new(internal_name: impl Into<String>) -> Self {
        Self { internal_name: internal_name.into(), name: None, is_local: false }
    }

    pub fn local(mut self) -> Self {
        self.is_local = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveState {
    Incomplete,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    pub description: String,
    pub kind: ObjectiveKind,
    pub state: ObjectiveState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Won,
    Lost,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub internal_name: String,
    pub name: String,
    pub is_local: bool,
    pub actor: Entity,
    pub objectives: Vec<Objective>,
    pub outcome: Option<Outcome>,
}

impl Player {
    pub(crate) fn new(id: PlayerId, spec: &PlayerSpec, actor: Entity) -> Self {
        Self {
            id,
            internal_name: spec.internal_name.clone(),
            name: spec.name.clone().unwrap_or_else(|| spec.internal_name.clone()),
            is_local: spec.is_local,
            actor,
            objectives: Vec::new(),
            outcome: None,
        }
    }

    pub fn add_objective(&mut self, description: impl Into<String>, kind: ObjectiveKind) -> usize {
        self.objectives.push(Objective {
            description: description.into(),
            kind,
            state: ObjectiveState::Incomplete,
        });
        self.objectives.len() - 1
    }

    pub fn objective_state(&self, id: usize) -> Option<ObjectiveState> {
        self.objectives.get(id).map(|objective| objective.state)
    }

    /// Moves an incomplete objective to `state`. Returns false if it was already resolved.
    pub(crate) fn resolve_objective(&mut self, id: usize, state: ObjectiveState) -> bool {
        match self.objectives.get_mut(id) {
            Some(objective) if objective.state == ObjectiveState::Incomplete => {
                objective.state = state;
                true
            }
            _ => false,
        }
    }

    /// A failed primary loses. Completing every primary wins.
    pub(crate) fn evaluate_outcome(&self) -> Option<Outcome> {
        if self.outcome.is_some() {
            return None;
        }
        let mut primaries = self.objectives.iter().filter(|o| o.kind == ObjectiveKind::Primary).peekable();
        primaries.peek()?;
        let mut all_completed = true;
        for objective in primaries {
            match objective.state {
                ObjectiveState::Failed => return Some(Outcome::Lost),
                ObjectiveState::Incomplete => all_completed = false,
                ObjectiveState::Completed => {}
            }
        }
        all_completed.then_some(Outcome::Won)
    }
}
