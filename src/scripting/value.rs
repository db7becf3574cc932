//! The boundary between script values and native values.

use bevy_ecs::prelude::Entity;
use rhai::{Array, Dynamic, FnPtr, ImmutableString, INT};

use crate::geometry::{CPos, CVec};
use crate::scripting::actor::{ScriptActor, ScriptPlayer};
use crate::scripting::{ArgError, HostContext};
use crate::world::PlayerId;

/// Native-side argument passed into script callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptValue {
    Unit,
    Bool(bool),
    Int(i64),
    Str(String),
    Cell(CPos),
    Actor(Entity),
    Player(PlayerId),
    Array(Vec<ScriptValue>),
}

impl ScriptValue {
    pub fn actor_or_unit(actor: Option<Entity>) -> Self {
        actor.map_or(ScriptValue::Unit, ScriptValue::Actor)
    }

    /// Actors that no longer exist become unit.
    pub fn to_dynamic(&self, ctx: &HostContext) -> Dynamic {
        match self {
            ScriptValue::Unit => Dynamic::UNIT,
            ScriptValue::Bool(value) => Dynamic::from_bool(*value),
            ScriptValue::Int(value) => Dynamic::from_int(*value as INT),
            ScriptValue::Str(value) => value.clone().into(),
            ScriptValue::Cell(cell) => Dynamic::from(*cell),
            ScriptValue::Actor(entity) => ctx.actor_value(*entity),
            ScriptValue::Player(player) => ctx.player_value(*player),
            ScriptValue::Array(items) => Dynamic::from_array(items.iter().map(|item| item.to_dynamic(ctx)).collect()),
        }
    }

    /// Values with no native counterpart become unit.
    pub fn from_dynamic(value: &Dynamic) -> Self {
        if value.is_unit() {
            ScriptValue::Unit
        } else if let Ok(b) = value.as_bool() {
            ScriptValue::Bool(b)
        } else if let Ok(i) = value.as_int() {
            ScriptValue::Int(i)
        } else if value.is_string() {
            ScriptValue::Str(value.to_string())
        } else if let Some(cell) = value.clone().try_cast::<CPos>() {
            ScriptValue::Cell(cell)
        } else if let Some(actor) = value.clone().try_cast::<ScriptActor>() {
            ScriptValue::Actor(actor.entity())
        } else if let Some(player) = value.clone().try_cast::<ScriptPlayer>() {
            ScriptValue::Player(player.id())
        } else if value.is_array() {
            let items = value.clone().into_array().unwrap_or_default();
            ScriptValue::Array(items.iter().map(ScriptValue::from_dynamic).collect())
        } else {
            ScriptValue::Unit
        }
    }
}

/// Friendly type name for error messages.
pub fn describe(value: &Dynamic) -> String {
    if value.is_unit() {
        "nil".to_string()
    } else if value.is::<ScriptActor>() {
        "Actor".to_string()
    } else if value.is::<ScriptPlayer>() {
        "Player".to_string()
    } else if value.is::<CPos>() {
        "CPos".to_string()
    } else if value.is::<CVec>() {
        "CVec".to_string()
    } else if value.is::<FnPtr>() {
        "function".to_string()
    } else if value.is_int() {
        "integer".to_string()
    } else if value.is_string() {
        "string".to_string()
    } else if value.is_array() {
        "array".to_string()
    } else if value.is_bool() {
        "boolean".to_string()
    } else {
        value.type_name().to_string()
    }
}

/// Lua-style truthiness: only nil and false are false.
pub fn is_truthy(value: &Dynamic) -> bool {
    if value.is_unit() {
        false
    } else {
        value.as_bool().unwrap_or(true)
    }
}

fn wrong_type(name: &'static str, expected: &'static str, value: &Dynamic) -> ArgError {
    ArgError::WrongType { name, expected, actual: describe(value) }
}

pub fn expect_actor(value: &Dynamic, name: &'static str) -> Result<ScriptActor, ArgError> {
    value.clone().try_cast::<ScriptActor>().ok_or_else(|| wrong_type(name, "Actor", value))
}

pub fn expect_player(value: &Dynamic, name: &'static str) -> Result<ScriptPlayer, ArgError> {
    value.clone().try_cast::<ScriptPlayer>().ok_or_else(|| wrong_type(name, "Player", value))
}

pub fn expect_function(value: &Dynamic, name: &'static str) -> Result<FnPtr, ArgError> {
    value.clone().try_cast::<FnPtr>().ok_or_else(|| wrong_type(name, "function", value))
}

pub fn expect_cell(value: &Dynamic, name: &'static str) -> Result<CPos, ArgError> {
    value.clone().try_cast::<CPos>().ok_or_else(|| wrong_type(name, "CPos", value))
}

pub fn expect_int(value: &Dynamic, name: &'static str) -> Result<i64, ArgError> {
    value.as_int().map_err(|_| wrong_type(name, "integer", value))
}

pub fn expect_string(value: &Dynamic, name: &'static str) -> Result<String, ArgError> {
    value
        .clone()
        .try_cast::<ImmutableString>()
        .map(|s| s.to_string())
        .ok_or_else(|| wrong_type(name, "string", value))
}

pub fn expect_array(value: &Dynamic, name: &'static str) -> Result<Array, ArgError> {
    value.clone().into_array().map_err(|_| wrong_type(name, "array", value))
}

pub fn expect_actors(value: &Dynamic, name: &'static str) -> Result<Vec<ScriptActor>, ArgError> {
    expect_array(value, name)?.iter().map(|item| expect_actor(item, name)).collect()
}

pub fn expect_cells(value: &Dynamic, name: &'static str) -> Result<Vec<CPos>, ArgError> {
    expect_array(value, name)?.iter().map(|item| expect_cell(item, name)).collect()
}

pub fn expect_strings(value: &Dynamic, name: &'static str) -> Result<Vec<String>, ArgError> {
    expect_array(value, name)?.iter().map(|item| expect_string(item, name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_values_convert_from_dynamic() {
        assert_eq!(ScriptValue::from_dynamic(&Dynamic::UNIT), ScriptValue::Unit);
        assert_eq!(ScriptValue::from_dynamic(&Dynamic::from_int(4)), ScriptValue::Int(4));
        assert_eq!(ScriptValue::from_dynamic(&"hi".into()), ScriptValue::Str("hi".into()));
        assert_eq!(ScriptValue::from_dynamic(&Dynamic::from(CPos::new(1, 2))), ScriptValue::Cell(CPos::new(1, 2)));
    }

    #[test]
    fn wrong_types_name_both_sides() {
        let err = expect_int(&"ten".into(), "interval").unwrap_err();
        assert_eq!(err.to_string(), "Expected integer for 'interval', got string");
        let err = expect_cell(&Dynamic::UNIT, "destination").unwrap_err();
        assert_eq!(err.to_string(), "Expected CPos for 'destination', got nil");
    }

    #[test]
    fn truthiness_follows_nil_and_false() {
        assert!(!is_truthy(&Dynamic::UNIT));
        assert!(!is_truthy(&Dynamic::FALSE));
        assert!(is_truthy(&Dynamic::from_int(0)));
    }
}
