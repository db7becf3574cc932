use rhai::{Dynamic, Engine};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::scripting::{globals, properties, HostContext, ScriptHostError};

/// Installs a group's types and functions on the engine.
pub type RegisterFn = fn(&mut Engine);

/// Builds a global's script value. Every global is constructed from the host context alone.
pub type GlobalFactory = fn(&HostContext) -> Dynamic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandScope {
    Actor,
    Player,
}

/// Members exposed on actor or player values, gated by required behaviours.
#[derive(Clone, Copy)]
pub struct CommandGroupDescriptor {
    pub name: &'static str,
    pub scope: CommandScope,
    pub requires: &'static [&'static str],
    pub commands: &'static [&'static str],
    /// Members stay usable after the actor has died.
    pub exposed_for_destroyed: bool,
    pub register: RegisterFn,
}

impl CommandGroupDescriptor {
    pub fn defines(&self, member: &str) -> bool {
        self.commands.contains(&member)
    }
}

impl fmt::Debug for CommandGroupDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandGroupDescriptor")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("requires", &self.requires)
            .field("commands", &self.commands)
            .finish()
    }
}

/// A world-scoped singleton bound under `name` for the lifetime of a host.
#[derive(Clone, Copy)]
pub struct GlobalDescriptor {
    pub name: &'static str,
    pub register: RegisterFn,
    pub create: GlobalFactory,
}

impl fmt::Debug for GlobalDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalDescriptor").field("name", &self.name).finish()
    }
}

/// Every command group and global a host exposes, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct CommandCatalogue {
    globals: Vec<GlobalDescriptor>,
    groups: Vec<CommandGroupDescriptor>,
}

impl CommandCatalogue {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        Self { globals: globals::BUILTIN.to_vec(), groups: properties::BUILTIN.to_vec() }
    }

    pub fn with_global(mut self, global: GlobalDescriptor) -> Self {
        self.globals.push(global);
        self
    }

    pub fn with_group(mut self, group: CommandGroupDescriptor) -> Self {
        self.groups.push(group);
        self
    }

    pub fn globals(&self) -> &[GlobalDescriptor] {
        &self.globals
    }

    pub fn groups(&self) -> &[CommandGroupDescriptor] {
        &self.groups
    }

    pub fn groups_in(&self, scope: CommandScope) -> impl Iterator<Item = &CommandGroupDescriptor> {
        self.groups.iter().filter(move |group| group.scope == scope)
    }

    pub fn validate(&self) -> Result<(), ScriptHostError> {
        let mut names = BTreeSet::new();
        for global in &self.globals {
            if !is_identifier(global.name) {
                return Err(ScriptHostError::InvalidGlobalName(global.name.to_string()));
            }
            if !names.insert(global.name) {
                return Err(ScriptHostError::DuplicateGlobal(global.name.to_string()));
            }
        }
        for scope in [CommandScope::Actor, CommandScope::Player] {
            let mut owners: BTreeMap<&str, &'static str> = BTreeMap::new();
            for group in self.groups_in(scope) {
                for &member in group.commands {
                    if let Some(first) = owners.insert(member, group.name) {
                        return Err(ScriptHostError::DuplicateCommand {
                            member: member.to_string(),
                            first,
                            second: group.name,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub(crate) fn register_all(&self, engine: &mut Engine) {
        for group in &self.groups {
            (group.register)(engine);
        }
        for global in &self.globals {
            (global.register)(engine);
        }
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut Engine) {}

    fn unit(_: &HostContext) -> Dynamic {
        Dynamic::UNIT
    }

    const MOVE_A: CommandGroupDescriptor = CommandGroupDescriptor {
        name: "MoveA",
        scope: CommandScope::Actor,
        requires: &[],
        commands: &["Move"],
        exposed_for_destroyed: false,
        register: noop,
    };

    #[test]
    fn builtin_catalogue_is_consistent() {
        CommandCatalogue::builtin().validate().expect("builtin catalogue validates");
    }

    #[test]
    fn duplicate_members_are_rejected_per_scope() {
        let move_b = CommandGroupDescriptor { name: "MoveB", ..MOVE_A };
        let err = CommandCatalogue::empty().with_group(MOVE_A).with_group(move_b).validate().unwrap_err();
        assert!(matches!(err, ScriptHostError::DuplicateCommand { first: "MoveA", second: "MoveB", .. }));

        let player_move = CommandGroupDescriptor { name: "PlayerMove", scope: CommandScope::Player, ..MOVE_A };
        CommandCatalogue::empty().with_group(MOVE_A).with_group(player_move).validate().expect("scopes are separate");
    }

    #[test]
    fn global_names_must_be_unique_identifiers() {
        let global = GlobalDescriptor { name: "Radar", register: noop, create: unit };
        let err = CommandCatalogue::empty().with_global(global).with_global(global).validate().unwrap_err();
        assert!(matches!(err, ScriptHostError::DuplicateGlobal(name) if name == "Radar"));

        let bad = GlobalDescriptor { name: "2nd wave", register: noop, create: unit };
        let err = CommandCatalogue::empty().with_global(bad).validate().unwrap_err();
        assert!(matches!(err, ScriptHostError::InvalidGlobalName(_)));
        assert!(!is_identifier(""));
    }
}
