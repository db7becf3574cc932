use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use crate::rules::ActorInfo;
use crate::scripting::{CommandCatalogue, CommandGroupDescriptor, CommandScope};

/// Decides which actor-scoped command groups an actor type exposes. Results
/// are cached per actor type for the lifetime of the owning host.
pub struct CapabilityFilter {
    groups: Vec<CommandGroupDescriptor>,
    cache: RefCell<HashMap<String, Rc<[CommandGroupDescriptor]>>>,
}

impl CapabilityFilter {
    pub fn new(catalogue: &CommandCatalogue) -> Self {
        Self { groups: catalogue.groups_in(CommandScope::Actor).copied().collect(), cache: RefCell::new(HashMap::new()) }
    }

    pub fn required_behaviors(group: &CommandGroupDescriptor) -> BTreeSet<&'static str> {
        group.requires.iter().copied().collect()
    }

    pub fn is_applicable(info: &ActorInfo, group: &CommandGroupDescriptor) -> bool {
        group.requires.iter().all(|behavior| info.has_behavior(behavior))
    }

    pub fn filter(&self, info: &ActorInfo) -> Rc<[CommandGroupDescriptor]> {
        if let Some(cached) = self.cache.borrow().get(&info.name) {
            return cached.clone();
        }
        let applicable: Rc<[CommandGroupDescriptor]> =
            self.groups.iter().filter(|group| Self::is_applicable(info, group)).copied().collect();
        self.cache.borrow_mut().insert(info.name.clone(), applicable.clone());
        applicable
    }

    pub fn cached_types(&self) -> usize {
        self.cache.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhai::Engine;

    fn noop(_: &mut Engine) {}

    const GROUND: CommandGroupDescriptor = CommandGroupDescriptor {
        name: "Ground",
        scope: CommandScope::Actor,
        requires: &["Mobile"],
        commands: &["Drive"],
        exposed_for_destroyed: false,
        register: noop,
    };
    const ARMOR: CommandGroupDescriptor = CommandGroupDescriptor {
        name: "Armor",
        scope: CommandScope::Actor,
        requires: &["Mobile", "Health"],
        commands: &["Ram"],
        exposed_for_destroyed: false,
        register: noop,
    };
    const ALWAYS: CommandGroupDescriptor = CommandGroupDescriptor {
        name: "Always",
        scope: CommandScope::Actor,
        requires: &[],
        commands: &["Ping"],
        exposed_for_destroyed: true,
        register: noop,
    };

    #[test]
    fn applicability_is_a_superset_check() {
        let jeep = ActorInfo::new("jeep", ["Mobile"]);
        let tank = ActorInfo::new("tank", ["Mobile", "Health", "Turreted"]);
        assert!(CapabilityFilter::is_applicable(&jeep, &GROUND));
        assert!(!CapabilityFilter::is_applicable(&jeep, &ARMOR));
        assert!(CapabilityFilter::is_applicable(&tank, &ARMOR));
        assert!(CapabilityFilter::is_applicable(&ActorInfo::new("rock", Vec::<String>::new()), &ALWAYS));
    }

    #[test]
    fn adding_behaviours_never_removes_groups() {
        let catalogue = CommandCatalogue::empty().with_group(ALWAYS).with_group(GROUND).with_group(ARMOR);
        let filter = CapabilityFilter::new(&catalogue);
        let small = filter.filter(&ActorInfo::new("a", ["Mobile"]));
        let large = filter.filter(&ActorInfo::new("b", ["Mobile", "Health"]));
        for group in small.iter() {
            assert!(large.iter().any(|g| g.name == group.name), "{} lost after adding a behaviour", group.name);
        }
        assert_eq!(large.iter().map(|g| g.name).collect::<Vec<_>>(), vec!["Always", "Ground", "Armor"]);
    }

    #[test]
    fn results_are_memoized_per_actor_type() {
        let catalogue = CommandCatalogue::empty().with_group(GROUND);
        let filter = CapabilityFilter::new(&catalogue);
        let info = ActorInfo::new("jeep", ["Mobile"]);
        let first = filter.filter(&info);
        let second = filter.filter(&info);
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(filter.cached_types(), 1);
        assert_eq!(CapabilityFilter::required_behaviors(&ARMOR).into_iter().collect::<Vec<_>>(), vec!["Health", "Mobile"]);
    }

    #[test]
    fn tanks_get_ground_commands_only() {
        let aircraft_only =
            CommandGroupDescriptor { name: "AircraftOnly", requires: &["Aircraft"], commands: &["Land"], ..GROUND };
        let ground_only =
            CommandGroupDescriptor { name: "GroundOnly", requires: &["Mobile"], commands: &["Move"], ..GROUND };
        let catalogue = CommandCatalogue::empty().with_group(aircraft_only).with_group(ground_only);
        let filter = CapabilityFilter::new(&catalogue);
        let groups = filter.filter(&ActorInfo::new("tank", ["Mobile", "Health"]));
        assert_eq!(groups.iter().map(|g| g.name).collect::<Vec<_>>(), vec!["GroundOnly"]);
    }

    #[test]
    fn player_groups_are_not_filtered() {
        let player_group = CommandGroupDescriptor { name: "Cash", scope: CommandScope::Player, ..ALWAYS };
        let catalogue = CommandCatalogue::empty().with_group(player_group).with_group(GROUND);
        let filter = CapabilityFilter::new(&catalogue);
        let groups = filter.filter(&ActorInfo::new("jeep", ["Mobile"]));
        assert_eq!(groups.iter().map(|g| g.name).collect::<Vec<_>>(), vec!["Ground"]);
    }
}
