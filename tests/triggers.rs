mod common;

use common::{fatal_lines, Mission};
use sortie_script::config::ScriptingConfig;
use sortie_script::scripting::{CommandCatalogue, ScriptHost, ScriptSource, Trigger};
use sortie_script::viewport::ViewportHandle;
use sortie_script::world::{DeferredAction, ObjectiveState, Outcome};

#[test]
fn callbacks_run_in_registration_order() {
    let mut mission = Mission::new();
    let host = mission.start(
        r#"
        fn WorldLoaded() {
            Trigger.OnKilled(tank, |victim, killer| print("first " + victim.Type));
            Trigger.OnKilled(tank, |victim, killer| print("second"));
            tank.Kill();
        }
        "#,
    );
    assert!(host.take_logs().is_empty(), "kills wait for the frame end");
    mission.ticks(1);
    assert_eq!(host.take_logs(), vec!["first 2tnk", "second"]);
}

#[test]
fn failing_callback_stops_the_dispatch_and_halts() {
    let mut mission = Mission::new();
    let host = mission.start(
        r#"
        fn WorldLoaded() {
            Trigger.OnKilled(tank, |victim, killer| print("one"));
            Trigger.OnKilled(tank, |victim, killer| no_such_function());
            Trigger.OnKilled(tank, |victim, killer| print("three"));
            tank.Kill();
        }
        "#,
    );
    mission.ticks(2);
    let logs = host.take_logs();
    assert_eq!(logs[0], "one");
    assert_eq!(fatal_lines(&logs).len(), 1);
    assert!(!logs.iter().any(|line| line == "three"));
    assert!(host.fatal_error_occurred());
    assert!(mission.game.world().borrow().has_ended());
}

#[test]
fn failing_callback_stops_callbacks_of_other_hosts() {
    let mut mission = Mission::new();
    let first = mission.start(
        r#"
        fn WorldLoaded() {
            Trigger.OnKilled(tank, |victim, killer| print("a1"));
            Trigger.OnKilled(tank, |victim, killer| no_such_function());
        }
        "#,
    );
    let source = ScriptSource::new(
        "second.rhai",
        r#"fn WorldLoaded() { Trigger.OnKilled(tank, |victim, killer| print("b1")); }"#,
    );
    let second = ScriptHost::new(
        mission.game.world(),
        ViewportHandle::default(),
        &[source],
        CommandCatalogue::builtin(),
        &ScriptingConfig::default(),
    )
    .expect("second host loads");
    second.register_entity_handle("tank", mission.tank).expect("bind tank");
    second.notify_world_loaded();

    let tank = mission.tank;
    mission.game.world().borrow_mut().queue_frame_end(DeferredAction::Kill { actor: tank, attacker: None });
    mission.ticks(1);

    let logs = first.take_logs();
    assert_eq!(logs[0], "a1");
    assert_eq!(fatal_lines(&logs).len(), 1);
    assert!(first.fatal_error_occurred());
    assert!(second.take_logs().is_empty(), "the dispatch ends at the failure");
    assert!(!second.fatal_error_occurred());
}

#[test]
fn clear_during_a_dispatch_lets_it_finish() {
    let mut mission = Mission::new();
    let host = mission.start(
        r#"
        fn WorldLoaded() {
            Trigger.OnKilled(tank, |victim, killer| { print("first"); Trigger.Clear(victim, "OnKilled"); });
            Trigger.OnKilled(tank, |victim, killer| print("second"));
            tank.Kill();
        }
        "#,
    );
    let registry = mission.game.world().borrow().triggers(mission.tank).expect("tank registry");
    mission.ticks(1);
    assert_eq!(host.take_logs(), vec!["first", "second"]);
    assert_eq!(registry.callback_count(Trigger::OnKilled), 2, "the clear waits for the next frame end");
}

#[test]
fn clear_applies_at_the_frame_end() {
    let mut mission = Mission::new();
    mission.start(
        r#"
        fn WorldLoaded() {
            Trigger.OnDamaged(tank, |victim, attacker| print("hit"));
            Trigger.OnIdle(tank, |actor| print("idle"));
            Trigger.Clear(tank, "OnDamaged");
        }
        "#,
    );
    let registry = mission.game.world().borrow().triggers(mission.tank).expect("tank registry");
    assert_eq!(registry.callback_count(Trigger::OnDamaged), 1, "clear is deferred");
    mission.ticks(1);
    assert_eq!(registry.callback_count(Trigger::OnDamaged), 0);
    assert_eq!(registry.callback_count(Trigger::OnIdle), 1, "other triggers are untouched");
}

#[test]
fn clear_all_empties_every_trigger() {
    let mut mission = Mission::new();
    mission.start(
        r#"
        fn WorldLoaded() {
            Trigger.OnDamaged(rifle, |victim, attacker| print("hit"));
            Trigger.OnKilled(rifle, |victim, killer| print("dead"));
            Trigger.ClearAll(rifle);
        }
        "#,
    );
    mission.ticks(1);
    let registry = mission.game.world().borrow().triggers(mission.rifle).expect("rifle registry");
    assert!(Trigger::ALL.iter().all(|&trigger| registry.callback_count(trigger) == 0));
}

#[test]
fn unknown_trigger_names_are_script_errors() {
    let mut mission = Mission::new();
    let host = mission.start(r#"fn WorldLoaded() { Trigger.Clear(tank, "OnExploded"); }"#);
    let logs = host.take_logs();
    assert_eq!(fatal_lines(&logs).len(), 1);
    assert!(logs[0].contains("Unknown trigger 'OnExploded'"), "{logs:?}");
}

#[test]
fn damage_reports_the_attacker_and_lethal_damage_kills() {
    let mut mission = Mission::new();
    let host = mission.start(
        r#"
        fn WorldLoaded() {
            Trigger.OnDamaged(rifle, |victim, attacker| print("damaged by " + attacker.Type));
            Trigger.OnKilled(rifle, |victim, killer| print("killed by " + killer.Type));
        }
        "#,
    );
    let (rifle, tank) = (mission.rifle, mission.tank);
    mission.game.world().borrow_mut().queue_frame_end(DeferredAction::Damage { actor: rifle, attacker: Some(tank), amount: 20 });
    mission.ticks(1);
    assert_eq!(mission.game.world().borrow().health(rifle).map(|h| h.hp), Some(30));
    mission.game.world().borrow_mut().queue_frame_end(DeferredAction::Damage { actor: rifle, attacker: Some(tank), amount: 80 });
    mission.ticks(1);
    assert_eq!(host.take_logs(), vec!["damaged by 2tnk", "damaged by 2tnk", "killed by 2tnk"]);
    assert!(mission.game.world().borrow().is_dead(rifle));
}

#[test]
fn killed_actors_are_released_a_frame_later() {
    let mut mission = Mission::new();
    mission.start(r#"fn WorldLoaded() { Trigger.OnKilled(tank, |victim, killer| print("gone")); tank.Kill(); }"#);
    let tank = mission.tank;
    mission.ticks(1);
    assert!(mission.game.world().borrow().exists(tank), "still present while OnKilled runs");
    mission.ticks(1);
    assert!(!mission.game.world().borrow().exists(tank));
    assert!(mission.game.world().borrow().triggers(tank).is_none());
}

#[test]
fn on_all_killed_fires_once_after_the_last_death() {
    let mut mission = Mission::new();
    let host = mission.start(
        r#"
        fn WorldLoaded() {
            Trigger.OnAllKilled([tank, rifle], || print("all dead"));
            tank.Kill();
        }
        "#,
    );
    mission.ticks(1);
    assert!(host.take_logs().is_empty());
    let rifle = mission.rifle;
    mission.game.world().borrow_mut().queue_frame_end(DeferredAction::Kill { actor: rifle, attacker: None });
    mission.ticks(3);
    assert_eq!(host.take_logs(), vec!["all dead"]);
}

#[test]
fn after_delay_waits_the_given_ticks() {
    let mut mission = Mission::new();
    let host = mission.start(r#"fn WorldLoaded() { Trigger.AfterDelay(3, || print("later")); }"#);
    mission.ticks(2);
    assert!(host.take_logs().is_empty());
    mission.ticks(1);
    assert_eq!(host.take_logs(), vec!["later"]);
}

#[test]
fn production_notifies_the_producer_and_other_listeners() {
    let mut mission = Mission::new();
    let host = mission.start(
        r#"
        fn WorldLoaded() {
            Trigger.OnProduction(factory, |producer, unit| print("made " + unit.Type));
            Trigger.OnOtherProduction(tank, |producer, unit| print("seen " + producer.Type));
            factory.Produce("e1");
        }
        "#,
    );
    mission.ticks(1);
    assert_eq!(host.take_logs(), vec!["made e1", "seen weap"]);
}

#[test]
fn idle_fires_for_actors_without_activities() {
    let mut mission = Mission::new();
    let host = mission.start(
        r#"
        fn WorldLoaded() {
            tank.Move(CPos.New(4, 2));
            Trigger.AfterDelay(1, || {
                Trigger.OnIdle(tank, |actor| { print("idle at " + actor.Location.X); Trigger.ClearAll(actor); });
            });
        }
        "#,
    );
    mission.ticks(3);
    assert_eq!(host.take_logs(), vec!["idle at 4"]);
}

#[test]
fn objectives_drive_player_triggers() {
    let mut mission = Mission::new();
    let host = mission.start(
        r#"
        fn WorldLoaded() {
            let greece = Player.GetPlayer("Greece");
            Trigger.OnObjectiveAdded(greece, |player, id| print("added " + id));
            Trigger.OnObjectiveCompleted(greece, |player, id| print("completed " + id));
            Trigger.OnPlayerWon(greece, |player| print("won " + player.InternalName));
            let id = greece.AddPrimaryObjective("Destroy the radar dome");
            greece.MarkCompletedObjective(id);
        }
        "#,
    );
    mission.ticks(1);
    assert_eq!(host.take_logs(), vec!["added 0", "completed 0", "won Greece"]);
    let world = mission.game.world().borrow();
    let greece = world.player(mission.greece).expect("greece");
    assert_eq!(greece.objective_state(0), Some(ObjectiveState::Completed));
    assert_eq!(greece.outcome, Some(Outcome::Won));
}

#[test]
fn capture_and_discovery_notify_both_sides() {
    let mut mission = Mission::new();
    let host = mission.start(
        r#"
        fn WorldLoaded() {
            let greece = Player.GetPlayer("Greece");
            Trigger.OnCapture(factory, |actor, captor, old_owner, new_owner| print("captured by " + new_owner.InternalName));
            Trigger.OnDiscovered(tank, |actor, discoverer| print("spotted by " + discoverer.InternalName));
            Trigger.OnPlayerDiscovered(greece, |owner, discoverer, actor| print(owner.InternalName + " exposed by " + actor.Type));
        }
        "#,
    );
    let (factory, yak, tank, ussr) = (mission.factory, mission.yak, mission.tank, mission.ussr);
    {
        let mut world = mission.game.world().borrow_mut();
        world.queue_frame_end(DeferredAction::Capture { actor: factory, captor: yak });
        world.queue_frame_end(DeferredAction::Discover { actor: tank, discoverer: ussr });
    }
    mission.ticks(1);
    assert_eq!(host.take_logs(), vec!["captured by USSR", "spotted by USSR", "Greece exposed by 2tnk"]);
    assert_eq!(mission.game.world().borrow().owner(factory), Some(ussr));
}

#[test]
fn player_triggers_require_a_player() {
    let mut mission = Mission::new();
    let host = mission.start(r#"fn WorldLoaded() { Trigger.OnPlayerLost(tank, |player| print("lost")); }"#);
    let logs = host.take_logs();
    assert_eq!(fatal_lines(&logs).len(), 1);
    assert!(logs[0].contains("Expected Player for 'player', got Actor"), "{logs:?}");
}

#[test]
fn shutdown_suppresses_dispatch() {
    let mut mission = Mission::new();
    let host = mission.start(r#"fn WorldLoaded() { Trigger.OnDamaged(tank, |victim, attacker| print("hit")); }"#);
    let registry = mission.game.world().borrow().triggers(mission.tank).expect("tank registry");
    mission.game.shutdown();
    registry.dispatch(Trigger::OnDamaged, &[]);
    assert!(host.take_logs().is_empty());
    assert_eq!(registry.callback_count(Trigger::OnDamaged), 0, "shutdown clears registries");
}
