use std::sync::Arc;
use std::time::Duration;

use mudbot_core::{Action, Outcome, PopulationCurve};
use mudbot_kernel::actions::{
    AddressAction, GoAction, IdleAction, LurkAction, PoseAction, PosePayload, SayAction,
    SayPayload, SleepAction, TeleportAction, WakeupAction, WhisperAction, WhisperPayload,
};
use mudbot_kernel::config::{
    ActionsConfig, FixedWeightConfig, IdleConfig, LurkConfig, TeleportConfig,
};
use mudbot_kernel::world::{Character, SpeechKind};
use mudbot_kernel::{BotContext, Personality, SimWorld, World, WorldEvent};

fn square() -> Arc<SimWorld> {
    let world = SimWorld::new();
    world.add_room("square", "Town Square");
    world.add_room("tavern", "The Rusty Tankard");
    world.add_exit("square", "sq-tavern", "tavern", "tavern");
    world.add_bot_char("square", Character::new("bot", "Rusty", "Gears"));
    world.add_char("square", Character::new("npc-1", "Mira", "Vale"));
    world.add_char("square", Character::new("npc-2", "Tobin", "Ash"));
    world.control("bot").unwrap();
    Arc::new(world)
}

fn ctx(world: &Arc<SimWorld>) -> BotContext {
    world.clone()
}

fn defaults() -> ActionsConfig {
    ActionsConfig::default()
}

#[test]
fn snapshot_shows_controlled_room() {
    let world = square();
    let snapshot = world.snapshot();

    assert_eq!(snapshot.awake().unwrap().id, "bot");
    let room = snapshot.room.unwrap();
    assert_eq!(room.name, "Town Square");
    assert_eq!(room.awake_population(), 3);
    assert_eq!(room.exits[0].name(), "tavern");
}

#[test]
fn idle_delay_is_drawn_from_range() {
    let world = square();
    let idle = IdleAction::new(
        IdleConfig {
            weight: 5.0,
            delay_min_ms: 1000,
            delay_max_ms: 2000,
            ..IdleConfig::default()
        },
        3,
    );

    for _ in 0..50 {
        let outcomes = idle.outcomes(&ctx(&world));
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].weight, 5.0);
        let delay = outcomes[0].delay;
        assert!(delay >= Duration::from_millis(1000) && delay < Duration::from_millis(2000));
    }
}

#[tokio::test]
async fn idle_needs_an_awake_character() {
    let world = square();
    SleepAction::new(FixedWeightConfig::default())
        .exec(ctx(&world), Outcome::forced())
        .await
        .unwrap();

    let idle = IdleAction::new(IdleConfig::default(), 3);
    assert!(idle.outcomes(&ctx(&world)).is_empty());
}

#[tokio::test]
async fn say_weight_follows_population() {
    let world = square();
    let say = SayAction::new(defaults().say, Personality::default(), 1);

    let outcomes = say.outcomes(&ctx(&world));
    assert_eq!(outcomes.len(), 1);
    let outcome = &outcomes[0];
    assert_eq!(outcome.weight, 40.0);

    let payload: SayPayload = outcome.payload().unwrap();
    assert_eq!(payload.char_id, "bot");
    let typing = Personality::default().type_duration(&payload.msg);
    assert_eq!(outcome.delay, Duration::from_millis(2000) + typing);
    assert_eq!(outcome.postdelay, Duration::from_millis(5000));

    let message = say.exec(ctx(&world), outcome.clone()).await.unwrap();
    assert_eq!(message.as_deref(), Some("Rusty Gears spoke"));
    assert!(world.transcript()[0].starts_with("Rusty Gears says"));
}

#[test]
fn say_is_silent_alone_or_in_quiet_rooms() {
    let world = square();
    let say = SayAction::new(defaults().say, Personality::default(), 1);

    world.set_quiet("square", true);
    assert!(say.outcomes(&ctx(&world)).is_empty());

    world.set_quiet("square", false);
    world.move_char("npc-1", "tavern").unwrap();
    world.move_char("npc-2", "tavern").unwrap();
    assert!(say.outcomes(&ctx(&world)).is_empty());
}

#[tokio::test]
async fn say_rejects_uncontrolled_character() {
    let world = square();
    let say = SayAction::new(defaults().say, Personality::default(), 1);
    let outcome = Outcome::forced().with_payload(&SayPayload {
        char_id: "npc-1".to_string(),
        msg: "Hello.".to_string(),
    });

    let err = say.exec(ctx(&world), outcome).await.unwrap_err();
    assert!(err.to_string().contains("not controlled"), "{err}");
}

#[tokio::test]
async fn whisper_weight_is_split_between_targets() {
    let world = square();
    world.add_char("square", Character::new("npc-3", "Greta", "Hollow"));
    let config = defaults().whisper;
    let expected = config.population_weight.weight_at(4);
    let whisper = WhisperAction::new(config, Personality::default(), 2);

    let outcomes = whisper.outcomes(&ctx(&world));
    assert_eq!(outcomes.len(), 3);
    let total: f64 = outcomes.iter().map(|o| o.weight).sum();
    assert!((total - expected).abs() < 1e-9);

    let targets: Vec<String> = outcomes
        .iter()
        .map(|o| o.payload::<WhisperPayload>().unwrap().target_id)
        .collect();
    assert_eq!(targets, vec!["npc-1", "npc-2", "npc-3"]);

    let mut events = world.subscribe();
    let message = whisper.exec(ctx(&world), outcomes[0].clone()).await.unwrap();
    assert_eq!(message.as_deref(), Some("Rusty Gears whispered to Mira Vale"));
    match events.try_recv().unwrap() {
        WorldEvent::Whisper { from, to, .. } => {
            assert_eq!(from.id, "bot");
            assert_eq!(to, "npc-1");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn whisper_fails_when_target_left() {
    let world = square();
    let whisper = WhisperAction::new(defaults().whisper, Personality::default(), 2);
    let outcome = Outcome::forced().with_payload(&WhisperPayload {
        char_id: "bot".to_string(),
        target_id: "npc-2".to_string(),
        msg: "Psst.".to_string(),
        pose: false,
    });

    world.move_char("npc-2", "tavern").unwrap();
    let err = whisper.exec(ctx(&world), outcome).await.unwrap_err();
    assert!(err.to_string().contains("no longer in room"), "{err}");
}

#[tokio::test]
async fn go_uses_an_exit() {
    let world = square();
    let go = GoAction::new(defaults().go, 4);

    let outcomes = go.outcomes(&ctx(&world));
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].weight, 5.0);

    let message = tokio_test::assert_ok!(go.exec(ctx(&world), outcomes[0].clone()).await);
    assert_eq!(message.as_deref(), Some("Rusty Gears used exit tavern"));
    assert_eq!(world.room_of("bot").as_deref(), Some("tavern"));

    // No way out of the tavern.
    assert!(go.outcomes(&ctx(&world)).is_empty());
}

#[tokio::test]
async fn wakeup_takes_control_when_needed() {
    let world = SimWorld::new();
    world.add_room("square", "Town Square");
    world.add_bot_char("square", Character::new("bot", "Rusty", "Gears").asleep());
    let world = Arc::new(world);
    let wakeup = WakeupAction::new(defaults().wakeup);

    let outcomes = wakeup.outcomes(&ctx(&world));
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].weight, 50.0);

    let message = wakeup.exec(ctx(&world), outcomes[0].clone()).await.unwrap();
    assert_eq!(message.as_deref(), Some("woke up Rusty Gears"));
    assert!(world.character("bot").unwrap().is_awake());
    assert!(wakeup.outcomes(&ctx(&world)).is_empty());

    let err = wakeup
        .exec(ctx(&world), Outcome::forced())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("already awake"), "{err}");
}

#[tokio::test]
async fn sleep_releases_the_character() {
    let world = square();
    assert!(SleepAction::new(defaults().sleep)
        .outcomes(&ctx(&world))
        .is_empty());

    let sleep = SleepAction::new(FixedWeightConfig {
        weight: 3.0,
        ..FixedWeightConfig::default()
    });
    assert_eq!(sleep.outcomes(&ctx(&world)).len(), 1);

    let message = sleep.exec(ctx(&world), Outcome::forced()).await.unwrap();
    assert_eq!(message.as_deref(), Some("Rusty Gears put to sleep"));
    assert!(world.snapshot().controlled.is_none());
    assert!(!world.character("bot").unwrap().is_awake());
}

#[test]
fn absurd_typing_speed_saturates_the_delay() {
    let world = square();
    let crawling = Personality {
        type_speed: 1e-300,
        read_speed: 1000.0,
    };

    let say = SayAction::new(defaults().say, crawling, 7);
    let outcomes = say.outcomes(&ctx(&world));
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].delay, Duration::MAX);

    let whisper = WhisperAction::new(defaults().whisper, crawling, 7);
    assert!(whisper
        .outcomes(&ctx(&world))
        .iter()
        .all(|o| o.delay == Duration::MAX));

    let pose = PoseAction::new(defaults().pose, crawling, 7);
    let outcome = pose.outcome_for("bot", "waves.".to_string(), 150, Some(5000), None);
    assert_eq!(outcome.delay, Duration::MAX);
}

#[tokio::test]
async fn pose_goes_to_the_room() {
    let world = square();
    let pose = PoseAction::new(defaults().pose, Personality::default(), 5);

    let outcomes = pose.outcomes(&ctx(&world));
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].weight, 40.0);
    let payload: PosePayload = outcomes[0].payload().unwrap();
    assert_eq!(payload.char_id, "bot");

    let mut events = world.subscribe();
    let message = pose.exec(ctx(&world), outcomes[0].clone()).await.unwrap();
    assert_eq!(message.as_deref(), Some("Rusty Gears posed"));
    assert_eq!(world.transcript(), vec![format!("Rusty {}", payload.msg)]);
    match events.try_recv().unwrap() {
        WorldEvent::Spoke { from, room, kind, .. } => {
            assert_eq!(from.id, "bot");
            assert_eq!(room, "square");
            assert_eq!(kind, SpeechKind::Pose);
        }
        other => panic!("unexpected {other:?}"),
    }

    world.set_quiet("square", true);
    assert!(pose.outcomes(&ctx(&world)).is_empty());
}

#[test]
fn pose_overrides_keep_typing_time() {
    let pose = PoseAction::new(defaults().pose, Personality::default(), 5);
    let msg = "waves to Mira.";
    let typing = Personality::default().type_duration(msg);

    let outcome = pose.outcome_for("bot", msg.to_string(), 150, Some(1000), Some(2000));
    assert_eq!(outcome.priority, 150);
    assert_eq!(outcome.delay, Duration::from_millis(1000) + typing);
    assert_eq!(outcome.postdelay, Duration::from_millis(2000));

    let outcome = pose.outcome_for("bot", msg.to_string(), 150, None, None);
    assert_eq!(outcome.delay, Duration::from_millis(2000) + typing);
    assert_eq!(outcome.postdelay, Duration::from_millis(5000));
}

#[tokio::test]
async fn lurk_only_without_a_character() {
    let world = square();
    let lurk = LurkAction::new(
        LurkConfig {
            weight: 2.0,
            ..LurkConfig::default()
        },
        6,
    );
    assert!(lurk.outcomes(&ctx(&world)).is_empty());
    assert!(LurkAction::new(LurkConfig::default(), 6)
        .outcomes(&ctx(&world))
        .is_empty());

    SleepAction::new(FixedWeightConfig::default())
        .exec(ctx(&world), Outcome::forced())
        .await
        .unwrap();
    let outcomes = lurk.outcomes(&ctx(&world));
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].weight, 2.0);
    let delay = outcomes[0].delay;
    assert!(delay >= Duration::from_millis(2000) && delay <= Duration::from_millis(5000));
    assert_eq!(lurk.exec(ctx(&world), outcomes[0].clone()).await.unwrap(), None);
}

#[tokio::test]
async fn address_speaks_to_one_target_out_loud() {
    let world = square();
    let mut config = defaults().address;
    config.population_weight = PopulationCurve::new([(1, 0.0), (3, 30.0)]);
    let address = AddressAction::new(config, Personality::default(), 8);

    let outcomes = address.outcomes(&ctx(&world));
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| (o.weight - 15.0).abs() < 1e-9));
    let payload: WhisperPayload = outcomes[1].payload().unwrap();
    assert_eq!(payload.target_id, "npc-2");

    let mut events = world.subscribe();
    let message = address.exec(ctx(&world), outcomes[1].clone()).await.unwrap();
    assert_eq!(message.as_deref(), Some("Rusty Gears addressed Tobin Ash"));
    assert!(matches!(
        events.try_recv().unwrap(),
        WorldEvent::Spoke { room, .. } if room == "square"
    ));

    world.move_char("npc-2", "tavern").unwrap();
    let err = address
        .exec(ctx(&world), outcomes[1].clone())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no longer in room"), "{err}");
}

#[test]
fn address_is_off_by_default() {
    let world = square();
    let address = AddressAction::new(defaults().address, Personality::default(), 8);
    assert!(address.outcomes(&ctx(&world)).is_empty());
}

#[tokio::test]
async fn teleport_leaves_for_another_node() {
    let world = square();
    world.add_room("library", "Old Library");
    world.add_teleport("node-square", "square", "square");
    world.add_teleport("node-library", "library", "library");
    let config = defaults().teleport;
    let expected = config.population_weight.weight_at(3);
    let teleport = TeleportAction::new(config, 9);

    let outcomes = teleport.outcomes(&ctx(&world));
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].weight, expected);

    let mut events = world.subscribe();
    let message = teleport.exec(ctx(&world), outcomes[0].clone()).await.unwrap();
    assert_eq!(message.as_deref(), Some("Rusty Gears used teleport library"));
    assert_eq!(world.room_of("bot").as_deref(), Some("library"));
    assert!(matches!(
        events.try_recv().unwrap(),
        WorldEvent::Arrived { char, room } if char.id == "bot" && room == "library"
    ));
}

#[tokio::test]
async fn teleport_honors_allowed_destinations() {
    let world = square();
    world.add_room("library", "Old Library");
    world.add_teleport("node-library", "library", "library");
    let teleport = TeleportAction::new(
        TeleportConfig {
            allowed_destinations: Some(vec!["square".to_string()]),
            ..defaults().teleport
        },
        9,
    );

    assert!(teleport.outcomes(&ctx(&world)).is_empty());
    let err = teleport
        .exec(ctx(&world), Outcome::forced())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no valid teleport nodes"), "{err}");
    assert_eq!(world.room_of("bot").as_deref(), Some("square"));
}
