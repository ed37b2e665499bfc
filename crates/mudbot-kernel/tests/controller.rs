use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mudbot_core::{Action, Error, FnAction, Outcome};
use mudbot_kernel::{
    ContextProvider, Controller, ControllerConfig, ControllerError, ControllerEvent, EventKind,
};
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout, Instant};

#[derive(Default)]
struct Tracker {
    runs: Mutex<Vec<(String, Instant)>>,
    enabled: AtomicBool,
}

impl Tracker {
    fn record(&self, id: &str) {
        self.runs.lock().unwrap().push((id.to_string(), Instant::now()));
    }

    fn runs(&self) -> Vec<(String, Instant)> {
        self.runs.lock().unwrap().clone()
    }

    fn order(&self) -> Vec<String> {
        self.runs().into_iter().map(|(id, _)| id).collect()
    }
}

type Ctx = Arc<Tracker>;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn recorder(id: &'static str) -> Arc<dyn Action<Ctx>> {
    Arc::new(FnAction::new(
        id,
        |_: &Ctx| Vec::new(),
        move |tracker: Ctx, _| {
            Box::pin(async move {
                tracker.record(id);
                Ok(Some(format!("{id} ran")))
            })
        },
    ))
}

fn failing(id: &'static str) -> Arc<dyn Action<Ctx>> {
    Arc::new(FnAction::new(
        id,
        |_: &Ctx| Vec::new(),
        |_, _| Box::pin(async { Err(anyhow::anyhow!("boom")) }),
    ))
}

fn queued(delay: u64, postdelay: u64, priority: i32) -> Outcome {
    Outcome::forced()
        .with_delay(ms(delay))
        .with_postdelay(ms(postdelay))
        .with_priority(priority)
}

struct Harness {
    controller: Controller<Ctx>,
    provider: ContextProvider<Ctx>,
    tracker: Ctx,
    events: broadcast::Receiver<ControllerEvent>,
}

impl Harness {
    fn new(actions: Vec<Arc<dyn Action<Ctx>>>) -> Self {
        let controller = Controller::new(ControllerConfig::default());
        for action in actions {
            controller.add_action(action).unwrap();
        }
        let events = controller.subscribe();
        Self {
            controller,
            provider: ContextProvider::new(),
            tracker: Arc::new(Tracker::default()),
            events,
        }
    }

    fn start(&self) {
        self.controller.start(self.provider.subscribe()).unwrap();
        self.provider.set(self.tracker.clone());
    }

    async fn wait_for(&mut self, pred: impl Fn(&EventKind) -> bool) -> ControllerEvent {
        let events = &mut self.events;
        timeout(Duration::from_secs(3600), async {
            loop {
                let event = events.recv().await.expect("event channel closed");
                if pred(&event.kind) {
                    return event;
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    async fn executed(&mut self, action: &str) {
        self.wait_for(|k| matches!(k, EventKind::Executed { action: a, .. } if a == action))
            .await;
    }
}

fn near(actual: Duration, expected: Duration) -> bool {
    actual >= expected && actual <= expected + ms(5)
}

#[tokio::test(start_paused = true)]
async fn equal_priorities_run_in_insertion_order() {
    let mut h = Harness::new(vec![recorder("a"), recorder("b"), recorder("c")]);
    let t0 = Instant::now();
    h.controller.enqueue("a", queued(100, 0, 1)).unwrap();
    h.controller.enqueue("b", queued(100, 0, 1)).unwrap();
    h.controller.enqueue("c", queued(100, 0, 1)).unwrap();
    h.start();

    h.executed("c").await;
    assert_eq!(h.tracker.order(), vec!["a", "b", "c"]);

    let runs = h.tracker.runs();
    assert!(near(runs[0].1 - t0, ms(100)));
    assert!(near(runs[1].1 - t0, ms(200)));
    assert!(near(runs[2].1 - t0, ms(300)));
}

#[tokio::test(start_paused = true)]
async fn urgent_item_preserves_remaining_delay_of_the_interrupted_one() {
    let mut h = Harness::new(vec![recorder("low"), recorder("high")]);
    let t0 = Instant::now();
    h.controller.enqueue("low", queued(1000, 0, 1)).unwrap();
    h.start();

    sleep(ms(400)).await;
    h.controller.enqueue("high", queued(250, 0, 10)).unwrap();

    h.executed("low").await;
    let runs = h.tracker.runs();
    assert_eq!(h.tracker.order(), vec!["high", "low"]);
    assert!(near(runs[0].1 - t0, ms(650)));
    // 600 ms were left on the low priority delay when it was interrupted.
    assert!(near(runs[1].1 - t0, ms(1250)));
}

#[tokio::test(start_paused = true)]
async fn post_delay_holds_back_the_next_item() {
    let mut h = Harness::new(vec![recorder("go"), recorder("say")]);
    let t0 = Instant::now();
    h.controller.enqueue("go", queued(0, 5000, 1)).unwrap();
    h.controller.enqueue("say", queued(100, 0, 1)).unwrap();
    h.start();

    h.wait_for(|k| matches!(k, EventKind::Completed { action, .. } if action == "go"))
        .await;
    h.executed("say").await;
    let runs = h.tracker.runs();
    assert!(near(runs[1].1 - t0, ms(5100)));
}

#[tokio::test(start_paused = true)]
async fn failed_exec_skips_post_delay() {
    let mut h = Harness::new(vec![failing("whisper"), recorder("say")]);
    let t0 = Instant::now();
    h.controller.enqueue("whisper", queued(0, 5000, 1)).unwrap();
    h.controller.enqueue("say", queued(10, 0, 1)).unwrap();
    h.start();

    let failed = h
        .wait_for(|k| matches!(k, EventKind::Failed { .. }))
        .await;
    match failed.kind {
        EventKind::Failed { action, error, .. } => {
            assert_eq!(action, "whisper");
            assert!(error.contains("boom"), "{error}");
        }
        other => panic!("unexpected {other:?}"),
    }

    h.executed("say").await;
    let runs = h.tracker.runs();
    assert_eq!(h.tracker.order(), vec!["say"]);
    assert!(near(runs[0].1 - t0, ms(10)));
}

#[tokio::test(start_paused = true)]
async fn unknown_action_is_reported_as_failure() {
    let mut h = Harness::new(vec![recorder("say")]);
    h.controller.enqueue("ghost", queued(0, 0, 1)).unwrap();
    h.controller.enqueue("say", queued(0, 0, 1)).unwrap();
    h.start();

    let failed = h
        .wait_for(|k| matches!(k, EventKind::Failed { .. }))
        .await;
    assert_eq!(failed.action(), Some("ghost"));
    h.executed("say").await;
}

#[tokio::test(start_paused = true)]
async fn removed_action_fails_its_queued_items() {
    let mut h = Harness::new(vec![recorder("say")]);
    h.controller.enqueue("say", queued(100, 0, 1)).unwrap();
    h.controller.remove_action("say");
    h.controller.remove_action("say");
    h.start();

    let failed = h
        .wait_for(|k| matches!(k, EventKind::Failed { .. }))
        .await;
    assert_eq!(failed.action(), Some("say"));
    assert!(h.tracker.order().is_empty());
}

#[tokio::test(start_paused = true)]
async fn panicking_exec_is_a_failure() {
    let panicky: Arc<dyn Action<Ctx>> = Arc::new(FnAction::new(
        "panic",
        |_: &Ctx| Vec::new(),
        |_, outcome: Outcome| {
            Box::pin(async move {
                if outcome.priority > 0 {
                    panic!("kaboom");
                }
                Ok(None)
            })
        },
    ));
    let mut h = Harness::new(vec![panicky, recorder("say")]);
    h.controller.enqueue("panic", queued(0, 1000, 1)).unwrap();
    h.controller.enqueue("say", queued(0, 0, 1)).unwrap();
    h.start();

    let failed = h
        .wait_for(|k| matches!(k, EventKind::Failed { .. }))
        .await;
    assert_eq!(failed.action(), Some("panic"));
    h.executed("say").await;
}

#[tokio::test(start_paused = true)]
async fn only_one_action_executes_at_a_time() {
    let slow: Arc<dyn Action<Ctx>> = Arc::new(FnAction::new(
        "slow",
        |_: &Ctx| Vec::new(),
        |tracker: Ctx, _| {
            Box::pin(async move {
                tracker.record("slow-start");
                sleep(ms(500)).await;
                tracker.record("slow-end");
                Ok(None)
            })
        },
    ));
    let mut h = Harness::new(vec![slow, recorder("urgent")]);
    h.controller.enqueue("slow", queued(0, 0, 1)).unwrap();
    h.start();

    sleep(ms(100)).await;
    h.controller.enqueue("urgent", queued(0, 0, 100)).unwrap();

    h.executed("urgent").await;
    assert_eq!(h.tracker.order(), vec!["slow-start", "slow-end", "urgent"]);
}

#[tokio::test(start_paused = true)]
async fn dispose_with_pending_timer_prevents_exec() {
    let mut h = Harness::new(vec![recorder("say")]);
    h.controller.enqueue("say", queued(1000, 0, 1)).unwrap();
    h.start();

    sleep(ms(500)).await;
    h.controller.dispose();
    h.wait_for(|k| matches!(k, EventKind::Disposed)).await;

    sleep(ms(5000)).await;
    assert!(h.tracker.order().is_empty());
    assert!(h.controller.is_disposed());
    assert!(h.controller.queued().is_empty());
    assert_eq!(h.controller.enqueue("say", queued(0, 0, 1)), None);

    // Disposing twice is harmless.
    h.controller.dispose();
}

#[tokio::test(start_paused = true)]
async fn dispose_without_timer_is_safe() {
    let h = Harness::new(vec![recorder("say")]);
    h.controller.dispose();
    assert!(h.controller.is_disposed());
    assert_eq!(
        h.controller.start(h.provider.subscribe()).unwrap_err(),
        ControllerError::Disposed
    );
}

#[tokio::test(start_paused = true)]
async fn start_twice_is_rejected() {
    let h = Harness::new(Vec::new());
    h.start();
    assert_eq!(
        h.controller.start(h.provider.subscribe()).unwrap_err(),
        ControllerError::AlreadyStarted
    );
    h.controller.dispose();
}

#[test]
fn duplicate_action_is_rejected() {
    let controller: Controller<Ctx> = Controller::new(ControllerConfig::default());
    controller.add_action(recorder("say")).unwrap();
    let err = controller.add_action(recorder("say")).unwrap_err();
    assert!(matches!(err, Error::DuplicateAction(ref id) if id == "say"));
}

#[tokio::test(start_paused = true)]
async fn idle_controller_refills_on_context_change() {
    let toggled: Arc<dyn Action<Ctx>> = Arc::new(FnAction::new(
        "toggled",
        |tracker: &Ctx| {
            if tracker.enabled.load(Ordering::SeqCst) {
                vec![Outcome::new(1.0).with_delay(ms(50)).with_postdelay(ms(1000))]
            } else {
                Vec::new()
            }
        },
        |tracker: Ctx, _| {
            Box::pin(async move {
                tracker.enabled.store(false, Ordering::SeqCst);
                tracker.record("toggled");
                Ok(None)
            })
        },
    ));
    let mut h = Harness::new(vec![toggled]);
    h.start();
    h.wait_for(|k| matches!(k, EventKind::Idle)).await;
    assert!(h.controller.queued().is_empty());

    h.tracker.enabled.store(true, Ordering::SeqCst);
    h.provider.set(h.tracker.clone());
    h.executed("toggled").await;

    // Nothing else to do once it has run.
    h.wait_for(|k| matches!(k, EventKind::Idle)).await;
    assert_eq!(h.tracker.order(), vec!["toggled"]);
}

#[tokio::test(start_paused = true)]
async fn timers_wait_for_a_context() {
    let mut h = Harness::new(vec![recorder("say")]);
    h.controller.start(h.provider.subscribe()).unwrap();
    h.controller.enqueue("say", queued(100, 0, 1)).unwrap();

    sleep(ms(1000)).await;
    assert!(h.tracker.order().is_empty());
    let pending = h.controller.queued();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].action_id, "say");

    h.provider.set(h.tracker.clone());
    h.executed("say").await;
}

#[tokio::test(start_paused = true)]
async fn queued_summary_reflects_priority_order() {
    let h = Harness::new(vec![recorder("a"), recorder("b")]);
    let a = h.controller.enqueue("a", queued(100, 0, 1)).unwrap();
    let b = h.controller.enqueue("b", queued(100, 0, 5)).unwrap();

    let summary = h.controller.queued();
    assert_eq!(summary.len(), 2);
    assert_eq!(summary[0].item, b);
    assert_eq!(summary[0].priority, 5);
    assert_eq!(summary[1].item, a);
    assert!(summary.iter().all(|s| !s.executing));
}

#[tokio::test(start_paused = true)]
async fn dispose_aborts_a_running_action() {
    let slow: Arc<dyn Action<Ctx>> = Arc::new(FnAction::new(
        "slow",
        |_: &Ctx| Vec::new(),
        |tracker: Ctx, _| {
            Box::pin(async move {
                tracker.record("slow-start");
                sleep(ms(500)).await;
                tracker.record("slow-end");
                Ok(Some("slow done".to_string()))
            })
        },
    ));
    let filler: Arc<dyn Action<Ctx>> = Arc::new(FnAction::new(
        "filler",
        |_: &Ctx| vec![Outcome::new(1.0)],
        |tracker: Ctx, _| {
            Box::pin(async move {
                tracker.record("filler");
                Ok(None)
            })
        },
    ));
    let mut h = Harness::new(vec![slow, filler, recorder("say")]);
    h.controller.enqueue("slow", queued(0, 0, 1)).unwrap();
    h.controller.enqueue("say", queued(0, 0, 1)).unwrap();
    h.start();

    sleep(ms(100)).await;
    assert_eq!(h.tracker.order(), vec!["slow-start"]);
    h.controller.dispose();
    h.wait_for(|k| matches!(k, EventKind::Disposed)).await;

    sleep(ms(5000)).await;
    assert_eq!(h.tracker.order(), vec!["slow-start"]);
    assert!(h.controller.queued().is_empty());
    assert!(h.events.try_recv().is_err(), "no events after dispose");
}

#[tokio::test(start_paused = true)]
async fn urgent_item_interrupts_a_post_delay() {
    let mut h = Harness::new(vec![recorder("go"), recorder("urgent"), recorder("say")]);
    let t0 = Instant::now();
    h.controller.enqueue("go", queued(0, 1000, 1)).unwrap();
    h.controller.enqueue("say", queued(0, 0, 1)).unwrap();
    h.start();

    h.executed("go").await;
    sleep(ms(400)).await;
    h.controller.enqueue("urgent", queued(100, 0, 10)).unwrap();

    h.executed("say").await;
    assert_eq!(h.tracker.order(), vec!["go", "urgent", "say"]);
    let runs = h.tracker.runs();
    assert!(near(runs[1].1 - t0, ms(500)));
    // 600 ms of the post-delay were left when the urgent item arrived.
    assert!(near(runs[2].1 - t0, ms(1100)));
}

#[tokio::test(start_paused = true)]
async fn panicking_outcomes_do_not_stop_the_controller() {
    let broken: Arc<dyn Action<Ctx>> = Arc::new(FnAction::new(
        "broken",
        |_: &Ctx| -> Vec<Outcome> { panic!("cannot list outcomes") },
        |_, _| Box::pin(async { Ok(None) }),
    ));
    let steady: Arc<dyn Action<Ctx>> = Arc::new(FnAction::new(
        "steady",
        |_: &Ctx| vec![Outcome::new(1.0).with_postdelay(ms(1000))],
        |tracker: Ctx, _| {
            Box::pin(async move {
                tracker.record("steady");
                Ok(None)
            })
        },
    ));
    let mut h = Harness::new(vec![broken, steady]);
    h.start();

    h.executed("steady").await;
    h.executed("steady").await;
    assert_eq!(h.tracker.order(), vec!["steady", "steady"]);
    h.controller.dispose();
}
