use serde_json::json;
use simbus_core::{
    BreakpointCriteria, DebugError, DebugSession, Error, EventBus, FilterCriteria, PauseReason,
    Synchronize, SynchronizeConfig,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::common::{orc, wait_until, CombatEvent};

fn counting_bus(session: &DebugSession) -> (EventBus<CombatEvent>, Arc<AtomicUsize>) {
    let bus = EventBus::<CombatEvent>::new(session);
    let hits = Arc::new(AtomicUsize::new(0));
    for kind in [CombatEvent::Attacked, CombatEvent::Died] {
        let counter = hits.clone();
        bus.on(kind, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }
    (bus, hits)
}

#[tokio::test]
async fn test_every_breakpoint_suspends_send_until_run() {
    let session = DebugSession::new();
    let (bus, hits) = counting_bus(&session);
    let bp = session
        .add_breakpoint(BreakpointCriteria::every(), None)
        .unwrap();
    assert_eq!(bp.name(), "bp1");

    let sender = bus.clone();
    let pending = tokio::spawn(async move { sender.send(orc("grak", CombatEvent::Died)).await });

    assert!(wait_until(|| session.is_paused()).await);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!pending.is_finished());
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(
        session.pause_reason(),
        Some(PauseReason::Breakpoint("bp1".to_string()))
    );
    assert_eq!(session.paused_event().unwrap().source_name, "grak");

    session.run().unwrap();
    assert!(!session.is_paused());
    let delivered = pending.await.unwrap().unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // same value as an un-intercepted send
    session.clear_all();
    assert_eq!(delivered, bus.send(orc("grak", CombatEvent::Died)).await.unwrap());
}

#[tokio::test]
async fn test_paused_send_without_subscribers_settles_false() {
    let session = DebugSession::new();
    let (bus, _) = counting_bus(&session);
    session.add_breakpoint(BreakpointCriteria::every(), None).unwrap();

    let sender = bus.clone();
    let pending = tokio::spawn(async move { sender.send(orc("grak", CombatEvent::Healed)).await });
    assert!(wait_until(|| session.is_paused()).await);
    session.run().unwrap();
    assert!(!pending.await.unwrap().unwrap());
}

#[tokio::test]
async fn test_once_breakpoint_never_retriggers() {
    let session = DebugSession::new();
    let (bus, hits) = counting_bus(&session);
    session
        .add_breakpoint_json(
            &json!({"eventType": "died", "any": true, "once": true}),
            Some("first-death"),
        )
        .unwrap();

    assert!(bus.send(orc("grak", CombatEvent::Attacked)).await.unwrap());
    assert!(!session.is_paused());

    let sender = bus.clone();
    let pending = tokio::spawn(async move { sender.send(orc("grak", CombatEvent::Died)).await });
    assert!(wait_until(|| session.is_paused()).await);
    assert_eq!(
        session.list(),
        vec!["first-death: \"any::eventType:died\" [disabled,once]".to_string()]
    );
    session.run().unwrap();
    pending.await.unwrap().unwrap();

    for _ in 0..3 {
        assert!(bus.send(orc("grak", CombatEvent::Died)).await.unwrap());
        assert!(!session.is_paused());
    }
    assert_eq!(hits.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_count_breakpoint_pauses_on_every_second_match() {
    let session = DebugSession::new();
    let (bus, _) = counting_bus(&session);
    session
        .add_breakpoint(
            BreakpointCriteria::new(FilterCriteria::default().event_type("died").any()).count(2),
            Some("pairs"),
        )
        .unwrap();

    assert!(bus.send(orc("a", CombatEvent::Died)).await.unwrap());
    assert!(bus.send(orc("b", CombatEvent::Attacked)).await.unwrap());
    assert_eq!(session.list(), vec!["pairs: \"any::eventType:died\" (1/2)".to_string()]);

    let sender = bus.clone();
    let pending = tokio::spawn(async move { sender.send(orc("c", CombatEvent::Died)).await });
    assert!(wait_until(|| session.is_paused()).await);
    session.run().unwrap();
    pending.await.unwrap().unwrap();

    assert!(bus.send(orc("d", CombatEvent::Died)).await.unwrap());
    assert!(!session.is_paused());
}

#[tokio::test]
async fn test_step_pauses_next_event_only() {
    let session = DebugSession::new();
    let (bus, _) = counting_bus(&session);
    session.set_breakpoint();

    let sender = bus.clone();
    let pending = tokio::spawn(async move { sender.send(orc("a", CombatEvent::Attacked)).await });
    assert!(wait_until(|| session.is_paused()).await);
    assert_eq!(session.pause_reason(), Some(PauseReason::Step));
    session.run().unwrap();
    pending.await.unwrap().unwrap();

    assert!(bus.send(orc("b", CombatEvent::Attacked)).await.unwrap());
    assert!(!session.is_paused());
}

#[tokio::test]
async fn test_second_pause_is_rejected() {
    let session = DebugSession::new();
    let (bus, hits) = counting_bus(&session);
    session.add_breakpoint(BreakpointCriteria::every(), None).unwrap();

    let sender = bus.clone();
    let pending = tokio::spawn(async move { sender.send(orc("a", CombatEvent::Died)).await });
    assert!(wait_until(|| session.is_paused()).await);

    let err = bus.send(orc("b", CombatEvent::Died)).await.unwrap_err();
    assert!(matches!(err, Error::Debug(DebugError::AlreadyPaused { .. })));

    session.run().unwrap();
    pending.await.unwrap().unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(matches!(session.run(), Err(DebugError::NotPaused)));
}

#[tokio::test]
async fn test_trace_records_every_dispatch() {
    let session = DebugSession::new();
    let (bus, _) = counting_bus(&session);
    bus.send(orc("a", CombatEvent::Attacked)).await.unwrap();
    bus.send(orc("b", CombatEvent::Healed)).await.unwrap();

    let history = session.trace_history();
    let tags: Vec<&str> = history.iter().map(|r| r.event_type.as_str()).collect();
    assert_eq!(tags, vec!["attacked", "healed"]);
    assert!(history.iter().all(|r| r.family == "combat"));

    session.clear_trace();
    assert!(session.trace_history().is_empty());
}

#[tokio::test]
async fn test_pause_suspends_watchdog() {
    let clock = Synchronize::new();
    let stalls = clock.stalls();
    clock.init(SynchronizeConfig::synchronous(30)).unwrap();
    let session = DebugSession::with_clock(&clock);
    let (bus, _) = counting_bus(&session);
    session.add_breakpoint(BreakpointCriteria::every(), None).unwrap();

    let sender = bus.clone();
    let pending = tokio::spawn(async move { sender.send(orc("a", CombatEvent::Died)).await });
    assert!(wait_until(|| session.is_paused()).await);
    assert!(!clock.is_watchdog_running());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(stalls.borrow().is_none());

    session.run().unwrap();
    pending.await.unwrap().unwrap();
    assert!(clock.is_watchdog_running());

    for _ in 0..5 {
        clock.next_tick().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(stalls.borrow().is_none());
    clock.shutdown();
}

#[tokio::test]
async fn test_dropped_paused_send_restores_watchdog() {
    let clock = Synchronize::new();
    let mut stalls = clock.stalls();
    clock.init(SynchronizeConfig::synchronous(20)).unwrap();
    let session = DebugSession::with_clock(&clock);
    let (bus, hits) = counting_bus(&session);
    session
        .add_breakpoint(BreakpointCriteria::every().once(), None)
        .unwrap();

    let timed_out =
        tokio::time::timeout(Duration::from_millis(10), bus.send(orc("a", CombatEvent::Died))).await;
    assert!(timed_out.is_err());
    assert!(!session.is_paused());
    assert!(clock.is_watchdog_running());
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    tokio::time::timeout(Duration::from_millis(200), stalls.changed())
        .await
        .expect("stall should be reported once the dropped pause is released")
        .unwrap();
    assert!(stalls.borrow().is_some());
    clock.shutdown();
}
