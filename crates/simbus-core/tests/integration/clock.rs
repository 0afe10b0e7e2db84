use async_trait::async_trait;
use simbus_core::{
    DebugSession, Event, EventBus, SyncError, Synchronize, SynchronizeConfig, TickListener,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::common::CombatEvent;

/// Publishes one combat event per tick
struct Spawner {
    bus: EventBus<CombatEvent>,
}

#[async_trait]
impl TickListener for Spawner {
    async fn on_tick(&self, tick: u64) -> anyhow::Result<()> {
        let event = Event::new(format!("orc-{}", tick), "orc", CombatEvent::Attacked, serde_json::json!({"tick": tick}));
        self.bus.send(event).await?;
        Ok(())
    }
}

#[tokio::test]
async fn test_stall_without_ticks() {
    let clock = Synchronize::new();
    let mut stalls = clock.stalls();
    clock.init(SynchronizeConfig::synchronous(10)).unwrap();

    tokio::time::timeout(Duration::from_millis(100), stalls.changed())
        .await
        .expect("stall should be reported")
        .unwrap();
    let report = stalls.borrow().clone().unwrap();
    assert_eq!(report.to_error(), SyncError::Stalled { timeout_ms: 10, tick_count: 0 });
    assert!(report.to_error().to_string().starts_with("Watchdog timeout"));
    clock.shutdown();
}

#[tokio::test]
async fn test_ticking_inside_window_suppresses_stall() {
    let clock = Synchronize::new();
    let stalls = clock.stalls();
    clock.init(SynchronizeConfig::synchronous(25)).unwrap();

    for _ in 0..10 {
        clock.next_tick().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(stalls.borrow().is_none());
    assert_eq!(clock.tick_count(), Ok(10));
    clock.shutdown();
}

#[tokio::test]
async fn test_tick_listener_drives_bus() {
    let clock = Synchronize::new();
    clock.init(SynchronizeConfig::synchronous(1000)).unwrap();
    let session = DebugSession::with_clock(&clock);
    let bus = EventBus::<CombatEvent>::new(&session);

    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    bus.on(CombatEvent::Attacked, move |event| {
        assert!(event.data()["tick"].is_u64());
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    clock.register(Arc::new(Spawner { bus: bus.clone() })).unwrap();

    for _ in 0..3 {
        clock.next_tick().await.unwrap();
    }
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    let names: Vec<String> = session
        .trace_history()
        .into_iter()
        .map(|r| r.source_name)
        .collect();
    assert_eq!(names, vec!["orc-1", "orc-2", "orc-3"]);
    clock.shutdown();
}

#[tokio::test]
async fn test_async_mode_ticks_on_its_own() {
    let clock = Synchronize::new();
    clock.init(SynchronizeConfig::asynchronous(5)).unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(clock.tick_count().unwrap() > 0);
    assert!(clock.next_tick().await.is_err());
    clock.shutdown();
}
