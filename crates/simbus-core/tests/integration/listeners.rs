use parking_lot::Mutex;
use serde_json::json;
use simbus_core::{
    BusError, DebugSession, Error, Event, EventBus, EventFilter, EventListener, EventRecord,
    FilterCriteria,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::common::{orc, CombatEvent, WeatherEvent};

#[test]
fn test_all_source_name_filter() {
    let filter =
        EventFilter::allow(FilterCriteria::from_json(&json!({"sourceName": "X", "all": true})).unwrap())
            .unwrap();
    assert!(filter.match_event(&EventRecord::new("combat", "X", "orc", "died", json!(null))));
    assert!(!filter.match_event(&EventRecord::new("combat", "Y", "orc", "died", json!(null))));
    assert!(!filter.match_event(&EventRecord::new("combat", "x", "orc", "died", json!(null))));
}

#[tokio::test]
async fn test_listener_chain_with_priorities() {
    let session = DebugSession::new();
    let bus = EventBus::<CombatEvent>::new(&session);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();

    let listener = EventListener::new(
        &bus,
        [
            EventFilter::allow(FilterCriteria::default().source_type("orc").any()).unwrap(),
            EventFilter::deny(FilterCriteria::default().source_name("boss").any())
                .unwrap()
                .with_priority(1),
        ],
        move |event: &Event<CombatEvent>| {
            log.lock().push(event.to_string());
            Ok(())
        },
    )
    .unwrap();
    assert_eq!(listener.attached_events().len(), 3);

    bus.send(orc("grunt", CombatEvent::Attacked)).await.unwrap();
    bus.send(orc("boss", CombatEvent::Attacked)).await.unwrap();
    bus.send(Event::new("elf-1", "elf", CombatEvent::Healed, json!(null)))
        .await
        .unwrap();
    assert_eq!(*seen.lock(), vec!["grunt::orc => attacked".to_string()]);

    assert_eq!(listener.detach(), 3);
    bus.send(orc("grunt", CombatEvent::Died)).await.unwrap();
    assert_eq!(seen.lock().len(), 1);
}

#[tokio::test]
async fn test_listener_rejects_foreign_event_type() {
    let bus = EventBus::<CombatEvent>::new(&DebugSession::new());
    let err = EventListener::new(
        &bus,
        [EventFilter::allow(FilterCriteria::default().event_type("rain").any()).unwrap()],
        |_: &Event<CombatEvent>| Ok(()),
    )
    .unwrap_err();
    assert!(err.to_string().contains("rain"));
    assert_eq!(bus.subscriber_count(), 0);
}

#[tokio::test]
async fn test_send_record_checks_family() {
    let session = DebugSession::new();
    let bus = EventBus::<CombatEvent>::new(&session);
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    bus.on(CombatEvent::Died, move |event| {
        assert_eq!(event.data(), &json!({"hp": 0}));
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let wire: EventRecord =
        serde_json::from_value(json!({"sourceName": "grak", "sourceType": "orc", "type": "died", "data": {"hp": 0}}))
            .unwrap();
    assert!(bus.send_record(wire).await.unwrap());

    let foreign = Event::new("sky", "cloud", WeatherEvent::Rain, json!(null)).to_record();
    let err = bus.send_record(foreign).await.unwrap_err();
    assert!(matches!(err, Error::Bus(BusError::WrongFamily { .. })));

    let unknown = EventRecord::new("combat", "grak", "orc", "danced", json!(null));
    let err = bus.send_record(unknown).await.unwrap_err();
    assert!(matches!(err, Error::Bus(BusError::EventTypeNotAllowed { .. })));

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    // rejected records never reach the gate
    assert_eq!(session.trace_history().len(), 1);
}

#[tokio::test]
async fn test_once_and_unsubscribe() {
    let bus = EventBus::<CombatEvent>::new(&DebugSession::new());
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = hits.clone();
    bus.once(CombatEvent::Healed, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let counter = hits.clone();
    let sub = bus.on(CombatEvent::Healed, move |_| {
        counter.fetch_add(10, Ordering::SeqCst);
        Ok(())
    });

    bus.send(orc("a", CombatEvent::Healed)).await.unwrap();
    bus.send(orc("a", CombatEvent::Healed)).await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 21);

    assert!(sub.unsubscribe());
    assert!(!bus.send(orc("a", CombatEvent::Healed)).await.unwrap());
}

#[tokio::test]
async fn test_callback_error_stops_fan_out() {
    let bus = EventBus::<CombatEvent>::new(&DebugSession::new());
    let hits = Arc::new(AtomicUsize::new(0));
    bus.on(CombatEvent::Died, |_| anyhow::bail!("corpse handler failed"));
    let counter = hits.clone();
    bus.on(CombatEvent::Died, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let err = bus.send(orc("a", CombatEvent::Died)).await.unwrap_err();
    assert!(matches!(err, Error::Callback(_)));
    assert!(err.to_string().contains("corpse handler failed"));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}
