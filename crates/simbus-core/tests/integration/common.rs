use serde_json::json;
use simbus_core::Event;
use std::time::Duration;

simbus_core::event_family! {
    /// Combat events shared by the integration tests
    pub enum CombatEvent: "combat" {
        Attacked => "attacked",
        Died => "died",
        Healed => "healed",
    }
}

simbus_core::event_family! {
    pub enum WeatherEvent: "weather" {
        Rain => "rain",
    }
}

pub fn orc(name: &str, kind: CombatEvent) -> Event<CombatEvent> {
    Event::new(name, "orc", kind, json!({"hp": 0}))
}

/// Poll `condition` while letting spawned tasks run, for up to ~1s
pub async fn wait_until(condition: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
