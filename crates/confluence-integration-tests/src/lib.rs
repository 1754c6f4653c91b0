//! Shared fixtures for the cross-crate tests under `tests/`.

use confluence_sensor::{EntityRef, Event, Sensor, SensorConfig, WindowBudget, WindowReport};

/// Feature vector that puts most of the weight on reconnaissance.
pub const RECON: [f64; 4] = [0.9, 0.1, 0.0, 0.0];

/// Feature vector dominated by the terminal phase.
pub const EXFIL: [f64; 4] = [0.0, 0.0, 0.0, 1.0];

/// A one-entity observation in category `host`.
pub fn observe(t: f64, id: &str, features: &[f64]) -> Event {
    observe_in(t, id, "host", features)
}

pub fn observe_in(t: f64, id: &str, category: &str, features: &[f64]) -> Event {
    Event::new(t, vec![EntityRef::new(id, category)], features.to_vec())
}

/// Ingest every event and run one unlimited window.
pub fn run_once(config: SensorConfig, events: impl IntoIterator<Item = Event>) -> WindowReport {
    let mut sensor = Sensor::new(config).expect("valid config");
    for event in events {
        sensor.ingest(event).expect("valid event");
    }
    sensor
        .run_window(&WindowBudget::unlimited())
        .expect("window completes")
}
