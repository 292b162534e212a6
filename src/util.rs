//! Environment overrides, named after the original deployment variables.

const MQTT_BROKER_URL: &str = "MQTT_BROKER_URL";

pub fn get_broker_url() -> Option<String> {
    std::env::var(MQTT_BROKER_URL).ok()
}

const INFLUX_HOST: &str = "INFLUX_HOST";

/// Influx host override; expanded to a full v1 endpoint url.
pub fn get_influx_url() -> Option<String> {
    std::env::var(INFLUX_HOST)
        .ok()
        .map(|host| format!("http://{host}:8086"))
}

const INFLUX_DB: &str = "INFLUX_DB";

pub fn get_influx_database() -> Option<String> {
    std::env::var(INFLUX_DB).ok()
}

const ALERT_DEBOUNCE_MS: &str = "ALERT_DEBOUNCE_MS";

pub fn get_debounce_ms() -> Option<u64> {
    std::env::var(ALERT_DEBOUNCE_MS)
        .ok()
        .and_then(|ms| ms.parse().ok())
}

const SIM_TANKS: &str = "SIM_TANKS";

pub fn get_sim_tanks() -> Vec<String> {
    std::env::var(SIM_TANKS).map_or_else(
        |_| vec![String::from("tank1"), String::from("tank2")],
        |tanks| tanks.split(',').map(str::to_string).collect(),
    )
}

const SIM_INTERVAL_MS: &str = "SIM_INTERVAL_MS";

const DEFAULT_SIM_INTERVAL_MS: u64 = 2000;

pub fn get_sim_interval_ms() -> u64 {
    std::env::var(SIM_INTERVAL_MS).map_or(DEFAULT_SIM_INTERVAL_MS, |ms| {
        ms.parse().unwrap_or(DEFAULT_SIM_INTERVAL_MS)
    })
}
