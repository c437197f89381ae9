use std::env;
use std::time::Duration;

use dispatch::ViewConfig;
use realtime::Coordinates;
use tracking::{ThrottleConfig, WatchOptions};

const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub throttle: ThrottleConfig,
    pub watch: WatchOptions,
    pub view: ViewConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup, e.g. a map in tests.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_base_url = lookup("API_BASE_URL")
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| {
                tracing::trace!("API_BASE_URL not set, using default: {DEFAULT_API_BASE_URL}");
                DEFAULT_API_BASE_URL.to_string()
            });
        let api_token = lookup("API_TOKEN")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let throttle = ThrottleConfig {
            min_interval: chrono::Duration::seconds(
                env_i64(&lookup, "THROTTLE_MIN_INTERVAL_SECS", 10),
            ),
            min_distance_meters: env_f64(&lookup, "THROTTLE_MIN_DISTANCE_METERS", 10.0),
        };
        let watch = WatchOptions {
            high_accuracy: env_bool(&lookup, "GEO_HIGH_ACCURACY", true),
            timeout: Duration::from_secs(env_u64(&lookup, "GEO_TIMEOUT_SECS", 20)),
            maximum_age: Duration::from_secs(env_u64(&lookup, "GEO_MAXIMUM_AGE_SECS", 30)),
        };

        let defaults = ViewConfig::default();
        let view = ViewConfig {
            default_center: Coordinates::new(
                env_f64(&lookup, "MAP_DEFAULT_LAT", defaults.default_center.lat),
                env_f64(&lookup, "MAP_DEFAULT_LNG", defaults.default_center.lng),
            ),
            default_zoom: u8::try_from(env_u64(&lookup, "MAP_DEFAULT_ZOOM", 12)).unwrap_or(12),
            padding_ratio: env_f64(&lookup, "MAP_PADDING_RATIO", defaults.padding_ratio),
            min_span_degrees: env_f64(&lookup, "MAP_MIN_SPAN_DEGREES", defaults.min_span_degrees),
        };

        Self { api_base_url, api_token, throttle, watch, view }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn env_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    lookup(key)
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

fn env_f64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: f64) -> f64 {
    lookup(key).and_then(|value| value.parse::<f64>().ok()).unwrap_or(default)
}

fn env_i64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: i64) -> i64 {
    lookup(key).and_then(|value| value.parse::<i64>().ok()).unwrap_or(default)
}

fn env_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    lookup(key).and_then(|value| value.parse::<u64>().ok()).unwrap_or(default)
}
