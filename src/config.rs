//! Runtime settings
//!
//! Defaults are compiled in; a handful can be overridden from the environment.

use std::path::PathBuf;
use std::time::Duration;

pub const DEVICE_NAME: &str = "Tandem";
pub const DEFAULT_VOLUME: f32 = 0.5;
/// Preview clips are conventionally this long; reported while metadata is unknown.
pub const PREVIEW_FALLBACK_DURATION_MS: u32 = 30_000;
pub const PROGRESS_TICK: Duration = Duration::from_millis(1000);
pub const DEFAULT_QUEUE_LIMIT: usize = 50;
pub const LOG_DIR: &str = ".logs";
/// Used when neither `RUST_LOG` nor `TANDEM_LOG_FILTER` is set.
pub const DEFAULT_LOG_FILTER: &str = "tandem_player=debug,librespot=info,rspotify=info,warn";

const ENV_DEVICE_NAME: &str = "TANDEM_DEVICE_NAME";
const ENV_INITIAL_VOLUME: &str = "TANDEM_INITIAL_VOLUME";
const ENV_QUEUE_LIMIT: &str = "TANDEM_QUEUE_LIMIT";
const ENV_LOG_DIR: &str = "TANDEM_LOG_DIR";
const ENV_LOG_FILTER: &str = "TANDEM_LOG_FILTER";

#[derive(Clone, Debug)]
pub struct Settings {
    pub device_name: String,
    pub initial_volume: f32,
    pub progress_tick: Duration,
    pub preview_fallback_duration_ms: u32,
    pub queue_limit: usize,
    pub log_dir: PathBuf,
    pub log_filter: String,
    /// Environment values that were present but rejected. Settings load
    /// before logging exists, so these are reported once it is up.
    pub ignored: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device_name: DEVICE_NAME.to_string(),
            initial_volume: DEFAULT_VOLUME,
            progress_tick: PROGRESS_TICK,
            preview_fallback_duration_ms: PREVIEW_FALLBACK_DURATION_MS,
            queue_limit: DEFAULT_QUEUE_LIMIT,
            log_dir: PathBuf::from(LOG_DIR),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            ignored: Vec::new(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if let Some(name) = lookup(ENV_DEVICE_NAME).filter(|n| !n.trim().is_empty()) {
            settings.device_name = name.trim().to_string();
        }

        if let Some(raw) = lookup(ENV_INITIAL_VOLUME) {
            match raw.trim().parse::<f32>() {
                Ok(v) if (0.0..=1.0).contains(&v) => settings.initial_volume = v,
                _ => settings.ignored.push(format!("{ENV_INITIAL_VOLUME}={raw}")),
            }
        }

        if let Some(raw) = lookup(ENV_QUEUE_LIMIT) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => settings.queue_limit = n,
                _ => settings.ignored.push(format!("{ENV_QUEUE_LIMIT}={raw}")),
            }
        }

        if let Some(dir) = lookup(ENV_LOG_DIR).filter(|d| !d.trim().is_empty()) {
            settings.log_dir = PathBuf::from(dir.trim());
        }

        if let Some(raw) = lookup(ENV_LOG_FILTER) {
            match tracing_subscriber::EnvFilter::try_new(raw.trim()) {
                Ok(_) if !raw.trim().is_empty() => settings.log_filter = raw.trim().to_string(),
                _ => settings.ignored.push(format!("{ENV_LOG_FILTER}={raw}")),
            }
        }

        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let settings = Settings::from_lookup(lookup(&[]));
        assert_eq!(settings.device_name, DEVICE_NAME);
        assert_eq!(settings.preview_fallback_duration_ms, 30_000);
        assert_eq!(settings.progress_tick, Duration::from_secs(1));
    }

    #[test]
    fn overrides_are_applied() {
        let settings = Settings::from_lookup(lookup(&[
            (ENV_DEVICE_NAME, " Kitchen "),
            (ENV_INITIAL_VOLUME, "0.25"),
            (ENV_QUEUE_LIMIT, "10"),
        ]));
        assert_eq!(settings.device_name, "Kitchen");
        assert_eq!(settings.initial_volume, 0.25);
        assert_eq!(settings.queue_limit, 10);
    }

    #[test]
    fn out_of_range_volume_is_ignored() {
        let settings = Settings::from_lookup(lookup(&[(ENV_INITIAL_VOLUME, "4")]));
        assert_eq!(settings.initial_volume, DEFAULT_VOLUME);
        assert_eq!(settings.ignored, vec![format!("{ENV_INITIAL_VOLUME}=4")]);
    }

    #[test]
    fn log_location_and_filter_can_be_moved() {
        let settings = Settings::from_lookup(lookup(&[]));
        assert_eq!(settings.log_dir, PathBuf::from(".logs"));
        assert_eq!(settings.log_filter, DEFAULT_LOG_FILTER);

        let settings = Settings::from_lookup(lookup(&[
            (ENV_LOG_DIR, "/var/log/tandem"),
            (ENV_LOG_FILTER, "tandem_player=trace,warn"),
        ]));
        assert_eq!(settings.log_dir, PathBuf::from("/var/log/tandem"));
        assert_eq!(settings.log_filter, "tandem_player=trace,warn");
        assert!(settings.ignored.is_empty());
    }

    #[test]
    fn rejected_values_are_collected() {
        let settings = Settings::from_lookup(lookup(&[
            (ENV_QUEUE_LIMIT, "0"),
            (ENV_LOG_FILTER, "tandem_player=loud"),
            (ENV_LOG_DIR, "  "),
        ]));
        assert_eq!(settings.queue_limit, DEFAULT_QUEUE_LIMIT);
        assert_eq!(settings.log_filter, DEFAULT_LOG_FILTER);
        assert_eq!(settings.log_dir, PathBuf::from(LOG_DIR));
        assert_eq!(
            settings.ignored,
            vec![format!("{ENV_QUEUE_LIMIT}=0"), format!("{ENV_LOG_FILTER}=tandem_player=loud")]
        );
    }
}
