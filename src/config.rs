//! Application-level configuration loading for round and scoring parameters.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MATH_RUSH_BACK_CONFIG_PATH";

/// Points awarded for winning a question when the config does not say otherwise.
const DEFAULT_WIN_POINTS: u32 = 10;
/// Delay before a new question replaces a closed one, letting clients display
/// the winner's name first.
const DEFAULT_REGENERATION_DELAY_MS: u64 = 3_000;
/// Maximum number of retained high-score entries.
const DEFAULT_HIGH_SCORE_CAP: usize = 10;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct GameConfig {
    /// Score increment granted to the winner of a question.
    pub win_points: u32,
    /// Delay between a win and the creation of the next question.
    pub regeneration_delay: Duration,
    /// Number of entries kept in the high-score table.
    pub high_score_cap: usize,
}

impl GameConfig {
    /// Load the configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        win_points = config.win_points,
                        "loaded game configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            win_points: DEFAULT_WIN_POINTS,
            regeneration_delay: Duration::from_millis(DEFAULT_REGENERATION_DELAY_MS),
            high_score_cap: DEFAULT_HIGH_SCORE_CAP,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    win_points: Option<u32>,
    regeneration_delay_ms: Option<u64>,
    high_score_cap: Option<usize>,
}

impl From<RawConfig> for GameConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = GameConfig::default();
        Self {
            win_points: value.win_points.unwrap_or(defaults.win_points),
            regeneration_delay: value
                .regeneration_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.regeneration_delay),
            high_score_cap: value.high_score_cap.unwrap_or(defaults.high_score_cap),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_applied_for_missing_fields() {
        let raw: RawConfig = serde_json::from_str(r#"{"win_points": 25}"#).unwrap();
        let config: GameConfig = raw.into();

        assert_eq!(config.win_points, 25);
        assert_eq!(config.regeneration_delay, Duration::from_millis(3_000));
        assert_eq!(config.high_score_cap, 10);
    }

    #[test]
    fn full_config_parses() {
        let raw: RawConfig = serde_json::from_str(
            r#"{"win_points": 5, "regeneration_delay_ms": 500, "high_score_cap": 3}"#,
        )
        .unwrap();
        let config: GameConfig = raw.into();

        assert_eq!(config.win_points, 5);
        assert_eq!(config.regeneration_delay, Duration::from_millis(500));
        assert_eq!(config.high_score_cap, 3);
    }
}
