use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[clap(about = "Source Analyzer dashboard watcher", version)]
#[serde(rename_all = "camelCase")]
pub struct ConfigArgs {
    #[clap(long, env = "DASHBOARD_API_URL", help = "Base URL of the dashboard REST API.")]
    pub api_base_url: Option<String>,

    #[clap(long, env = "DASHBOARD_WS_URL", help = "WebSocket URL of the notification endpoint.")]
    pub ws_url: Option<String>,

    #[clap(long, env = "DASHBOARD_RECONNECT_DELAY_MS", help = "Fixed delay in milliseconds between reconnect attempts.")]
    pub reconnect_delay_ms: Option<u64>,

    #[clap(long, env = "DASHBOARD_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "DASHBOARD_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "DASHBOARD_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,
}

impl ConfigArgs {
    // Merge two ConfigArgs structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: ConfigArgs) -> ConfigArgs {
        ConfigArgs {
            api_base_url: other.api_base_url.or(self.api_base_url),
            ws_url: other.ws_url.or(self.ws_url),
            reconnect_delay_ms: other.reconnect_delay_ms.or(self.reconnect_delay_ms),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
        }
    }
}

/// Fully resolved settings, after defaults, file, env and CLI are merged.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub ws_url: String,
    pub reconnect_delay: Duration,
    pub log_dir: PathBuf,
    pub log_level: String,
}

pub fn load_config() -> Config {
    // 1. Defaults matching the backend's development setup.
    let defaults = ConfigArgs {
        api_base_url: Some("http://localhost:8000/api/".to_string()),
        ws_url: Some("ws://localhost:8000/ws".to_string()),
        reconnect_delay_ms: Some(3000),
        log_dir: Some(PathBuf::from("./logs")),
        log_level: Some("info".to_string()),
        ..Default::default()
    };

    // 2. Parse CLI/env early to honor a --config-path override.
    let cli_args = ConfigArgs::parse();
    let config_file_path = cli_args
        .config_path
        .clone()
        .unwrap_or_else(default_config_path);

    let mut current = defaults;

    if config_file_path.exists() {
        if let Ok(config_str) = fs::read_to_string(&config_file_path) {
            if let Ok(file_config) = serde_json::from_str::<ConfigArgs>(&config_str) {
                current = current.merge(file_config);
            } else {
                log::warn!(
                    "Failed to parse config file: {}. Falling back to other sources.",
                    config_file_path.display()
                );
            }
        } else {
            log::warn!(
                "Failed to read config file: {}. Falling back to other sources.",
                config_file_path.display()
            );
        }
    }

    // 3. Environment variables and CLI arguments win over the file.
    current = current.merge(cli_args);

    resolve(current)
}

// Prefer a file next to the binary, then the user's config directory.
fn default_config_path() -> PathBuf {
    let local = PathBuf::from("console_watch.conf");
    if local.exists() {
        return local;
    }
    dirs::config_dir()
        .map(|dir| dir.join("source-analyzer").join("console_watch.conf"))
        .unwrap_or(local)
}

fn resolve(args: ConfigArgs) -> Config {
    Config {
        api_base_url: args
            .api_base_url
            .unwrap_or_else(|| "http://localhost:8000/api/".to_string()),
        ws_url: args
            .ws_url
            .unwrap_or_else(|| "ws://localhost:8000/ws".to_string()),
        reconnect_delay: Duration::from_millis(args.reconnect_delay_ms.unwrap_or(3000)),
        log_dir: args.log_dir.unwrap_or_else(|| PathBuf::from("./logs")),
        log_level: args.log_level.unwrap_or_else(|| "info".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_values_override_file_values() {
        let file = ConfigArgs {
            ws_url: Some("ws://from-file:8000/ws".to_string()),
            reconnect_delay_ms: Some(500),
            ..Default::default()
        };
        let cli = ConfigArgs {
            ws_url: Some("ws://from-cli:8000/ws".to_string()),
            ..Default::default()
        };

        let merged = file.merge(cli);
        assert_eq!(merged.ws_url.as_deref(), Some("ws://from-cli:8000/ws"));
        assert_eq!(merged.reconnect_delay_ms, Some(500));
    }

    #[test]
    fn resolve_fills_every_field() {
        let config = resolve(ConfigArgs::default());
        assert_eq!(config.ws_url, "ws://localhost:8000/ws");
        assert_eq!(config.reconnect_delay, Duration::from_millis(3000));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn file_config_round_trips_through_serde() {
        let raw = r#"{"wsUrl": "ws://example:9000/ws", "reconnectDelayMs": 1000}"#;
        let parsed: ConfigArgs = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.ws_url.as_deref(), Some("ws://example:9000/ws"));
        assert_eq!(parsed.reconnect_delay_ms, Some(1000));
    }
}
