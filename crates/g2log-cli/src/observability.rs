use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

const ENV_OBSERVABILITY: &str = "G2LOG_OBSERVABILITY";
const ENV_LOG_LEVEL: &str = "G2LOG_LOG_LEVEL";
const ENV_JSON_LOG_PATH: &str = "G2LOG_JSON_LOG_PATH";
const DEFAULT_LOG_FILE: &str = "g2log.logs.jsonl";

fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

/// Logging knobs read from the environment once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
struct LogSettings {
    enabled: bool,
    level: Option<String>,
    rust_log: Option<String>,
    json_path: Option<PathBuf>,
}

impl LogSettings {
    fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok();
        Self {
            // Unrecognized values keep logging on.
            enabled: var(ENV_OBSERVABILITY)
                .and_then(|v| parse_bool_env(&v))
                .unwrap_or(true),
            level: var(ENV_LOG_LEVEL),
            rust_log: var(EnvFilter::DEFAULT_ENV),
            json_path: var(ENV_JSON_LOG_PATH).map(PathBuf::from),
        }
    }

    /// `G2LOG_LOG_LEVEL`, then `--debug`, then `RUST_LOG`, then `warn`.
    ///
    /// A value that does not parse as a filter is skipped.
    fn filter(&self, debug: bool) -> EnvFilter {
        let parsed = |raw: &Option<String>| raw.as_deref().and_then(|s| EnvFilter::try_new(s).ok());
        if let Some(filter) = parsed(&self.level) {
            return filter;
        }
        if debug {
            return EnvFilter::new("debug");
        }
        parsed(&self.rust_log).unwrap_or_else(|| EnvFilter::new("warn"))
    }

    /// Directory and file name for the JSONL writer.
    fn json_target(&self) -> Option<(PathBuf, String)> {
        let path = self.json_path.as_ref()?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let file = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(DEFAULT_LOG_FILE)
            .to_string();
        Some((dir, file))
    }
}

/// Initialize logging once per process.
///
/// Environment variables:
/// - `G2LOG_OBSERVABILITY`: optional enable/disable flag (default enabled).
/// - `G2LOG_LOG_LEVEL`: optional level/filter override (`info`, `debug`, etc.).
/// - `G2LOG_JSON_LOG_PATH`: optional log file path. If set, logs are JSONL in that file.
///   If unset, logs go to stderr in a compact format; stdout carries the summary.
/// - `RUST_LOG`: optional filter, below `--debug`.
pub fn init_observability(debug: bool) {
    INIT.get_or_init(|| {
        let settings = LogSettings::from_env();
        if !settings.enabled {
            return;
        }
        let env_filter = settings.filter(debug);
        match settings.json_target() {
            Some((dir, file)) => {
                let _ = std::fs::create_dir_all(&dir);
                let writer = tracing_appender::rolling::never(dir, file);
                let json_layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(false)
                    .with_writer(writer);
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(json_layer)
                    .try_init();
            }
            None => {
                let console_layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(console_layer)
                    .try_init();
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(level: Option<&str>, rust_log: Option<&str>) -> LogSettings {
        LogSettings {
            enabled: true,
            level: level.map(str::to_string),
            rust_log: rust_log.map(str::to_string),
            json_path: None,
        }
    }

    #[test]
    fn bool_env_values() {
        assert_eq!(parse_bool_env(" OFF "), Some(false));
        assert_eq!(parse_bool_env("enabled"), Some(true));
        assert_eq!(parse_bool_env("maybe"), None);
    }

    #[test]
    fn level_variable_beats_debug_flag_and_rust_log() {
        let s = settings(Some("info"), Some("trace"));
        assert_eq!(s.filter(true).to_string(), "info");
        assert_eq!(s.filter(false).to_string(), "info");
    }

    #[test]
    fn debug_flag_beats_rust_log() {
        let s = settings(None, Some("trace"));
        assert_eq!(s.filter(true).to_string(), "debug");
        assert_eq!(s.filter(false).to_string(), "trace");
    }

    #[test]
    fn invalid_values_fall_through() {
        let s = settings(Some("app=loud"), Some("app=loud"));
        assert_eq!(s.filter(true).to_string(), "debug");
        assert_eq!(s.filter(false).to_string(), "warn");
        assert_eq!(settings(None, None).filter(false).to_string(), "warn");
    }

    #[test]
    fn json_target_splits_path() {
        let mut s = settings(None, None);
        assert_eq!(s.json_target(), None);
        s.json_path = Some(PathBuf::from("logs/run.jsonl"));
        assert_eq!(
            s.json_target(),
            Some((PathBuf::from("logs"), "run.jsonl".to_string()))
        );
        s.json_path = Some(PathBuf::from("run.jsonl"));
        assert_eq!(s.json_target(), Some((PathBuf::from("."), "run.jsonl".to_string())));
    }
}
