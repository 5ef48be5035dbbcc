//! Process-wide logging setup.
//!
//! stdout carries the enhanced prompt, so console logs always go to stderr. Every
//! line logged while a request is in flight sits inside an `enhance{run_id=..}` span.
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: OnceCell<()> = OnceCell::new();

const KEY_ENABLED: &str = "YOUWEN_OBSERVABILITY";
const KEY_LEVEL: &str = "YOUWEN_LOG_LEVEL";
const KEY_JSON_PATH: &str = "YOUWEN_JSON_LOG_PATH";
const DEFAULT_FILTER: &str = "warn";
const DEFAULT_LOG_FILE: &str = "youwen.logs.jsonl";

/// Where log lines are written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogSink {
    Stderr,
    /// JSON lines appended to this file.
    JsonFile(PathBuf),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogSettings {
    pub enabled: bool,
    /// Explicit filter directive; `RUST_LOG` then `warn` apply when absent.
    pub filter: Option<String>,
    pub sink: LogSink,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = lookup(KEY_ENABLED)
            .and_then(|v| parse_bool(&v))
            .unwrap_or(true);
        let filter = lookup(KEY_LEVEL).filter(|v| !v.trim().is_empty());
        let sink = match lookup(KEY_JSON_PATH).filter(|v| !v.trim().is_empty()) {
            Some(path) => LogSink::JsonFile(PathBuf::from(path)),
            None => LogSink::Stderr,
        };
        Self {
            enabled,
            filter,
            sink,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        if let Some(directive) = &self.filter
            && let Ok(filter) = EnvFilter::try_new(directive)
        {
            return filter;
        }
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

/// JSON layer that records the enclosing run span on every line.
fn json_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_target(false)
        .with_writer(writer)
}

fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE)
        .to_string();
    (dir, file_name)
}

/// Initialize logging once per process from the environment.
///
/// - `YOUWEN_OBSERVABILITY`: enable/disable flag (default enabled).
/// - `YOUWEN_LOG_LEVEL`: filter directive (`info`, `youwen_stream=debug`, ...).
/// - `YOUWEN_JSON_LOG_PATH`: write JSON lines to this file instead of stderr.
/// - `RUST_LOG`: fallback filter.
pub fn init_observability() {
    INIT.get_or_init(|| init_with(&LogSettings::from_env()));
}

fn init_with(settings: &LogSettings) {
    if !settings.enabled {
        return;
    }
    let env_filter = settings.env_filter();
    match &settings.sink {
        LogSink::JsonFile(path) => {
            let (dir, file_name) = split_log_path(path);
            let _ = std::fs::create_dir_all(&dir);
            let writer = tracing_appender::rolling::never(dir, file_name);
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(json_layer(writer))
                .try_init();
        }
        LogSink::Stderr => {
            let console = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr);
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(console)
                .try_init();
        }
    }
}
