//! Process-wide logging setup.
//!
//! `RUST_LOG` selects what is emitted (default `info`); `LOG_FORMAT` selects
//! how: `json` (default) or `text` for local development.

use std::str::FromStr;

use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" | "pretty" => Ok(LogFormat::Text),
            other => Err(format!("unknown LOG_FORMAT '{other}' (expected json or text)")),
        }
    }
}

/// Install the global subscriber using `RUST_LOG` and `LOG_FORMAT`.
///
/// Safe to call multiple times; only the first call installs anything.
pub fn init() {
    let format = std::env::var("LOG_FORMAT")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_default();
    init_with(format);
}

pub fn init_with(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(true)
            .with_target(false)
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .try_init(),
    };

    if installed.is_ok() {
        tracing::debug!(?format, "logging initialized");
    }
}
