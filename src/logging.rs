//! Tracing subscriber set-up shared by every binary entry point.
//!
//! Filtering follows `RUST_LOG` (default `info`). Setting
//! `SCRUMBOARD_LOG_JSON=1` switches to one JSON object per line. Output
//! always goes to stderr so command output on stdout stays parseable.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_JSON_ENV: &str = "SCRUMBOARD_LOG_JSON";

/// Interpret a boolean-ish environment value.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" | "" => Some(false),
        _ => None,
    }
}

fn log_json_enabled() -> bool {
    std::env::var(LOG_JSON_ENV)
        .ok()
        .and_then(|v| parse_flag(&v))
        .unwrap_or(false)
}

/// Install the global subscriber. `default_level` applies when `RUST_LOG`
/// is unset or unparseable. Calling this twice is harmless.
pub fn init(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let result = if log_json_enabled() {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_flag_accepts_common_spellings() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("yes"), Some(true));
        assert_eq!(parse_flag("false"), Some(false));
        assert_eq!(parse_flag(""), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn init_twice_does_not_panic() {
        init("warn");
        init("debug");
    }
}
