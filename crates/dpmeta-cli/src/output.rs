use std::io;
use std::sync::OnceLock;

use serde::Serialize;
use tracing_subscriber::EnvFilter;

static JSON_MODE: OnceLock<bool> = OnceLock::new();

/// Select the output mode and install the log subscriber. Logs go to stderr;
/// `RUST_LOG` overrides the default `info` level.
pub fn init(json: bool) {
    let _ = JSON_MODE.set(json);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

pub fn is_json() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

/// Print a command result: pretty JSON in JSON mode, `summary` otherwise.
pub fn print<T: Serialize>(value: &T, summary: &str) -> anyhow::Result<()> {
    if is_json() {
        let s = serde_json::to_string_pretty(value)?;
        println!("{s}");
        return Ok(());
    }
    println!("{summary}");
    Ok(())
}
