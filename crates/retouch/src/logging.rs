//! Logging setup for the `retouch` binary.
//!
//! The library only emits `tracing` events; this module decides where they
//! go and in which shape (human-readable or JSON).

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
///
/// Logs always go to stderr so that reports written to stdout stay
/// parseable. `RUST_LOG`, when set, wins over `level`.
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json_format {
        // JSON format for machine parsing
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        // Pretty format for humans
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the `[logging]` section of the config file.
///
/// The command-line flags only ever raise verbosity or switch to JSON.
pub fn init_from_config(
    config: &retouch_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) {
    let level = effective_level(&config.logging.level, verbose_override);
    let json_format = json_logs_override || config.logging.format == "json";
    init(level, json_format);
}

/// `--verbose` lifts anything quieter than debug up to debug.
fn effective_level(configured: &str, verbose: bool) -> &str {
    match configured {
        "trace" | "debug" => configured,
        _ if verbose => "debug",
        "error" | "warn" | "info" => configured,
        _ => "info",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_level() {
        assert_eq!(effective_level("info", false), "info");
        assert_eq!(effective_level("warn", false), "warn");
        assert_eq!(effective_level("warn", true), "debug");
        assert_eq!(effective_level("trace", true), "trace");
        assert_eq!(effective_level("loud", false), "info");
    }
}
