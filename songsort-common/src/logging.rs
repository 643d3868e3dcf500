//! Tracing subscriber bootstrap
//!
//! All diagnostics go to stderr so stdout stays free for summaries.
//! Filter precedence: `RUST_LOG`, then `-v` flags, then the configured level.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{Error, Result};

/// Targets raised by `-v`; dependencies stay at `info`
const OWN_CRATES: &[&str] = &["songsort_common", "songsort_recognize", "songsort_organize"];

/// Directive used when `RUST_LOG` is unset
pub fn filter_directive(verbose: u8, configured_level: &str) -> String {
    let own_level = match verbose {
        0 => {
            let level = configured_level.trim();
            return if level.is_empty() {
                "info".to_string()
            } else {
                level.to_string()
            };
        }
        1 => "debug",
        _ => "trace",
    };
    let mut directives: Vec<String> = OWN_CRATES
        .iter()
        .map(|krate| format!("{krate}={own_level}"))
        .collect();
    directives.push("info".to_string());
    directives.join(",")
}

/// Install the global subscriber
pub fn init_tracing(verbose: u8, configured_level: &str) -> Result<()> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(value) if !value.trim().is_empty() => EnvFilter::try_new(value),
        _ => EnvFilter::try_new(filter_directive(verbose, configured_level)),
    }
    .map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to install tracing subscriber: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_overrides_configured_level() {
        assert_eq!(filter_directive(0, "warn"), "warn");
        assert_eq!(
            filter_directive(1, "warn"),
            "songsort_common=debug,songsort_recognize=debug,songsort_organize=debug,info"
        );
        assert_eq!(
            filter_directive(3, "warn"),
            "songsort_common=trace,songsort_recognize=trace,songsort_organize=trace,info"
        );
    }

    #[test]
    fn test_verbose_directives_parse() {
        for verbose in 0..3 {
            assert!(EnvFilter::try_new(filter_directive(verbose, "info")).is_ok());
        }
    }

    #[test]
    fn test_blank_level_defaults_to_info() {
        assert_eq!(filter_directive(0, "  "), "info");
    }
}
