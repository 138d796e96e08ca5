// SPDX-License-Identifier: Apache-2.0

use bijux_churn_core::ENV_BIJUX_LOG_LEVEL;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct LogFlags {
    pub quiet: bool,
    pub verbose: u8,
    pub trace: bool,
    pub json: bool,
}

impl LogFlags {
    fn default_directive(self) -> &'static str {
        if self.trace || self.verbose >= 2 {
            "trace"
        } else if self.verbose == 1 {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        }
    }
}

/// `BIJUX_LOG_LEVEL` beats `RUST_LOG`; the flags only move the default.
pub(crate) fn filter_directive(flags: LogFlags) -> String {
    [ENV_BIJUX_LOG_LEVEL, "RUST_LOG"]
        .into_iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| flags.default_directive().to_string())
}

/// Logs go to stderr so stdout carries only command payloads.
pub(crate) fn init_tracing(flags: LogFlags) {
    let filter = EnvFilter::try_new(filter_directive(flags))
        .unwrap_or_else(|_| EnvFilter::new(flags.default_directive()));
    let result = if flags.json {
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
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::LogFlags;

    #[test]
    fn flags_move_the_default_level() {
        assert_eq!(LogFlags::default().default_directive(), "info");
        let quiet = LogFlags {
            quiet: true,
            ..LogFlags::default()
        };
        assert_eq!(quiet.default_directive(), "error");
        let verbose = LogFlags {
            quiet: true,
            verbose: 1,
            ..LogFlags::default()
        };
        assert_eq!(verbose.default_directive(), "debug");
        let trace = LogFlags {
            trace: true,
            ..LogFlags::default()
        };
        assert_eq!(trace.default_directive(), "trace");
    }
}
