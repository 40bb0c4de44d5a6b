//! Process-wide `tracing` subscriber setup.

use anyhow::Context as _;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Output format of the process log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Builds the filter: `RUST_LOG` when set, otherwise `default_filter`.
///
/// # Errors
///
/// Returns an error if the chosen directive (`RUST_LOG` or `default_filter`)
/// is not a valid filter.
pub fn build_filter(default_filter: &str) -> anyhow::Result<EnvFilter> {
    let from_env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    filter_from(from_env.as_deref(), default_filter)
}

fn filter_from(from_env: Option<&str>, default_filter: &str) -> anyhow::Result<EnvFilter> {
    let directives = from_env.unwrap_or(default_filter);
    EnvFilter::try_new(directives)
        .with_context(|| format!("invalid log filter {directives:?}"))
}

/// Installs the global subscriber.
///
/// Request records from `reqscope_core::TracingSink` arrive as events on the
/// `reqscope::request` target carrying `request_id` and `record` fields.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a global subscriber is
/// already installed.
pub fn init_tracing(format: LogFormat, default_filter: &str) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry().with(build_filter(default_filter)?);

    match format {
        LogFormat::Pretty => registry.with(fmt::layer()).try_init()?,
        LogFormat::Json => registry.with(fmt::layer().json()).try_init()?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_format_is_pretty() {
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
    }

    #[test]
    fn default_directives_apply_when_env_unset() {
        let filter = filter_from(None, "info,reqscope::request=debug").unwrap();
        assert!(filter
            .to_string()
            .to_lowercase()
            .contains("reqscope::request=debug"));
    }

    #[test]
    fn env_directives_take_precedence() {
        let filter = filter_from(Some("warn"), "info").unwrap();
        assert_eq!(filter.to_string().to_lowercase(), "warn");
    }

    #[test]
    fn malformed_env_directive_is_an_error() {
        let err = filter_from(Some("reqscope=loudest"), "info").unwrap_err();
        assert!(err.to_string().contains("reqscope=loudest"));
    }
}
