use std::str::FromStr;

use anyhow::{anyhow, Context};
use clap::ValueEnum;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Dependencies such as sqlx only log at this level unless `RUST_LOG` says otherwise
const DEPENDENCY_LEVEL: &str = "warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One line per event
    Compact,
    /// Multi-line events with span context
    Pretty,
}

/// Filter giving the pipeline crates `level` and everything else [`DEPENDENCY_LEVEL`]
fn pipeline_filter(level: &str) -> anyhow::Result<EnvFilter> {
    let level = Level::from_str(level.trim())
        .map_err(|_| anyhow!("unknown log level '{}' (error, warn, info, debug, trace)", level))?;
    let directives = format!(
        "{},assessment_etl={level},assessment_storage={level}",
        DEPENDENCY_LEVEL,
        level = level.as_str().to_ascii_lowercase()
    );
    EnvFilter::try_new(&directives).context("building log filter")
}

/// Install the stderr subscriber
///
/// A set `RUST_LOG` replaces the `--log-level` directives entirely.
pub fn init(level: &str, format: LogFormat) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => pipeline_filter(level)?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = match format {
        LogFormat::Compact => builder.compact().with_target(false).try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
    installed.map_err(|e| anyhow!("installing log subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_scoped_to_pipeline_crates() {
        let filter = pipeline_filter("DEBUG").unwrap().to_string();
        assert!(filter.contains("assessment_etl=debug"));
        assert!(filter.contains("assessment_storage=debug"));
        assert!(filter.split(',').any(|d| d == "warn"));
    }

    #[test]
    fn test_unknown_level_rejected() {
        let err = pipeline_filter("chatty").unwrap_err();
        assert!(err.to_string().contains("chatty"));
    }
}
