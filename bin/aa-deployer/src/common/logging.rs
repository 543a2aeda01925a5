//! Logging configuration for the aa-deployer CLI tool.
//!
//! Provides CLI arguments for configuring tracing output:
//! - Verbosity levels via `-v/-vv/-vvv` flags
//! - Custom log filters via `RUST_LOG` environment variable
//! - Log file output via `--log.file` flag

use std::path::PathBuf;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use super::{DeployerError, Result};

/// Logging configuration arguments.
#[derive(Debug, Clone, Default, Parser)]
pub struct LogArgs {
    /// Increase logging verbosity (-v = error, -vv = warn, -vvv = info, -vvvv = debug, -vvvvv =
    /// trace)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log file path. If specified, logs are written to this file instead of stderr.
    #[arg(long = "log.file", visible_aliases = ["log-file"], global = true)]
    pub log_file: Option<PathBuf>,

    /// Disable colorful console logging. Only applies when logging to stderr (no --log.file).
    #[arg(long = "log.no-color", visible_aliases = ["log-no-color"], global = true)]
    pub log_no_color: bool,
}

impl LogArgs {
    /// Returns the log filter directives, or `None` if `RUST_LOG` should be used.
    ///
    /// Without `-v` flags and without `RUST_LOG` logging is off.
    pub fn directives(&self) -> Option<String> {
        self.directives_with(std::env::var("RUST_LOG").ok().as_deref())
    }

    fn directives_with(&self, rust_log: Option<&str>) -> Option<String> {
        if rust_log.is_some() {
            return None;
        }
        let level = match self.verbose {
            0 => return Some("off".to_string()),
            1 => Level::ERROR,
            2 => Level::WARN,
            3 => Level::INFO,
            4 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Some(format!("aa_deployer={level},aa_deploy={level}"))
    }

    /// Initialize the tracing subscriber based on the logging configuration.
    ///
    /// Log target is only shown for DEBUG level and above.
    pub fn init(&self) -> Result<()> {
        let filter = match self.directives() {
            Some(directives) => EnvFilter::new(directives),
            None => EnvFilter::from_default_env(),
        };
        let show_target = self.verbose >= 4;

        if let Some(ref log_file) = self.log_file {
            let file = std::fs::File::create(log_file).map_err(|e| {
                DeployerError::InvalidInput(format!(
                    "Failed to create log file {}: {e}",
                    log_file.display()
                ))
            })?;
            fmt()
                .with_env_filter(filter)
                .with_target(show_target)
                .with_writer(file)
                .with_ansi(false)
                .init();
        } else {
            fmt()
                .with_env_filter(filter)
                .with_target(show_target)
                .with_writer(std::io::stderr)
                .with_ansi(!self.log_no_color)
                .init();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::quiet(0, "off")]
    #[case::error(1, "aa_deployer=ERROR,aa_deploy=ERROR")]
    #[case::warn(2, "aa_deployer=WARN,aa_deploy=WARN")]
    #[case::info(3, "aa_deployer=INFO,aa_deploy=INFO")]
    #[case::debug(4, "aa_deployer=DEBUG,aa_deploy=DEBUG")]
    #[case::trace(5, "aa_deployer=TRACE,aa_deploy=TRACE")]
    #[case::beyond_trace(9, "aa_deployer=TRACE,aa_deploy=TRACE")]
    fn test_verbosity(#[case] verbose: u8, #[case] expected: &str) {
        let args = LogArgs { verbose, ..Default::default() };
        assert_eq!(args.directives_with(None).as_deref(), Some(expected));
    }

    #[test]
    fn test_rust_log_overrides_verbosity() {
        let args = LogArgs { verbose: 3, ..Default::default() };
        assert_eq!(args.directives_with(Some("aa_deploy=trace")), None);
        assert_eq!(LogArgs::default().directives_with(Some("")), None);
    }
}
