use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;

const LOG_FILE_PREFIX: &str = "multihost.log";

/// Installs the global subscriber: stdout plus a daily log file in `log_file_root`.
///
/// `RUST_LOG` overrides the configured level.
/// The returned guard flushes the file writer when dropped, keep it alive in main.
pub fn init(config: &Config) -> Result<WorkerGuard, tracing_subscriber::util::TryInitError> {
	let level: tracing::Level = config.log_level.into();
	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

	let file_appender = tracing_appender::rolling::daily(&config.log_file_root, LOG_FILE_PREFIX);
	let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

	tracing_subscriber::registry()
		.with(env_filter)
		.with(fmt::layer().with_target(false))
		.with(fmt::layer().with_ansi(false).with_writer(file_writer))
		.try_init()?;

	Ok(guard)
}

/// Our own crate at the configured level, dependencies one notch quieter.
fn default_directives(level: tracing::Level) -> String {
	let level = level.as_str().to_ascii_lowercase();
	format!("warn,multihost={level},tower_http={level}")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn directives_use_configured_level() {
		assert_eq!(
			default_directives(tracing::Level::DEBUG),
			"warn,multihost=debug,tower_http=debug"
		);
		assert!(EnvFilter::try_new(default_directives(tracing::Level::INFO)).is_ok());
	}
}
