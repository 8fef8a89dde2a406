use std::{
	net::{IpAddr, Ipv4Addr, SocketAddr},
	path::{Path, PathBuf},
	time::Duration,
};

pub const CONFIG_PATH: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("failed to access config file: {0}")]
	Io(#[from] std::io::Error),
	#[error("failed to parse config file: {0}")]
	Parse(#[from] toml::de::Error),
	#[error("failed to serialize config: {0}")]
	Serialize(#[from] toml::ser::Error),
	#[error("upload_delay_min_ms ({min}) is greater than upload_delay_max_ms ({max})")]
	DelayRange { min: u64, max: u64 },
}

/// Wrapper for [`tracing::Level`] which supports serde
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LogLevel {
	Trace,
	Debug,
	Info,
	Warn,
	Error,
}

impl From<LogLevel> for tracing::Level {
	fn from(value: LogLevel) -> Self {
		match value {
			LogLevel::Trace => tracing::Level::TRACE,
			LogLevel::Debug => tracing::Level::DEBUG,
			LogLevel::Info => tracing::Level::INFO,
			LogLevel::Warn => tracing::Level::WARN,
			LogLevel::Error => tracing::Level::ERROR,
		}
	}
}

/// PEM files for serving over https
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TlsConfig {
	pub cert: PathBuf,
	pub key: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
	pub log_level: LogLevel,
	pub log_file_root: PathBuf,
	pub web_root: PathBuf,
	pub host: IpAddr,
	pub port: u16,
	pub upload_delay_min_ms: u64,
	pub upload_delay_max_ms: u64,
	pub progress_tick_ms: u64,
	pub progress_finish_delay_ms: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tls: Option<TlsConfig>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			#[cfg(debug_assertions)]
			log_level: LogLevel::Trace,
			#[cfg(not(debug_assertions))]
			log_level: LogLevel::Info,
			log_file_root: PathBuf::from("./logs"),
			web_root: PathBuf::from("./static"),
			host: IpAddr::V4(Ipv4Addr::LOCALHOST),
			port: 3000,
			upload_delay_min_ms: 1000,
			upload_delay_max_ms: 3000,
			progress_tick_ms: 300,
			progress_finish_delay_ms: 500,
			tls: None,
		}
	}
}

impl Config {
	/// Loads the config from `path`.
	///
	/// If the file does not exist, the default config is written to it and returned.
	/// Creates the log directory either way.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();

		let config = if path.try_exists()? {
			let file_data = std::fs::read_to_string(path)?;
			toml::from_str::<Config>(&file_data)?
		} else {
			let config = Config::default();
			std::fs::write(path, toml::to_string(&config)?)?;
			config
		};

		config.validate()?;
		config.init_log_file_dir()?;

		Ok(config)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.upload_delay_min_ms > self.upload_delay_max_ms {
			return Err(ConfigError::DelayRange {
				min: self.upload_delay_min_ms,
				max: self.upload_delay_max_ms,
			});
		}
		Ok(())
	}

	pub fn init_log_file_dir(&self) -> std::io::Result<()> {
		std::fs::create_dir_all(&self.log_file_root)
	}

	pub fn socket_addr(&self) -> SocketAddr {
		SocketAddr::new(self.host, self.port)
	}

	pub fn upload_delay(&self) -> std::ops::RangeInclusive<Duration> {
		Duration::from_millis(self.upload_delay_min_ms)
			..=Duration::from_millis(self.upload_delay_max_ms)
	}

	pub fn progress_tick(&self) -> Duration {
		Duration::from_millis(self.progress_tick_ms)
	}

	pub fn progress_finish_delay(&self) -> Duration {
		Duration::from_millis(self.progress_finish_delay_ms)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn temp_path(name: &str) -> PathBuf {
		std::env::temp_dir().join(format!("multihost-{}-{name}", rand::random::<u32>()))
	}

	#[test]
	fn existing_file_is_loaded_and_log_dir_created() {
		let path = temp_path("config.toml");
		let mut expected = Config::default();
		expected.log_file_root = temp_path("logs");

		std::fs::write(&path, toml::to_string(&expected).unwrap()).unwrap();
		let loaded = Config::load(&path).unwrap();
		assert_eq!(loaded, expected);
		assert!(expected.log_file_root.is_dir());

		std::fs::remove_file(&path).unwrap();
		std::fs::remove_dir_all(&expected.log_file_root).unwrap();
	}

	#[test]
	fn partial_file_falls_back_to_defaults() {
		let config: Config = toml::from_str("port = 8080\nlog_level = \"Warn\"").unwrap();
		assert_eq!(config.port, 8080);
		assert_eq!(config.log_level, LogLevel::Warn);
		assert_eq!(config.upload_delay_min_ms, 1000);
		assert_eq!(config.upload_delay_max_ms, 3000);
		assert!(config.tls.is_none());
	}

	#[test]
	fn inverted_delay_range_is_rejected() {
		let config = Config {
			upload_delay_min_ms: 5000,
			upload_delay_max_ms: 10,
			..Config::default()
		};
		assert!(matches!(
			config.validate(),
			Err(ConfigError::DelayRange { min: 5000, max: 10 })
		));
	}

	#[test]
	fn tls_section_parses() {
		let config: Config =
			toml::from_str("[tls]\ncert = \"cert.pem\"\nkey = \"key.pem\"").unwrap();
		assert_eq!(
			config.tls,
			Some(TlsConfig { cert: "cert.pem".into(), key: "key.pem".into() })
		);
	}
}
