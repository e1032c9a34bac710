use ash::vk;
use simplelog::LevelFilter;
use std::{env, str::FromStr};

const LOG_VAR: &str = "VK_SANDBOX_LOG";

pub struct Config {
	pub log_level: LevelFilter,
	/// Set when the log level variable held something that isn't a level, so it can be reported once logging is up.
	pub rejected_log_level: Option<String>,
	pub app_name: &'static str,
	pub app_version: u32,
}
impl Config {
	pub fn from_env() -> Self {
		Self::with_log_level(env::var(LOG_VAR).ok().as_deref())
	}

	/// `log_level` is the raw value of the log level variable, if it was set.
	fn with_log_level(log_level: Option<&str>) -> Self {
		let (log_level, rejected_log_level) = match log_level {
			Some(level) => match LevelFilter::from_str(level) {
				Ok(level) => (level, None),
				Err(_) => (default_log_level(), Some(level.to_owned())),
			},
			None => (default_log_level(), None),
		};

		Self {
			log_level,
			rejected_log_level,
			app_name: env!("CARGO_PKG_NAME"),
			app_version: vk::make_api_version(
				0,
				env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0),
				env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0),
				env!("CARGO_PKG_VERSION_PATCH").parse().unwrap_or(0),
			),
		}
	}
}

fn default_log_level() -> LevelFilter {
	if cfg!(debug_assertions) {
		LevelFilter::Info
	} else {
		LevelFilter::Warn
	}
}
