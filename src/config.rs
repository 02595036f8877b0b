//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use directories::ProjectDirs;

/// Database file name inside the application data directory
pub const DATABASE_FILE: &str = "DB.sqlite";

/// Path value that opens an ephemeral database
pub const IN_MEMORY_DATABASE: &str = ":memory:";

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "showtrak-timers")]
#[command(about = "Live show timers with OSC remote control and a web dashboard")]
#[command(version)]
pub struct Config {
    /// Port the control API binds to
    #[arg(short, long, default_value = "3001")]
    pub port: u16,

    /// Host address the control API binds to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// SQLite database path, or `:memory:` for an ephemeral store
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Interval between two timer ticks, in milliseconds
    #[arg(long, default_value = "300", value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_interval_ms: u64,

    /// Minimum spacing between two updates sent to a viewer, in milliseconds
    #[arg(long, default_value = "400")]
    pub emit_interval_ms: u64,

    /// Do not advance timers automatically
    #[arg(long)]
    pub no_tick: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn emit_interval(&self) -> Duration {
        Duration::from_millis(self.emit_interval_ms)
    }

    /// Database location: the `--database` flag, else `DB.sqlite` in the
    /// platform data directory. `None` when no home directory is known.
    pub fn database_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.database {
            return Some(path.clone());
        }
        ProjectDirs::from("com", "ShowTrak", "ShowTrak Timers")
            .map(|dirs| dirs.data_dir().join(DATABASE_FILE))
    }

    pub fn is_in_memory(&self) -> bool {
        self.database
            .as_deref()
            .is_some_and(|path| path.as_os_str() == IN_MEMORY_DATABASE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::try_parse_from(["showtrak-timers"]).unwrap();
        assert_eq!(config.address(), "127.0.0.1:3001");
        assert_eq!(config.tick_interval_ms, 300);
        assert_eq!(config.emit_interval(), Duration::from_millis(400));
        assert_eq!(config.log_level(), "info");
        assert!(!config.no_tick);
        assert!(!config.is_in_memory());
    }

    #[test]
    fn explicit_database_wins() {
        let config =
            Config::try_parse_from(["showtrak-timers", "--database", ":memory:", "-v"]).unwrap();
        assert!(config.is_in_memory());
        assert_eq!(config.database_path(), Some(PathBuf::from(":memory:")));
        assert_eq!(config.log_level(), "debug");
    }

    #[test]
    fn zero_tick_interval_is_rejected() {
        assert!(Config::try_parse_from(["showtrak-timers", "--tick-interval-ms", "0"]).is_err());
    }
}
