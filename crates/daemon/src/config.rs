//! Configuration file parsing (§4.13, §6 "Server CLI").
//!
//! Format: `key=value`, `#` comments, whitespace trimmed (grounded on
//! `server/config.cpp`'s `parse_config`). Unknown keys are logged and
//! ignored rather than silently dropped, since ambient diagnostics are
//! always carried even where the original stays silent.

use std::path::PathBuf;

use thiserror::Error;

/// Default listen port (`LISTEN_PORT` in the original).
pub const DEFAULT_PORT: u16 = 10000;
/// Default maximum simultaneous connections.
pub const DEFAULT_MAXCONNS: u32 = 1024;
/// Default worker pool size.
pub const DEFAULT_THREADS: usize = 4;
/// Default fairness budget per connection wakeup.
pub const DEFAULT_REQS_PER_EVENT: u32 = 20;
/// Default TCP listen backlog.
pub const DEFAULT_BACKLOG: i32 = 1024;
/// Default `get_children` descent bound.
pub const DEFAULT_MAX_DEPTH: usize = 1024;
/// Default HTTP admin poll/reload timeout, in seconds.
pub const DEFAULT_MONITOR_TIMEOUT: u64 = 10;

/// Parsed daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// User to drop privileges to after binding, if started as root.
    pub username: Option<String>,
    /// Pidfile path.
    pub pidfile: Option<PathBuf>,
    /// Unix domain socket path, in addition to (or instead of) TCP.
    pub unixpath: Option<PathBuf>,
    /// TCP listen port.
    pub port: u16,
    /// Log verbosity repeat-count, fed to [`logging::init`].
    pub verbose: u8,
    /// Maximum simultaneous connections.
    pub maxconns: u32,
    /// Worker pool size.
    pub threads: usize,
    /// TCP listen backlog.
    pub backlog: i32,
    /// Fairness budget per connection wakeup.
    pub reqs_per_event: u32,
    /// Han→Pinyin dictionary path (required).
    pub chinese_map_file: Option<PathBuf>,
    /// Trie blob path (required).
    pub index_file: Option<PathBuf>,
    /// `get_children` descent bound.
    pub max_depth: usize,
    /// Log output file; absent means stderr.
    pub log_path: Option<PathBuf>,
    /// Log level name, currently only used to widen `verbose` (§4.15).
    pub log_level: Option<String>,
    /// HTTP admin port; `None` disables the admin surface.
    pub monitor_port: Option<u16>,
    /// HTTP admin request timeout, in seconds.
    pub monitor_timeout: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: None,
            pidfile: None,
            unixpath: None,
            port: DEFAULT_PORT,
            verbose: 0,
            maxconns: DEFAULT_MAXCONNS,
            threads: DEFAULT_THREADS,
            backlog: DEFAULT_BACKLOG,
            reqs_per_event: DEFAULT_REQS_PER_EVENT,
            chinese_map_file: None,
            index_file: None,
            max_depth: DEFAULT_MAX_DEPTH,
            log_path: None,
            log_level: None,
            monitor_port: None,
            monitor_timeout: DEFAULT_MONITOR_TIMEOUT,
        }
    }
}

/// Errors from loading or validating a [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// The path that failed to read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A required key was missing after parsing.
    #[error("missing required config key {key}")]
    MissingKey {
        /// The missing key's name.
        key: &'static str,
    },
}

impl Config {
    /// Parses a configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    /// Parses configuration text directly (split out from [`Config::load`]
    /// so tests don't need a filesystem round trip).
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut config = Self::default();
        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                tracing::warn!(line = raw_line, "ignoring malformed config line");
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            config.apply(key, value);
        }
        config
    }

    fn apply(&mut self, key: &str, value: &str) {
        match key {
            "username" => self.username = Some(value.to_owned()),
            "pidfile" => self.pidfile = Some(PathBuf::from(value)),
            "unixpath" => self.unixpath = Some(PathBuf::from(value)),
            "port" => self.port = parse_or_warn(key, value, self.port),
            "verbose" => self.verbose = parse_or_warn(key, value, self.verbose),
            "maxconn" => self.maxconns = parse_or_warn(key, value, self.maxconns),
            "threads" => self.threads = parse_or_warn(key, value, self.threads),
            "backlog" => self.backlog = parse_or_warn(key, value, self.backlog),
            "max_requests" => self.reqs_per_event = parse_or_warn(key, value, self.reqs_per_event),
            "chinese_map_file" => self.chinese_map_file = Some(PathBuf::from(value)),
            "index_file" => self.index_file = Some(PathBuf::from(value)),
            "max_depth" => self.max_depth = parse_or_warn(key, value, self.max_depth),
            "log_path" => self.log_path = Some(PathBuf::from(value)),
            "log_level" => self.log_level = Some(value.to_owned()),
            "monitor_port" => self.monitor_port = value.parse().ok(),
            "monitor_timeout" => self.monitor_timeout = parse_or_warn(key, value, self.monitor_timeout),
            other => tracing::warn!(key = other, "ignoring unknown config key"),
        }
    }

    /// Validates that the paths required to serve queries are present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] for the first missing required
    /// key (`chinese_map_file` or `index_file`).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chinese_map_file.is_none() {
            return Err(ConfigError::MissingKey { key: "chinese_map_file" });
        }
        if self.index_file.is_none() {
            return Err(ConfigError::MissingKey { key: "index_file" });
        }
        Ok(())
    }
}

fn parse_or_warn<T: std::str::FromStr>(key: &str, value: &str, default: T) -> T {
    value.parse().unwrap_or_else(|_| {
        tracing::warn!(key, value, "ignoring unparseable config value");
        default
    })
}
