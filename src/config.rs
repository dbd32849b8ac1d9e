//! Configuration for tape-batch.
//!
//! Use [`ConfigBuilder`] to override the defaults, which match the options a
//! documentation build exposes to its users.

use std::env;
use std::path::PathBuf;

use chrono::TimeDelta;

use crate::render::Version;

/// Environment variable set on hosted documentation builders.
pub const READTHEDOCS_VAR: &str = "READTHEDOCS";

/// Name of the cache directory under the host's doctree directory.
pub const DEFAULT_CACHE_DIR_NAME: &str = "vhs_tapes_cache";

/// Runtime configuration of a build.
#[derive(Debug, Clone)]
pub struct Config {
    /// Inclusive lower bound for the renderer version.
    pub min_version: Version,
    /// Exclusive upper bound for the renderer version.
    pub max_version: Version,
    /// Directory `Source` paths and renders are resolved against.
    /// Defaults to the documentation source directory.
    pub cwd: Option<PathBuf>,
    /// Whether a missing renderer may be installed.
    pub auto_install: bool,
    /// Where installed renderers live (`<location>/bin/vhs`).
    pub install_location: Option<PathBuf>,
    /// How long an unreferenced cache entry survives.
    pub retention: TimeDelta,
    /// Number of render workers.
    pub parallel: usize,
    /// 0 keeps one rewriting progress line; higher logs each tape.
    pub verbosity: u8,
    /// Cache root name under the doctree directory.
    pub cache_dir_name: String,
    /// Extra environment for renderer processes.
    pub extra_env: Vec<(String, String)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_version: Version::new(0, 5, 0),
            max_version: Version::new(2, 0, 0),
            cwd: None,
            auto_install: true,
            install_location: None,
            retention: TimeDelta::days(1),
            parallel: 1,
            verbosity: 0,
            cache_dir_name: DEFAULT_CACHE_DIR_NAME.to_owned(),
            extra_env: Vec::new(),
        }
    }
}

impl Config {
    /// Environment passed to every renderer process.
    ///
    /// Adds `VHS_NO_SANDBOX=true` on hosted builders, where the headless
    /// browser cannot use its sandbox.
    pub fn renderer_env(&self) -> Vec<(String, String)> {
        self.renderer_env_with(env::var_os(READTHEDOCS_VAR).is_some())
    }

    fn renderer_env_with(&self, hosted: bool) -> Vec<(String, String)> {
        let mut vars = self.extra_env.clone();
        if hosted && !vars.iter().any(|(k, _)| k == "VHS_NO_SANDBOX") {
            vars.push(("VHS_NO_SANDBOX".to_owned(), "true".to_owned()));
        }
        vars
    }
}

/// Configuration builder for fluent API.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    min_version: Option<Version>,
    max_version: Option<Version>,
    cwd: Option<PathBuf>,
    auto_install: Option<bool>,
    install_location: Option<PathBuf>,
    retention: Option<TimeDelta>,
    parallel: Option<usize>,
    verbosity: Option<u8>,
    cache_dir_name: Option<String>,
    extra_env: Vec<(String, String)>,
}

impl ConfigBuilder {
    /// Create a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepted renderer versions, `min` inclusive and `max` exclusive.
    ///
    /// Default: `0.5.0 .. 2.0.0`
    ///
    /// # Example
    ///
    /// ```
    /// use tape_batch::config::ConfigBuilder;
    /// use tape_batch::render::Version;
    ///
    /// let config = ConfigBuilder::new()
    ///     .versions(Version::new(0, 7, 0), Version::new(1, 0, 0))
    ///     .build();
    /// assert_eq!(config.min_version.to_string(), "0.7.0");
    /// ```
    pub fn versions(mut self, min: Version, max: Version) -> Self {
        self.min_version = Some(min);
        self.max_version = Some(max);
        self
    }

    /// Working directory for `Source` paths and the renderer.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Allow or forbid installing a renderer.
    pub fn auto_install(mut self, enabled: bool) -> Self {
        self.auto_install = Some(enabled);
        self
    }

    /// Install location for renderer binaries.
    pub fn install_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.install_location = Some(location.into());
        self
    }

    /// Retention window for unreferenced cache entries.
    ///
    /// Default: 1 day. Zero evicts unreferenced entries on the next build.
    pub fn retention(mut self, retention: TimeDelta) -> Self {
        self.retention = Some(retention);
        self
    }

    /// Number of render workers.
    pub fn parallel(mut self, workers: usize) -> Self {
        self.parallel = Some(workers);
        self
    }

    /// Progress verbosity.
    pub fn verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = Some(verbosity);
        self
    }

    /// Cache root name under the doctree directory.
    pub fn cache_dir_name(mut self, name: impl Into<String>) -> Self {
        self.cache_dir_name = Some(name.into());
        self
    }

    /// Add an environment variable for renderer processes.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_env.push((key.into(), value.into()));
        self
    }

    /// Build the configuration, filling unset fields with defaults.
    pub fn build(self) -> Config {
        let defaults = Config::default();
        Config {
            min_version: self.min_version.unwrap_or(defaults.min_version),
            max_version: self.max_version.unwrap_or(defaults.max_version),
            cwd: self.cwd,
            auto_install: self.auto_install.unwrap_or(defaults.auto_install),
            install_location: self.install_location,
            retention: self.retention.unwrap_or(defaults.retention),
            parallel: self.parallel.unwrap_or(defaults.parallel),
            verbosity: self.verbosity.unwrap_or(defaults.verbosity),
            cache_dir_name: self.cache_dir_name.unwrap_or(defaults.cache_dir_name),
            extra_env: self.extra_env,
        }
    }
}
