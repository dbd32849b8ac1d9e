//! Finding (or installing) a compatible `vhs` binary.
//!
//! Resolution order:
//! 1. `<install_location>/bin/vhs`, if an install location is configured
//! 2. every `vhs` on `PATH`, in `PATH` order
//! 3. the [`Installer`], if auto-install is enabled and one is provided
//!
//! The first candidate whose `--version` falls in `[min_version, max_version)`
//! wins.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::progress::InstallReporter;
use super::renderer::VhsRenderer;
use super::version::Version;
use crate::config::Config;
use crate::diagnostic::{RejectedCandidate, ResolutionError};

/// Name of the renderer binary.
#[cfg(not(windows))]
pub const PROGRAM_NAME: &str = "vhs";
/// Name of the renderer binary.
#[cfg(windows)]
pub const PROGRAM_NAME: &str = "vhs.exe";

/// Installs a renderer binary on demand.
pub trait Installer {
    /// Install a renderer under `location`, returning the path of the binary.
    fn install(&self, location: &Path, reporter: &dyn InstallReporter) -> Result<PathBuf, String>;
}

/// Inputs of [`resolve`].
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Inclusive lower version bound.
    pub min_version: Version,
    /// Exclusive upper version bound.
    pub max_version: Version,
    /// Working directory for renders.
    pub cwd: PathBuf,
    /// Whether the installer may be used.
    pub auto_install: bool,
    /// Where installed binaries live.
    pub install_location: Option<PathBuf>,
    /// Extra environment for renders.
    pub env: Vec<(String, String)>,
    /// Search path, `PATH` when `None`.
    pub search_path: Option<OsString>,
}

impl ResolveOptions {
    /// Options derived from the build configuration.
    ///
    /// `srcdir` is the working directory when the configuration has none.
    pub fn from_config(config: &Config, srcdir: &Path) -> Self {
        Self {
            min_version: config.min_version,
            max_version: config.max_version,
            cwd: config.cwd.clone().unwrap_or_else(|| srcdir.to_path_buf()),
            auto_install: config.auto_install,
            install_location: config.install_location.clone(),
            env: config.renderer_env(),
            search_path: None,
        }
    }

    fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(location) = &self.install_location {
            candidates.push(location.join("bin").join(PROGRAM_NAME));
        }
        let search_path = self.search_path.clone().or_else(|| env::var_os("PATH"));
        if let Some(search_path) = search_path {
            for dir in env::split_paths(&search_path) {
                let candidate = dir.join(PROGRAM_NAME);
                if candidate.is_file() && !candidates.contains(&candidate) {
                    candidates.push(candidate);
                }
            }
        }
        candidates
    }
}

/// Find a renderer satisfying `options`.
pub fn resolve(
    options: &ResolveOptions,
    installer: Option<&dyn Installer>,
    reporter: &dyn InstallReporter,
) -> Result<VhsRenderer, ResolutionError> {
    let mut rejected = Vec::new();

    for candidate in options.candidates() {
        match check_candidate(&candidate, options) {
            Ok(version) => return Ok(finish(candidate, version, options)),
            Err(reason) => rejected.push(RejectedCandidate {
                program: candidate,
                reason,
            }),
        }
    }

    let mut install_error = None;
    match (options.auto_install, installer, &options.install_location) {
        (true, Some(installer), Some(location)) => {
            tracing::info!(location = %location.display(), "installing vhs");
            match installer.install(location, reporter) {
                Ok(program) => match check_candidate(&program, options) {
                    Ok(version) => return Ok(finish(program, version, options)),
                    Err(reason) => install_error = Some(format!("{}: {reason}", program.display())),
                },
                Err(e) => install_error = Some(e),
            }
        }
        (true, Some(_), None) => {
            install_error = Some("no install location configured".to_owned());
        }
        _ => {}
    }

    Err(ResolutionError {
        min_version: options.min_version.to_string(),
        max_version: options.max_version.to_string(),
        rejected,
        install_error,
    })
}

fn finish(program: PathBuf, version: Version, options: &ResolveOptions) -> VhsRenderer {
    tracing::debug!(program = %program.display(), %version, "using vhs");
    VhsRenderer::new(program, version)
        .with_cwd(&options.cwd)
        .with_env(options.env.iter().cloned())
}

fn check_candidate(program: &Path, options: &ResolveOptions) -> Result<Version, String> {
    let version = probe_version(program)?;
    if version.within(&options.min_version, &options.max_version) {
        Ok(version)
    } else {
        Err(format!("version {version} is out of range"))
    }
}

fn probe_version(program: &Path) -> Result<Version, String> {
    let output = Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .map_err(|e| format!("cannot run: {e}"))?;
    if !output.status.success() {
        return Err(format!("`--version` failed ({})", output.status));
    }
    let text = String::from_utf8_lossy(&output.stdout);
    Version::extract(&text).ok_or_else(|| format!("unrecognized version output {:?}", text.trim()))
}
