//! The renderer interface and its process-backed implementation.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use super::version::Version;
use crate::diagnostic::RenderError;

/// Turns a tape file into an image.
///
/// Called concurrently from scheduler workers, each time with a distinct
/// output path.
pub trait Renderer: Send + Sync {
    /// Render `tape` into `output`.
    fn render(&self, tape: &Path, output: &Path) -> Result<(), RenderError>;
}

impl<R: Renderer + ?Sized> Renderer for &R {
    fn render(&self, tape: &Path, output: &Path) -> Result<(), RenderError> {
        (**self).render(tape, output)
    }
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn render(&self, tape: &Path, output: &Path) -> Result<(), RenderError> {
        (**self).render(tape, output)
    }
}

impl<R: Renderer + ?Sized> Renderer for Arc<R> {
    fn render(&self, tape: &Path, output: &Path) -> Result<(), RenderError> {
        (**self).render(tape, output)
    }
}

/// A resolved `vhs` binary.
#[derive(Debug, Clone)]
pub struct VhsRenderer {
    program: PathBuf,
    version: Version,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
}

impl VhsRenderer {
    /// Wrap a binary already known to have `version`.
    pub fn new(program: impl Into<PathBuf>, version: Version) -> Self {
        Self {
            program: program.into(),
            version,
            cwd: None,
            env: Vec::new(),
        }
    }

    /// Run the renderer in `cwd`, so relative paths inside tapes resolve there.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Add environment variables for every render.
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Path of the binary.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Version reported by the binary.
    pub fn version(&self) -> Version {
        self.version
    }
}

impl Renderer for VhsRenderer {
    fn render(&self, tape: &Path, output: &Path) -> Result<(), RenderError> {
        // The child runs in `cwd`; relative paths must keep meaning ours.
        let mut cmd = Command::new(&self.program);
        cmd.arg(anchored(tape))
            .arg("-o")
            .arg(anchored(output))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .envs(self.env.iter().map(|(k, v)| (k, v)));
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        let result = cmd.output().map_err(|source| RenderError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if result.status.success() {
            return Ok(());
        }

        let mut captured = String::from_utf8_lossy(&result.stderr).into_owned();
        let stdout = String::from_utf8_lossy(&result.stdout);
        if !stdout.trim().is_empty() {
            if !captured.is_empty() && !captured.ends_with('\n') {
                captured.push('\n');
            }
            captured.push_str(&stdout);
        }
        Err(RenderError::failed(tape, result.status.to_string(), &captured))
    }
}

fn anchored(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn script(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("vhs");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_render_success_writes_output() {
        let dir = TempDir::new().unwrap();
        let program = script(&dir, r#"cp "$1" "$3""#);
        let tape = dir.path().join("in.tape");
        let out = dir.path().join("out.gif");
        fs::write(&tape, "Type hi").unwrap();

        VhsRenderer::new(program, Version::new(0, 7, 0))
            .render(&tape, &out)
            .unwrap();
        assert_eq!(fs::read_to_string(out).unwrap(), "Type hi");
    }

    #[test]
    fn test_render_failure_captures_streams() {
        let dir = TempDir::new().unwrap();
        let program = script(&dir, "echo 'parse error' >&2; echo 'partial' ; exit 3");
        let tape = dir.path().join("in.tape");
        fs::write(&tape, "Bogus").unwrap();

        let err = VhsRenderer::new(program, Version::new(0, 7, 0))
            .render(&tape, &dir.path().join("out.gif"))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("parse error"));
        assert!(msg.contains("partial"));
        assert!(msg.contains('3'));
    }

    #[test]
    fn test_render_passes_env_and_cwd() {
        let dir = TempDir::new().unwrap();
        let program = script(&dir, r#"printf '%s|%s' "$VHS_NO_SANDBOX" "$(pwd)" > "$3""#);
        let out = dir.path().join("out.gif");

        VhsRenderer::new(program, Version::new(0, 7, 0))
            .with_cwd(dir.path())
            .with_env([("VHS_NO_SANDBOX", "true")])
            .render(Path::new("in.tape"), &out)
            .unwrap();
        let text = fs::read_to_string(out).unwrap();
        assert!(text.starts_with("true|"));
        assert!(text.ends_with(dir.path().file_name().unwrap().to_str().unwrap()));
    }

    #[test]
    fn test_render_relative_paths_ignore_child_cwd() {
        let bin = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let local = TempDir::new_in(".").unwrap();
        let program = script(&bin, r#"cp "$1" "$3""#);
        let name = Path::new(local.path().file_name().unwrap());
        fs::write(local.path().join("in.tape"), "Type rel").unwrap();

        VhsRenderer::new(program, Version::new(0, 7, 0))
            .with_cwd(elsewhere.path())
            .render(&name.join("in.tape"), &name.join("out.gif"))
            .unwrap();
        assert_eq!(fs::read_to_string(local.path().join("out.gif")).unwrap(), "Type rel");
    }

    #[test]
    fn test_render_missing_binary() {
        let dir = TempDir::new().unwrap();
        let err = VhsRenderer::new(dir.path().join("absent"), Version::new(0, 7, 0))
            .render(Path::new("a.tape"), Path::new("a.gif"))
            .unwrap_err();
        assert!(matches!(err, RenderError::Spawn { .. }));
    }
}
