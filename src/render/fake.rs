//! In-process renderer for tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::renderer::Renderer;
use crate::diagnostic::RenderError;

/// Writes `GIF:` followed by the tape text, and counts invocations.
#[derive(Debug, Default)]
pub(crate) struct FakeRenderer {
    calls: AtomicUsize,
    rendered: Mutex<Vec<PathBuf>>,
    fail_marker: Option<String>,
}

impl FakeRenderer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fail every tape whose text contains `marker`.
    pub(crate) fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_owned()),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Tape paths passed to successful renders, in call order.
    pub(crate) fn rendered(&self) -> Vec<PathBuf> {
        self.rendered.lock().clone()
    }
}

impl Renderer for FakeRenderer {
    fn render(&self, tape: &Path, output: &Path) -> Result<(), RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = fs::read_to_string(tape).map_err(|source| RenderError::Spawn {
            program: PathBuf::from("fake-vhs"),
            source,
        })?;

        if let Some(marker) = &self.fail_marker
            && text.contains(marker.as_str())
        {
            return Err(RenderError::failed(tape, "exit status: 1", "unknown command"));
        }

        fs::write(output, format!("GIF:{text}")).map_err(|source| RenderError::Spawn {
            program: PathBuf::from("fake-vhs"),
            source,
        })?;
        self.rendered.lock().push(tape.to_path_buf());
        Ok(())
    }
}
