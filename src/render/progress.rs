//! Progress reporting for render runs and renderer installation.
//!
//! Reporting is advisory: sinks never fail, and write errors on the terminal
//! are ignored.

use std::io::{self, Write};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::diagnostic::Paint;

/// Receives notifications from a render run.
///
/// Workers call [`ProgressSink::tape_done`] concurrently; implementations
/// serialize their own output.
pub trait ProgressSink: Sync {
    /// A run over tapes from `origins` (one item per pending render) begins.
    fn start(&self, origins: &[String], workers: usize);
    /// One render of a tape from `origin` finished.
    fn tape_done(&self, origin: &str);
    /// The run ended, successfully or not.
    fn finish(&self);
}

/// Discards all notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn start(&self, _origins: &[String], _workers: usize) {}
    fn tape_done(&self, _origin: &str) {}
    fn finish(&self) {}
}

// ============================================================================
// Status line
// ============================================================================

/// A single terminal line rewritten in place with `\r`.
#[derive(Debug)]
struct StatusLine<W> {
    out: W,
    last_len: usize,
}

impl<W: Write> StatusLine<W> {
    fn new(out: W) -> Self {
        Self { out, last_len: 0 }
    }

    /// Replace the line. `visible_len` excludes ANSI escapes.
    fn rewrite(&mut self, text: &str, visible_len: usize) {
        let pad = self.last_len.saturating_sub(visible_len);
        let _ = write!(self.out, "\r{text}{:pad$}", "");
        let _ = self.out.flush();
        self.last_len = visible_len;
    }

    fn end(&mut self) {
        if self.last_len > 0 {
            let _ = writeln!(self.out);
            let _ = self.out.flush();
        }
        self.last_len = 0;
    }
}

// ============================================================================
// TerminalProgress
// ============================================================================

/// Format `rendering VHS tapes... [done/total] first +N more`.
///
/// `first` is the outstanding origin shown by name; `left` counts every
/// outstanding render including it.
pub fn format_status(done: usize, total: usize, first: Option<&str>, left: usize, paint: Paint) -> String {
    let mut tape = String::new();
    if let Some(first) = first {
        tape.push(' ');
        tape.push_str(first);
    }
    if left > 1 {
        tape.push_str(&format!(" +{} more", left - 1));
    }
    format!(
        "{} [{done}/{total}]{}",
        paint.bold("rendering VHS tapes..."),
        paint.accent(&tape)
    )
}

#[derive(Debug, Default)]
struct RunState {
    total: usize,
    outstanding: FxHashMap<String, usize>,
}

impl RunState {
    fn left(&self) -> usize {
        self.outstanding.values().sum()
    }

    fn first(&self) -> Option<&str> {
        self.outstanding.keys().min().map(String::as_str)
    }

    fn complete(&mut self, origin: &str) {
        if let Some(count) = self.outstanding.get_mut(origin) {
            *count -= 1;
            if *count == 0 {
                self.outstanding.remove(origin);
            }
        }
    }
}

/// Progress on a terminal.
///
/// With `verbosity == 0` a single status line is rewritten after every
/// finished tape. Otherwise each tape is logged as its own `tracing` event.
#[derive(Debug)]
pub struct TerminalProgress<W = io::Stderr> {
    verbosity: u8,
    paint: Paint,
    state: Mutex<(RunState, StatusLine<W>)>,
}

impl TerminalProgress<io::Stderr> {
    /// Report on stderr, coloured when stderr is a terminal.
    pub fn stderr(verbosity: u8) -> Self {
        Self::new(io::stderr(), verbosity, Paint::detect())
    }
}

impl<W: Write + Send> TerminalProgress<W> {
    /// Report into `out`.
    pub fn new(out: W, verbosity: u8, paint: Paint) -> Self {
        Self {
            verbosity,
            paint,
            state: Mutex::new((RunState::default(), StatusLine::new(out))),
        }
    }

    /// Consume the reporter and return its writer.
    pub fn into_inner(self) -> W {
        self.state.into_inner().1.out
    }

    fn redraw(&self, run: &RunState, line: &mut StatusLine<W>) {
        let left = run.left();
        let done = run.total - left;
        let text = format_status(done, run.total, run.first(), left, self.paint);
        let visible = format_status(done, run.total, run.first(), left, Paint::plain());
        line.rewrite(&text, visible.chars().count());
    }
}

impl<W: Write + Send> ProgressSink for TerminalProgress<W> {
    fn start(&self, origins: &[String], workers: usize) {
        let mut guard = self.state.lock();
        let (run, line) = &mut *guard;
        run.total = origins.len();
        run.outstanding.clear();
        for origin in origins {
            *run.outstanding.entry(origin.clone()).or_default() += 1;
        }

        if self.verbosity > 0 {
            tracing::info!(files = origins.len(), parallel = workers, "rendering VHS tapes");
        } else {
            self.redraw(run, line);
        }
    }

    fn tape_done(&self, origin: &str) {
        let mut guard = self.state.lock();
        let (run, line) = &mut *guard;
        run.complete(origin);

        if self.verbosity > 0 {
            tracing::info!(tape = origin, done = run.total - run.left(), total = run.total, "rendered");
        } else {
            self.redraw(run, line);
        }
    }

    fn finish(&self) {
        if self.verbosity == 0 {
            self.state.lock().1.end();
        }
    }
}

// ============================================================================
// Installation
// ============================================================================

/// Receives download progress while a renderer is installed.
pub trait InstallReporter {
    /// `done` of `total` bytes of the step `desc` are complete.
    fn progress(&self, desc: &str, done: u64, total: u64);
}

/// Ignores installation progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentReporter;

impl InstallReporter for SilentReporter {
    fn progress(&self, _desc: &str, _done: u64, _total: u64) {}
}

/// Format ` [ 42%] 1.2/3.4MB`.
pub fn format_download(done: u64, total: u64) -> String {
    const MB: f64 = 1024.0 * 1024.0;
    let percent = if total == 0 {
        100.0
    } else {
        done as f64 * 100.0 / total as f64
    };
    format!(
        " [{percent:>3.0}%] {:.1}/{:.1}MB",
        done as f64 / MB,
        total as f64 / MB
    )
}

/// Installation progress on a terminal, shaped like [`TerminalProgress`].
#[derive(Debug)]
pub struct LogInstallReporter<W = io::Stderr> {
    verbosity: u8,
    paint: Paint,
    state: Mutex<(Option<String>, StatusLine<W>)>,
}

impl LogInstallReporter<io::Stderr> {
    /// Report on stderr.
    pub fn stderr(verbosity: u8) -> Self {
        Self::new(io::stderr(), verbosity, Paint::detect())
    }
}

impl<W: Write> LogInstallReporter<W> {
    /// Report into `out`.
    pub fn new(out: W, verbosity: u8, paint: Paint) -> Self {
        Self {
            verbosity,
            paint,
            state: Mutex::new((None, StatusLine::new(out))),
        }
    }

    /// Finish the status line and return the writer.
    pub fn into_inner(self) -> W {
        let (_, mut line) = self.state.into_inner();
        line.end();
        line.out
    }
}

impl<W: Write> InstallReporter for LogInstallReporter<W> {
    fn progress(&self, desc: &str, done: u64, total: u64) {
        let mut guard = self.state.lock();
        let (prev_desc, line) = &mut *guard;

        if self.verbosity > 0 {
            if prev_desc.as_deref() != Some(desc) {
                tracing::info!("{desc}");
            }
        } else {
            if prev_desc.as_deref().is_some_and(|prev| prev != desc) {
                line.end();
            }
            let heading = format!("{desc}...");
            let progress = format_download(done, total);
            let text = format!("{}{progress}", self.paint.bold(&heading));
            line.rewrite(&text, heading.chars().count() + progress.chars().count());
        }
        *prev_desc = Some(desc.to_owned());
    }
}
