//! Parallel render scheduling.
//!
//! ```text
//! pending jobs ──► partition(workers) ──► chunk 0 ──► render, render, ...
//!                                     ├─► chunk 1 ──► render, ...
//!                                     └─► chunk N ──► ...
//!                                              │
//!                        first error wins ◄────┘ (remaining chunks stop)
//! ```
//!
//! Each render writes `render.partial.gif` inside its own entry directory and
//! is renamed to `render.gif` only on success, so an interrupted or failed run
//! never leaves something that looks like a finished render.

use std::fs;
use std::path::PathBuf;

use super::progress::ProgressSink;
use super::renderer::Renderer;
use crate::cache::CacheEntry;
use crate::diagnostic::{BuildError, CacheError, Paint};

/// Whether this build can render on more than one thread.
pub const PARALLEL_AVAILABLE: bool = cfg!(feature = "batch");

/// One canonical render to produce.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Entry to render into.
    pub entry: CacheEntry,
    /// Source file of the first document referencing the entry.
    pub doc_path: PathBuf,
    /// Line of that reference.
    pub lineno: usize,
    /// Referenced tape path, or `<inline>`, for progress output.
    pub origin: String,
}

/// Split `items` into at most `parts` contiguous, near-equal chunks.
///
/// Earlier chunks are at most one item longer than later ones. Order is
/// preserved and no chunk is empty.
pub fn partition<T>(items: &[T], parts: usize) -> Vec<&[T]> {
    if items.is_empty() {
        return Vec::new();
    }
    let parts = parts.clamp(1, items.len());
    let base = items.len() / parts;
    let extra = items.len() % parts;

    let mut chunks = Vec::with_capacity(parts);
    let mut rest = items;
    for i in 0..parts {
        let len = base + usize::from(i < extra);
        let (chunk, tail) = rest.split_at(len);
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}

/// Runs render jobs on a bounded worker pool.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    workers: usize,
}

impl Scheduler {
    /// Schedule across `workers` threads. `0` and `1` both mean sequential.
    pub fn new(workers: usize) -> Self {
        Self { workers }
    }

    /// Configured worker count.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Whether runs will use a thread pool.
    pub fn is_parallel(&self) -> bool {
        PARALLEL_AVAILABLE && self.workers > 1
    }

    /// Render every job, returning how many renders completed.
    ///
    /// Stops at the first failure and returns it with the job's document and
    /// line. Renders finished before that stay in the cache.
    pub fn run<R>(&self, jobs: &[RenderJob], renderer: &R, progress: &dyn ProgressSink) -> Result<usize, BuildError>
    where
        R: Renderer + ?Sized,
    {
        if jobs.is_empty() {
            return Ok(0);
        }
        if jobs.len() > 1 && PARALLEL_AVAILABLE && self.workers <= 1 {
            tracing::info!("{}", sequential_hint(Paint::detect()));
        }

        let origins: Vec<String> = jobs.iter().map(|job| job.origin.clone()).collect();
        progress.start(&origins, self.workers.max(1));

        let result = if self.is_parallel() {
            self.run_parallel(jobs, renderer, progress)
        } else {
            run_chunk_sequential(jobs, renderer, progress)
        };

        progress.finish();
        result
    }

    #[cfg(feature = "batch")]
    fn run_parallel<R>(&self, jobs: &[RenderJob], renderer: &R, progress: &dyn ProgressSink) -> Result<usize, BuildError>
    where
        R: Renderer + ?Sized,
    {
        use parking_lot::Mutex;
        use rayon::prelude::*;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let chunks = partition(jobs, self.workers);
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(chunks.len())
            .thread_name(|i| format!("vhs-render-{i}"))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                tracing::warn!(error = %e, "cannot start render workers, rendering in sequence");
                return run_chunk_sequential(jobs, renderer, progress);
            }
        };

        let first_error: Mutex<Option<BuildError>> = Mutex::new(None);
        let rendered = AtomicUsize::new(0);

        pool.install(|| {
            chunks.par_iter().for_each(|chunk| {
                for job in chunk.iter() {
                    // Another worker failed
                    if first_error.lock().is_some() {
                        return;
                    }
                    match render_job(job, renderer) {
                        Ok(()) => {
                            rendered.fetch_add(1, Ordering::Relaxed);
                            progress.tape_done(&job.origin);
                        }
                        Err(e) => {
                            let mut err = first_error.lock();
                            if err.is_none() {
                                *err = Some(e);
                            }
                            return;
                        }
                    }
                }
            });
        });

        if let Some(err) = first_error.into_inner() {
            return Err(err);
        }
        Ok(rendered.into_inner())
    }

    #[cfg(not(feature = "batch"))]
    fn run_parallel<R>(&self, jobs: &[RenderJob], renderer: &R, progress: &dyn ProgressSink) -> Result<usize, BuildError>
    where
        R: Renderer + ?Sized,
    {
        run_chunk_sequential(jobs, renderer, progress)
    }
}

fn run_chunk_sequential<R>(jobs: &[RenderJob], renderer: &R, progress: &dyn ProgressSink) -> Result<usize, BuildError>
where
    R: Renderer + ?Sized,
{
    for job in jobs {
        render_job(job, renderer)?;
        progress.tape_done(&job.origin);
    }
    Ok(jobs.len())
}

fn render_job<R>(job: &RenderJob, renderer: &R) -> Result<(), BuildError>
where
    R: Renderer + ?Sized,
{
    let entry = &job.entry;
    let partial = entry.partial_render_file();
    let output = entry.render_file();
    tracing::debug!(tape = %entry.tape_file().display(), "rendering");

    if let Err(source) = renderer.render(&entry.tape_file(), &partial) {
        let _ = fs::remove_file(&partial);
        return Err(BuildError::Render {
            doc_path: job.doc_path.clone(),
            lineno: job.lineno,
            source,
        });
    }
    fs::rename(&partial, &output).map_err(|e| CacheError::io(&output, e))?;
    Ok(())
}

/// Advice logged when several renders run on a single worker.
pub fn sequential_hint(paint: Paint) -> String {
    paint.warning("rendering VHS tapes in sequence; pass -j auto to enable parallel run")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheKey, RenderCache};
    use crate::render::fake::FakeRenderer;
    use crate::render::progress::NoProgress;
    use crate::tape::NormalizedTape;
    use parking_lot::Mutex;
    use tempfile::TempDir;

    #[test]
    fn test_sequential_hint_plain() {
        assert_eq!(
            sequential_hint(Paint::plain()),
            "rendering VHS tapes in sequence; pass -j auto to enable parallel run"
        );
    }

    fn jobs(cache: &RenderCache, texts: &[&str]) -> Vec<RenderJob> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let tape = NormalizedTape::new(vec![text.to_string()]);
                let entry = cache.ensure_entry(&CacheKey::of(&tape), &tape).unwrap();
                RenderJob {
                    entry,
                    doc_path: PathBuf::from("docs/index.rst"),
                    lineno: i + 1,
                    origin: format!("tape{i}.tape"),
                }
            })
            .collect()
    }

    #[derive(Default)]
    struct Recording {
        started: Mutex<Vec<String>>,
        done: Mutex<Vec<String>>,
        finished: Mutex<bool>,
    }

    impl ProgressSink for Recording {
        fn start(&self, origins: &[String], _workers: usize) {
            self.started.lock().extend_from_slice(origins);
        }
        fn tape_done(&self, origin: &str) {
            self.done.lock().push(origin.to_owned());
        }
        fn finish(&self) {
            *self.finished.lock() = true;
        }
    }

    #[test]
    fn test_partition_near_equal_in_order() {
        let items: Vec<u32> = (0..10).collect();
        let chunks = partition(&items, 3);
        let sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
        assert_eq!(chunks.concat(), items);

        assert_eq!(partition(&items, 0).len(), 1);
        assert_eq!(partition(&items[..2], 8).len(), 2);
        assert!(partition::<u32>(&[], 4).is_empty());
    }

    #[test]
    fn test_sequential_run_renders_all() {
        let root = TempDir::new().unwrap();
        let cache = RenderCache::new(root.path());
        let jobs = jobs(&cache, &["Type a", "Type b", "Type c"]);
        let renderer = FakeRenderer::new();
        let progress = Recording::default();

        let rendered = Scheduler::new(1).run(&jobs, &renderer, &progress).unwrap();
        assert_eq!(rendered, 3);
        assert_eq!(renderer.calls(), 3);
        for job in &jobs {
            assert!(job.entry.is_rendered());
            assert!(!job.entry.partial_render_file().exists());
        }
        assert_eq!(progress.started.lock().len(), 3);
        assert_eq!(*progress.done.lock(), vec!["tape0.tape", "tape1.tape", "tape2.tape"]);
        assert!(*progress.finished.lock());
    }

    #[test]
    fn test_worker_count_does_not_change_outcome() {
        let texts = ["Type a", "Type b", "Type c", "Type d", "Type e"];

        let mut outcomes = Vec::new();
        for workers in [1, 2, 4, 16] {
            let root = TempDir::new().unwrap();
            let cache = RenderCache::new(root.path());
            let jobs = jobs(&cache, &texts);
            let renderer = FakeRenderer::new();

            let rendered = Scheduler::new(workers).run(&jobs, &renderer, &NoProgress).unwrap();
            let mut state: Vec<(String, String)> = jobs
                .iter()
                .map(|job| {
                    let body = fs::read_to_string(job.entry.render_file()).unwrap();
                    (job.entry.key.to_string(), body)
                })
                .collect();
            state.sort();
            outcomes.push((rendered, state, cache.keys().unwrap()));
        }
        assert!(outcomes.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_failure_reports_location_and_keeps_finished_renders() {
        let root = TempDir::new().unwrap();
        let cache = RenderCache::new(root.path());
        let jobs = jobs(&cache, &["Type ok", "Type BROKEN", "Type later"]);
        let renderer = FakeRenderer::failing_on("BROKEN");
        let progress = Recording::default();

        let err = Scheduler::new(1).run(&jobs, &renderer, &progress).unwrap_err();
        match &err {
            BuildError::Render { doc_path, lineno, .. } => {
                assert_eq!(doc_path, &PathBuf::from("docs/index.rst"));
                assert_eq!(*lineno, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().starts_with("at docs/index.rst:2:\n"));
        assert!(jobs[0].entry.is_rendered());
        assert!(!jobs[1].entry.is_rendered());
        assert!(!jobs[1].entry.partial_render_file().exists());
        assert!(!jobs[2].entry.is_rendered());
        assert!(*progress.finished.lock());
    }

    #[test]
    fn test_parallel_failure_propagates() {
        let root = TempDir::new().unwrap();
        let cache = RenderCache::new(root.path());
        let jobs = jobs(&cache, &["Type a", "Type b", "Type BROKEN", "Type d"]);
        let renderer = FakeRenderer::failing_on("BROKEN");

        let err = Scheduler::new(4).run(&jobs, &renderer, &NoProgress).unwrap_err();
        assert!(matches!(err, BuildError::Render { lineno: 3, .. }));
        assert!(!jobs[2].entry.is_rendered());
    }

    #[test]
    fn test_empty_run_is_silent() {
        let progress = Recording::default();
        let renderer = FakeRenderer::new();
        assert_eq!(Scheduler::new(4).run(&[], &renderer, &progress).unwrap(), 0);
        assert!(progress.started.lock().is_empty());
        assert!(!*progress.finished.lock());
    }
}
