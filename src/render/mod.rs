//! Rendering tapes into images.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Render Flow                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  resolve(options) ──► VhsRenderer (version-checked binary)   │
//! │                              │                               │
//! │  pending RenderJobs ──► Scheduler::run ──► Renderer::render  │
//! │                              │                               │
//! │                              └──► ProgressSink::tape_done    │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The [`Renderer`] trait is the seam between scheduling and the external
//! tool; tests swap in an in-process implementation.

#[cfg(test)]
pub(crate) mod fake;
mod progress;
mod renderer;
mod resolve;
mod scheduler;
mod version;

pub use progress::{
    InstallReporter, LogInstallReporter, NoProgress, ProgressSink, SilentReporter,
    TerminalProgress, format_download, format_status,
};
pub use renderer::{Renderer, VhsRenderer};
pub use resolve::{Installer, PROGRAM_NAME, ResolveOptions, resolve};
pub use scheduler::{PARALLEL_AVAILABLE, RenderJob, Scheduler, partition, sequential_hint};
pub use version::{ParseVersionError, Version};
