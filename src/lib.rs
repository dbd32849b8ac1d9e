//! # tape-batch
//!
//! A content-addressed render cache and parallel render scheduler for
//! terminal-recording tapes embedded in documentation.
//!
//! Documentation pages reference [VHS](https://github.com/charmbracelet/vhs)
//! tapes, either as files or inline. Rendering a tape takes seconds, so this
//! crate renders each distinct tape at most once and reuses the result across
//! builds:
//!
//! - **Normalization**: comments are stripped and `Source` inclusions are
//!   flattened depth-first, with cycle detection
//! - **Content addressing**: the normalized text is hashed; equal tapes share
//!   one cache entry no matter where they came from
//! - **Usage tracking**: references are recorded per document so incremental
//!   rebuilds know what is still in use
//! - **Scheduling**: missing renders are spread across a worker pool; the
//!   first failure aborts the run with the referencing document and line
//!
//! ## Quick Start
//!
//! ```ignore
//! use tape_batch::prelude::*;
//! use std::path::Path;
//!
//! let config = ConfigBuilder::new().parallel(4).build();
//! let mut host = DirHost::new("docs");
//! let mut env = BuildEnv::new(config, "docs", Path::new("_build/doctrees"));
//!
//! // While reading documents
//! let uri = env.process_reference(&mut host, "index", 12, TapeRef::File("demo.tape"))?;
//!
//! // Once every document is read
//! env.env_updated(&host, None, &TerminalProgress::stderr(0))?;
//!
//! // While writing output
//! let image = env.resolve_placeholder(&uri).unwrap();
//! println!("{}", image.uri);
//! ```
//!
//! ## Modules
//!
//! - [`tape`]: tape sources and normalization
//! - [`cache`]: cache keys, the on-disk store and display aliases
//! - [`usage`]: which entries the documentation references
//! - [`render`]: renderer resolution, the scheduler and progress output
//! - [`build`]: the per-build environment driven by host hooks
//! - [`config`]: build configuration
//! - [`diagnostic`]: errors and terminal formatting

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod build;
pub mod cache;
pub mod config;
pub mod diagnostic;
pub mod render;
pub mod tape;
pub mod usage;

// =============================================================================
// Prelude - import commonly used items with a single `use`
// =============================================================================

/// Prelude module for convenient imports.
///
/// ```ignore
/// use tape_batch::prelude::*;
/// ```
pub mod prelude {
    // Build lifecycle
    pub use crate::{BuildEnv, BuildSummary, DirHost, DocumentHost, TapeRef};

    // Configuration
    pub use crate::{Config, ConfigBuilder};

    // Errors
    pub use crate::{BuildError, RenderError, ResolutionError, TapeError};

    // Rendering
    pub use crate::{
        Installer, NoProgress, ProgressSink, Renderer, TerminalProgress, Version, VhsRenderer,
    };
}

// =============================================================================
// Build lifecycle
// =============================================================================

pub use build::{
    BuildEnv, BuildSummary, DirHost, DocumentHost, PLACEHOLDER_PREFIX, ResolvedImage, TapeRef,
    display_name_for, resolve_placeholder,
};

// =============================================================================
// Components
// =============================================================================

pub use cache::{CacheEntry, CacheKey, RenderCache, key_of};
pub use render::{
    Installer, NoProgress, ProgressSink, RenderJob, Renderer, ResolveOptions, Scheduler,
    TerminalProgress, Version, VhsRenderer, resolve,
};
pub use tape::{FileTape, InlineTape, NormalizedTape, Normalizer, TapeSource};
pub use usage::{UsageRecord, UsageTracker};

// =============================================================================
// Infrastructure
// =============================================================================

pub use config::{Config, ConfigBuilder};
pub use diagnostic::{BuildError, CacheError, RenderError, ResolutionError, TapeError};
