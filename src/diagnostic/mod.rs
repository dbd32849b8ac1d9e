//! Error taxonomy and terminal formatting.
//!
//! | Error              | Raised by              | Scope                          |
//! |--------------------|------------------------|--------------------------------|
//! | [`TapeError`]      | tape normalization     | the referencing document       |
//! | [`CacheError`]     | render cache store     | whole build                    |
//! | [`ResolutionError`]| renderer resolution    | whole build, before rendering  |
//! | [`RenderError`]    | a single render        | whole scheduling run           |
//!
//! [`BuildError`] wraps all of them with the originating document and line.

mod error;
mod format;

pub use error::{
    BuildError, CacheError, IncludeChain, IncludeStep, RejectedCandidate, RenderError,
    ResolutionError, TapeError,
};
pub use format::Paint;
