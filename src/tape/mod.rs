//! Tape normalization.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Normalization Flow                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  TapeSource ──► Normalizer::normalize                       │
//! │  (FileTape │        │                                       │
//! │   InlineTape)       ├─► raw line is `Source <path>`         │
//! │                     │   └─► resolve against cwd, check      │
//! │                     │       inclusion stack, recurse        │
//! │                     │                                       │
//! │                     └─► otherwise strip comment, keep if    │
//! │                         anything remains                    │
//! │                                                             │
//! │  ──► NormalizedTape + every file opened (dependencies)      │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod comment;
mod normalize;
mod read;
mod source;

pub use comment::{SourceDirective, source_directive, strip_comment};
pub use normalize::{Normalized, NormalizedTape, Normalizer};
pub use read::{decode_utf8, read_lines, resolve_path, split_lines};
pub use source::{FileTape, INLINE_ORIGIN, InlineTape, RawTape, TapeSource};
