//! Per-build integration with the documentation host.
//!
//! | Hook                          | Call                              |
//! |-------------------------------|-----------------------------------|
//! | a document is about to be re-read | [`BuildEnv::purge_document`]  |
//! | a tape reference is read      | [`BuildEnv::process_reference`]   |
//! | a parallel reader finished    | [`BuildEnv::merge`]               |
//! | all documents are read        | [`BuildEnv::env_updated`]         |
//! | an image node is written      | [`BuildEnv::resolve_placeholder`] |

mod env;
mod host;
mod placeholder;


pub use env::{BuildEnv, BuildSummary, TapeRef, display_name_for};
pub use host::{DirHost, DocumentHost};
pub use placeholder::{PLACEHOLDER_PREFIX, ResolvedImage, placeholder_uri, resolve_placeholder};
