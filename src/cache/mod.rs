//! Content-addressed render cache.
//!
//! - [`CacheKey`]: SHA-256 of the normalized tape text
//! - [`RenderCache`]: one directory per key holding the tape, its canonical
//!   render and display aliases; age-based eviction of unreferenced entries
//! - [`materialize`]: publishes display aliases once the render exists

mod key;
mod link;
mod store;

pub use key::{CacheKey, KEY_LEN, key_of};
pub use link::{AliasKind, link_or_copy, materialize, publish};
pub use store::{
    CacheEntry, DISPLAY_PREFIX, PARTIAL_RENDER_FILE, RENDER_EXTENSION, RENDER_FILE, RenderCache,
    TAPE_FILE,
};
