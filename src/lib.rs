//! Personal tagged note-taking library
//!
//! This library keeps short text notes classified by a built-in tag and an
//! optional custom tag, persists notes and custom tags as JSON blobs in local
//! key-value storage, and offers tag filtering, text search and day grouping
//! for timeline views.

mod cli;
mod config;
mod errors;
mod feedback;
mod helper;
mod kv;
mod note;
mod note_store;
mod persist;
mod query;
mod store;
mod tag;
mod tag_store;
mod timeline;
mod types;

// Re-export key components
pub use cli::*;
pub use config::*;
pub use errors::*;
pub use feedback::*;
pub use helper::*;
pub use kv::*;
pub use note::*;
pub use note_store::*;
pub use persist::*;
pub use query::*;
pub use store::*;
pub use tag::*;
pub use tag_store::*;
pub use timeline::*;
pub use types::*;
