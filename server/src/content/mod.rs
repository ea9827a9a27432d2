//! In-memory content API: the write paths that feed the event publisher.
//! Every mutating handler notifies exactly once, after the store commits.

pub mod articles;
pub mod comments;
pub mod notify;
pub mod store;
pub mod workspaces;

pub use store::ContentStore;
