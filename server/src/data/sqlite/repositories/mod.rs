//! SQLite repositories
//!
//! Free async functions over the shared pool, one module per entity.

pub mod feedback;
pub mod link_summary;
pub mod message;
pub mod source;
pub mod subscriber;
pub mod summary;
