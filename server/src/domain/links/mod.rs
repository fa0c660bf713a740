//! Outbound link handling
//!
//! - `extract` - pull URLs out of message text
//! - `resolver` - turn a URL into a cached short summary

pub mod extract;
pub mod resolver;

pub use extract::extract_urls;
pub use resolver::LinkResolver;
