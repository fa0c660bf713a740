//! Domain logic
//!
//! - `progress` - per-request progress bus backing the SSE endpoint
//! - `links` - URL extraction and single-flight link resolution
//! - `telegram` - channel client and data-export parsing
//! - `llm` - structured-output and link-reader model clients
//! - `ingest` - channel ingestion pipeline
//! - `analysis` - summarization, clustering, and insight generation

pub mod analysis;
pub mod ingest;
pub mod links;
pub mod llm;
pub mod progress;
pub mod telegram;
