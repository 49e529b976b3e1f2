//! Fetch and cache per-lexicon bundles from the analysis backend.
//!
//! A bundle is assembled from four endpoints: paginated morphology links,
//! paginated lexicon evidence, synonym topics, and one morphology lookup per
//! distinct linked id. The links, evidence and synonyms requests run
//! concurrently; the per-id lookups follow once the links are known.
//!
//! [`LexiconBundleClient`] keeps one cache entry per lexicon id. Concurrent
//! callers share the same fetch and the same outcome; failures are not cached.
//!
//! ```no_run
//! use std::sync::Arc;
//! use quran_lexicon_client::{HttpTransport, LexiconBundleClient};
//!
//! # async fn run() -> Result<(), quran_lexicon_client::LexiconError> {
//! let transport = HttpTransport::new("http://localhost:8080/api")?;
//! let client = LexiconBundleClient::new(Arc::new(transport));
//! let bundle = client.get_lexicon_bundle("LX-ktb", false).await?;
//! println!("{} links", bundle.morphology_links.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod transport;

pub use client::{
    BundleLimits, BundleResult, DEFAULT_MAX_ROWS, DEFAULT_PAGE_SIZE, LexiconBundleClient,
    SynonymPayload, parse_synonym_payload,
};
pub use error::LexiconError;
pub use transport::{Endpoint, HttpTransport, JsonTransport, TransportFuture};
