//! # refbib-resolver
//!
//! Resolves loosely structured reference stubs (title, authors, year, DOI,
//! raw citation text) to BibTeX entries using CrossRef, Semantic Scholar, and
//! DBLP.
//!
//! Provides:
//! - **Library**: per-provider adapters, the ordered provider waterfall, and a
//!   batch resolver with a retry pass and citation key deduplication
//! - **CLI**: `refbib` binary (`cli` feature) for resolving or probing a JSON
//!   file of stubs
//!
//! ## Quick Start
//!
//! ```no_run
//! # async fn example() -> refbib_resolver::Result<()> {
//! use refbib_resolver::{BatchResolver, ReferenceStub, ResolverConfig};
//!
//! let resolver = BatchResolver::from_config(ResolverConfig::from_env()?)?;
//!
//! let stubs = vec![
//!     ReferenceStub::titled(1, "Attention Is All You Need"),
//!     ReferenceStub::titled(2, "Deep Residual Learning").with_doi("10.1109/CVPR.2016.90"),
//! ];
//!
//! let report = resolver.resolve_report(&stubs).await;
//! for r in &report.references {
//!     println!("[{}] {} via {}", r.index(), r.citation_key, r.match_source);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Generation
//!
//! ```
//! use refbib_resolver::bibtex::generate_citation_key;
//!
//! let key = generate_citation_key(
//!     &["Vaswani, A.".to_string()],
//!     Some(2017),
//!     Some("Attention Is All You Need"),
//! );
//! assert_eq!(key, "vaswani2017attention");
//! ```

pub mod batch;
pub mod bibtex;
pub mod client;
pub mod config;
pub mod crossref;
pub mod dblp;
pub mod dedup;
pub mod discovery;
pub mod error;
pub mod parse;
pub mod rate_limit;
pub mod semantic_scholar;
pub mod similarity;
pub mod source;
pub mod types;
pub mod waterfall;

// Re-export key types at the crate root.
pub use batch::BatchResolver;
pub use config::ResolverConfig;
pub use discovery::{DiscoveryResult, DiscoveryService, DiscoveryStatus};
pub use error::{ResolveError, Result};
pub use rate_limit::RateLimiter;
pub use source::{CitationSource, DoiDiscovery, DoiLookup, DoiSource};
pub use types::*;
pub use waterfall::Waterfall;
