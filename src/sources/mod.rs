//! Listing inputs: snapshot files, enrichment joins and infrastructure filters.
//!
//! - **files**: JSON loaders for listing snapshots and enrichment dumps
//! - **infrastructure**: AND/OR place-proximity filter matching
//! - **assemble**: Raw listing + enrichment → indexable listing

pub mod assemble;
pub mod files;
pub mod infrastructure;

pub use assemble::{AssembledListings, assemble_listings, build_full_text};
pub use files::{DatasetError, load_enrichments, load_raw_listings, load_snapshot};
pub use infrastructure::{InfraMatch, match_places};
