//! JSON file loaders for listing snapshots and enrichment dumps.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::model::{Enrichment, Listing, RawListing};

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Read and deserialize one JSON document.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, DatasetError> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| DatasetError::Read {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| DatasetError::Parse {
        path: display,
        source,
    })
}

/// Already-normalised listings: `[{id, title, price, address, description?, full_text_content}]`.
pub fn load_snapshot(path: &Path) -> Result<Vec<Listing>, DatasetError> {
    read_json_file(path)
}

/// Listings in the upstream search-endpoint shape (`priceTitle`, `geoLocation`).
pub fn load_raw_listings(path: &Path) -> Result<Vec<RawListing>, DatasetError> {
    read_json_file(path)
}

/// Per-listing enrichment records: `[{id, original_text, places}]`.
pub fn load_enrichments(path: &Path) -> Result<Vec<Enrichment>, DatasetError> {
    read_json_file(path)
}
