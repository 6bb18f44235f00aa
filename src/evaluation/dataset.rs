//! Labeled evaluation cases.
//!
//! File shape: a JSON array of
//! `{id, description?, query, relevant_ids: [int], retrieved_ids: [int]}`.
//! `id` may be a string or a number; `retrieved_ids` may be omitted for
//! datasets only used in pipeline mode.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{error, info};

use crate::model::ListingId;
use crate::sources::files::{DatasetError, read_json_file};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalCase {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub query: String,
    pub relevant_ids: HashSet<ListingId>,
    #[serde(default)]
    pub retrieved_ids: Vec<ListingId>,
}

impl EvalCase {
    /// Ground truth in ascending order, for stable display.
    pub fn sorted_relevant(&self) -> Vec<ListingId> {
        let mut ids: Vec<ListingId> = self.relevant_ids.iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
        Float(f64),
    }
    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
        Id::Float(n) => n.to_string(),
    })
}

/// Strict loader: surfaces the read or parse error.
pub fn try_load_eval_dataset(path: &Path) -> Result<Vec<EvalCase>, DatasetError> {
    read_json_file(path)
}

/// Lenient loader: a missing or malformed file is logged and yields no cases.
pub fn load_eval_dataset(path: &Path) -> Vec<EvalCase> {
    match try_load_eval_dataset(path) {
        Ok(cases) => {
            info!(path = %path.display(), cases = cases.len(), "Loaded evaluation dataset");
            cases
        }
        Err(err) => {
            error!(path = %path.display(), error = %err, "Could not load evaluation dataset");
            Vec::new()
        }
    }
}
