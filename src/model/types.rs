//! Normalized entity structs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Listing identifier, unique within one indexing session.
pub type ListingId = i64;

/// Display group used when the enrichment source omits a place title.
pub const DEFAULT_PLACE_TITLE: &str = "Инфраструктура";

/// A normalized listing ready for indexing.
///
/// Ranking output never lives on this struct; see [`ScoredListing`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub full_text_content: String,
}

/// Immutable `(listing_id, score)` pair produced by one ranking pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredListing {
    pub id: ListingId,
    pub score: f32,
}

impl ScoredListing {
    pub fn new(id: ListingId, score: f32) -> Self {
        Self { id, score }
    }
}

/// Listing as returned by the upstream listing search endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawListing {
    pub id: ListingId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub price_title: Option<String>,
    #[serde(default)]
    pub geo_location: Option<GeoLocation>,
}

impl RawListing {
    pub fn address(&self) -> &str {
        self.geo_location
            .as_ref()
            .and_then(|geo| geo.address_title.as_deref())
            .unwrap_or("")
    }

    /// Numeric price, falling back to the digits of the price title.
    pub fn price_value(&self) -> i64 {
        if let Some(price) = self.price {
            return price;
        }
        self.price_title
            .as_deref()
            .map(parse_price_digits)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLocation {
    #[serde(default)]
    pub address_title: Option<String>,
}

/// Extract the integer amount from a price string like `"250 000 〒"`.
///
/// Digits before the first `.` are concatenated; thousands separators
/// (spaces, commas, no-break spaces) are ignored.
pub fn parse_price_digits(raw: &str) -> i64 {
    let mut digits = String::new();
    let mut seen_digit = false;
    for ch in raw.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            seen_digit = true;
        } else if seen_digit && ch == '.' {
            break;
        }
    }
    digits.parse().unwrap_or(0)
}

/// A nearby place supplied by the enrichment collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_place_title")]
    pub title: String,
    #[serde(default, deserialize_with = "distance_text")]
    pub distance: Option<String>,
}

fn default_place_title() -> String {
    DEFAULT_PLACE_TITLE.to_string()
}

/// Distances arrive either as display strings (`"300 м"`) or bare numbers.
fn distance_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(
        match Option::<serde_json::Value>::deserialize(deserializer)? {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        },
    )
}

impl Place {
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
            title: default_place_title(),
            distance: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_distance(mut self, distance: impl Into<String>) -> Self {
        self.distance = Some(distance.into());
        self
    }

    /// `"name (distance)"`, or just the name when no distance is known.
    pub fn display_label(&self) -> String {
        match self.distance.as_deref() {
            Some(dist) if !dist.is_empty() => format!("{} ({dist})", self.name),
            _ => self.name.clone(),
        }
    }
}

/// Raw infrastructure payload: `{"data": [{"places": [...]}]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfrastructureResponse {
    #[serde(default)]
    pub data: Vec<PlaceSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaceSection {
    #[serde(default)]
    pub places: Vec<Place>,
}

impl InfrastructureResponse {
    pub fn into_places(self) -> Vec<Place> {
        self.data
            .into_iter()
            .flat_map(|section| section.places)
            .collect()
    }
}

/// Per-listing enrichment data (description text plus nearby places).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Enrichment {
    pub id: ListingId,
    #[serde(default, alias = "text")]
    pub original_text: String,
    #[serde(default)]
    pub places: Vec<Place>,
}

/// Categorical place-proximity filter.
///
/// `name_match` is compared as a case-insensitive substring and must use the
/// same script as the enrichment source (e.g. Cyrillic `Абай`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InfrastructureFilter {
    pub category: String,
    #[serde(default)]
    pub name_match: Option<String>,
}

impl InfrastructureFilter {
    pub fn generic(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name_match: None,
        }
    }

    pub fn named(category: impl Into<String>, name_match: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name_match: Some(name_match.into()),
        }
    }
}

impl FromStr for InfrastructureFilter {
    type Err = String;

    /// Parses `category` or `category=name`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (category, name) = match s.split_once('=') {
            Some((category, name)) => (category.trim(), Some(name.trim())),
            None => (s.trim(), None),
        };
        if category.is_empty() {
            return Err(format!("filter `{s}` has an empty category"));
        }
        Ok(match name {
            Some(name) if !name.is_empty() => Self::named(category, name),
            _ => Self::generic(category),
        })
    }
}

impl fmt::Display for InfrastructureFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name_match {
            Some(name) => write!(f, "{}={}", self.category, name),
            None => write!(f, "{}", self.category),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    #[default]
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

impl FromStr for FilterOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Ok(Self::And),
            "or" => Ok(Self::Or),
            other => Err(format!("unknown filter operator `{other}` (expected and|or)")),
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterOperator::And => write!(f, "AND"),
            FilterOperator::Or => write!(f, "OR"),
        }
    }
}

/// Ordered filters joined by one operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    #[serde(default)]
    pub filters: Vec<InfrastructureFilter>,
    #[serde(default)]
    pub operator: FilterOperator,
}

impl FilterSet {
    pub fn new(filters: Vec<InfrastructureFilter>, operator: FilterOperator) -> Self {
        Self { filters, operator }
    }

    /// A set with no filters never excludes anything.
    pub fn is_active(&self) -> bool {
        !self.filters.is_empty()
    }
}
