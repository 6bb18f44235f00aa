//! Domain types shared by the search, sources and evaluation layers.

pub mod types;

pub use types::{
    DEFAULT_PLACE_TITLE, Enrichment, FilterOperator, FilterSet, GeoLocation, InfrastructureFilter,
    InfrastructureResponse, Listing, ListingId, Place, RawListing, ScoredListing,
};
