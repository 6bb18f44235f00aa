//! Turn upstream listings plus enrichment data into indexable [`Listing`]s.
//!
//! Filter evaluation is independent per listing and runs on the rayon pool.
//! Results are collected in input order.

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::info;

use super::infrastructure::{InfraMatch, match_places};
use crate::model::{Enrichment, FilterSet, Listing, ListingId, RawListing};

#[derive(Debug, Clone, Default)]
pub struct AssembledListings {
    pub listings: Vec<Listing>,
    /// Listings dropped for failing the active filter set.
    pub dropped: usize,
}

/// `Description: ...\nTitle: ...`, with an `Infrastructure:` line when a
/// summary is present.
pub fn build_full_text(description: &str, title: &str, infrastructure: Option<&str>) -> String {
    let mut text = format!("Description: {description}\nTitle: {title}");
    if let Some(summary) = infrastructure.filter(|s| !s.is_empty()) {
        text.push_str("\nInfrastructure: ");
        text.push_str(summary);
    }
    text
}

/// Join raw listings with their enrichment and apply `filters`.
///
/// A listing with no enrichment record has no description and no places, so
/// it is dropped whenever `filters` is active.
pub fn assemble_listings(
    raw: &[RawListing],
    enrichments: &[Enrichment],
    filters: &FilterSet,
) -> AssembledListings {
    let by_id: HashMap<ListingId, &Enrichment> = enrichments.iter().map(|e| (e.id, e)).collect();

    let assembled: Vec<Option<Listing>> = raw
        .par_iter()
        .map(|item| {
            let enrichment = by_id.get(&item.id).copied();
            let description = enrichment.map(|e| e.original_text.trim()).unwrap_or("");

            let summary = if filters.is_active() {
                let places = enrichment.map(|e| e.places.as_slice()).unwrap_or(&[]);
                match match_places(filters, places) {
                    InfraMatch::Qualified { summary } => Some(summary),
                    InfraMatch::Excluded => return None,
                }
            } else {
                None
            };

            Some(Listing {
                id: item.id,
                title: item.title.clone(),
                price: item.price_value(),
                address: item.address().to_string(),
                description: description.to_string(),
                full_text_content: build_full_text(description, &item.title, summary.as_deref()),
            })
        })
        .collect();

    let total = assembled.len();
    let listings: Vec<Listing> = assembled.into_iter().flatten().collect();
    let dropped = total - listings.len();

    info!(
        kept = listings.len(),
        dropped = dropped,
        operator = %filters.operator,
        filters = filters.filters.len(),
        "Listings assembled"
    );
    AssembledListings { listings, dropped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FilterOperator, GeoLocation, InfrastructureFilter, Place};

    fn raw(id: ListingId, title: &str) -> RawListing {
        RawListing {
            id,
            title: title.to_string(),
            price: Some(150_000),
            price_title: None,
            geo_location: Some(GeoLocation {
                address_title: Some("Алматы, Бостандыкский р-н".to_string()),
            }),
        }
    }

    fn enrichment(id: ListingId, text: &str, places: Vec<Place>) -> Enrichment {
        Enrichment {
            id,
            original_text: text.to_string(),
            places,
        }
    }

    #[test]
    fn test_full_text_layout() {
        assert_eq!(
            build_full_text("Светлая", "2-комн", None),
            "Description: Светлая\nTitle: 2-комн"
        );
        assert_eq!(
            build_full_text("Светлая", "2-комн", Some("Метро: Абай")),
            "Description: Светлая\nTitle: 2-комн\nInfrastructure: Метро: Абай"
        );
    }

    #[test]
    fn test_no_filters_keeps_everything_in_order() {
        let raws = vec![raw(3, "c"), raw(1, "a"), raw(2, "b")];
        let out = assemble_listings(&raws, &[enrichment(1, " Уютная ", vec![])], &FilterSet::default());
        assert_eq!(out.dropped, 0);
        let ids: Vec<ListingId> = out.listings.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(out.listings[1].description, "Уютная");
        assert_eq!(out.listings[0].description, "");
        assert_eq!(out.listings[0].address, "Алматы, Бостандыкский р-н");
    }

    #[test]
    fn test_active_filters_drop_and_annotate() {
        let filters = FilterSet::new(
            vec![InfrastructureFilter::named("metro", "абай")],
            FilterOperator::And,
        );
        let raws = vec![raw(1, "near"), raw(2, "far"), raw(3, "unknown")];
        let enrichments = vec![
            enrichment(1, "У метро", vec![Place::new("metro", "Абай").with_title("Метро")]),
            enrichment(2, "Далеко", vec![Place::new("metro", "Алатау").with_title("Метро")]),
        ];
        let out = assemble_listings(&raws, &enrichments, &filters);
        assert_eq!(out.dropped, 2);
        assert_eq!(out.listings.len(), 1);
        assert!(out.listings[0]
            .full_text_content
            .ends_with("\nInfrastructure: Метро: Абай"));
    }
}
