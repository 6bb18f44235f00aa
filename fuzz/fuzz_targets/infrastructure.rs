//! Filter matching over arbitrary places: a qualified result always carries
//! a non-empty summary.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use listing_search::model::{FilterOperator, FilterSet, InfrastructureFilter, Place};
use listing_search::sources::{InfraMatch, match_places};

#[derive(Arbitrary, Debug)]
struct MatchInput {
    filters: Vec<(String, Option<String>)>,
    use_or: bool,
    places: Vec<(String, String, String)>,
}

fuzz_target!(|input: MatchInput| {
    let filters = FilterSet::new(
        input
            .filters
            .into_iter()
            .map(|(category, name)| match name {
                Some(name) => InfrastructureFilter::named(category, name),
                None => InfrastructureFilter::generic(category),
            })
            .collect(),
        if input.use_or {
            FilterOperator::Or
        } else {
            FilterOperator::And
        },
    );
    let places: Vec<Place> = input
        .places
        .into_iter()
        .map(|(category, name, title)| Place::new(category, name).with_title(title))
        .collect();

    match match_places(&filters, &places) {
        InfraMatch::Qualified { summary } => assert!(!summary.is_empty()),
        InfraMatch::Excluded => {}
    }
});
