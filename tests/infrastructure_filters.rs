//! Enrichment join and infrastructure filter tests, from JSON files on disk
//! through assembly into indexable listings.

use listing_search::model::{FilterOperator, FilterSet, InfrastructureFilter, Place};
use listing_search::sources::{
    InfraMatch, assemble_listings, load_enrichments, load_raw_listings, match_places,
};
use tempfile::TempDir;

mod util;

fn filters(specs: &[&str], operator: FilterOperator) -> FilterSet {
    FilterSet::new(
        specs
            .iter()
            .map(|s| s.parse::<InfrastructureFilter>().unwrap())
            .collect(),
        operator,
    )
}

fn school_and_street() -> Vec<Place> {
    vec![
        Place::new("school", "Школа-лицей №2").with_title("Школы"),
        Place::new("street", "проспект Абая").with_title("Улицы"),
        Place::new("park", "Парк Ганди").with_title("Парки"),
    ]
}

#[test]
fn and_requires_every_filter() {
    let places = school_and_street();
    let both = filters(&["school", "street=абай"], FilterOperator::And);
    assert_eq!(
        match_places(&both, &places).summary(),
        Some("Школы: Школа-лицей №2. Улицы: проспект Абая")
    );

    let missing = filters(&["school", "hospital"], FilterOperator::And);
    assert!(match_places(&missing, &places).is_excluded());
}

#[test]
fn or_needs_any_filter() {
    let places = school_and_street();
    let any = filters(&["hospital", "park"], FilterOperator::Or);
    assert_eq!(
        match_places(&any, &places),
        InfraMatch::Qualified {
            summary: "Парки: Парк Ганди".to_string()
        }
    );
}

#[test]
fn latin_name_does_not_match_cyrillic_place() {
    let places = school_and_street();
    let latin = filters(&["street=Abai"], FilterOperator::And);
    assert!(match_places(&latin, &places).is_excluded());
}

#[test]
fn assembly_from_files_keeps_input_order_and_drops_unmatched() {
    let dir = TempDir::new().unwrap();
    let raw = vec![
        util::raw_listing(30, "Третья"),
        util::raw_listing(10, "Первая"),
        util::raw_listing(20, "Вторая"),
    ];
    let enrichments = vec![
        util::enrichment(10, "  рядом школа  ", school_and_street()),
        util::enrichment(30, "у парка", vec![Place::new("park", "Парк Ганди")]),
    ];
    let raw_path = util::write_json(&dir, "raw.json", &raw);
    let enrichment_path = util::write_json(&dir, "enrichment.json", &enrichments);

    let raw = load_raw_listings(&raw_path).unwrap();
    let enrichments = load_enrichments(&enrichment_path).unwrap();

    let active = filters(&["park"], FilterOperator::And);
    let assembled = assemble_listings(&raw, &enrichments, &active);
    let ids: Vec<i64> = assembled.listings.iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![30, 10]);
    assert_eq!(assembled.dropped, 1);

    let first = &assembled.listings[0];
    assert_eq!(first.address, "ул. Абая 30");
    assert_eq!(first.price, 150_030);
    assert!(first.full_text_content.ends_with("\nInfrastructure: Инфраструктура: Парк Ганди"));

    let second = &assembled.listings[1];
    assert!(
        second
            .full_text_content
            .starts_with("Description: рядом школа\nTitle: Первая")
    );
}

#[test]
fn inactive_filters_keep_everything_without_summary() {
    let raw = vec![util::raw_listing(1, "A"), util::raw_listing(2, "B")];
    let assembled = assemble_listings(&raw, &[], &FilterSet::default());
    assert_eq!(assembled.listings.len(), 2);
    assert_eq!(assembled.dropped, 0);
    assert_eq!(
        assembled.listings[0].full_text_content,
        "Description: \nTitle: A"
    );
}

#[test]
fn enrichment_payload_with_text_alias_parses() {
    let dir = TempDir::new().unwrap();
    let path = util::write_text(
        dir.path(),
        "enrichment.json",
        r#"[{"id": 5, "text": "описание", "places": [
            {"category": "school", "name": "Школа №1", "distance": 350},
            {"category": "shop", "name": "Магнум", "title": "Магазины", "distance": "120 м"}
        ]}]"#,
    );
    let enrichments = load_enrichments(&path).unwrap();
    assert_eq!(enrichments[0].original_text, "описание");
    assert_eq!(enrichments[0].places[0].title, "Инфраструктура");
    assert_eq!(enrichments[0].places[0].distance.as_deref(), Some("350"));
    assert_eq!(enrichments[0].places[1].distance.as_deref(), Some("120 м"));
}
