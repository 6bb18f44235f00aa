//! Infrastructure filter matching.
//!
//! Decides whether a listing's nearby places satisfy a [`FilterSet`] and, if
//! so, renders the matched places into the summary that becomes part of the
//! listing's indexed text:
//!
//! ```text
//! Метро: Абай (300 м), Байконур. Школы: Школа № 12 (450 м)
//! ```

use std::collections::{HashMap, HashSet};

use crate::model::{FilterOperator, FilterSet, Place};

/// Outcome of matching one listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfraMatch {
    /// The listing satisfies the filters; `summary` is never empty.
    Qualified { summary: String },
    /// The listing must be dropped before indexing.
    Excluded,
}

impl InfraMatch {
    pub fn summary(&self) -> Option<&str> {
        match self {
            InfraMatch::Qualified { summary } => Some(summary),
            InfraMatch::Excluded => None,
        }
    }

    pub fn is_excluded(&self) -> bool {
        matches!(self, InfraMatch::Excluded)
    }
}

/// `(category, name_match)` with both sides lowercased.
type Requirement = (String, Option<String>);

/// Match `places` against `filters`.
///
/// Categories compare case-insensitively; a named filter additionally needs
/// its `name_match` as a case-insensitive substring of the place name. A
/// place can satisfy several requirements at once but is listed once. An
/// inactive filter set matches nothing, so callers check
/// [`FilterSet::is_active`] first.
pub fn match_places(filters: &FilterSet, places: &[Place]) -> InfraMatch {
    if !filters.is_active() {
        return InfraMatch::Excluded;
    }

    let required: HashSet<Requirement> = filters
        .filters
        .iter()
        .map(|f| {
            (
                f.category.to_lowercase(),
                f.name_match.as_ref().map(|n| n.to_lowercase()),
            )
        })
        .collect();

    let mut by_category: HashMap<&str, Vec<Option<&str>>> = HashMap::new();
    for (category, name) in &required {
        by_category
            .entry(category.as_str())
            .or_default()
            .push(name.as_deref());
    }

    let mut satisfied: HashSet<(&str, Option<&str>)> = HashSet::new();
    let mut matched: Vec<&Place> = Vec::new();

    for place in places {
        let category = place.category.to_lowercase();
        let Some((&stored_category, names)) = by_category.get_key_value(category.as_str()) else {
            continue;
        };
        let place_name = place.name.to_lowercase();
        let mut place_matched = false;
        for name in names {
            let hit = match name {
                None => true,
                Some(needle) => place_name.contains(needle),
            };
            if hit {
                satisfied.insert((stored_category, *name));
                place_matched = true;
            }
        }
        if place_matched {
            matched.push(place);
        }
    }

    let qualifies = match filters.operator {
        FilterOperator::And => required
            .iter()
            .all(|(c, n)| satisfied.contains(&(c.as_str(), n.as_deref()))),
        FilterOperator::Or => !satisfied.is_empty(),
    };
    if !qualifies || matched.is_empty() {
        return InfraMatch::Excluded;
    }

    let summary = render_summary(&matched);
    if summary.is_empty() {
        InfraMatch::Excluded
    } else {
        InfraMatch::Qualified { summary }
    }
}

/// Group labels by display title (first-seen order), dropping repeats.
fn render_summary(places: &[&Place]) -> String {
    let mut groups: Vec<(&str, Vec<String>)> = Vec::new();
    for place in places {
        let label = place.display_label();
        match groups.iter_mut().find(|(title, _)| *title == place.title) {
            Some((_, labels)) => {
                if !labels.contains(&label) {
                    labels.push(label);
                }
            }
            None => groups.push((place.title.as_str(), vec![label])),
        }
    }
    groups
        .into_iter()
        .map(|(title, labels)| format!("{title}: {}", labels.join(", ")))
        .collect::<Vec<_>>()
        .join(". ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InfrastructureFilter;

    fn metro_and_school(operator: FilterOperator) -> FilterSet {
        FilterSet::new(
            vec![
                InfrastructureFilter::named("metro", "Абай"),
                InfrastructureFilter::generic("school"),
            ],
            operator,
        )
    }

    #[test]
    fn test_and_requires_every_filter() {
        let places = vec![Place::new("metro", "Абай")];
        assert!(match_places(&metro_and_school(FilterOperator::And), &places).is_excluded());
    }

    #[test]
    fn test_or_requires_any_filter() {
        let places = vec![Place::new("metro", "Абай")];
        let result = match_places(&metro_and_school(FilterOperator::Or), &places);
        assert_eq!(result.summary(), Some("Инфраструктура: Абай"));
    }

    #[test]
    fn test_and_satisfied_renders_groups() {
        let places = vec![
            Place::new("metro", "Станция Абай").with_title("Метро").with_distance("300 м"),
            Place::new("school", "Школа № 12").with_title("Школы").with_distance("450 м"),
            Place::new("park", "Парк").with_title("Парки"),
            Place::new("school", "Лицей").with_title("Школы"),
        ];
        let result = match_places(&metro_and_school(FilterOperator::And), &places);
        assert_eq!(
            result.summary(),
            Some("Метро: Станция Абай (300 м). Школы: Школа № 12 (450 м), Лицей")
        );
    }

    #[test]
    fn test_case_insensitive_category_and_name() {
        let filters = FilterSet::new(
            vec![InfrastructureFilter::named("METRO", "абай")],
            FilterOperator::And,
        );
        let places = vec![Place::new("Metro", "АБАЙ")];
        assert!(!match_places(&filters, &places).is_excluded());
    }

    #[test]
    fn test_name_must_match_same_script() {
        let filters = FilterSet::new(
            vec![InfrastructureFilter::named("metro", "Abay")],
            FilterOperator::And,
        );
        let places = vec![Place::new("metro", "Абай")];
        assert!(match_places(&filters, &places).is_excluded());
    }

    #[test]
    fn test_duplicate_labels_collapsed() {
        let filters = FilterSet::new(vec![InfrastructureFilter::generic("shop")], FilterOperator::And);
        let places = vec![
            Place::new("shop", "Magnum").with_distance("100 м"),
            Place::new("shop", "Magnum").with_distance("100 м"),
            Place::new("shop", "Magnum").with_distance("900 м"),
        ];
        assert_eq!(
            match_places(&filters, &places).summary(),
            Some("Инфраструктура: Magnum (100 м), Magnum (900 м)")
        );
    }

    #[test]
    fn test_place_counted_once_when_matching_two_filters() {
        let filters = FilterSet::new(
            vec![
                InfrastructureFilter::generic("metro"),
                InfrastructureFilter::named("metro", "Алатау"),
            ],
            FilterOperator::And,
        );
        let places = vec![Place::new("metro", "Алатау")];
        assert_eq!(
            match_places(&filters, &places).summary(),
            Some("Инфраструктура: Алатау")
        );
    }

    #[test]
    fn test_inactive_or_empty_places_excluded() {
        assert!(match_places(&FilterSet::default(), &[Place::new("metro", "Абай")]).is_excluded());
        assert!(match_places(&metro_and_school(FilterOperator::Or), &[]).is_excluded());
    }
}
