//! [`SearchQuery`] definition.

use serde_json::{json, Map, Value};

use crate::domain::market::{Bounds, Criteria, Location};

use super::PAGE_SIZE;

/// Structured filter sent to the listing-search service.
///
/// A required location clause AND-ed with an OR-group holding a sub-clause
/// for every active numeric dimension, requesting identifiers only up to
/// [`PAGE_SIZE`].
#[derive(Clone, Debug, PartialEq)]
pub struct SearchQuery(Value);

impl SearchQuery {
    /// Builds a new [`SearchQuery`] out of the provided [`Location`] and
    /// [`Criteria`].
    ///
    /// Callers must reject empty [`Criteria`] beforehand: an empty OR-group
    /// would match the whole country.
    #[must_use]
    pub fn new(location: &Location, criteria: &Criteria) -> Self {
        let location_clause = match location {
            Location::CityState { city, state } => json!({
                "city": AsRef::<str>::as_ref(city),
                "state": AsRef::<str>::as_ref(state),
            }),
            Location::ZipCodes(codes) => json!({
                "zips": codes
                    .iter()
                    .map(AsRef::<str>::as_ref)
                    .collect::<Vec<_>>(),
            }),
            Location::CountyState { county, state } => json!({
                "county": AsRef::<str>::as_ref(county),
                "state": AsRef::<str>::as_ref(state),
            }),
        };

        let Criteria {
            units,
            assessed_value,
            estimated_value,
            year_built,
        } = criteria;
        let or_group = [
            ("units", units),
            ("assessed_value", assessed_value),
            ("estimated_value", estimated_value),
            ("year_built", year_built),
        ]
        .into_iter()
        .filter(|(_, bounds)| bounds.is_set())
        .map(|(dimension, bounds)| dimension_clause(dimension, *bounds))
        .collect::<Vec<_>>();

        Self(json!({
            "ids_only": true,
            "size": PAGE_SIZE,
            "and": [location_clause, {"or": or_group}],
        }))
    }

    /// Returns the JSON body of this [`SearchQuery`].
    #[must_use]
    pub fn body(&self) -> &Value {
        &self.0
    }
}

/// Builds the sub-clause of one numeric `dimension`, keeping only its
/// nonzero bounds.
fn dimension_clause(dimension: &str, bounds: Bounds) -> Value {
    let mut clause = Map::new();
    if bounds.min != 0 {
        drop(clause.insert(format!("{dimension}_min"), bounds.min.into()));
    }
    if bounds.max != 0 {
        drop(clause.insert(format!("{dimension}_max"), bounds.max.into()));
    }
    Value::Object(clause)
}

#[cfg(test)]
mod spec {
    use serde_json::json;

    use crate::domain::market::{
        City, County, Criteria, Location, StateCode, ZipCode,
    };

    use super::SearchQuery;

    fn units_only() -> Criteria {
        Criteria {
            units: (10, 40).into(),
            ..Criteria::default()
        }
    }

    #[test]
    fn city_query_shape() {
        let location = Location::CityState {
            city: City::new("Providence").unwrap(),
            state: StateCode::new("RI").unwrap(),
        };

        let query = SearchQuery::new(&location, &units_only());
        assert_eq!(
            *query.body(),
            json!({
                "ids_only": true,
                "size": 8000,
                "and": [
                    {"city": "Providence", "state": "RI"},
                    {"or": [{"units_min": 10, "units_max": 40}]},
                ],
            }),
        );
    }

    #[test]
    fn zip_and_county_location_clauses() {
        let zips = Location::ZipCodes(vec![
            ZipCode::new("02903").unwrap(),
            ZipCode::new("02904").unwrap(),
        ]);
        let query = SearchQuery::new(&zips, &units_only());
        assert_eq!(
            query.body()["and"][0],
            json!({"zips": ["02903", "02904"]}),
        );

        let county = Location::CountyState {
            county: County::new("Providence County").unwrap(),
            state: StateCode::new("RI").unwrap(),
        };
        let query = SearchQuery::new(&county, &units_only());
        assert_eq!(
            query.body()["and"][0],
            json!({"county": "Providence County", "state": "RI"}),
        );
    }

    #[test]
    fn only_active_dimensions_enter_the_or_group() {
        let location = Location::CityState {
            city: City::new("Providence").unwrap(),
            state: StateCode::new("RI").unwrap(),
        };
        let criteria = Criteria {
            units: (10, 0).into(),
            year_built: (0, 1980).into(),
            ..Criteria::default()
        };

        let query = SearchQuery::new(&location, &criteria);
        assert_eq!(
            query.body()["and"][1],
            json!({"or": [
                {"units_min": 10},
                {"year_built_max": 1980},
            ]}),
        );
    }
}
