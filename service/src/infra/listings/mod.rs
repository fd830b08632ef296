//! [`Listings`]-related implementations.
//!
//! The listing-search service is the external source of truth for "how many
//! properties match a market's filters". It's consumed through the same
//! [`Handler`]-based abstraction as the database, so commands stay generic
//! over the transport.
//!
//! [`Handler`]: common::Handler

#[cfg(feature = "listings")]
pub mod http;
mod query;

use common::geo::Coordinate;
use derive_more::{AsRef, Display, Error as StdError, From};
use serde_json::Value;

use crate::domain::market::PropertyCount;

#[cfg(feature = "listings")]
pub use self::http::Http;
pub use self::query::SearchQuery;

/// Listing-search operation.
pub use common::Handler as Listings;

/// Maximum number of property identifiers requested from the listing-search
/// service in one page.
///
/// Resolved property counts are capped here by design: the cap is the count,
/// not the upstream's true total.
pub const PAGE_SIZE: usize = 8000;

/// ID of a property in the listing-search service.
///
/// Opaque: the upstream reports both string and numeric identifiers, so
/// they're carried verbatim as text.
#[derive(AsRef, Clone, Debug, Display, Eq, From, Hash, PartialEq)]
#[as_ref(forward)]
#[from(String, &str)]
pub struct PropertyId(String);

/// Identifiers of the properties matching a [`SearchQuery`], truncated at
/// [`PAGE_SIZE`].
#[derive(Clone, Debug, Default)]
pub struct Matches {
    /// IDs of the matching properties.
    pub ids: Vec<PropertyId>,
}

impl Matches {
    /// Parses [`Matches`] out of a listing-search response.
    ///
    /// The upstream reports either `{"ids": [...]}` or
    /// `{"data": [{"id" | "propertyId": ...}, ...]}`, with identifiers being
    /// strings or numbers. Anything unparsable is treated as no matches.
    #[must_use]
    pub fn from_response(response: &Value) -> Self {
        let mut ids = if let Some(ids) =
            response.get("ids").and_then(Value::as_array)
        {
            ids.iter().filter_map(id_of_value).collect::<Vec<_>>()
        } else if let Some(data) =
            response.get("data").and_then(Value::as_array)
        {
            data.iter()
                .filter_map(|record| {
                    record
                        .get("id")
                        .or_else(|| record.get("propertyId"))
                        .and_then(id_of_value)
                })
                .collect()
        } else {
            Vec::new()
        };
        ids.truncate(PAGE_SIZE);
        Self { ids }
    }

    /// Returns the [`PropertyCount`] of these [`Matches`].
    #[must_use]
    pub fn count(&self) -> PropertyCount {
        u32::try_from(self.ids.len()).unwrap_or(u32::MAX).into()
    }
}

/// Parses a [`PropertyId`] out of a JSON value.
fn id_of_value(value: &Value) -> Option<PropertyId> {
    match value {
        Value::String(s) => Some(s.as_str().into()),
        Value::Number(n) => Some(n.to_string().into()),
        Value::Null
        | Value::Bool(_)
        | Value::Array(_)
        | Value::Object(_) => None,
    }
}

/// Extracts the [`Coordinate`] of a full property record.
///
/// The upstream reports either `latitude`/`longitude` or `lat`/`lng`.
#[must_use]
pub fn record_coordinate(record: &Value) -> Option<Coordinate> {
    let field = |keys: [&str; 2]| {
        keys.into_iter()
            .find_map(|key| record.get(key).and_then(Value::as_f64))
    };
    Some(Coordinate {
        latitude: field(["latitude", "lat"])?,
        longitude: field(["longitude", "lng"])?,
    })
}

/// [`Listings`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    #[cfg(feature = "listings")]
    /// HTTP transport error.
    #[display("HTTP transport error: {_0}")]
    Transport(reqwest::Error),

    /// Listing-search service responded with a non-success status.
    #[display("listing-search service responded with status {_0}")]
    #[from(ignore)]
    UnexpectedStatus(#[error(not(source))] u16),
}

#[cfg(test)]
mod spec {
    use serde_json::json;

    use super::{record_coordinate, Matches, PAGE_SIZE};

    #[test]
    fn parses_ids_response() {
        let matches =
            Matches::from_response(&json!({"ids": ["a1", 42, "b2"]}));
        assert_eq!(u32::from(matches.count()), 3);
        assert_eq!(matches.ids[1].to_string(), "42");
    }

    #[test]
    fn parses_data_response() {
        let matches = Matches::from_response(&json!({"data": [
            {"id": "a1"},
            {"propertyId": 7},
            {"unrelated": true},
        ]}));
        assert_eq!(u32::from(matches.count()), 2);
    }

    #[test]
    fn caps_count_at_page_size() {
        let ids = (0..PAGE_SIZE + 5).collect::<Vec<_>>();
        let matches = Matches::from_response(&json!({"ids": ids}));
        assert_eq!(matches.ids.len(), PAGE_SIZE);
        assert_eq!(u32::from(matches.count()), 8000);
    }

    #[test]
    fn unparsable_response_means_no_matches() {
        assert_eq!(
            u32::from(Matches::from_response(&json!({"total": 5})).count()),
            0,
        );
    }

    #[test]
    fn reads_both_coordinate_shapes() {
        let full = record_coordinate(
            &json!({"latitude": 41.8, "longitude": -71.4}),
        )
        .unwrap();
        let short =
            record_coordinate(&json!({"lat": 41.8, "lng": -71.4})).unwrap();
        assert_eq!(full, short);

        assert!(record_coordinate(&json!({"latitude": 41.8})).is_none());
    }
}
