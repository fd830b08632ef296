//! Geographic primitives.

use std::{fmt, str::FromStr};

use derive_more::{From, Into};

/// Geographic point in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    /// Latitude of this [`Coordinate`], in degrees.
    pub latitude: f64,

    /// Longitude of this [`Coordinate`], in degrees.
    pub longitude: f64,
}

impl Coordinate {
    /// Mean radius of the Earth, in [`Miles`].
    pub const EARTH_RADIUS: Miles = Miles(3959.0);

    /// Returns the great-circle distance between this [`Coordinate`] and the
    /// `other` one, computed with the Haversine formula.
    #[must_use]
    pub fn distance_to(self, other: Self) -> Miles {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lng = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);

        Miles(2.0 * Self::EARTH_RADIUS.0 * a.sqrt().atan2((1.0 - a).sqrt()))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            latitude,
            longitude,
        } = self;
        write!(f, "{latitude},{longitude}")
    }
}

impl FromStr for Coordinate {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (latitude, longitude) =
            s.split_once(',').ok_or("missing `,` separator")?;
        let latitude =
            latitude.trim().parse().map_err(|_| "invalid latitude")?;
        let longitude =
            longitude.trim().parse().map_err(|_| "invalid longitude")?;
        if !(-90.0..=90.0).contains(&latitude) {
            return Err("latitude out of range");
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err("longitude out of range");
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Distance in statute miles.
#[derive(Clone, Copy, Debug, From, Into, PartialEq, PartialOrd)]
pub struct Miles(f64);

impl fmt::Display for Miles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}mi", self.0)
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! Module providing integration with [`juniper`] crate.

    use std::str::FromStr as _;

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Geographic point in `{latitude},{longitude}` decimal-degrees format.
    #[graphql_scalar(with = Self, parse_token(String))]
    type Coordinate = super::Coordinate;

    impl Coordinate {
        fn to_output<S: ScalarValue>(c: &Coordinate) -> Value<S> {
            Value::scalar(c.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `Coordinate` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_str(s).map_err(|e| {
                        format!("Cannot parse `Coordinate` input scalar: {e}")
                    })
                })
        }
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use super::{Coordinate, Miles};

    const PROVIDENCE: Coordinate = Coordinate {
        latitude: 41.8240,
        longitude: -71.4128,
    };
    const BOSTON: Coordinate = Coordinate {
        latitude: 42.3601,
        longitude: -71.0589,
    };

    #[test]
    fn distance_between_known_points() {
        let miles = f64::from(PROVIDENCE.distance_to(BOSTON));
        assert!(
            (miles - 41.3).abs() < 1.0,
            "Providence-Boston should be ~41mi, got {miles}",
        );
    }

    #[test]
    fn distance_to_itself_is_zero() {
        let miles = f64::from(PROVIDENCE.distance_to(PROVIDENCE));
        assert!(miles.abs() < f64::EPSILON);
    }

    #[test]
    fn distance_is_symmetric() {
        let forth = f64::from(PROVIDENCE.distance_to(BOSTON));
        let back = f64::from(BOSTON.distance_to(PROVIDENCE));
        assert!((forth - back).abs() < 1e-9);
    }

    #[test]
    fn from_str() {
        assert_eq!(
            Coordinate::from_str("41.824,-71.4128").unwrap(),
            Coordinate {
                latitude: 41.824,
                longitude: -71.4128,
            },
        );

        assert!(Coordinate::from_str("41.824").is_err());
        assert!(Coordinate::from_str("91.0,0.0").is_err());
        assert!(Coordinate::from_str("0.0,181.0").is_err());
        assert!(Coordinate::from_str("north,west").is_err());
    }

    #[test]
    fn miles_ordering() {
        assert!(Miles::from(1.5) < Miles::from(2.0));
        assert!(Miles::from(2.0) >= Miles::from(2.0));
    }
}
