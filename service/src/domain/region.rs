//! [`Region`] definitions.

use common::geo::{Coordinate, Miles};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::tier;

/// Reference rental region: a named metro area assigning a density tier to
/// every [`Market`] resolving nearby.
///
/// Catalog data, changed rarely and only by operators.
///
/// [`Market`]: super::Market
#[derive(Clone, Debug)]
pub struct Region {
    /// ID of this [`Region`].
    pub id: Id,

    /// Display name of this [`Region`], like `Providence, RI`.
    pub city_state: CityState,

    /// Center [`Coordinate`] of this [`Region`].
    ///
    /// A [`Region`] without a center never matches.
    pub center: Option<Coordinate>,

    /// Inclusion radius of this [`Region`] around its center.
    pub radius: Miles,

    /// Density tier [`Rank`] of this [`Region`].
    ///
    /// [`Rank`]: tier::Rank
    pub tier: tier::Rank,
}

impl Region {
    /// Indicates whether the provided `point` falls within the radius of
    /// this [`Region`].
    #[must_use]
    pub fn contains(&self, point: Coordinate) -> bool {
        self.center
            .is_some_and(|center| center.distance_to(point) <= self.radius)
    }

    /// Finds the [`Region`] the provided `point` belongs to.
    ///
    /// The `catalog` is scanned in its stored order and the first [`Region`]
    /// containing the `point` wins, even if a later one is nearer. [`None`]
    /// means no [`Region`] contains the `point` and the caller should fall
    /// back to the default tier.
    #[must_use]
    pub fn find(catalog: &[Self], point: Coordinate) -> Option<&Self> {
        catalog.iter().find(|region| region.contains(point))
    }
}

/// ID of a [`Region`].
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

/// Display name of a [`Region`], like `Providence, RI`.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct CityState(String);

impl CityState {
    /// Creates a new [`CityState`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `name` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a new [`CityState`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`CityState`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && !name.is_empty() && name.len() <= 512
    }
}

impl FromStr for CityState {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `CityState`")
    }
}

#[cfg(test)]
mod spec {
    use common::geo::Coordinate;
    use uuid::Uuid;

    use crate::domain::tier;

    use super::{CityState, Region};

    fn region(name: &str, center: Option<Coordinate>, radius: f64) -> Region {
        Region {
            id: Uuid::new_v4().into(),
            city_state: CityState::new(name).unwrap(),
            center,
            radius: radius.into(),
            tier: tier::Rank::from(2),
        }
    }

    const PROVIDENCE: Coordinate = Coordinate {
        latitude: 41.8240,
        longitude: -71.4128,
    };
    const BOSTON: Coordinate = Coordinate {
        latitude: 42.3601,
        longitude: -71.0589,
    };
    const DENVER: Coordinate = Coordinate {
        latitude: 39.7392,
        longitude: -104.9903,
    };

    #[test]
    fn finds_single_containing_region() {
        let catalog = [
            region("Denver, CO", Some(DENVER), 50.0),
            region("Boston, MA", Some(BOSTON), 25.0),
        ];

        let point = Coordinate {
            latitude: 42.3,
            longitude: -71.1,
        };
        let found = Region::find(&catalog, point).unwrap();
        assert_eq!(found.city_state.to_string(), "Boston, MA");
    }

    #[test]
    fn no_containing_region_yields_none() {
        let catalog = [
            region("Denver, CO", Some(DENVER), 50.0),
            region("Boston, MA", Some(BOSTON), 25.0),
        ];

        let nowhere = Coordinate {
            latitude: 21.3,
            longitude: -157.8,
        };
        assert!(Region::find(&catalog, nowhere).is_none());
    }

    #[test]
    fn overlapping_regions_resolve_by_catalog_order() {
        // A point ~32mi from Providence and ~11mi from Boston: both radii
        // contain it, and the catalog row wins over the nearer center.
        let point = Coordinate {
            latitude: 42.2,
            longitude: -71.1,
        };
        let catalog = [
            region("Providence, RI", Some(PROVIDENCE), 50.0),
            region("Boston, MA", Some(BOSTON), 50.0),
        ];

        assert!(catalog[0].contains(point));
        assert!(catalog[1].contains(point));
        let to_providence =
            f64::from(PROVIDENCE.distance_to(point));
        let to_boston = f64::from(BOSTON.distance_to(point));
        assert!(to_boston < to_providence, "Boston must be the nearer one");

        let found = Region::find(&catalog, point).unwrap();
        assert_eq!(found.city_state.to_string(), "Providence, RI");
    }

    #[test]
    fn centerless_region_never_matches() {
        let catalog = [
            region("Unmapped, XX", None, 10_000.0),
            region("Boston, MA", Some(BOSTON), 25.0),
        ];

        let found = Region::find(&catalog, BOSTON).unwrap();
        assert_eq!(found.city_state.to_string(), "Boston, MA");
    }
}
