//! [`Market`] definitions.

use common::{define_kind, geo::Coordinate, unit, DateTimeOf};
#[cfg(doc)]
use common::DateTime;
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{region, tier, Tier};

/// User-defined investment search area with property filters.
#[derive(Clone, Debug)]
pub struct Market {
    /// ID of this [`Market`].
    pub id: Id,

    /// ID of the investor owning this [`Market`].
    ///
    /// A [`Market`] is exclusively owned: it's never shared between
    /// investors.
    pub owner_id: OwnerId,

    /// Sequential [`Key`] of this [`Market`] among the owner's markets.
    pub key: Key,

    /// Display [`Name`] of this [`Market`], unique per owner.
    pub name: Name,

    /// Geographic [`Location`] this [`Market`] searches in.
    ///
    /// [`None`] until the owner saves the [`Market`] for the first time.
    pub location: Option<Location>,

    /// Numeric filter [`Criteria`] of this [`Market`].
    pub criteria: Criteria,

    /// Cached [`Resolution`] of this [`Market`], if it was ever resolved.
    pub resolution: Option<Resolution>,

    /// [`DateTime`] when this [`Market`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Market`] was updated last time.
    pub updated_at: UpdateDateTime,

    /// [`DateTime`] when this [`Market`] was deleted, if it was.
    pub deleted_at: Option<DeletionDateTime>,
}

impl Market {
    /// Returns the [`Fingerprint`] of the current [`Location`] and
    /// [`Criteria`] of this [`Market`].
    ///
    /// [`None`] is returned while no [`Location`] is set.
    #[must_use]
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        self.location
            .as_ref()
            .map(|l| Fingerprint::new(l, &self.criteria))
    }

    /// Indicates whether the cached [`Resolution`] of this [`Market`] is
    /// stale.
    ///
    /// A [`Resolution`] is valid only while its [`Fingerprint`] matches the
    /// one of the current [`Location`] and [`Criteria`].
    #[must_use]
    pub fn is_stale(&self) -> bool {
        match (&self.resolution, self.fingerprint()) {
            (Some(res), Some(current)) => res.fingerprint != current,
            (Some(_) | None, _) => true,
        }
    }

    /// Returns the supply [`Status`] of this [`Market`], if it's resolved.
    ///
    /// [`Status`]: tier::Status
    #[must_use]
    pub fn status(&self) -> Option<tier::Status> {
        self.resolution.as_ref().map(|res| {
            Tier::by_rank(res.tier)
                .unwrap_or_else(Tier::fallback)
                .classify(res.property_count)
        })
    }
}

/// ID of a [`Market`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
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

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// ID of the investor owning a [`Market`].
///
/// Issued by the external authentication provider, so never generated here.
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
pub struct OwnerId(Uuid);

/// Sequential key of a [`Market`] among its owner's markets.
///
/// Assigned once at creation and stable for the whole [`Market`] lifetime.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, Hash, Into, Ord, PartialEq,
    PartialOrd,
)]
#[display("Market{_0}")]
pub struct Key(u16);

impl Key {
    /// The very first [`Key`] assigned to an owner's [`Market`].
    pub const FIRST: Self = Self(1);
}

/// Display name of a [`Market`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `name` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && !name.is_empty() && name.len() <= 512
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// City a [`Market`] searches in.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct City(String);

impl City {
    /// Creates a new [`City`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `city` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(city: impl Into<String>) -> Self {
        Self(city.into())
    }

    /// Creates a new [`City`] if the given `city` is valid.
    #[must_use]
    pub fn new(city: impl Into<String>) -> Option<Self> {
        let city = city.into();
        Self::check(&city).then_some(Self(city))
    }

    /// Checks whether the given `city` is a valid [`City`].
    fn check(city: impl AsRef<str>) -> bool {
        let city = city.as_ref();
        city.trim() == city && !city.is_empty() && city.len() <= 512
    }
}

impl FromStr for City {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `City`")
    }
}

/// Two-letter US state code of a [`Market`] location.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct StateCode(String);

impl StateCode {
    /// Creates a new [`StateCode`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `code` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Creates a new [`StateCode`] if the given `code` is valid.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Option<Self> {
        let code = code.into();
        Self::check(&code).then_some(Self(code))
    }

    /// Checks whether the given `code` is a valid [`StateCode`].
    fn check(code: impl AsRef<str>) -> bool {
        let code = code.as_ref();
        code.len() == 2 && code.chars().all(|c| c.is_ascii_uppercase())
    }
}

impl FromStr for StateCode {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_ascii_uppercase()).ok_or("invalid `StateCode`")
    }
}

/// 5-digit US ZIP code of a [`Market`] location.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct ZipCode(String);

impl ZipCode {
    /// Creates a new [`ZipCode`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `code` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Creates a new [`ZipCode`] if the given `code` is valid.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Option<Self> {
        let code = code.into();
        Self::check(&code).then_some(Self(code))
    }

    /// Checks whether the given `code` is a valid [`ZipCode`].
    fn check(code: impl AsRef<str>) -> bool {
        let code = code.as_ref();
        code.len() == 5 && code.chars().all(|c| c.is_ascii_digit())
    }
}

impl FromStr for ZipCode {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `ZipCode`")
    }
}

/// County a [`Market`] searches in.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct County(String);

impl County {
    /// Creates a new [`County`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `county` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(county: impl Into<String>) -> Self {
        Self(county.into())
    }

    /// Creates a new [`County`] if the given `county` is valid.
    #[must_use]
    pub fn new(county: impl Into<String>) -> Option<Self> {
        let county = county.into();
        Self::check(&county).then_some(Self(county))
    }

    /// Checks whether the given `county` is a valid [`County`].
    fn check(county: impl AsRef<str>) -> bool {
        let county = county.as_ref();
        county.trim() == county && !county.is_empty() && county.len() <= 512
    }
}

impl FromStr for County {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `County`")
    }
}

define_kind! {
    #[doc = "Kind of a [`Market`] [`Location`]."]
    enum LocationKind {
        #[doc = "A city within a state."]
        CityState = 1,

        #[doc = "A list of ZIP codes."]
        ZipCodes = 2,

        #[doc = "A county within a state."]
        CountyState = 3,
    }
}

/// Geographic location a [`Market`] searches in.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Location {
    /// A city within a state.
    CityState {
        /// [`City`] to search in.
        city: City,

        /// [`StateCode`] of the state the city belongs to.
        state: StateCode,
    },

    /// A list of ZIP codes.
    ///
    /// Never empty: [`Location::from_parts()`] refuses an empty list.
    ZipCodes(Vec<ZipCode>),

    /// A county within a state.
    CountyState {
        /// [`County`] to search in.
        county: County,

        /// [`StateCode`] of the state the county belongs to.
        state: StateCode,
    },
}

impl Location {
    /// Assembles a [`Location`] from the provided optional parts.
    ///
    /// ZIP codes take precedence over a county, and a county over a city.
    /// [`None`] is returned if no combination forms a resolvable
    /// [`Location`].
    #[must_use]
    pub fn from_parts(
        city: Option<City>,
        state: Option<StateCode>,
        zip_codes: Vec<ZipCode>,
        county: Option<County>,
    ) -> Option<Self> {
        if !zip_codes.is_empty() {
            return Some(Self::ZipCodes(zip_codes));
        }
        let state = state?;
        if let Some(county) = county {
            return Some(Self::CountyState { county, state });
        }
        city.map(|city| Self::CityState { city, state })
    }

    /// Returns [`LocationKind`] of this [`Location`].
    #[must_use]
    pub fn kind(&self) -> LocationKind {
        match self {
            Self::CityState { .. } => LocationKind::CityState,
            Self::ZipCodes(_) => LocationKind::ZipCodes,
            Self::CountyState { .. } => LocationKind::CountyState,
        }
    }

    /// Returns the [`City`] of this [`Location`], if any.
    #[must_use]
    pub fn city(&self) -> Option<&City> {
        match self {
            Self::CityState { city, .. } => Some(city),
            Self::ZipCodes(_) | Self::CountyState { .. } => None,
        }
    }

    /// Returns the [`StateCode`] of this [`Location`], if any.
    #[must_use]
    pub fn state(&self) -> Option<&StateCode> {
        match self {
            Self::CityState { state, .. } | Self::CountyState { state, .. } => {
                Some(state)
            }
            Self::ZipCodes(_) => None,
        }
    }

    /// Returns the ZIP codes of this [`Location`], if any.
    #[must_use]
    pub fn zip_codes(&self) -> Option<&[ZipCode]> {
        match self {
            Self::ZipCodes(codes) => Some(codes),
            Self::CityState { .. } | Self::CountyState { .. } => None,
        }
    }

    /// Returns the [`County`] of this [`Location`], if any.
    #[must_use]
    pub fn county(&self) -> Option<&County> {
        match self {
            Self::CountyState { county, .. } => Some(county),
            Self::CityState { .. } | Self::ZipCodes(_) => None,
        }
    }
}

/// Inclusive numeric bounds of one filter dimension.
///
/// A bound of `0` means "unset", and the whole dimension is inactive while
/// both bounds are `0`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Bounds {
    /// Lower bound, `0` when unset.
    pub min: u32,

    /// Upper bound, `0` when unset.
    pub max: u32,
}

impl Bounds {
    /// Indicates whether this filter dimension is active.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.min != 0 || self.max != 0
    }
}

impl From<(u32, u32)> for Bounds {
    fn from((min, max): (u32, u32)) -> Self {
        Self { min, max }
    }
}

/// Numeric filter criteria of a [`Market`].
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Criteria {
    /// [`Bounds`] on the number of units in a property.
    pub units: Bounds,

    /// [`Bounds`] on the assessed value of a property, in US dollars.
    pub assessed_value: Bounds,

    /// [`Bounds`] on the estimated value of a property, in US dollars.
    pub estimated_value: Bounds,

    /// [`Bounds`] on the year a property was built.
    pub year_built: Bounds,
}

impl Criteria {
    /// Indicates whether all the [`Bounds`] of this [`Criteria`] are unset.
    ///
    /// A [`Market`] with empty [`Criteria`] cannot be saved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let Self {
            units,
            assessed_value,
            estimated_value,
            year_built,
        } = self;
        !units.is_set()
            && !assessed_value.is_set()
            && !estimated_value.is_set()
            && !year_built.is_set()
    }
}

/// Fingerprint of a [`Market`]'s [`Location`] and [`Criteria`].
///
/// Detects staleness of the cached [`Resolution`] only: collisions are
/// acceptable, so this is no replacement for equality of the fields
/// themselves.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, Hash, Into, PartialEq,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Fingerprint(i32);

impl Fingerprint {
    /// Calculates a new [`Fingerprint`] for the provided [`Location`] and
    /// [`Criteria`].
    #[must_use]
    pub fn new(location: &Location, criteria: &Criteria) -> Self {
        // WARNING: Avoid changing the canonical form, because it will be a
        //          breaking change invalidating every cached resolution in
        //          the database at once.
        let mut canonical = String::with_capacity(128);
        match location {
            Location::CityState { city, state } => {
                canonical.push_str("city|");
                canonical.push_str(city.as_ref());
                canonical.push('|');
                canonical.push_str(state.as_ref());
            }
            Location::ZipCodes(codes) => {
                canonical.push_str("zips");
                for code in codes {
                    canonical.push('|');
                    canonical.push_str(code.as_ref());
                }
            }
            Location::CountyState { county, state } => {
                canonical.push_str("county|");
                canonical.push_str(county.as_ref());
                canonical.push('|');
                canonical.push_str(state.as_ref());
            }
        }
        let Criteria {
            units,
            assessed_value,
            estimated_value,
            year_built,
        } = criteria;
        for Bounds { min, max } in
            [units, assessed_value, estimated_value, year_built]
        {
            canonical.push_str(&format!("|{min}|{max}"));
        }

        Self(canonical.encode_utf16().fold(0_i32, |hash, unit| {
            hash.wrapping_mul(31).wrapping_add(i32::from(unit))
        }))
    }
}

/// Number of properties matching a [`Market`]'s filters, capped at the
/// listing-search page size.
///
/// Measures "how many IDs were returned up to the cap", so counts are
/// right-censored at the cap rather than being the upstream's true total.
#[derive(
    Clone, Copy, Debug, Default, Display, Eq, From, Hash, Into, Ord,
    PartialEq, PartialOrd,
)]
pub struct PropertyCount(u32);

/// Cached resolution of a [`Market`] against the listing-search service and
/// the rental-region catalog.
#[derive(Clone, Copy, Debug)]
pub struct Resolution {
    /// [`Fingerprint`] of the [`Location`] and [`Criteria`] this
    /// [`Resolution`] was computed for.
    pub fingerprint: Fingerprint,

    /// Number of matching properties.
    pub property_count: PropertyCount,

    /// Representative [`Coordinate`] of one matching property, if any.
    pub coordinate: Option<Coordinate>,

    /// ID of the matched rental [`Region`], if any.
    ///
    /// [`Region`]: region::Region
    pub region_id: Option<region::Id>,

    /// Assigned density tier [`Rank`].
    ///
    /// Falls back to [`Tier::fallback()`] when no [`Region`] matched.
    ///
    /// [`Rank`]: tier::Rank
    pub tier: tier::Rank,

    /// [`DateTime`] when this [`Resolution`] was computed.
    pub resolved_at: ResolutionDateTime,
}

/// [`DateTime`] when a [`Market`] was created.
pub type CreationDateTime = DateTimeOf<(Market, unit::Creation)>;

/// [`DateTime`] when a [`Market`] was updated.
pub type UpdateDateTime = DateTimeOf<(Market, unit::Update)>;

/// [`DateTime`] when a [`Market`] was resolved.
pub type ResolutionDateTime = DateTimeOf<(Market, unit::Resolution)>;

/// [`DateTime`] when a [`Market`] was deleted.
pub type DeletionDateTime = DateTimeOf<(Market, unit::Deletion)>;

#[cfg(test)]
mod spec {
    use super::{
        Bounds, City, County, Criteria, Fingerprint, Key, Location, Name,
        StateCode, ZipCode,
    };

    fn providence() -> Location {
        Location::CityState {
            city: City::new("Providence").unwrap(),
            state: StateCode::new("RI").unwrap(),
        }
    }

    fn full_criteria() -> Criteria {
        Criteria {
            units: (10, 40).into(),
            assessed_value: (100_000, 900_000).into(),
            estimated_value: (150_000, 950_000).into(),
            year_built: (1900, 2020).into(),
        }
    }

    #[test]
    fn fingerprint_is_deterministic() {
        assert_eq!(
            Fingerprint::new(&providence(), &full_criteria()),
            Fingerprint::new(&providence(), &full_criteria()),
        );
    }

    #[test]
    fn fingerprint_depends_on_every_bound() {
        let base = Fingerprint::new(&providence(), &full_criteria());

        let mutations: [fn(&mut Criteria); 8] = [
            |c| c.units.min += 1,
            |c| c.units.max += 1,
            |c| c.assessed_value.min += 1,
            |c| c.assessed_value.max += 1,
            |c| c.estimated_value.min += 1,
            |c| c.estimated_value.max += 1,
            |c| c.year_built.min += 1,
            |c| c.year_built.max += 1,
        ];
        for (i, mutate) in mutations.into_iter().enumerate() {
            let mut criteria = full_criteria();
            mutate(&mut criteria);
            assert_ne!(
                Fingerprint::new(&providence(), &criteria),
                base,
                "bound #{i} is not covered by the fingerprint",
            );
        }
    }

    #[test]
    fn fingerprint_depends_on_location() {
        let base = Fingerprint::new(&providence(), &full_criteria());

        let other_city = Location::CityState {
            city: City::new("Cranston").unwrap(),
            state: StateCode::new("RI").unwrap(),
        };
        assert_ne!(Fingerprint::new(&other_city, &full_criteria()), base);

        let other_state = Location::CityState {
            city: City::new("Providence").unwrap(),
            state: StateCode::new("UT").unwrap(),
        };
        assert_ne!(Fingerprint::new(&other_state, &full_criteria()), base);

        let zips =
            Location::ZipCodes(vec![ZipCode::new("02903").unwrap()]);
        assert_ne!(Fingerprint::new(&zips, &full_criteria()), base);

        let county = Location::CountyState {
            county: County::new("Providence County").unwrap(),
            state: StateCode::new("RI").unwrap(),
        };
        assert_ne!(Fingerprint::new(&county, &full_criteria()), base);
    }

    #[test]
    fn fingerprint_renders_as_decimal() {
        let rendered =
            Fingerprint::new(&providence(), &full_criteria()).to_string();
        assert!(
            rendered.parse::<i32>().is_ok(),
            "`{rendered}` is not a decimal 32-bit value",
        );
    }

    #[test]
    fn criteria_emptiness() {
        assert!(Criteria::default().is_empty());

        let mut criteria = Criteria::default();
        criteria.year_built.min = 1950;
        assert!(!criteria.is_empty());
        assert!(criteria.year_built.is_set());
        assert!(!criteria.units.is_set());
    }

    #[test]
    fn location_from_parts_precedence() {
        let city = City::new("Providence").unwrap();
        let state = StateCode::new("RI").unwrap();
        let county = County::new("Providence County").unwrap();
        let zip = ZipCode::new("02903").unwrap();

        let location = Location::from_parts(
            Some(city.clone()),
            Some(state.clone()),
            vec![zip.clone()],
            Some(county.clone()),
        )
        .unwrap();
        assert_eq!(location, Location::ZipCodes(vec![zip]));

        let location = Location::from_parts(
            Some(city.clone()),
            Some(state.clone()),
            vec![],
            Some(county.clone()),
        )
        .unwrap();
        assert_eq!(
            location,
            Location::CountyState {
                county,
                state: state.clone(),
            },
        );

        let location =
            Location::from_parts(Some(city.clone()), Some(state), vec![], None)
                .unwrap();
        assert!(matches!(location, Location::CityState { .. }));

        assert!(Location::from_parts(Some(city), None, vec![], None).is_none());
        assert!(Location::from_parts(None, None, vec![], None).is_none());
    }

    #[test]
    fn key_renders_with_prefix() {
        assert_eq!(Key::from(3).to_string(), "Market3");
        assert_eq!(Key::FIRST.to_string(), "Market1");
    }

    #[test]
    fn validates_newtypes() {
        assert!(Name::new("Rhode Island duplexes").is_some());
        assert!(Name::new("").is_none());
        assert!(Name::new(" padded ").is_none());

        assert!(StateCode::new("RI").is_some());
        assert!(StateCode::new("ri").is_none());
        assert!(StateCode::new("RHO").is_none());
        assert_eq!("ri".parse::<StateCode>().unwrap().to_string(), "RI");

        assert!(ZipCode::new("02903").is_some());
        assert!(ZipCode::new("2903").is_none());
        assert!(ZipCode::new("0290a").is_none());
    }
}
