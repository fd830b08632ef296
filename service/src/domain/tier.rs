//! [`Tier`] definitions.

use common::define_kind;
use derive_more::{Display, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};

use super::market::PropertyCount;

/// The full [`Tier`] catalog, ordered by [`Rank`].
static CATALOG: [Tier; 6] = [
    Tier {
        rank: Rank(1),
        name: "Gateway metro",
        description: "Top-tier metro with deep rental demand and \
                      institutional competition",
        metro_ranks: MetroRanks { min: 1, max: 10 },
        recommended: CountRange {
            min: 1500,
            max: 8000,
        },
        sweet_spot: CountRange {
            min: 2500,
            max: 6000,
        },
    },
    Tier {
        rank: Rank(2),
        name: "Major metro",
        description: "Large metro with broad inventory and steady absorption",
        metro_ranks: MetroRanks { min: 11, max: 35 },
        recommended: CountRange {
            min: 1000,
            max: 6000,
        },
        sweet_spot: CountRange {
            min: 1800,
            max: 4000,
        },
    },
    Tier {
        rank: Rank(3),
        name: "Mid-size metro",
        description: "Regional hub balancing inventory depth against \
                      competition",
        metro_ranks: MetroRanks { min: 36, max: 75 },
        recommended: CountRange { min: 500, max: 4000 },
        sweet_spot: CountRange { min: 900, max: 2500 },
    },
    Tier {
        rank: Rank(4),
        name: "Small city",
        description: "Smaller city where general guidance applies and \
                      criteria usually need widening",
        metro_ranks: MetroRanks { min: 76, max: 150 },
        recommended: CountRange { min: 250, max: 2500 },
        sweet_spot: CountRange { min: 500, max: 1500 },
    },
    Tier {
        rank: Rank(5),
        name: "Secondary market",
        description: "Secondary market with thin but workable inventory",
        metro_ranks: MetroRanks { min: 151, max: 300 },
        recommended: CountRange { min: 100, max: 1500 },
        sweet_spot: CountRange { min: 250, max: 800 },
    },
    Tier {
        rank: Rank(6),
        name: "Tertiary market",
        description: "Tertiary market where every matching property counts",
        metro_ranks: MetroRanks { min: 301, max: 500 },
        recommended: CountRange { min: 50, max: 800 },
        sweet_spot: CountRange { min: 100, max: 400 },
    },
];

/// Density tier: a fixed classification band carrying the property-count
/// ranges a market of that density should aim for.
///
/// Tiers are compiled-in catalog data, totally ordered by [`Rank`] and not
/// user-editable.
#[derive(Clone, Copy, Debug)]
pub struct Tier {
    /// [`Rank`] of this [`Tier`].
    pub rank: Rank,

    /// Short name of this [`Tier`].
    pub name: &'static str,

    /// Guidance description of this [`Tier`].
    pub description: &'static str,

    /// Range of national metro-size rankings this [`Tier`] covers.
    pub metro_ranks: MetroRanks,

    /// Recommended property-count range for a market of this [`Tier`].
    pub recommended: CountRange,

    /// Ideal property-count sub-range within [`Tier::recommended`].
    pub sweet_spot: CountRange,
}

impl Tier {
    /// Returns the full [`Tier`] catalog, ordered by [`Rank`].
    #[must_use]
    pub fn catalog() -> &'static [Self] {
        &CATALOG
    }

    /// Returns the [`Tier`] with the provided [`Rank`], if it exists.
    #[must_use]
    pub fn by_rank(rank: Rank) -> Option<&'static Self> {
        Self::catalog().iter().find(|t| t.rank == rank)
    }

    /// Returns the fallback [`Tier`] assigned to markets matching no rental
    /// region, so every saved market always gets a usable classification.
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn fallback() -> &'static Self {
        Self::by_rank(Rank(4)).expect("rank 4 is always in the catalog")
    }

    /// Classifies the provided property `count` against the bands of this
    /// [`Tier`].
    ///
    /// All bounds are inclusive: a `count` equal to a recommended or
    /// sweet-spot bound belongs to the band that bound delimits.
    #[must_use]
    pub fn classify(&self, count: PropertyCount) -> Status {
        let count = u32::from(count);
        if count < self.recommended.min {
            Status {
                band: Band::Under,
                message: "Too few matching properties, broaden your criteria",
            }
        } else if self.sweet_spot.contains(count) {
            Status {
                band: Band::Ideal,
                message: "Ideal property pool for this market",
            }
        } else if count <= self.recommended.max {
            Status {
                band: Band::Acceptable,
                message: "Healthy property pool, outside the sweet spot",
            }
        } else {
            Status {
                band: Band::Over,
                message: "Too many matching properties, narrow your criteria",
            }
        }
    }
}

/// Rank of a [`Tier`]: lower means denser.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, Hash, Into, Ord, PartialEq,
    PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Rank(i16);

/// Range of national metro-size rankings a [`Tier`] covers.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct MetroRanks {
    /// Highest (smallest number) covered ranking.
    pub min: u16,

    /// Lowest (largest number) covered ranking.
    pub max: u16,
}

/// Inclusive property-count range of a [`Tier`] band.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct CountRange {
    /// Lower bound of this [`CountRange`].
    pub min: u32,

    /// Upper bound of this [`CountRange`].
    pub max: u32,
}

impl CountRange {
    /// Indicates whether the provided `count` falls into this [`CountRange`].
    #[must_use]
    pub fn contains(&self, count: u32) -> bool {
        (self.min..=self.max).contains(&count)
    }
}

/// Supply status of a market: the classification of its property count
/// against its [`Tier`] bands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Status {
    /// Categorical [`Band`] for UI coloring.
    pub band: Band,

    /// Short human-readable explanation.
    pub message: &'static str,
}

define_kind! {
    #[doc = "Categorical supply band of a market [`Status`]."]
    enum Band {
        #[doc = "Too few matching properties."]
        Under = 1,

        #[doc = "Within the recommended range, outside the sweet spot."]
        Acceptable = 2,

        #[doc = "Within the sweet spot."]
        Ideal = 3,

        #[doc = "Too many matching properties."]
        Over = 4,
    }
}

#[cfg(test)]
mod spec {
    use super::{Band, CountRange, MetroRanks, Rank, Tier};

    fn probe() -> Tier {
        Tier {
            rank: Rank(9),
            name: "Probe",
            description: "Synthetic tier exercising band boundaries",
            metro_ranks: MetroRanks { min: 1, max: 1 },
            recommended: CountRange { min: 50, max: 300 },
            sweet_spot: CountRange { min: 100, max: 200 },
        }
    }

    #[test]
    fn classifies_band_boundaries() {
        let tier = probe();

        let cases = [
            (49, Band::Under),
            (50, Band::Acceptable),
            (99, Band::Acceptable),
            (100, Band::Ideal),
            (150, Band::Ideal),
            (200, Band::Ideal),
            (201, Band::Acceptable),
            (300, Band::Acceptable),
            (301, Band::Over),
        ];
        for (count, band) in cases {
            assert_eq!(
                tier.classify(count.into()).band,
                band,
                "count {count} classified wrongly",
            );
        }
    }

    #[test]
    fn zero_count_is_under_everywhere() {
        for tier in Tier::catalog() {
            assert_eq!(tier.classify(0.into()).band, Band::Under);
        }
    }

    #[test]
    fn fallback_is_small_city() {
        assert_eq!(Tier::fallback().rank, Rank::from(4));
    }

    #[test]
    fn catalog_is_consistent() {
        for (i, tier) in Tier::catalog().iter().enumerate() {
            assert_eq!(
                usize::from(u16::try_from(i16::from(tier.rank)).unwrap()),
                i + 1,
                "catalog must be ordered by rank",
            );
            assert!(tier.recommended.min <= tier.sweet_spot.min);
            assert!(tier.sweet_spot.min <= tier.sweet_spot.max);
            assert!(tier.sweet_spot.max <= tier.recommended.max);
            assert!(tier.metro_ranks.min <= tier.metro_ranks.max);
            assert!(Tier::by_rank(tier.rank).is_some());
        }
    }
}
