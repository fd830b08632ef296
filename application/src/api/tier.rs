//! [`Tier`]-related definitions.

use derive_more::From;
use juniper::{graphql_object, GraphQLEnum};
use service::domain;

use crate::Context;

/// A density tier of the fixed classification catalog.
#[derive(Clone, Copy, Debug, From)]
pub struct Tier(&'static domain::tier::Tier);

/// A density tier of the fixed classification catalog.
#[graphql_object(context = Context)]
impl Tier {
    /// Rank of this `Tier`: lower means denser.
    #[must_use]
    pub fn rank(&self) -> i32 {
        i32::from(i16::from(self.0.rank))
    }

    /// Short name of this `Tier`.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.name
    }

    /// Guidance description of this `Tier`.
    #[must_use]
    pub fn description(&self) -> &str {
        self.0.description
    }

    /// Highest national metro-size ranking this `Tier` covers.
    #[must_use]
    pub fn metro_rank_min(&self) -> i32 {
        i32::from(self.0.metro_ranks.min)
    }

    /// Lowest national metro-size ranking this `Tier` covers.
    #[must_use]
    pub fn metro_rank_max(&self) -> i32 {
        i32::from(self.0.metro_ranks.max)
    }

    /// Lower bound of the recommended property-count range.
    #[expect(clippy::missing_panics_doc, reason = "catalog values are small")]
    #[must_use]
    pub fn recommended_min(&self) -> i32 {
        i32::try_from(self.0.recommended.min).expect("fits catalog bounds")
    }

    /// Upper bound of the recommended property-count range.
    #[expect(clippy::missing_panics_doc, reason = "catalog values are small")]
    #[must_use]
    pub fn recommended_max(&self) -> i32 {
        i32::try_from(self.0.recommended.max).expect("fits catalog bounds")
    }

    /// Lower bound of the sweet-spot property-count range.
    #[expect(clippy::missing_panics_doc, reason = "catalog values are small")]
    #[must_use]
    pub fn sweet_spot_min(&self) -> i32 {
        i32::try_from(self.0.sweet_spot.min).expect("fits catalog bounds")
    }

    /// Upper bound of the sweet-spot property-count range.
    #[expect(clippy::missing_panics_doc, reason = "catalog values are small")]
    #[must_use]
    pub fn sweet_spot_max(&self) -> i32 {
        i32::try_from(self.0.sweet_spot.max).expect("fits catalog bounds")
    }
}

/// Supply status of a `Market` against its `Tier` bands.
#[derive(Clone, Copy, Debug, From)]
pub struct Status(domain::tier::Status);

/// Supply status of a `Market` against its `Tier` bands.
#[graphql_object(name = "MarketStatus", context = Context)]
impl Status {
    /// Short human-readable explanation.
    #[must_use]
    pub fn message(&self) -> &str {
        self.0.message
    }

    /// Categorical band for UI coloring.
    #[must_use]
    pub fn band(&self) -> Band {
        self.0.band.into()
    }
}

/// Categorical supply band of a `MarketStatus`.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "MarketStatusBand")]
pub enum Band {
    /// Too few matching properties.
    Under,

    /// Within the recommended range, outside the sweet spot.
    Acceptable,

    /// Within the sweet spot.
    Ideal,

    /// Too many matching properties.
    Over,
}

impl From<domain::tier::Band> for Band {
    fn from(band: domain::tier::Band) -> Self {
        use domain::tier::Band as B;
        match band {
            B::Under => Self::Under,
            B::Acceptable => Self::Acceptable,
            B::Ideal => Self::Ideal,
            B::Over => Self::Over,
        }
    }
}
