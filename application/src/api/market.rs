//! [`Market`]-related definitions.

use std::future;

use common::{geo::Coordinate, DateTime, Handler as _};
use derive_more::{AsRef, Display, From, Into};
use futures::TryFutureExt as _;
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::{domain, query};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{api, api::scalar, AsError, Context, Error};

/// A saved investment market.
#[derive(Clone, Debug, From)]
pub struct Market {
    /// ID of this [`Market`].
    id: Id,

    /// Underlying [`domain::Market`].
    market: OnceCell<domain::Market>,
}

impl From<domain::Market> for Market {
    fn from(market: domain::Market) -> Self {
        Self {
            id: market.id.into(),
            market: OnceCell::new_with(Some(market)),
        }
    }
}

impl Market {
    /// Creates a new [`Market`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that [`Market`] with the provided ID exists and
    /// belongs to the authenticated investor, otherwise accessing this
    /// [`Market`] will result with an error.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            market: OnceCell::new(),
        }
    }

    /// Returns the underlying [`domain::Market`].
    ///
    /// # Errors
    ///
    /// Errors if the [`domain::Market`] doesn't exist or belongs to another
    /// investor.
    async fn market(&self, ctx: &Context) -> Result<&domain::Market, Error> {
        let id = self.id.into();
        let owner_id = ctx.current_session().await?.owner_id;
        self.market
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::market::ById::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(move |m| {
                        future::ready(
                            m.filter(|m| m.owner_id == owner_id).ok_or_else(
                                || api::query::MarketError::NotExists.into(),
                            ),
                        )
                    })
            })
            .await
    }
}

/// A saved investment market.
#[graphql_object(context = Context)]
impl Market {
    /// Unique identifier of this `Market`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Market.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Stable sequential key of this `Market`, like `Market3`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Market.key",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn key(&self, ctx: &Context) -> Result<String, Error> {
        Ok(self.market(ctx).await?.key.to_string())
    }

    /// Display name of this `Market`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Market.name",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn name(&self, ctx: &Context) -> Result<Name, Error> {
        Ok(self.market(ctx).await?.name.clone().into())
    }

    /// Kind of this `Market`'s location, if one is set.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Market.locationKind",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn location_kind(
        &self,
        ctx: &Context,
    ) -> Result<Option<LocationKind>, Error> {
        Ok(self
            .market(ctx)
            .await?
            .location
            .as_ref()
            .map(|l| l.kind().into()))
    }

    /// City this `Market` searches in, if its location is a city.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Market.city",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn city(&self, ctx: &Context) -> Result<Option<City>, Error> {
        Ok(self
            .market(ctx)
            .await?
            .location
            .as_ref()
            .and_then(domain::market::Location::city)
            .cloned()
            .map(Into::into))
    }

    /// State code of this `Market`'s location, if it has one.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Market.state",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn state(
        &self,
        ctx: &Context,
    ) -> Result<Option<StateCode>, Error> {
        Ok(self
            .market(ctx)
            .await?
            .location
            .as_ref()
            .and_then(domain::market::Location::state)
            .cloned()
            .map(Into::into))
    }

    /// ZIP codes this `Market` searches in, if its location is a ZIP list.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Market.zipCodes",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn zip_codes(
        &self,
        ctx: &Context,
    ) -> Result<Option<Vec<ZipCode>>, Error> {
        Ok(self
            .market(ctx)
            .await?
            .location
            .as_ref()
            .and_then(domain::market::Location::zip_codes)
            .map(|codes| {
                codes.iter().cloned().map(Into::into).collect::<Vec<_>>()
            }))
    }

    /// County this `Market` searches in, if its location is a county.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Market.county",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn county(
        &self,
        ctx: &Context,
    ) -> Result<Option<County>, Error> {
        Ok(self
            .market(ctx)
            .await?
            .location
            .as_ref()
            .and_then(domain::market::Location::county)
            .cloned()
            .map(Into::into))
    }

    /// Lower bound on the number of units, `0` when unset.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Market.unitsMin",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn units_min(&self, ctx: &Context) -> Result<i32, Error> {
        i32::try_from(self.market(ctx).await?.criteria.units.min)
            .map_err(AsError::into_error)
    }

    /// Upper bound on the number of units, `0` when unset.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Market.unitsMax",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn units_max(&self, ctx: &Context) -> Result<i32, Error> {
        i32::try_from(self.market(ctx).await?.criteria.units.max)
            .map_err(AsError::into_error)
    }

    /// Lower bound on the assessed value, in US dollars, `0` when unset.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Market.assessedValueMin",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn assessed_value_min(
        &self,
        ctx: &Context,
    ) -> Result<i32, Error> {
        i32::try_from(self.market(ctx).await?.criteria.assessed_value.min)
            .map_err(AsError::into_error)
    }

    /// Upper bound on the assessed value, in US dollars, `0` when unset.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Market.assessedValueMax",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn assessed_value_max(
        &self,
        ctx: &Context,
    ) -> Result<i32, Error> {
        i32::try_from(self.market(ctx).await?.criteria.assessed_value.max)
            .map_err(AsError::into_error)
    }

    /// Lower bound on the estimated value, in US dollars, `0` when unset.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Market.estimatedValueMin",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn estimated_value_min(
        &self,
        ctx: &Context,
    ) -> Result<i32, Error> {
        i32::try_from(self.market(ctx).await?.criteria.estimated_value.min)
            .map_err(AsError::into_error)
    }

    /// Upper bound on the estimated value, in US dollars, `0` when unset.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Market.estimatedValueMax",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn estimated_value_max(
        &self,
        ctx: &Context,
    ) -> Result<i32, Error> {
        i32::try_from(self.market(ctx).await?.criteria.estimated_value.max)
            .map_err(AsError::into_error)
    }

    /// Lower bound on the construction year, `0` when unset.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Market.yearBuiltMin",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn year_built_min(&self, ctx: &Context) -> Result<i32, Error> {
        i32::try_from(self.market(ctx).await?.criteria.year_built.min)
            .map_err(AsError::into_error)
    }

    /// Upper bound on the construction year, `0` when unset.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Market.yearBuiltMax",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn year_built_max(&self, ctx: &Context) -> Result<i32, Error> {
        i32::try_from(self.market(ctx).await?.criteria.year_built.max)
            .map_err(AsError::into_error)
    }

    /// Number of matching properties resolved on the last save, if any.
    ///
    /// Capped at the listing-search page size, so it measures "at least this
    /// many" once the cap is reached.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Market.propertyCount",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn property_count(
        &self,
        ctx: &Context,
    ) -> Result<Option<i32>, Error> {
        self.market(ctx)
            .await?
            .resolution
            .as_ref()
            .map(|r| {
                i32::try_from(u32::from(r.property_count))
                    .map_err(AsError::into_error)
            })
            .transpose()
    }

    /// Representative coordinate of one matching property, if any.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Market.coordinate",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn coordinate(
        &self,
        ctx: &Context,
    ) -> Result<Option<Coordinate>, Error> {
        Ok(self
            .market(ctx)
            .await?
            .resolution
            .as_ref()
            .and_then(|r| r.coordinate))
    }

    /// Density tier assigned on the last save, if any.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Market.tier",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn tier(
        &self,
        ctx: &Context,
    ) -> Result<Option<api::Tier>, Error> {
        Ok(self
            .market(ctx)
            .await?
            .resolution
            .as_ref()
            .and_then(|r| domain::Tier::by_rank(r.tier))
            .map(Into::into))
    }

    /// Supply status of this `Market`, if it's resolved.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Market.status",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn status(
        &self,
        ctx: &Context,
    ) -> Result<Option<api::tier::Status>, Error> {
        Ok(self.market(ctx).await?.status().map(Into::into))
    }

    /// `DateTime` when this `Market` was resolved last time.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Market.resolvedAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn resolved_at(
        &self,
        ctx: &Context,
    ) -> Result<Option<DateTime>, Error> {
        Ok(self
            .market(ctx)
            .await?
            .resolution
            .as_ref()
            .map(|r| r.resolved_at.coerce()))
    }

    /// `DateTime` when this `Market` was created.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Market.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn created_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.market(ctx).await?.created_at.coerce())
    }

    /// `DateTime` when this `Market` was updated last time.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Market.updatedAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn updated_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.market(ctx).await?.updated_at.coerce())
    }
}

/// Unique identifier of a `Market`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::market::Id)]
#[into(domain::market::Id)]
#[graphql(name = "MarketId", transparent)]
pub struct Id(Uuid);

/// Display name of a `Market`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "MarketName",
    with = scalar::Via::<domain::market::Name>,
)]
pub struct Name(domain::market::Name);

/// City of a `Market` location.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "MarketCity",
    with = scalar::Via::<domain::market::City>,
)]
pub struct City(domain::market::City);

/// Two-letter US state code of a `Market` location.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "MarketStateCode",
    with = scalar::Via::<domain::market::StateCode>,
)]
pub struct StateCode(domain::market::StateCode);

/// 5-digit US ZIP code of a `Market` location.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "MarketZipCode",
    with = scalar::Via::<domain::market::ZipCode>,
)]
pub struct ZipCode(domain::market::ZipCode);

/// County of a `Market` location.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "MarketCounty",
    with = scalar::Via::<domain::market::County>,
)]
pub struct County(domain::market::County);

/// Kind of a `Market` location.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "MarketLocationKind")]
pub enum LocationKind {
    /// A city within a state.
    CityState,

    /// A list of ZIP codes.
    ZipCodes,

    /// A county within a state.
    CountyState,
}

impl From<domain::market::LocationKind> for LocationKind {
    fn from(kind: domain::market::LocationKind) -> Self {
        use domain::market::LocationKind as K;
        match kind {
            K::CityState => Self::CityState,
            K::ZipCodes => Self::ZipCodes,
            K::CountyState => Self::CountyState,
        }
    }
}

pub mod list {
    //! Definitions related to the [`Market`] list.

    use derive_more::{AsRef, From, Into};
    use juniper::{graphql_object, GraphQLScalar};
    use service::{query, read, Query as _};

    use super::{Id, Market};
    use crate::{api::scalar, AsError, Context, Error};

    /// Cursor for the `Market` list.
    #[derive(AsRef, Clone, Copy, Debug, From, GraphQLScalar, Into)]
    #[from(Id, read::market::list::Cursor)]
    #[graphql(
        name = "MarketListCursor",
        with = scalar::Via::<read::market::list::Cursor>,
    )]
    pub struct Cursor(pub read::market::list::Cursor);

    /// Edge in the [`Market`] list.
    #[derive(Clone, Copy, Debug, From, Into)]
    pub struct Edge(read::market::list::Edge);

    /// Edge in the `Market` list.
    #[graphql_object(name = "MarketListEdge", context = Context)]
    impl Edge {
        /// Cursor of this `MarketListEdge`.
        #[must_use]
        pub fn cursor(&self) -> Cursor {
            self.0.cursor.into()
        }

        /// Node of this `MarketListEdge`.
        #[must_use]
        pub fn node(&self) -> Market {
            #[expect(
                unsafe_code,
                reason = "`Edge` loaded from repository guarantees `Market` \
                          existence"
            )]
            unsafe {
                Market::new_unchecked(self.0.node)
            }
        }
    }

    /// Connection of the [`Market`] list.
    #[derive(Clone, Debug, From, Into)]
    pub struct Connection(read::market::list::Connection);

    /// Connection of the `Market` list.
    #[graphql_object(name = "MarketListConnection", context = Context)]
    impl Connection {
        /// Edges of this `MarketListConnection`.
        #[must_use]
        pub fn edges(&self) -> Vec<Edge> {
            self.0.edges.iter().copied().map(Into::into).collect()
        }

        /// Information about the page.
        #[must_use]
        pub fn page_info(&self) -> PageInfo {
            PageInfo {
                info: self.0.page_info(),
                start_cursor: self.0.edges.first().map(|e| e.cursor.into()),
                end_cursor: self.0.edges.last().map(|e| e.cursor.into()),
            }
        }
    }

    /// Information about a [`Connection`] page.
    #[derive(Clone, Copy, Debug)]
    pub struct PageInfo {
        /// Underlying [`read::market::list::PageInfo`].
        info: read::market::list::PageInfo,

        /// Start cursor of the page.
        start_cursor: Option<Cursor>,

        /// End cursor of the page.
        end_cursor: Option<Cursor>,
    }

    /// Information about a `MarketListConnection` page.
    #[graphql_object(name = "MarketListPageInfo", context = Context)]
    impl PageInfo {
        /// Indicator whether there is a next page.
        #[must_use]
        pub fn has_next_page(&self) -> bool {
            self.info.has_next_page
        }

        /// Indicator whether there is a previous page.
        #[must_use]
        pub fn has_previous_page(&self) -> bool {
            self.info.has_previous_page
        }

        /// Start cursor of the page.
        #[must_use]
        pub fn start_cursor(&self) -> &Option<Cursor> {
            &self.start_cursor
        }

        /// End cursor of the page.
        #[must_use]
        pub fn end_cursor(&self) -> &Option<Cursor> {
            &self.end_cursor
        }

        /// Total count of the authenticated investor's `Market`s.
        pub async fn total_count(&self, ctx: &Context) -> Result<i32, Error> {
            let owner_id = ctx.current_session().await?.owner_id;
            ctx.service()
                .execute(query::markets::TotalCount::by(owner_id))
                .await
                .map_err(AsError::into_error)
                .map_err(ctx.error())
                .map(Into::into)
        }
    }
}
