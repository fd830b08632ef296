//! GraphQL [`Query`]s definitions.

use itertools::Itertools as _;
use juniper::graphql_object;
use service::{domain, query, read, Query as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the authenticated investor's `Market` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `MARKET_NOT_EXISTS` - the `Market` with the specified ID does not
    ///                         exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "myMarket",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn my_market(
        id: api::market::Id,
        ctx: &Context,
    ) -> Result<api::market::list::Edge, Error> {
        Self::my_markets(None, Some(id.into()), None, Some(id.into()), None, ctx)
            .await?
            .edges()
            .into_iter()
            .exactly_one()
            .map_err(|_| MarketError::NotExists.into())
            .map_err(ctx.error())
    }

    /// Fetches the page of the authenticated investor's `Market`s.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AMBIGUOUS_PAGINATION_ARGUMENTS` - the pagination arguments are
    ///                                      ambiguous.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            before = ?before,
            first = ?first,
            gql.name = "myMarkets",
            last = ?last,
            name = ?name.as_ref().map(ToString::to_string),
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn my_markets(
        first: Option<i32>,
        after: Option<api::market::list::Cursor>,
        last: Option<i32>,
        before: Option<api::market::list::Cursor>,
        name: Option<api::market::Name>,
        ctx: &Context,
    ) -> Result<api::market::list::Connection, Error> {
        const DEFAULT_PAGE_SIZE: i32 = 10;

        let arguments = read::market::list::Arguments::new(
            first,
            after.map(Into::into),
            last,
            before.map(Into::into),
            DEFAULT_PAGE_SIZE,
        )
        .ok_or_else(|| api::PaginationError::Ambiguous.into())
        .map_err(ctx.error())?;

        let owner_id = ctx.current_session().await?.owner_id;

        ctx.service()
            .execute(query::markets::List::by(read::market::list::Selector {
                arguments,
                filter: read::market::list::Filter {
                    owner_id,
                    name: name.map(Into::into),
                },
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the fixed density `Tier` catalog.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "tiers",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    #[must_use]
    pub fn tiers() -> Vec<api::Tier> {
        domain::Tier::catalog().iter().map(Into::into).collect()
    }
}

define_error! {
    enum MarketError {
        #[code = "MARKET_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Market` with the specified ID does not exist"]
        NotExists,
    }
}
