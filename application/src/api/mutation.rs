//! GraphQL [`Mutation`]s definitions.

use juniper::graphql_object;
use service::{
    command,
    domain::market::{Criteria, Location},
    Command as _,
};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Creates a new empty `Market` with the provided name.
    ///
    /// The `Market` gets the next sequential key of the authenticated
    /// investor and carries no filters until saved.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NAME_OCCUPIED` - provided `MarketName` is used by another `Market`
    ///                     of the authenticated investor.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createMarket",
            name = %name,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn create_market(
        name: api::market::Name,
        ctx: &Context,
    ) -> Result<api::Market, Error> {
        let owner_id = ctx.current_session().await?.owner_id;

        ctx.service()
            .execute(command::CreateMarket {
                owner_id,
                name: name.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Saves the `Market` with the provided filters, resolving its property
    /// count, density tier and supply status.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `MARKET_NOT_EXISTS` - the `Market` with the provided ID does not
    ///                         exist;
    /// - `NAME_OCCUPIED` - provided `MarketName` is used by another `Market`
    ///                     of the authenticated investor;
    /// - `NO_LOCATION` - provided location parts don't form a resolvable
    ///                   location;
    /// - `NO_CRITERIA` - all the provided filter bounds are unset;
    /// - `NEGATIVE_BOUND` - a provided filter bound is negative.
    #[tracing::instrument(
        skip_all,
        fields(
            assessed_value_max = ?assessed_value_max,
            assessed_value_min = ?assessed_value_min,
            city = ?city.as_ref().map(ToString::to_string),
            county = ?county.as_ref().map(ToString::to_string),
            estimated_value_max = ?estimated_value_max,
            estimated_value_min = ?estimated_value_min,
            gql.name = "saveMarket",
            id = %id,
            name = %name,
            otel.name = Self::SPAN_NAME,
            state = ?state.as_ref().map(ToString::to_string),
            units_max = ?units_max,
            units_min = ?units_min,
            year_built_max = ?year_built_max,
            year_built_min = ?year_built_min,
            zip_codes = ?zip_codes.as_ref().map(Vec::len),
        ),
    )]
    #[expect(clippy::too_many_arguments, reason = "still readable")]
    pub async fn save_market(
        id: api::market::Id,
        name: api::market::Name,
        city: Option<api::market::City>,
        state: Option<api::market::StateCode>,
        zip_codes: Option<Vec<api::market::ZipCode>>,
        county: Option<api::market::County>,
        units_min: Option<i32>,
        units_max: Option<i32>,
        assessed_value_min: Option<i32>,
        assessed_value_max: Option<i32>,
        estimated_value_min: Option<i32>,
        estimated_value_max: Option<i32>,
        year_built_min: Option<i32>,
        year_built_max: Option<i32>,
        ctx: &Context,
    ) -> Result<api::Market, Error> {
        let bound = |b: Option<i32>| {
            u32::try_from(b.unwrap_or(0))
                .map_err(|_| Error::from(SaveError::NegativeBound))
                .map_err(ctx.error())
        };
        let criteria = Criteria {
            units: (bound(units_min)?, bound(units_max)?).into(),
            assessed_value: (
                bound(assessed_value_min)?,
                bound(assessed_value_max)?,
            )
                .into(),
            estimated_value: (
                bound(estimated_value_min)?,
                bound(estimated_value_max)?,
            )
                .into(),
            year_built: (bound(year_built_min)?, bound(year_built_max)?)
                .into(),
        };

        let location = Location::from_parts(
            city.map(Into::into),
            state.map(Into::into),
            zip_codes
                .unwrap_or_default()
                .into_iter()
                .map(Into::into)
                .collect(),
            county.map(Into::into),
        )
        .ok_or_else(|| Error::from(SaveError::NoLocation))
        .map_err(ctx.error())?;

        let owner_id = ctx.current_session().await?.owner_id;

        ctx.service()
            .execute(command::SaveMarket {
                id: id.into(),
                owner_id,
                name: name.into(),
                location,
                criteria,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Deletes the `Market` with the provided ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `MARKET_NOT_EXISTS` - the `Market` with the provided ID does not
    ///                         exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "deleteMarket",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn delete_market(
        id: api::market::Id,
        ctx: &Context,
    ) -> Result<api::Market, Error> {
        let owner_id = ctx.current_session().await?.owner_id;

        ctx.service()
            .execute(command::DeleteMarket {
                id: id.into(),
                owner_id,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

define_error! {
    enum SaveError {
        #[code = "NO_LOCATION"]
        #[status = BAD_REQUEST]
        #[message = "Provided location parts don't form a resolvable \
                     location"]
        NoLocation,

        #[code = "NEGATIVE_BOUND"]
        #[status = BAD_REQUEST]
        #[message = "Filter bounds must not be negative"]
        NegativeBound,
    }
}

impl AsError for command::create_market::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "NAME_OCCUPIED"]
                #[status = CONFLICT]
                #[message = "`MarketName` is used by another `Market` of the \
                             authenticated investor"]
                NameOccupied,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NameOccupied(_) => Some(Error::NameOccupied.into()),
        }
    }
}

impl AsError for command::save_market::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "MARKET_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Market` with the provided ID does not exist"]
                MarketNotExists,

                #[code = "NAME_OCCUPIED"]
                #[status = CONFLICT]
                #[message = "`MarketName` is used by another `Market` of the \
                             authenticated investor"]
                NameOccupied,

                #[code = "NO_CRITERIA"]
                #[status = BAD_REQUEST]
                #[message = "At least one filter bound must be set"]
                NoCriteria,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::MarketNotExists(_) => Error::MarketNotExists.into(),
            Self::NameOccupied(_) => Error::NameOccupied.into(),
            Self::NoCriteria => Error::NoCriteria.into(),
        })
    }
}

impl AsError for command::delete_market::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "MARKET_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Market` with the provided ID does not exist"]
                MarketNotExists,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::MarketNotExists(_) => Error::MarketNotExists.into(),
        })
    }
}
