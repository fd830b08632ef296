//! GraphQL API definitions.

pub mod market;
mod mutation;
mod query;
pub mod scalar;
mod subscription;
pub mod tier;

use crate::define_error;

pub use self::{
    market::Market, mutation::Mutation, query::Query,
    subscription::Subscription, tier::Tier,
};

/// GraphQL schema.
pub type Schema = juniper::RootNode<'static, Query, Mutation, Subscription>;

define_error! {
    enum PaginationError {
        #[code = "AMBIGUOUS_PAGINATION_ARGUMENTS"]
        #[status = BAD_REQUEST]
        #[message = "Ambiguous pagination arguments"]
        Ambiguous,
    }
}
