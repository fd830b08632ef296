//! Background [`Task`]s definitions.

mod background;
pub mod purge_empty_markets;

pub use common::Handler as Task;

pub use self::{
    background::Background, purge_empty_markets::PurgeEmptyMarkets,
};
