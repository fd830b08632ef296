//! [`Query`] collection related to a single [`Market`].

use common::operations::By;

use crate::domain::{market, Market};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`Market`] by its ID.
pub type ById = DatabaseQuery<By<Option<Market>, market::Id>>;
