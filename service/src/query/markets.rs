//! [`Query`] collection related to the multiple [`Market`]s.

use common::operations::By;

use crate::domain::market;
use crate::read;
#[cfg(doc)]
use crate::{domain::Market, Query};

use super::DatabaseQuery;

/// Queries a list of [`Market`]s.
pub type List =
    DatabaseQuery<By<read::market::list::Page, read::market::list::Selector>>;

/// Queries total count of one owner's [`Market`] list items.
pub type TotalCount =
    DatabaseQuery<By<read::market::list::TotalCount, market::OwnerId>>;
