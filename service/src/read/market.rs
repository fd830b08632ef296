//! [`Market`]-related read definitions.

#[cfg(doc)]
use crate::domain::Market;

pub mod list {
    //! [`Market`] list definitions.

    use common::define_pagination;
    use derive_more::{From, Into};

    use crate::domain::market;
    #[cfg(doc)]
    use crate::domain::Market;

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Connection`].
    pub type Node = market::Id;

    /// Cursor pointing to a specific [`Market`] in a list.
    pub type Cursor = market::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Debug)]
    pub struct Filter {
        /// ID of the investor whose [`Market`]s are listed.
        ///
        /// Required: a [`Market`] list is always scoped to its owner.
        pub owner_id: market::OwnerId,

        /// [`market::Name`] (or its part) to fuzzy search for.
        pub name: Option<market::Name>,
    }

    /// Total count of one owner's [`Market`]s.
    #[derive(Clone, Copy, Debug, Eq, From, Hash, Into, PartialEq)]
    pub struct TotalCount(i32);
}
