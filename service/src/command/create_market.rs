//! [`Command`] for creating a new [`Market`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::market::{Key, Name};
use crate::{
    domain::{market, Market},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new empty [`Market`].
///
/// The [`Market`] starts with the next sequential [`Key`] of its owner, no
/// location and no criteria: it becomes resolvable only once the owner saves
/// it with filters.
#[derive(Clone, Debug)]
pub struct CreateMarket {
    /// ID of the investor owning the new [`Market`].
    pub owner_id: market::OwnerId,

    /// [`Name`] of the new [`Market`].
    pub name: market::Name,
}

impl<Db, Ls> Command<CreateMarket> for Service<Db, Ls>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Market, market::OwnerId>>,
            Err = Traced<database::Error>,
        > + for<'n> Database<
            Select<By<Option<market::Id>, (market::OwnerId, &'n market::Name)>>,
            Ok = Option<market::Id>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<market::Key, market::OwnerId>>,
            Ok = market::Key,
            Err = Traced<database::Error>,
        > + Database<Insert<Market>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Market;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateMarket) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateMarket { owner_id, name } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Serializes concurrent creations of the same owner, so sequential
        // `Key`s never collide.
        tx.execute(Lock(By::new(owner_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let occupied = tx
            .execute(Select(By::new((owner_id, &name))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if occupied.is_some() {
            return Err(tracerr::new!(E::NameOccupied(name)));
        }

        let key = tx
            .execute(Select(By::new(owner_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let market = Market {
            id: market::Id::new(),
            owner_id,
            key,
            name,
            location: None,
            criteria: market::Criteria::default(),
            resolution: None,
            created_at: DateTime::now().coerce(),
            updated_at: DateTime::now().coerce(),
            deleted_at: None,
        };

        tx.execute(Insert(market.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(market)
    }
}

/// Error of [`CreateMarket`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`market::Name`] is already used by another [`Market`] of the same
    /// owner.
    #[display("`{_0}` name is occupied")]
    NameOccupied(#[error(not(source))] market::Name),
}
