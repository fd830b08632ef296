//! [`Command`] for deleting a [`Market`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{market, Market},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deleting a [`Market`] on its owner's request.
#[derive(Clone, Copy, Debug)]
pub struct DeleteMarket {
    /// ID of the [`Market`] to delete.
    pub id: market::Id,

    /// ID of the investor requesting the deletion.
    pub owner_id: market::OwnerId,
}

impl<Db, Ls> Command<DeleteMarket> for Service<Db, Ls>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Market, market::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Market>, market::Id>>,
            Ok = Option<Market>,
            Err = Traced<database::Error>,
        > + Database<Update<Market>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Market;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeleteMarket) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteMarket { id, owner_id } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Serializes against an in-flight save of the same `Market`.
        tx.execute(Lock(By::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut market = tx
            .execute(Select(By::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            // Another investor's `Market` is reported as missing, so its
            // existence doesn't leak.
            .filter(|m: &Market| m.owner_id == owner_id)
            .ok_or_else(|| tracerr::new!(E::MarketNotExists(id)))?;

        market.deleted_at = Some(DateTime::now().coerce());

        tx.execute(Update(market.clone()))
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

/// Error of [`DeleteMarket`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Market`] with the provided ID does not exist.
    #[display("`Market(id: {_0})` does not exist")]
    MarketNotExists(#[error(not(source))] market::Id),
}
