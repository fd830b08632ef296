//! [`PurgeEmptyMarkets`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::operations::{By, Delete, Perform, Start};
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{market, Market},
    infra::{database, Database},
    Service,
};

use super::Task;

/// Configuration for [`PurgeEmptyMarkets`] [`Task`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Interval between purges.
    pub interval: time::Duration,

    /// Timeout after which a never-resolved [`Market`] is considered
    /// abandoned.
    pub timeout: time::Duration,
}

/// [`Task`] deleting [`Market`]s that were created but never resolved.
///
/// The Buy Box UI creates a [`Market`] the moment its modal opens, so a
/// closed-without-saving modal leaves an empty row behind.
#[derive(Clone, Copy, Debug)]
pub struct PurgeEmptyMarkets<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db, Ls> Task<Start<By<PurgeEmptyMarkets<Self>, Config>>>
    for Service<Db, Ls>
where
    PurgeEmptyMarkets<Service<Db, Ls>>:
        Task<Perform<()>, Ok = (), Err: Error> + Send + Sync + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<PurgeEmptyMarkets<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = PurgeEmptyMarkets {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            _ = task.execute(Perform(())).await.map_err(|e| {
                log::error!("`task::PurgeEmptyMarkets` failed: {e}");
            });
        }
    }
}

impl<Db, Ls> Task<Perform<()>> for PurgeEmptyMarkets<Service<Db, Ls>>
where
    Db: Database<
        Delete<By<Market, market::CreationDateTime>>,
        Ok = (),
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let deadline = market::CreationDateTime::now() - self.config.timeout;
        self.service
            .database()
            .execute(Delete(By::new(deadline)))
            .await
            .map_err(tracerr::map_from_and_wrap!())
    }
}

/// Error of [`PurgeEmptyMarkets`] execution.
pub type ExecutionError = Traced<database::Error>;
