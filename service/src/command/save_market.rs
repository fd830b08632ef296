//! [`Command`] for saving a [`Market`].

use common::{
    geo::Coordinate,
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        market::{self, Resolution},
        Market, Region, Tier,
    },
    infra::{database, listings, Database, Listings},
    Service,
};

use super::Command;

/// [`Command`] for saving a [`Market`] with edited filters.
///
/// Runs the whole resolution pipeline: validates the filters, counts the
/// matching properties in the listing-search service, assigns a density tier
/// by proximity to the rental-region catalog, and persists the result.
///
/// Upstream failures degrade the resolution to a zero count and the fallback
/// tier instead of failing the save: only validation and persistence errors
/// surface to the caller.
#[derive(Clone, Debug)]
pub struct SaveMarket {
    /// ID of the [`Market`] to save.
    pub id: market::Id,

    /// ID of the investor requesting the save.
    pub owner_id: market::OwnerId,

    /// New [`Name`] of the [`Market`].
    ///
    /// [`Name`]: market::Name
    pub name: market::Name,

    /// New [`Location`] of the [`Market`].
    ///
    /// [`Location`]: market::Location
    pub location: market::Location,

    /// New [`Criteria`] of the [`Market`].
    ///
    /// [`Criteria`]: market::Criteria
    pub criteria: market::Criteria,
}

impl<Db, Ls> Command<SaveMarket> for Service<Db, Ls>
where
    Db: Database<
            Select<By<Option<Market>, market::Id>>,
            Ok = Option<Market>,
            Err = Traced<database::Error>,
        > + for<'n> Database<
            Select<By<Option<market::Id>, (market::OwnerId, &'n market::Name)>>,
            Ok = Option<market::Id>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Region>, ()>>,
            Ok = Vec<Region>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Market, market::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Market>, market::Id>>,
            Ok = Option<Market>,
            Err = Traced<database::Error>,
        > + Database<Update<Market>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Ls: Listings<
            Select<By<listings::Matches, listings::SearchQuery>>,
            Ok = listings::Matches,
            Err = Traced<listings::Error>,
        > + Listings<
            Select<By<Option<Coordinate>, listings::PropertyId>>,
            Ok = Option<Coordinate>,
            Err = Traced<listings::Error>,
        >,
{
    type Ok = Market;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: SaveMarket) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SaveMarket {
            id,
            owner_id,
            name,
            location,
            criteria,
        } = cmd;

        // Validation happens strictly before any listing-service round trip.
        if criteria.is_empty() {
            return Err(tracerr::new!(E::NoCriteria));
        }

        let existing = self
            .database()
            .execute(Select(By::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            // Another investor's `Market` is reported as missing, so its
            // existence doesn't leak.
            .filter(|m: &Market| m.owner_id == owner_id)
            .ok_or_else(|| tracerr::new!(E::MarketNotExists(id)))?;

        let occupied = self
            .database()
            .execute(Select(By::new((owner_id, &name))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if occupied.is_some_and(|other| other != id) {
            return Err(tracerr::new!(E::NameOccupied(name)));
        }

        let fingerprint = market::Fingerprint::new(&location, &criteria);
        let resolution = match existing
            .resolution
            .filter(|r| r.fingerprint == fingerprint)
        {
            // The filters didn't change since the last resolution, so the
            // cached one is still valid.
            Some(cached) => cached,
            None => self.resolve(&location, &criteria, fingerprint).await,
        };

        let market = Market {
            id,
            owner_id,
            key: existing.key,
            name,
            location: Some(location),
            criteria,
            resolution: Some(resolution),
            created_at: existing.created_at,
            updated_at: DateTime::now().coerce(),
            deleted_at: None,
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Serializes concurrent saves of the same `Market`, so the slower
        // resolution cannot silently overwrite the faster one.
        tx.execute(Lock(By::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        drop(
            tx.execute(Select(By::new(id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or_else(|| tracerr::new!(E::MarketNotExists(id)))?,
        );

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

impl<Db, Ls> Service<Db, Ls> {
    /// Resolves the provided filters against the listing-search service and
    /// the rental-region catalog.
    ///
    /// Never fails: an unavailable upstream degrades to a zero count without
    /// a coordinate, and a point matching no region gets the fallback tier.
    /// Both degradations are visible in traces only.
    async fn resolve(
        &self,
        location: &market::Location,
        criteria: &market::Criteria,
        fingerprint: market::Fingerprint,
    ) -> Resolution
    where
        Db: Database<
            Select<By<Vec<Region>, ()>>,
            Ok = Vec<Region>,
            Err = Traced<database::Error>,
        >,
        Ls: Listings<
                Select<By<listings::Matches, listings::SearchQuery>>,
                Ok = listings::Matches,
                Err = Traced<listings::Error>,
            > + Listings<
                Select<By<Option<Coordinate>, listings::PropertyId>>,
                Ok = Option<Coordinate>,
                Err = Traced<listings::Error>,
            >,
    {
        let query = listings::SearchQuery::new(location, criteria);
        let matches = self
            .listings()
            .execute(Select(By::new(query)))
            .await
            .unwrap_or_else(|e| {
                log::warn!(
                    "listing search failed, degrading to zero matches: {e}",
                );
                listings::Matches::default()
            });

        let coordinate = match matches.ids.first() {
            Some(id) => self
                .listings()
                .execute(Select(By::new(id.clone())))
                .await
                .unwrap_or_else(|e| {
                    log::warn!(
                        "representative coordinate lookup failed: {e}",
                    );
                    None
                }),
            None => None,
        };

        let matched = match coordinate {
            Some(point) => {
                match self.database().execute(Select(By::new(()))).await {
                    Ok(catalog) => Region::find(&catalog, point)
                        .map(|region| (region.id, region.tier)),
                    Err(e) => {
                        log::warn!(
                            "rental region catalog lookup failed: {e}",
                        );
                        None
                    }
                }
            }
            None => None,
        };

        Resolution {
            fingerprint,
            property_count: matches.count(),
            coordinate,
            region_id: matched.map(|(id, _)| id),
            tier: matched
                .map_or_else(|| Tier::fallback().rank, |(_, tier)| tier),
            resolved_at: DateTime::now().coerce(),
        }
    }
}

/// Error of [`SaveMarket`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Market`] with the provided ID does not exist.
    #[display("`Market(id: {_0})` does not exist")]
    MarketNotExists(#[error(not(source))] market::Id),

    /// [`market::Name`] is already used by another [`Market`] of the same
    /// owner.
    #[display("`{_0}` name is occupied")]
    NameOccupied(#[error(not(source))] market::Name),

    /// All the filter bounds are unset.
    #[display("No filter criteria set")]
    NoCriteria,
}

#[cfg(test)]
mod spec {
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
        time::Duration,
    };

    use common::{
        geo::Coordinate,
        operations::{By, Commit, Delete, Lock, Select, Transact, Update},
        DateTime,
    };
    use tracerr::Traced;

    use crate::{
        domain::{
            market::{self, Criteria, Location},
            region, tier, Market, Region,
        },
        infra::{database, listings, Database, Listings},
        task, Command as _, Config, Service,
    };

    use super::{ExecutionError, SaveMarket};

    const PROVIDENCE: Coordinate = Coordinate {
        latitude: 41.8240,
        longitude: -71.4128,
    };

    /// In-memory [`Database`] standing in for Postgres.
    #[derive(Clone, Debug, Default)]
    struct MockDb {
        markets: Arc<Mutex<HashMap<market::Id, Market>>>,
        regions: Arc<Mutex<Vec<Region>>>,
    }

    impl Database<Transact> for MockDb {
        type Ok = Self;
        type Err = Traced<database::Error>;

        async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
            Ok(self.clone())
        }
    }

    impl Database<Commit> for MockDb {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
            Ok(())
        }
    }

    impl Database<Lock<By<Market, market::Id>>> for MockDb {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            _: Lock<By<Market, market::Id>>,
        ) -> Result<Self::Ok, Self::Err> {
            Ok(())
        }
    }

    impl Database<Select<By<Option<Market>, market::Id>>> for MockDb {
        type Ok = Option<Market>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Select(by): Select<By<Option<Market>, market::Id>>,
        ) -> Result<Self::Ok, Self::Err> {
            Ok(self.markets.lock().unwrap().get(&by.into_inner()).cloned())
        }
    }

    impl<'n>
        Database<
            Select<By<Option<market::Id>, (market::OwnerId, &'n market::Name)>>,
        > for MockDb
    {
        type Ok = Option<market::Id>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Select(by): Select<
                By<Option<market::Id>, (market::OwnerId, &'n market::Name)>,
            >,
        ) -> Result<Self::Ok, Self::Err> {
            let (owner_id, name) = by.into_inner();
            Ok(self
                .markets
                .lock()
                .unwrap()
                .values()
                .find(|m| m.owner_id == owner_id && m.name == *name)
                .map(|m| m.id))
        }
    }

    impl Database<Select<By<Vec<Region>, ()>>> for MockDb {
        type Ok = Vec<Region>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            _: Select<By<Vec<Region>, ()>>,
        ) -> Result<Self::Ok, Self::Err> {
            Ok(self.regions.lock().unwrap().clone())
        }
    }

    impl Database<Update<Market>> for MockDb {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Update(market): Update<Market>,
        ) -> Result<Self::Ok, Self::Err> {
            let mut markets = self.markets.lock().unwrap();
            if market.deleted_at.is_some() {
                drop(markets.remove(&market.id));
            } else {
                drop(markets.insert(market.id, market));
            }
            Ok(())
        }
    }

    impl Database<Delete<By<Market, market::CreationDateTime>>> for MockDb {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Delete(by): Delete<By<Market, market::CreationDateTime>>,
        ) -> Result<Self::Ok, Self::Err> {
            let deadline = by.into_inner();
            self.markets.lock().unwrap().retain(|_, m| {
                m.resolution.is_some() || m.created_at >= deadline
            });
            Ok(())
        }
    }

    /// Scripted [`Listings`] stand-in.
    #[derive(Clone, Debug)]
    enum MockListings {
        /// Reports the given number of matches at the given [`Coordinate`].
        Matching {
            ids: usize,
            coordinate: Coordinate,
        },

        /// Fails every request, like an upstream responding with HTTP 500.
        Failing,

        /// Panics when called: for scenarios that must never reach the
        /// listing service.
        Unreachable,
    }

    impl Listings<Select<By<listings::Matches, listings::SearchQuery>>>
        for MockListings
    {
        type Ok = listings::Matches;
        type Err = Traced<listings::Error>;

        async fn execute(
            &self,
            _: Select<By<listings::Matches, listings::SearchQuery>>,
        ) -> Result<Self::Ok, Self::Err> {
            match self {
                Self::Matching { ids, .. } => Ok(listings::Matches {
                    ids: (0..*ids)
                        .map(|i| format!("P{i}").into())
                        .collect(),
                }),
                Self::Failing => Err(tracerr::new!(
                    listings::Error::UnexpectedStatus(500)
                )),
                Self::Unreachable => {
                    panic!("listing service must not be called")
                }
            }
        }
    }

    impl Listings<Select<By<Option<Coordinate>, listings::PropertyId>>>
        for MockListings
    {
        type Ok = Option<Coordinate>;
        type Err = Traced<listings::Error>;

        async fn execute(
            &self,
            _: Select<By<Option<Coordinate>, listings::PropertyId>>,
        ) -> Result<Self::Ok, Self::Err> {
            match self {
                Self::Matching { coordinate, .. } => Ok(Some(*coordinate)),
                Self::Failing => Err(tracerr::new!(
                    listings::Error::UnexpectedStatus(500)
                )),
                Self::Unreachable => {
                    panic!("listing service must not be called")
                }
            }
        }
    }

    fn service(
        db: MockDb,
        listings: MockListings,
    ) -> Service<MockDb, MockListings> {
        let config = Config {
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                b"test-secret",
            ),
            purge_empty_markets: task::purge_empty_markets::Config {
                interval: Duration::from_secs(60 * 60),
                timeout: Duration::from_secs(60 * 60),
            },
        };
        let (service, _bg) = Service::new(config, db, listings);
        service
    }

    fn seed_market(db: &MockDb, owner_id: market::OwnerId) -> market::Id {
        let id = market::Id::new();
        let market = Market {
            id,
            owner_id,
            key: market::Key::FIRST,
            name: market::Name::new("Rhode Island duplexes").unwrap(),
            location: None,
            criteria: Criteria::default(),
            resolution: None,
            created_at: DateTime::now().coerce(),
            updated_at: DateTime::now().coerce(),
            deleted_at: None,
        };
        drop(db.markets.lock().unwrap().insert(id, market));
        id
    }

    fn providence_cmd(
        id: market::Id,
        owner_id: market::OwnerId,
    ) -> SaveMarket {
        SaveMarket {
            id,
            owner_id,
            name: market::Name::new("Rhode Island duplexes").unwrap(),
            location: Location::CityState {
                city: market::City::new("Providence").unwrap(),
                state: market::StateCode::new("RI").unwrap(),
            },
            criteria: Criteria {
                units: (10, 40).into(),
                ..Criteria::default()
            },
        }
    }

    #[tokio::test]
    async fn resolves_count_tier_and_status() {
        let db = MockDb::default();
        let region_id = region::Id::from(uuid::Uuid::new_v4());
        // Tier 6 carries the 100..=400 sweet spot, so 120 matches land
        // right inside it.
        db.regions.lock().unwrap().push(Region {
            id: region_id,
            city_state: region::CityState::new("Providence, RI").unwrap(),
            center: Some(PROVIDENCE),
            radius: 30.0.into(),
            tier: tier::Rank::from(6),
        });
        let owner_id = market::OwnerId::from(uuid::Uuid::new_v4());
        let id = seed_market(&db, owner_id);

        let saved = service(
            db.clone(),
            MockListings::Matching {
                ids: 120,
                coordinate: PROVIDENCE,
            },
        )
        .execute(providence_cmd(id, owner_id))
        .await
        .unwrap();

        let resolution = saved.resolution.unwrap();
        assert_eq!(u32::from(resolution.property_count), 120);
        assert_eq!(resolution.tier, tier::Rank::from(6));
        assert_eq!(resolution.region_id, Some(region_id));
        assert_eq!(resolution.coordinate, Some(PROVIDENCE));
        assert_eq!(saved.status().unwrap().band, tier::Band::Ideal);

        let persisted = db.markets.lock().unwrap()[&id].clone();
        assert!(!persisted.is_stale());
        assert_eq!(
            u32::from(persisted.resolution.unwrap().property_count),
            120,
        );
    }

    #[tokio::test]
    async fn degraded_upstream_still_saves() {
        let db = MockDb::default();
        let owner_id = market::OwnerId::from(uuid::Uuid::new_v4());
        let id = seed_market(&db, owner_id);

        let saved = service(db.clone(), MockListings::Failing)
            .execute(providence_cmd(id, owner_id))
            .await
            .unwrap();

        let resolution = saved.resolution.unwrap();
        assert_eq!(u32::from(resolution.property_count), 0);
        assert!(resolution.coordinate.is_none());
        assert!(resolution.region_id.is_none());
        assert_eq!(resolution.tier, tier::Rank::from(4));
        assert_eq!(saved.status().unwrap().band, tier::Band::Under);
        assert!(db.markets.lock().unwrap()[&id].resolution.is_some());
    }

    #[tokio::test]
    async fn empty_criteria_never_reach_the_listing_service() {
        let db = MockDb::default();
        let owner_id = market::OwnerId::from(uuid::Uuid::new_v4());
        let id = seed_market(&db, owner_id);

        let mut cmd = providence_cmd(id, owner_id);
        cmd.criteria = Criteria::default();

        let err = service(db, MockListings::Unreachable)
            .execute(cmd)
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::NoCriteria));
    }

    #[tokio::test]
    async fn fresh_cache_skips_resolution() {
        let db = MockDb::default();
        let owner_id = market::OwnerId::from(uuid::Uuid::new_v4());
        let id = seed_market(&db, owner_id);

        let cmd = providence_cmd(id, owner_id);
        let fingerprint =
            market::Fingerprint::new(&cmd.location, &cmd.criteria);
        {
            let mut markets = db.markets.lock().unwrap();
            let market = markets.get_mut(&id).unwrap();
            market.resolution = Some(market::Resolution {
                fingerprint,
                property_count: 77.into(),
                coordinate: Some(PROVIDENCE),
                region_id: None,
                tier: tier::Rank::from(4),
                resolved_at: DateTime::now().coerce(),
            });
        }

        let saved = service(db, MockListings::Unreachable)
            .execute(cmd)
            .await
            .unwrap();
        assert_eq!(
            u32::from(saved.resolution.unwrap().property_count),
            77,
        );
    }

    #[tokio::test]
    async fn foreign_market_is_reported_missing() {
        let db = MockDb::default();
        let owner_id = market::OwnerId::from(uuid::Uuid::new_v4());
        let id = seed_market(&db, owner_id);

        let stranger = market::OwnerId::from(uuid::Uuid::new_v4());
        let err = service(db, MockListings::Unreachable)
            .execute(providence_cmd(id, stranger))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::MarketNotExists(_)));
    }

    #[tokio::test]
    async fn renaming_into_an_occupied_name_is_rejected() {
        let db = MockDb::default();
        let owner_id = market::OwnerId::from(uuid::Uuid::new_v4());
        let id = seed_market(&db, owner_id);

        let other = market::Id::new();
        let occupied = market::Name::new("Providence portfolio").unwrap();
        drop(db.markets.lock().unwrap().insert(
            other,
            Market {
                id: other,
                owner_id,
                key: market::Key::from(2),
                name: occupied.clone(),
                location: None,
                criteria: Criteria::default(),
                resolution: None,
                created_at: DateTime::now().coerce(),
                updated_at: DateTime::now().coerce(),
                deleted_at: None,
            },
        ));

        let mut cmd = providence_cmd(id, owner_id);
        cmd.name = occupied;

        let err = service(db, MockListings::Unreachable)
            .execute(cmd)
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::NameOccupied(_)));
    }
}
