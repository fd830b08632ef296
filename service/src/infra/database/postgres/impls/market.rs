//! [`Market`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::{
    geo::Coordinate,
    operations::{By, Delete, Insert, Lock, Select, Update},
};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tracerr::Traced;

use crate::{
    domain::{
        market::{self, Location, LocationKind, Resolution},
        Market,
    },
    infra::{
        database::{
            self,
            postgres::{Connection, FuzzPattern},
            Postgres,
        },
        Database,
    },
    read,
};

impl<C, IDs> Database<Select<By<HashMap<market::Id, Market>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[market::Id]>,
{
    type Ok = HashMap<market::Id, Market>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<market::Id, Market>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[market::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let limit = i32::try_from(ids.len()).unwrap();

        const SQL: &str = "\
            SELECT id, owner_id, key, name, \
                   location_kind, city, state, zip_codes, county, \
                   units_min, units_max, \
                   assessed_value_min, assessed_value_max, \
                   estimated_value_min, estimated_value_max, \
                   year_built_min, year_built_max, \
                   fingerprint, property_count, latitude, longitude, \
                   region_id, tier, resolved_at, \
                   created_at, updated_at \
            FROM markets \
            WHERE id IN (SELECT unnest($1::UUID[]) LIMIT $2::INT4) \
            LIMIT $2::INT4";
        Ok(self
            .query(SQL, &[&ids, &limit])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                let id = row.get("id");
                (id, market_of_row(&row, id))
            })
            .collect())
    }
}

/// Reassembles a [`Market`] out of its `markets` table `row`.
fn market_of_row(row: &tokio_postgres::Row, id: market::Id) -> Market {
    let bound = |column: &str| {
        u32::try_from(row.get::<_, i64>(column))
            .unwrap_or_else(|_| panic!("`{column}` overflow"))
    };

    let location =
        row.get::<_, Option<LocationKind>>("location_kind").map(|kind| {
            match kind {
                LocationKind::CityState => Location::CityState {
                    city: row
                        .get::<_, Option<_>>("city")
                        .expect("`city` is set for a city location"),
                    state: row
                        .get::<_, Option<_>>("state")
                        .expect("`state` is set for a city location"),
                },
                LocationKind::ZipCodes => Location::ZipCodes(
                    row.get::<_, Option<_>>("zip_codes")
                        .expect("`zip_codes` is set for a ZIP location"),
                ),
                LocationKind::CountyState => Location::CountyState {
                    county: row
                        .get::<_, Option<_>>("county")
                        .expect("`county` is set for a county location"),
                    state: row
                        .get::<_, Option<_>>("state")
                        .expect("`state` is set for a county location"),
                },
            }
        });

    let resolution = row
        .get::<_, Option<market::Fingerprint>>("fingerprint")
        .map(|fingerprint| Resolution {
            fingerprint,
            property_count: u32::try_from(
                row.get::<_, i32>("property_count"),
            )
            .expect("`property_count` is never negative")
            .into(),
            coordinate: row.get::<_, Option<f64>>("latitude").and_then(
                |latitude| {
                    row.get::<_, Option<f64>>("longitude").map(|longitude| {
                        Coordinate {
                            latitude,
                            longitude,
                        }
                    })
                },
            ),
            region_id: row.get("region_id"),
            tier: row
                .get::<_, Option<_>>("tier")
                .expect("`tier` is set for a resolved market"),
            resolved_at: row
                .get::<_, Option<_>>("resolved_at")
                .expect("`resolved_at` is set for a resolved market"),
        });

    Market {
        id,
        owner_id: row.get("owner_id"),
        key: u16::try_from(row.get::<_, i32>("key"))
            .expect("`key` overflow")
            .into(),
        name: row.get("name"),
        location,
        criteria: market::Criteria {
            units: (bound("units_min"), bound("units_max")).into(),
            assessed_value: (
                bound("assessed_value_min"),
                bound("assessed_value_max"),
            )
                .into(),
            estimated_value: (
                bound("estimated_value_min"),
                bound("estimated_value_max"),
            )
                .into(),
            year_built: (bound("year_built_min"), bound("year_built_max"))
                .into(),
        },
        resolution,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        // OK, because a `Market` is removed from the database completely
        // once deleted.
        deleted_at: None,
    }
}

impl<C> Database<Select<By<Option<Market>, market::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<market::Id, Market>, [market::Id; 1]>>,
        Ok = HashMap<market::Id, Market>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Market>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Market>, market::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<'n, C>
    Database<
        Select<By<Option<market::Id>, (market::OwnerId, &'n market::Name)>>,
    > for Postgres<C>
where
    C: Connection,
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

        const SQL: &str = "\
            SELECT id \
            FROM markets \
            WHERE owner_id = $1::UUID \
              AND name = $2::VARCHAR \
            LIMIT 1";
        self.query_opt(SQL, &[&owner_id, name])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.map(|r| r.get("id")))
    }
}

impl<C> Database<Select<By<market::Key, market::OwnerId>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = market::Key;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<market::Key, market::OwnerId>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let owner_id: market::OwnerId = by.into_inner();

        const SQL: &str = "\
            SELECT COALESCE(MAX(key), 0)::INT4 AS last \
            FROM markets \
            WHERE owner_id = $1::UUID";
        self.query_opt(SQL, &[&owner_id])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| {
                let last = row.expect("always exists").get::<_, i32>("last");
                u16::try_from(last + 1).expect("`key` overflow").into()
            })
    }
}

impl<C> Database<Insert<Market>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Market>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(market): Insert<Market>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(market)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Market>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(market): Update<Market>,
    ) -> Result<Self::Ok, Self::Err> {
        let Market {
            id,
            owner_id,
            key,
            name,
            location,
            criteria,
            resolution,
            created_at,
            updated_at,
            deleted_at,
        } = market;

        if deleted_at.is_some() {
            const SQL: &str = "\
                DELETE FROM markets \
                WHERE id = $1::UUID";
            return self
                .exec(SQL, &[&id])
                .await
                .map_err(tracerr::wrap!())
                .map(drop);
        }

        let key = i32::from(u16::from(key));
        let location_kind = location.as_ref().map(Location::kind);
        let city = location.as_ref().and_then(Location::city);
        let state = location.as_ref().and_then(Location::state);
        let zip_codes =
            location.as_ref().and_then(Location::zip_codes);
        let county = location.as_ref().and_then(Location::county);
        let units_min = i64::from(criteria.units.min);
        let units_max = i64::from(criteria.units.max);
        let assessed_value_min = i64::from(criteria.assessed_value.min);
        let assessed_value_max = i64::from(criteria.assessed_value.max);
        let estimated_value_min = i64::from(criteria.estimated_value.min);
        let estimated_value_max = i64::from(criteria.estimated_value.max);
        let year_built_min = i64::from(criteria.year_built.min);
        let year_built_max = i64::from(criteria.year_built.max);
        let fingerprint = resolution.as_ref().map(|r| r.fingerprint);
        let property_count = resolution.as_ref().map(|r| {
            i32::try_from(u32::from(r.property_count))
                .expect("`property_count` overflow")
        });
        let latitude =
            resolution.as_ref().and_then(|r| r.coordinate).map(|c| c.latitude);
        let longitude = resolution
            .as_ref()
            .and_then(|r| r.coordinate)
            .map(|c| c.longitude);
        let region_id = resolution.as_ref().and_then(|r| r.region_id);
        let tier = resolution.as_ref().map(|r| r.tier);
        let resolved_at = resolution.as_ref().map(|r| r.resolved_at);

        const SQL: &str = "\
            INSERT INTO markets (\
                id, owner_id, key, name, \
                location_kind, city, state, zip_codes, county, \
                units_min, units_max, \
                assessed_value_min, assessed_value_max, \
                estimated_value_min, estimated_value_max, \
                year_built_min, year_built_max, \
                fingerprint, property_count, latitude, longitude, \
                region_id, tier, resolved_at, \
                created_at, updated_at \
            ) VALUES (\
                $1::UUID, $2::UUID, $3::INT4, $4::VARCHAR, \
                $5::INT2, $6::VARCHAR, $7::VARCHAR, $8::VARCHAR[], \
                $9::VARCHAR, \
                $10::INT8, $11::INT8, \
                $12::INT8, $13::INT8, \
                $14::INT8, $15::INT8, \
                $16::INT8, $17::INT8, \
                $18::INT4, $19::INT4, $20::FLOAT8, $21::FLOAT8, \
                $22::UUID, $23::INT2, $24::TIMESTAMPTZ, \
                $25::TIMESTAMPTZ, $26::TIMESTAMPTZ \
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET name = EXCLUDED.name, \
                location_kind = EXCLUDED.location_kind, \
                city = EXCLUDED.city, \
                state = EXCLUDED.state, \
                zip_codes = EXCLUDED.zip_codes, \
                county = EXCLUDED.county, \
                units_min = EXCLUDED.units_min, \
                units_max = EXCLUDED.units_max, \
                assessed_value_min = EXCLUDED.assessed_value_min, \
                assessed_value_max = EXCLUDED.assessed_value_max, \
                estimated_value_min = EXCLUDED.estimated_value_min, \
                estimated_value_max = EXCLUDED.estimated_value_max, \
                year_built_min = EXCLUDED.year_built_min, \
                year_built_max = EXCLUDED.year_built_max, \
                fingerprint = EXCLUDED.fingerprint, \
                property_count = EXCLUDED.property_count, \
                latitude = EXCLUDED.latitude, \
                longitude = EXCLUDED.longitude, \
                region_id = EXCLUDED.region_id, \
                tier = EXCLUDED.tier, \
                resolved_at = EXCLUDED.resolved_at, \
                updated_at = EXCLUDED.updated_at";
        self.exec(
            SQL,
            &[
                &id,
                &owner_id,
                &key,
                &name,
                &location_kind,
                &city,
                &state,
                &zip_codes,
                &county,
                &units_min,
                &units_max,
                &assessed_value_min,
                &assessed_value_max,
                &estimated_value_min,
                &estimated_value_max,
                &year_built_min,
                &year_built_max,
                &fingerprint,
                &property_count,
                &latitude,
                &longitude,
                &region_id,
                &tier,
                &resolved_at,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Market, market::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Market, market::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: market::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO markets_save_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO NOTHING";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<Market, market::OwnerId>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Market, market::OwnerId>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let owner_id: market::OwnerId = by.into_inner();

        const SQL: &str = "\
            INSERT INTO markets_creation_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (owner_id) DO NOTHING";
        self.query(SQL, &[&owner_id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C>
    Database<Select<By<read::market::list::Page, read::market::list::Selector>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::market::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::market::list::Page, read::market::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::market::list::Selector {
            arguments,
            filter: read::market::list::Filter { owner_id, name },
        } = by.into_inner();

        let limit = i32::try_from(arguments.limit()).unwrap() + 1;

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit, &owner_id];

        let cursor_idx = arguments.cursor().map(|c| {
            ps.push(c);
            ps.len()
        });
        let name_idx = name.as_ref().map(|n| {
            ps.push(n);
            ps.len()
        });

        let name_pattern = name.as_ref().map(|n| FuzzPattern::new(n.as_ref()));
        let name_pattern_idx = name_pattern.as_ref().map(|n| {
            ps.push(n);
            ps.len()
        });

        let sql = format!(
            "SELECT id \
             FROM markets \
             WHERE owner_id = $2::UUID \
                   {cursor} \
                   {name_filtering} \
             ORDER BY {name_ordering} \
                      id {order} \
             LIMIT $1::INT4",
            cursor = cursor_idx.into_iter().format_with("", |idx, f| {
                let op = arguments.kind().operator();
                f(&format_args!("AND id {op} ${idx}::UUID"))
            }),
            order = arguments.kind().order().sql(),
            name_filtering =
                name_pattern_idx.into_iter().format_with("", |idx, f| {
                    f(&format_args!(
                        "AND LOWER(name) SIMILAR TO LOWER(${idx}::VARCHAR)"
                    ))
                }),
            name_ordering = name_idx.into_iter().format_with("", |idx, f| {
                let order = arguments.kind().order().sql();
                f(&format_args!(
                    "LEVENSHTEIN(name, ${idx}::VARCHAR, 1, 1, 0) {order},"
                ))
            })
        );
        let rows = self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?;

        let has_more = rows.len() > arguments.limit();
        let edges = rows
            .into_iter()
            .take(arguments.limit())
            .map(|row| {
                let id = row.get("id");
                (id, id)
            })
            .collect::<Vec<_>>();

        Ok(read::market::list::Page::new(&arguments, edges, has_more))
    }
}

impl<C>
    Database<Select<By<read::market::list::TotalCount, market::OwnerId>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::market::list::TotalCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::market::list::TotalCount, market::OwnerId>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let owner_id: market::OwnerId = by.into_inner();

        const SQL: &str = "\
            SELECT COUNT(*)::INT4 \
            FROM markets \
            WHERE owner_id = $1::UUID";
        self.query_opt(SQL, &[&owner_id])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.expect("always exists").get::<_, i32>(0).into())
    }
}

impl<C> Database<Delete<By<Market, market::CreationDateTime>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Market, market::CreationDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let deadline: market::CreationDateTime = by.into_inner();

        const SQL: &str = "\
            DELETE FROM markets \
            WHERE resolved_at IS NULL \
              AND created_at < $1";
        self.exec(SQL, &[&deadline])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
