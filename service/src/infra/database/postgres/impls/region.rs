//! [`Region`]-related [`Database`] implementations.

use common::{
    geo::Coordinate,
    operations::{By, Select},
};
use tracerr::Traced;

use crate::{
    domain::Region,
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Select<By<Vec<Region>, ()>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Region>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(_): Select<By<Vec<Region>, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        // `position` fixes the catalog order, and the order matters: a point
        // inside several radii resolves to the first containing row.
        const SQL: &str = "\
            SELECT id, city_state, latitude, longitude, radius, tier \
            FROM rental_regions \
            ORDER BY position";
        Ok(self
            .query(SQL, &[])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| Region {
                id: row.get("id"),
                city_state: row.get("city_state"),
                center: row.get::<_, Option<f64>>("latitude").and_then(
                    |latitude| {
                        row.get::<_, Option<f64>>("longitude").map(
                            |longitude| Coordinate {
                                latitude,
                                longitude,
                            },
                        )
                    },
                ),
                radius: row.get::<_, f64>("radius").into(),
                tier: row.get("tier"),
            })
            .collect())
    }
}
