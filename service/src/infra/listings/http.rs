//! HTTP [`Listings`] client.

use std::time::Duration;

use common::{
    geo::Coordinate,
    operations::{By, Select},
};
use derive_more::Debug;
use secrecy::{ExposeSecret as _, SecretString};
use serde_json::{json, Value};
use tracerr::Traced;
use tracing as log;

use crate::infra::listings::{
    self, record_coordinate, Matches, PropertyId, SearchQuery,
};

use super::Listings;

/// Configuration of the [`Http`] listings client.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the listing-search service.
    pub base_url: String,

    /// API key authenticating requests.
    #[debug(skip)]
    pub api_key: SecretString,

    /// Timeout of a single request.
    ///
    /// Without it a hung upstream would stall a market save forever.
    pub timeout: Duration,
}

/// HTTP client of the listing-search service.
#[derive(Clone, Debug)]
pub struct Http {
    /// Underlying [`reqwest::Client`].
    client: reqwest::Client,

    /// [`Config`] of this client.
    config: Config,
}

impl Http {
    /// Creates a new [`Http`] client with the provided [`Config`].
    ///
    /// # Errors
    ///
    /// If failed to initialize the underlying [`reqwest::Client`].
    pub fn new(config: Config) -> Result<Self, Traced<listings::Error>> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(tracerr::from_and_wrap!(=> listings::Error))?;
        Ok(Self { client, config })
    }

    /// POSTs the provided `body` to the search endpoint and returns the
    /// decoded JSON response.
    async fn search(
        &self,
        body: &Value,
    ) -> Result<Value, Traced<listings::Error>> {
        let url =
            format!("{}/search", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.config.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(tracerr::from_and_wrap!(=> listings::Error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(tracerr::new!(listings::Error::UnexpectedStatus(
                status.as_u16(),
            )));
        }

        response
            .json()
            .await
            .map_err(tracerr::from_and_wrap!(=> listings::Error))
    }
}

impl Listings<Select<By<Matches, SearchQuery>>> for Http {
    type Ok = Matches;
    type Err = Traced<listings::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Matches, SearchQuery>>,
    ) -> Result<Self::Ok, Self::Err> {
        let query = by.into_inner();

        let response =
            self.search(query.body()).await.map_err(tracerr::wrap!())?;
        let matches = Matches::from_response(&response);
        log::debug!(count = %matches.count(), "listing search completed");

        Ok(matches)
    }
}

impl Listings<Select<By<Option<Coordinate>, PropertyId>>> for Http {
    type Ok = Option<Coordinate>;
    type Err = Traced<listings::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Coordinate>, PropertyId>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let body = json!({"ids": [AsRef::<str>::as_ref(&id)], "ids_only": false});
        let response = self.search(&body).await.map_err(tracerr::wrap!())?;

        Ok(response
            .get("data")
            .and_then(Value::as_array)
            .and_then(|records| records.first())
            .and_then(record_coordinate))
    }
}
