//! Authenticated retrieval of the five supplier datasets.
//!
//! Every fetch goes through [`DatasetFetcher::authorized`]: an HTTP 401
//! triggers exactly one token refresh (bypassing the cache) and exactly one
//! repeat of the fetch. A second 401 becomes
//! [`SupplierError::TokenRejected`].

use std::future::Future;

use nscat_core::{CsvRow, JsonRecord};
use serde_json::Value;

use crate::auth::{AuthToken, Authenticator};
use crate::client::SupplierClient;
use crate::csv_rows::parse_csv_rows;
use crate::endpoint::Endpoint;
use crate::envelope::unwrap_records;
use crate::error::SupplierError;
use crate::retry::RetryPolicy;

/// The raw datasets of one run, unwrapped but not yet merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Datasets {
    pub catalog: Vec<JsonRecord>,
    pub stock: Vec<JsonRecord>,
    pub units_of_measure: Vec<JsonRecord>,
    pub prices: Vec<JsonRecord>,
    /// `None` when the wholesale source is disabled.
    pub wholesale: Option<Vec<CsvRow>>,
}

pub struct DatasetFetcher {
    client: SupplierClient,
    auth: Authenticator,
    token: AuthToken,
    catalog_retry: RetryPolicy,
    catalog_lang: i64,
}

impl DatasetFetcher {
    /// Obtains a token (cached or fresh) and returns a fetcher holding it.
    ///
    /// # Errors
    ///
    /// Propagates the authentication errors of [`Authenticator::get_token`].
    pub async fn connect(
        client: SupplierClient,
        auth: Authenticator,
        catalog_retry: RetryPolicy,
        catalog_lang: i64,
    ) -> Result<Self, SupplierError> {
        let token = auth.get_token().await?;
        Ok(Self {
            client,
            auth,
            token,
            catalog_retry,
            catalog_lang,
        })
    }

    #[must_use]
    pub fn token(&self) -> &AuthToken {
        &self.token
    }

    /// `getCatalogo`, sent as a GET carrying the JSON body `{"lang": n}` and
    /// retried per the catalog [`RetryPolicy`].
    ///
    /// # Errors
    ///
    /// Returns the last error once the retry budget is spent, or an auth
    /// error from the refresh path.
    pub async fn fetch_catalog(&mut self) -> Result<Vec<JsonRecord>, SupplierError> {
        let client = self.client.clone();
        let policy = self.catalog_retry.clone();
        let body = serde_json::json!({ "lang": self.catalog_lang });
        self.authorized(Endpoint::Catalog, move |token| {
            let client = client.clone();
            let policy = policy.clone();
            let body = body.clone();
            async move {
                policy
                    .run(Endpoint::Catalog.name(), || {
                        fetch_records(client.clone(), Endpoint::Catalog, token.clone(), Some(body.clone()))
                    })
                    .await
            }
        })
        .await
    }

    /// # Errors
    ///
    /// Network, status, format or auth failure of `getStock`.
    pub async fn fetch_stock(&mut self) -> Result<Vec<JsonRecord>, SupplierError> {
        self.fetch_json_once(Endpoint::Stock).await
    }

    /// # Errors
    ///
    /// Network, status, format or auth failure of `getUnidadMedida`.
    pub async fn fetch_units_of_measure(&mut self) -> Result<Vec<JsonRecord>, SupplierError> {
        self.fetch_json_once(Endpoint::UnitsOfMeasure).await
    }

    /// # Errors
    ///
    /// Network, status, format or auth failure of `getPrecio`.
    pub async fn fetch_prices(&mut self) -> Result<Vec<JsonRecord>, SupplierError> {
        self.fetch_json_once(Endpoint::Prices).await
    }

    /// `getCsv`, parsed into header-keyed rows.
    ///
    /// # Errors
    ///
    /// Network, status, CSV format or auth failure of `getCsv`.
    pub async fn fetch_wholesale(&mut self) -> Result<Vec<CsvRow>, SupplierError> {
        let client = self.client.clone();
        self.authorized(Endpoint::WholesaleCsv, move |token| {
            let client = client.clone();
            async move {
                let body = client.get_text(Endpoint::WholesaleCsv, &token).await?;
                parse_csv_rows(&body)
            }
        })
        .await
    }

    /// Fetches every dataset in sequence. The first failure aborts.
    ///
    /// # Errors
    ///
    /// The first error of any individual fetch.
    pub async fn fetch_all(&mut self, include_wholesale: bool) -> Result<Datasets, SupplierError> {
        let catalog = self.fetch_catalog().await?;
        let stock = self.fetch_stock().await?;
        let units_of_measure = self.fetch_units_of_measure().await?;
        let prices = self.fetch_prices().await?;
        let wholesale = if include_wholesale {
            Some(self.fetch_wholesale().await?)
        } else {
            None
        };

        tracing::info!(
            catalog = catalog.len(),
            stock = stock.len(),
            units_of_measure = units_of_measure.len(),
            prices = prices.len(),
            wholesale = wholesale.as_ref().map(Vec::len),
            "datasets fetched"
        );

        Ok(Datasets {
            catalog,
            stock,
            units_of_measure,
            prices,
            wholesale,
        })
    }

    async fn fetch_json_once(&mut self, endpoint: Endpoint) -> Result<Vec<JsonRecord>, SupplierError> {
        let client = self.client.clone();
        self.authorized(endpoint, move |token| {
            fetch_records(client.clone(), endpoint, token, None)
        })
        .await
    }

    /// Runs `op` with the current token; on 401 refreshes once and reruns.
    async fn authorized<T, F, Fut>(&mut self, endpoint: Endpoint, op: F) -> Result<T, SupplierError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, SupplierError>>,
    {
        match op(self.token.value().to_owned()).await {
            Err(SupplierError::Unauthorized { .. }) => {
                tracing::warn!(endpoint = endpoint.name(), "token rejected, logging in again");
                self.token = self.auth.refresh_token().await?;
                match op(self.token.value().to_owned()).await {
                    Err(SupplierError::Unauthorized { .. }) => {
                        tracing::error!(endpoint = endpoint.name(), "fresh token rejected");
                        Err(SupplierError::TokenRejected {
                            endpoint: endpoint.name().to_owned(),
                        })
                    }
                    other => other,
                }
            }
            other => other,
        }
    }
}

async fn fetch_records(
    client: SupplierClient,
    endpoint: Endpoint,
    token: String,
    body: Option<Value>,
) -> Result<Vec<JsonRecord>, SupplierError> {
    let payload = client.get_json(endpoint, &token, body.as_ref()).await?;
    unwrap_records(endpoint, payload)
}
