use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

use super::bundle::BundleSession;
use crate::config::StorefrontConfig;
use crate::models::{ListingKind, PriceSnapshot};
use crate::plugins::traits::ListingFetcher;
use crate::utils::currency::format_minor;
use crate::utils::error::{AppError, FetchError};

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct DetailsEnvelope<T> {
    success: bool,
    #[serde(default)]
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct AppDetails {
    name: String,
    #[serde(default)]
    price_overview: Option<AppPrice>,
}

#[derive(Debug, Deserialize)]
struct AppPrice {
    #[serde(default)]
    currency: String,
    initial: i64,
    #[serde(rename = "final")]
    final_price: i64,
    #[serde(default)]
    initial_formatted: String,
    #[serde(default)]
    final_formatted: String,
    #[serde(default)]
    discount_percent: i64,
}

#[derive(Debug, Deserialize)]
struct PackageDetails {
    name: String,
    #[serde(default)]
    price: Option<PackagePrice>,
}

#[derive(Debug, Deserialize)]
struct PackagePrice {
    #[serde(default)]
    currency: String,
    initial: i64,
    #[serde(rename = "final")]
    final_price: i64,
    #[serde(default)]
    discount_percent: i64,
}

/// Fetches listing prices from the storefront.
///
/// Single and package listings go through the JSON details endpoints with a
/// shared client. Bundles have no such endpoint, so each bundle lookup opens
/// its own [`BundleSession`] to pass the age gate and read the store page.
pub struct StorefrontFetcher {
    client: Client,
    config: StorefrontConfig,
}

impl StorefrontFetcher {
    pub fn new(config: StorefrontConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn locale_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(cc) = &self.config.country_code {
            query.push(("cc", cc.clone()));
        }
        if let Some(lang) = &self.config.language {
            query.push(("l", lang.clone()));
        }
        query
    }

    async fn get_details<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        id_param: &'static str,
        external_id: &str,
    ) -> Result<T, FetchError> {
        let url = format!("{}/api/{}", self.base_url(), endpoint);
        let mut query = self.locale_query();
        query.push((id_param, external_id.to_string()));

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status: status.as_u16() });
        }

        let body = response.text().await.map_err(|e| self.request_error(e))?;
        let mut envelopes: HashMap<String, DetailsEnvelope<T>> = serde_json::from_str(&body)
            .map_err(|e| FetchError::Shape(format!("{} payload for {}: {}", endpoint, external_id, e)))?;

        let envelope = envelopes
            .remove(external_id)
            .ok_or_else(|| FetchError::Shape(format!("{} payload has no entry for {}", endpoint, external_id)))?;

        if !envelope.success {
            return Err(FetchError::Shape(format!("{} reported failure for {}", endpoint, external_id)));
        }

        envelope
            .data
            .ok_or_else(|| FetchError::Shape(format!("{} payload for {} has no data", endpoint, external_id)))
    }

    async fn fetch_single(&self, external_id: &str) -> Result<PriceSnapshot, FetchError> {
        let details: AppDetails = self.get_details("appdetails", "appids", external_id).await?;
        let price = details.price_overview.ok_or_else(|| FetchError::NotForSale {
            external_id: external_id.to_string(),
        })?;

        // The storefront leaves initial_formatted empty when there is no discount.
        let initial_formatted = if price.initial_formatted.is_empty() {
            format_minor(price.initial, &price.currency)
        } else {
            price.initial_formatted
        };
        let final_formatted = if price.final_formatted.is_empty() {
            format_minor(price.final_price, &price.currency)
        } else {
            price.final_formatted
        };

        Ok(PriceSnapshot::new(
            details.name,
            price.initial,
            price.final_price,
            initial_formatted,
            final_formatted,
            price.discount_percent,
        ))
    }

    async fn fetch_package(&self, external_id: &str) -> Result<PriceSnapshot, FetchError> {
        let details: PackageDetails = self.get_details("packagedetails", "packageids", external_id).await?;
        let price = details.price.ok_or_else(|| FetchError::NotForSale {
            external_id: external_id.to_string(),
        })?;

        Ok(PriceSnapshot::new(
            details.name,
            price.initial,
            price.final_price,
            format_minor(price.initial, &price.currency),
            format_minor(price.final_price, &price.currency),
            price.discount_percent,
        ))
    }

    async fn fetch_bundle(&self, external_id: &str) -> Result<PriceSnapshot, FetchError> {
        let session = BundleSession::open(&self.config).map_err(|e| self.request_error(e))?;
        session.fetch(external_id).await
    }

    fn request_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                seconds: self.config.request_timeout,
            }
        } else {
            err.into()
        }
    }
}

#[async_trait]
impl ListingFetcher for StorefrontFetcher {
    async fn fetch(&self, external_id: &str, kind: ListingKind) -> Result<PriceSnapshot, FetchError> {
        tracing::debug!("Fetching {} listing {}", kind, external_id);
        match kind {
            ListingKind::Single => self.fetch_single(external_id).await,
            ListingKind::Package => self.fetch_package(external_id).await,
            ListingKind::Bundle => self.fetch_bundle(external_id).await,
        }
    }
}
