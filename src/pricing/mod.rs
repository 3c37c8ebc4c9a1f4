//! Price estimation service
//!
//! Fetches USD-denominated spot prices from an external price API and derives
//! exchange rates and converted amounts between supported tokens. The HTTP
//! fetch sits behind the [`PriceSource`] trait so the rate math is testable
//! without a network.

pub mod tracker;

use crate::config::PriceApiConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::tokens::TokenRegistry;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Source of USD spot prices, keyed by price-API identifier
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch USD prices for the given identifiers in a single batched call
    async fn usd_prices(&self, ids: &[String]) -> BridgeResult<HashMap<String, f64>>;
}

/// HTTP client for a CoinGecko-style `/simple/price` endpoint
pub struct HttpPriceSource {
    client: Client,
    base_url: String,
}

impl HttpPriceSource {
    pub fn new(config: &PriceApiConfig) -> BridgeResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Response entry shape: `{ "<id>": { "usd": <number> } }`. The `usd` field
/// can be absent for ids the upstream doesn't quote.
#[derive(Debug, Deserialize)]
struct QuoteEntry {
    usd: Option<f64>,
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn usd_prices(&self, ids: &[String]) -> BridgeResult<HashMap<String, f64>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd",
            self.base_url,
            ids.join(",")
        );
        debug!("Fetching spot prices for {} ids", ids.len());

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let payload: HashMap<String, QuoteEntry> = response.json().await?;

        Ok(payload
            .into_iter()
            .filter_map(|(id, entry)| entry.usd.map(|price| (id, price)))
            .collect())
    }
}

/// Derives exchange rates and amount estimates from a price source
pub struct Estimator {
    source: Arc<dyn PriceSource>,
    registry: Arc<TokenRegistry>,
}

impl Estimator {
    pub fn new(source: Arc<dyn PriceSource>, registry: Arc<TokenRegistry>) -> Self {
        Self { source, registry }
    }

    /// USD prices keyed by token *symbol*. Symbols without a price id are
    /// excluded from the request and therefore absent from the result.
    pub async fn token_prices(&self, symbols: &[&str]) -> BridgeResult<HashMap<String, f64>> {
        let mapped: Vec<(&str, String)> = symbols
            .iter()
            .filter_map(|symbol| {
                self.registry
                    .price_id(symbol)
                    .map(|id| (*symbol, id.to_string()))
            })
            .collect();

        if mapped.is_empty() {
            return Ok(HashMap::new());
        }

        let ids: Vec<String> = mapped.iter().map(|(_, id)| id.clone()).collect();
        let prices = self.source.usd_prices(&ids).await?;

        Ok(mapped
            .into_iter()
            .filter_map(|(symbol, id)| prices.get(&id).map(|price| (symbol.to_string(), *price)))
            .collect())
    }

    /// Exchange rate between two tokens: price(origin) / price(destination).
    /// A token-to-itself rate is 1 and never touches the network.
    pub async fn exchange_rate(&self, origin: &str, destination: &str) -> BridgeResult<f64> {
        if origin == destination {
            return Ok(1.0);
        }

        let prices = self.token_prices(&[origin, destination]).await?;

        match (prices.get(origin), prices.get(destination)) {
            (Some(origin_price), Some(destination_price))
                if *origin_price > 0.0 && *destination_price > 0.0 =>
            {
                Ok(origin_price / destination_price)
            }
            _ => Err(BridgeError::PriceUnavailable {
                origin: origin.to_string(),
                destination: destination.to_string(),
            }),
        }
    }

    /// Source amount needed to produce `destination_amount` at the current rate
    pub async fn estimate_source_amount(
        &self,
        origin: &str,
        destination: &str,
        destination_amount: f64,
    ) -> BridgeResult<f64> {
        let rate = self.exchange_rate(origin, destination).await?;
        Ok(destination_amount / rate)
    }

    /// Destination amount produced by `amount` of the origin token
    pub async fn estimate_destination_amount(
        &self,
        origin: &str,
        destination: &str,
        amount: f64,
    ) -> BridgeResult<f64> {
        let rate = self.exchange_rate(origin, destination).await?;
        Ok(amount * rate)
    }
}
