//! HTTP price feed client

use async_trait::async_trait;
use reqwest::{Client, Url};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::session::PriceSource;

/// Price lookups against a data-retrieval style service
pub struct HttpPriceFeed {
    client: Client,
    base_url: Url,
}

impl HttpPriceFeed {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow::anyhow!("Price feed URL {} cannot take a path", base_url));
        }

        Ok(Self { client, base_url })
    }

    /// `{base}/prices/{token}` with the token as one encoded path segment
    fn price_url(&self, token_id: &str) -> anyhow::Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Price feed URL {} cannot take a path", self.base_url))?
            .pop_if_empty()
            .push("prices")
            .push(token_id);
        Ok(url)
    }

    /// Fetch current price for a token (SOL per token)
    pub async fn fetch_price(&self, token_id: &str) -> anyhow::Result<Decimal> {
        let url = self.price_url(token_id)?;

        let response = self.client.get(url).send().await?;

        if response.status().is_success() {
            let data: PriceResponse = response.json().await?;
            let price: Decimal = data.price.parse()?;
            if price <= Decimal::ZERO {
                return Err(anyhow::anyhow!("Non-positive price {} for {}", price, token_id));
            }
            Ok(price)
        } else {
            Err(anyhow::anyhow!("Price fetch failed: {}", response.status()))
        }
    }
}

#[async_trait]
impl PriceSource for HttpPriceFeed {
    async fn current_price(&self, token_id: &str) -> Option<Decimal> {
        match self.fetch_price(token_id).await {
            Ok(price) => {
                debug!(token = %token_id, %price, "Price fetched");
                Some(price)
            }
            Err(e) => {
                warn!(token = %token_id, "Price unavailable: {}", e);
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    price: String,
}
