//! CoinGecko spot-price adapter

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;

use crate::core::config::FeedConfig;
use crate::core::{Error, PriceFeed, Result, Symbol};

/// Maps an exchange-style symbol to a CoinGecko coin id. The assistant
/// trades a small fixed universe, so the table is deliberately closed.
fn coin_id(symbol: &Symbol) -> Option<&'static str> {
    match symbol.as_str() {
        "BTCUSD" => Some("bitcoin"),
        "ETHUSD" => Some("ethereum"),
        _ => None,
    }
}

/// Price feed over the CoinGecko simple-price endpoint (keyless).
pub struct CoinGeckoFeed {
    base_url: String,
    client: reqwest::Client,
}

impl CoinGeckoFeed {
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build price feed client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl PriceFeed for CoinGeckoFeed {
    async fn spot_price(&self, symbol: &Symbol) -> Result<Decimal> {
        let coin = coin_id(symbol).ok_or_else(|| Error::UnsupportedSymbol(symbol.to_string()))?;

        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd",
            self.base_url, coin
        );
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::PriceUnavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::PriceUnavailable(format!(
                "coingecko returned status {}",
                resp.status()
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::PriceUnavailable(e.to_string()))?;

        let quote = body
            .get(coin)
            .and_then(|c| c.get("usd"))
            .and_then(|v| v.as_f64())
            .ok_or_else(|| Error::PriceUnavailable(format!("missing usd quote for {coin}")))?;

        Decimal::try_from(quote).map_err(|e| Error::PriceUnavailable(e.to_string()))
    }

    fn name(&self) -> &str {
        "coingecko"
    }
}
