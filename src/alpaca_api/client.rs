use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;

use crate::alpaca_api::model::{AlpacaAccount, AlpacaOrderRequest};
use crate::core::config::BrokerConfig;
use crate::core::{AccountSnapshot, Broker, BrokerOrder, Error, Result, Side, Symbol};

pub struct AlpacaClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl AlpacaClient {
    pub fn new(config: &BrokerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build broker client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "APCA-API-KEY-ID",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| Error::Config(format!("invalid broker api key: {e}")))?,
        );
        headers.insert(
            "APCA-API-SECRET-KEY",
            HeaderValue::from_str(&self.api_secret)
                .map_err(|e| Error::Config(format!("invalid broker api secret: {e}")))?,
        );
        Ok(headers)
    }
}

#[async_trait]
impl Broker for AlpacaClient {
    async fn account(&self) -> Result<AccountSnapshot> {
        let url = format!("{}/v2/account", self.base_url);
        let resp = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .send()
            .await
            .map_err(|e| Error::EquityUnavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::EquityUnavailable(format!("status {status}: {body}")));
        }

        let account: AlpacaAccount = resp
            .json()
            .await
            .map_err(|e| Error::EquityUnavailable(e.to_string()))?;

        let raw = account.equity.or(account.cash);
        let equity = match raw.as_deref() {
            Some(v) => Decimal::from_str(v)
                .map_err(|e| Error::EquityUnavailable(format!("unparseable equity {v:?}: {e}")))?,
            None => Decimal::ZERO,
        };

        Ok(AccountSnapshot { equity })
    }

    async fn submit_order(
        &self,
        symbol: &Symbol,
        side: Side,
        qty: Decimal,
    ) -> Result<BrokerOrder> {
        let payload = AlpacaOrderRequest {
            symbol: symbol.to_string(),
            qty: qty.to_string(),
            side: side.as_str().to_string(),
            order_type: "market".to_string(),
            time_in_force: "gtc".to_string(),
            asset_class: "crypto".to_string(),
        };

        let mut headers = self.auth_headers()?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let url = format!("{}/v2/orders", self.base_url);
        let resp = self
            .client
            .post(&url)
            .headers(headers)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Broker(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Broker(format!("order rejected, status {status}: {body}")));
        }

        let raw: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::Broker(e.to_string()))?;

        let id = raw
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(BrokerOrder { id, raw })
    }
}
