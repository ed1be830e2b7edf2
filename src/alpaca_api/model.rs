use serde::{Deserialize, Serialize};

/// Payload for POST /v2/orders. Alpaca expects crypto quantities as
/// decimal strings.
#[derive(Debug, Serialize)]
pub struct AlpacaOrderRequest {
    pub symbol: String,
    pub qty: String,
    pub side: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub time_in_force: String,
    pub asset_class: String,
}

/// Subset of GET /v2/account. Equity is preferred; paper accounts that
/// have never traded may only report cash.
#[derive(Debug, Deserialize)]
pub struct AlpacaAccount {
    #[serde(default)]
    pub equity: Option<String>,
    #[serde(default)]
    pub cash: Option<String>,
}
