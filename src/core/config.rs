//! Configuration - TOML file with environment overrides for secrets

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::error::{Error, Result};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP surface
    pub server: ServerConfig,

    /// Risk limits
    pub risk: RiskConfig,

    /// Symbol universe
    pub trading: TradingConfig,

    /// Decision oracle (language model)
    pub oracle: OracleConfig,

    /// Brokerage endpoint
    pub broker: BrokerConfig,

    /// Price feed
    pub feed: FeedConfig,

    /// Memory document
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Bearer token required on mutating endpoints.
    pub auth_token: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            auth_token: "phone-secret".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Fraction of equity put at risk per trade (e.g. 0.02).
    pub risk_per_trade_pct: Decimal,

    /// Fraction of equity allowed to be at risk within a trading day
    /// before new executions are blocked.
    pub daily_drawdown_pct: Decimal,

    /// Hard cap on a single order quantity, in asset units.
    pub max_order_qty: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_per_trade_pct: Decimal::new(2, 2),   // 2%
            daily_drawdown_pct: Decimal::new(10, 2),  // 10%
            max_order_qty: Decimal::from(1000),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    /// Only these symbols may become orders.
    pub allowed_symbols: Vec<String>,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            allowed_symbols: vec!["BTCUSD".to_string(), "ETHUSD".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// API key (loaded from OPENAI_KEY if not provided).
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_tokens: 400,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// API key (loaded from ALPACA_API_KEY if not provided).
    pub api_key: String,

    /// API secret (loaded from ALPACA_SECRET_KEY if not provided).
    pub api_secret: String,

    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            endpoint: "https://paper-api.alpaca.markets".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub memory_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            memory_path: PathBuf::from("memory.json"),
        }
    }
}

impl Config {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Resolve the full configuration: the TOML file named by ARIA_CONFIG
    /// (default `aria.toml`, optional), then environment overrides on top.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var("ARIA_CONFIG").unwrap_or_else(|_| "aria.toml".to_string());
        let mut config = if Path::new(&path).exists() {
            Self::load(Path::new(&path))?
        } else {
            Self::default()
        };
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var("OPENAI_KEY") {
            self.oracle.api_key = v;
        }
        if let Ok(v) = std::env::var("ALPACA_API_KEY") {
            self.broker.api_key = v;
        }
        if let Ok(v) = std::env::var("ALPACA_SECRET_KEY") {
            self.broker.api_secret = v;
        }
        if let Ok(v) = std::env::var("ALPACA_ENDPOINT") {
            self.broker.endpoint = v;
        }
        if let Ok(v) = std::env::var("PHONE_TOKEN") {
            self.server.auth_token = v;
        }
        if let Ok(v) = std::env::var("PORT") {
            self.server.port = v
                .parse()
                .map_err(|e| Error::Config(format!("invalid PORT: {e}")))?;
        }
        if let Ok(v) = std::env::var("RISK_PER_TRADE_PCT") {
            self.risk.risk_per_trade_pct = parse_decimal("RISK_PER_TRADE_PCT", &v)?;
        }
        if let Ok(v) = std::env::var("DAILY_DRAWDOWN_PCT") {
            self.risk.daily_drawdown_pct = parse_decimal("DAILY_DRAWDOWN_PCT", &v)?;
        }
        if let Ok(v) = std::env::var("MAX_ORDER_QTY") {
            self.risk.max_order_qty = parse_decimal("MAX_ORDER_QTY", &v)?;
        }
        if let Ok(v) = std::env::var("ALLOWED_SYMBOLS") {
            self.trading.allowed_symbols = v
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = std::env::var("MEMORY_PATH") {
            self.store.memory_path = PathBuf::from(v);
        }
        Ok(())
    }

    /// Missing credentials are a warning, not a startup failure: the
    /// affected adapter fails per-request instead.
    pub fn warn_missing_credentials(&self) {
        if self.oracle.api_key.is_empty() {
            tracing::warn!("OPENAI_KEY is not set; decision oracle calls will fail");
        }
        if self.broker.api_key.is_empty() || self.broker.api_secret.is_empty() {
            tracing::warn!("ALPACA_API_KEY / ALPACA_SECRET_KEY not set; broker calls will fail");
        }
    }
}

fn parse_decimal(name: &str, value: &str) -> Result<Decimal> {
    Decimal::from_str(value).map_err(|e| Error::Config(format!("invalid {name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_limits() {
        let config = Config::default();
        assert_eq!(config.risk.risk_per_trade_pct, Decimal::new(2, 2));
        assert_eq!(config.risk.daily_drawdown_pct, Decimal::new(10, 2));
        assert_eq!(config.risk.max_order_qty, Decimal::from(1000));
        assert_eq!(config.trading.allowed_symbols, vec!["BTCUSD", "ETHUSD"]);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [risk]
            risk_per_trade_pct = 0.05

            [server]
            port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(config.risk.risk_per_trade_pct, Decimal::new(5, 2));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.risk.max_order_qty, Decimal::from(1000));
        assert_eq!(config.oracle.model, "gpt-4o-mini");
    }
}
