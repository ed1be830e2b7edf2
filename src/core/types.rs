//! Core types - Strong typing for the suggestion lifecycle

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Tradeable symbol (e.g., "BTCUSD")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Account equity at a point in time. Fetched fresh per risk computation,
/// never cached.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub equity: Decimal,
}

/// Order recommendation produced by the decision oracle.
///
/// `qty` is advisory only: the executed quantity is always computed by the
/// risk sizer from current equity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderIntent {
    pub symbol: Symbol,
    pub side: Side,
    pub reason: String,
    #[serde(default)]
    pub stop: Option<Decimal>,
    #[serde(default)]
    pub qty: Option<Decimal>,
}

/// Validated oracle output: either free-form analysis or an order intent.
#[derive(Debug, Clone)]
pub enum Decision {
    Analysis { text: String },
    Order(OrderIntent),
}

/// Suggestion lifecycle status - a strict one-way state machine. No
/// transition ever returns to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Pending,
    Declined,
    Executed,
    Failed,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionStatus::Pending => "pending",
            SuggestionStatus::Declined => "declined",
            SuggestionStatus::Executed => "executed",
            SuggestionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SuggestionStatus::Pending)
    }
}

impl std::fmt::Display for SuggestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A sized, not-yet-executed order proposal awaiting human confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    /// Time-ordered, globally unique, never reused.
    pub id: String,
    /// Operator instruction that produced this suggestion.
    pub prompt: String,
    pub symbol: Symbol,
    pub side: Side,
    /// Computed by the risk sizer at creation; never resized afterwards.
    pub qty: Decimal,
    pub reason: String,
    pub stop: Option<Decimal>,
    /// Risk budget committed at sizing time (equity x per-trade risk).
    pub risk_amount: Decimal,
    pub status: SuggestionStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declined_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
}

/// Broker acknowledgment for a submitted order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerOrder {
    pub id: String,
    /// Raw broker response, kept verbatim for the audit trail.
    pub raw: serde_json::Value,
}

/// Terminal outcome of one order-submission attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum ExecutionOutcome {
    Submitted {
        broker_order_id: String,
        raw: serde_json::Value,
    },
    Failed {
        detail: String,
    },
}

/// One entry per attempted execution. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: String,
    pub suggestion_id: String,
    pub submitted_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: ExecutionOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_uppercases() {
        assert_eq!(Symbol::new("btcusd").as_str(), "BTCUSD");
    }

    #[test]
    fn status_terminality() {
        assert!(!SuggestionStatus::Pending.is_terminal());
        assert!(SuggestionStatus::Declined.is_terminal());
        assert!(SuggestionStatus::Executed.is_terminal());
        assert!(SuggestionStatus::Failed.is_terminal());
    }

    #[test]
    fn side_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Side::Buy).unwrap(), "\"buy\"");
        assert_eq!(serde_json::to_string(&Side::Sell).unwrap(), "\"sell\"");
    }
}
