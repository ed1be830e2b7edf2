//! Port traits - every external collaborator lives behind one of these

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::core::error::Result;
use crate::core::types::{
    AccountSnapshot, BrokerOrder, ExecutionOutcome, OrderIntent, Side, Suggestion, Symbol,
};
use crate::store::{MemoryDocument, MemorySummary};

/// Market-data source returning a current spot price.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Current USD price for a symbol. Must fail distinctly for an
    /// unmapped symbol vs a failed fetch.
    async fn spot_price(&self, symbol: &Symbol) -> Result<Decimal>;

    /// Feed name (for logs)
    fn name(&self) -> &str;
}

/// Language-model service producing free-form decision text.
#[async_trait]
pub trait DecisionOracle: Send + Sync {
    /// Raw assistant text for a system/user prompt pair. Parsing and
    /// validation happen on the caller's side.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Brokerage endpoint: account state and order submission.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn account(&self) -> Result<AccountSnapshot>;

    async fn submit_order(&self, symbol: &Symbol, side: Side, qty: Decimal)
    -> Result<BrokerOrder>;
}

/// Durable suggestion lifecycle state - the single source of truth for
/// what is pending, declined, executed, or failed.
///
/// Every mutation atomically verifies the current status before writing,
/// so concurrent losers get `Error::Conflict` instead of overwriting.
pub trait SuggestionStore: Send + Sync {
    /// Persist a fresh pending suggestion and return the full record.
    fn create(
        &self,
        intent: &OrderIntent,
        qty: Decimal,
        risk_amount: Decimal,
        prompt: &str,
    ) -> Result<Suggestion>;

    fn get(&self, id: &str) -> Result<Suggestion>;

    /// Pending (and unclaimed) -> declined.
    fn decline(&self, id: &str) -> Result<Suggestion>;

    /// Atomically take the exclusive right to execute a pending
    /// suggestion. The claim is an in-memory marker: a claimed suggestion
    /// still persists as pending until settled.
    fn claim(&self, id: &str) -> Result<Suggestion>;

    /// Claimed -> executed | failed, appending the execution record in the
    /// same critical section.
    fn settle(&self, id: &str, outcome: ExecutionOutcome) -> Result<Suggestion>;

    fn record_analysis(&self, prompt: &str, text: &str) -> Result<()>;

    fn record_note(&self, event: &str, detail: &str) -> Result<()>;

    /// Sum of risk committed by suggestions executed at or after `since`.
    fn risk_committed_since(&self, since: DateTime<Utc>) -> Decimal;

    fn summary(&self) -> MemorySummary;

    fn document(&self) -> MemoryDocument;
}
