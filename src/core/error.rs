//! Error handling - typed rejections for the whole suggestion pipeline

use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy. Adapter failures are converted to these at the workflow
/// boundary; nothing below the HTTP layer panics on external input.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Missing or mismatched bearer credential. No state change.
    #[error("unauthorized")]
    Unauthorized,

    /// Malformed inbound request (missing prompt, missing suggestion_id).
    #[error("{0}")]
    Validation(String),

    /// Order decision named a symbol outside the allow-list.
    #[error("symbol not allowed")]
    SymbolNotAllowed(String),

    /// Order decision carried no reason.
    #[error("order decision must include a reason")]
    MissingReason,

    /// The price feed has no mapping for this symbol.
    #[error("unsupported symbol for price fetch: {0}")]
    UnsupportedSymbol(String),

    /// The price feed errored or returned an unusable quote.
    #[error("price unavailable: {0}")]
    PriceUnavailable(String),

    /// The brokerage account endpoint errored.
    #[error("failed to fetch account equity: {0}")]
    EquityUnavailable(String),

    /// The language-model service errored at the transport level.
    #[error("decision oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// Oracle output did not contain exactly one well-formed decision
    /// object. Recoverable: recorded as a note, surfaced verbatim, never
    /// treated as an order.
    #[error("oracle output is not a well-formed decision")]
    MalformedDecision { raw: String },

    /// Order submission rejected or failed in transit.
    #[error("broker error: {0}")]
    Broker(String),

    /// Unknown suggestion id.
    #[error("suggestion not found: {0}")]
    NotFound(String),

    /// Lost a transition race; the losing actor absorbs this silently.
    #[error("conflicting transition for suggestion {0}")]
    Conflict(String),

    /// Confirm-time risk re-check failed; the suggestion stays pending.
    #[error("daily drawdown limit exceeded: {committed} committed + {requested} requested > {limit} limit")]
    DrawdownExceeded {
        committed: Decimal,
        requested: Decimal,
        limit: Decimal,
    },

    /// Memory document I/O failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Invariant breach inside the process (e.g. runner channel closed).
    #[error("internal error: {0}")]
    Internal(String),
}
