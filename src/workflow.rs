//! Confirmation workflow - the state machine between an operator
//! instruction and an executed order.
//!
//! Intake: oracle decision -> validation -> sizing -> pending suggestion.
//! Confirm: decline, or re-check the daily risk limit against fresh equity
//! and hand the suggestion id to the execution runner. The confirm path
//! never resizes qty; sizing happens exactly once, at creation.

use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::config::Config;
use crate::core::{
    Broker, Decision, DecisionOracle, Error, OrderIntent, Result, Suggestion, SuggestionStore,
    Symbol,
};
use crate::oracle::{SYSTEM_PROMPT, parse_decision};
use crate::risk::RiskSizer;

/// Reply to an assistant request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AssistantReply {
    Analysis {
        text: String,
    },
    RequireConfirm {
        suggestion: Suggestion,
        how_to_confirm: String,
    },
    Rejected {
        reason: String,
    },
}

/// Reply to a confirm request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ConfirmReply {
    Declined {
        suggestion_id: String,
    },
    PlacedRequest {
        suggestion_id: String,
        status: String,
    },
    Rejected {
        reason: String,
    },
}

pub struct ConfirmationWorkflow {
    oracle: Arc<dyn DecisionOracle>,
    broker: Arc<dyn Broker>,
    sizer: RiskSizer,
    store: Arc<dyn SuggestionStore>,
    allowed_symbols: HashSet<Symbol>,
    daily_drawdown_pct: Decimal,
    runner_tx: flume::Sender<String>,
}

impl ConfirmationWorkflow {
    pub fn new(
        oracle: Arc<dyn DecisionOracle>,
        broker: Arc<dyn Broker>,
        sizer: RiskSizer,
        store: Arc<dyn SuggestionStore>,
        config: &Config,
        runner_tx: flume::Sender<String>,
    ) -> Self {
        Self {
            oracle,
            broker,
            sizer,
            store,
            allowed_symbols: config
                .trading
                .allowed_symbols
                .iter()
                .map(Symbol::new)
                .collect(),
            daily_drawdown_pct: config.risk.daily_drawdown_pct,
            runner_tx,
        }
    }

    /// Ask the oracle and either record an analysis or create a pending
    /// suggestion. Rejections persist nothing.
    pub async fn request_suggestion(&self, prompt: &str) -> Result<AssistantReply> {
        let raw = self.oracle.complete(SYSTEM_PROMPT, prompt).await?;

        let decision = match parse_decision(&raw) {
            Ok(decision) => decision,
            Err(err) => {
                if let Error::MalformedDecision { raw } = &err {
                    self.store.record_note("bad_model_output", raw)?;
                }
                return Err(err);
            }
        };

        match decision {
            Decision::Analysis { text } => {
                self.store.record_analysis(prompt, &text)?;
                Ok(AssistantReply::Analysis { text })
            }
            Decision::Order(intent) => self.intake_order(prompt, intent).await,
        }
    }

    async fn intake_order(&self, prompt: &str, intent: OrderIntent) -> Result<AssistantReply> {
        if !self.allowed_symbols.contains(&intent.symbol) {
            return Err(Error::SymbolNotAllowed(intent.symbol.to_string()));
        }
        if intent.reason.trim().is_empty() {
            return Err(Error::MissingReason);
        }

        let account = self.broker.account().await?;
        let sizing = self
            .sizer
            .size(&intent.symbol, account.equity, intent.stop)
            .await?;

        if sizing.qty <= Decimal::ZERO {
            return Ok(AssistantReply::Rejected {
                reason: "calculated qty is zero (insufficient equity)".to_string(),
            });
        }

        if let Some(advisory) = intent.qty {
            debug!(%advisory, computed = %sizing.qty, "ignoring oracle-supplied qty");
        }

        let suggestion = self
            .store
            .create(&intent, sizing.qty, sizing.risk_amount, prompt)?;
        info!(
            suggestion_id = %suggestion.id,
            symbol = %suggestion.symbol,
            side = %suggestion.side,
            qty = %suggestion.qty,
            price = %sizing.price,
            "suggestion created, awaiting confirmation"
        );

        Ok(AssistantReply::RequireConfirm {
            suggestion,
            how_to_confirm:
                "POST /confirm with {\"suggestion_id\":\"...\",\"confirm\":true}".to_string(),
        })
    }

    /// Decline or execute a pending suggestion. Repeated confirms on a
    /// settled suggestion are idempotent no-ops.
    pub async fn confirm(&self, id: &str, confirm: bool) -> Result<ConfirmReply> {
        let suggestion = self.store.get(id)?;

        if suggestion.status.is_terminal() {
            return Ok(ConfirmReply::Rejected {
                reason: format!("suggestion is {}", suggestion.status),
            });
        }

        if !confirm {
            return match self.store.decline(id) {
                Ok(declined) => {
                    info!(suggestion_id = %declined.id, "suggestion declined");
                    Ok(ConfirmReply::Declined {
                        suggestion_id: declined.id,
                    })
                }
                // Someone else settled or claimed it between the read and
                // the decline; report the no-op instead of surfacing a race.
                Err(Error::Conflict(_)) => Ok(ConfirmReply::Rejected {
                    reason: "suggestion is no longer pending".to_string(),
                }),
                Err(err) => Err(err),
            };
        }

        // Re-validate the risk limit against fresh equity. The stored qty
        // and risk_amount are not recomputed.
        let account = self.broker.account().await?;
        let limit = account.equity * self.daily_drawdown_pct;
        let committed = self.store.risk_committed_since(start_of_utc_day());
        if committed + suggestion.risk_amount > limit {
            return Err(Error::DrawdownExceeded {
                committed,
                requested: suggestion.risk_amount,
                limit,
            });
        }

        self.runner_tx
            .send(suggestion.id.clone())
            .map_err(|_| Error::Internal("execution runner is not running".to_string()))?;
        info!(suggestion_id = %suggestion.id, "execution requested");

        Ok(ConfirmReply::PlacedRequest {
            suggestion_id: suggestion.id,
            status: "placed_request".to_string(),
        })
    }
}

fn start_of_utc_day() -> DateTime<Utc> {
    Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc()
}
