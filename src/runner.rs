//! Execution runner - claims and submits confirmed suggestions
//!
//! A dedicated worker consumes suggestion ids from a channel. The atomic
//! claim in the store is the only mutual exclusion on the executed path:
//! if two confirms enqueue the same id, the second claim loses and that
//! delivery is dropped silently. Once claimed, execution runs to
//! completion; there is no cancellation and no automatic retry, since a
//! market order whose fate is unknown must not be resubmitted.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::core::{Broker, Error, ExecutionOutcome, SuggestionStore};

pub struct ExecutionRunner {
    store: Arc<dyn SuggestionStore>,
    broker: Arc<dyn Broker>,
    rx: flume::Receiver<String>,
}

impl ExecutionRunner {
    pub fn new(
        store: Arc<dyn SuggestionStore>,
        broker: Arc<dyn Broker>,
        rx: flume::Receiver<String>,
    ) -> Self {
        Self { store, broker, rx }
    }

    /// Spawn the worker task. It drains the channel until every sender is
    /// dropped, which is the shutdown boundary.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!("execution runner started");
            while let Ok(id) = self.rx.recv_async().await {
                self.execute(&id).await;
            }
            info!("execution runner stopped");
        })
    }

    async fn execute(&self, id: &str) {
        let suggestion = match self.store.claim(id) {
            Ok(suggestion) => suggestion,
            // Another actor already owns or settled this suggestion.
            Err(Error::Conflict(_)) => return,
            Err(err) => {
                warn!(suggestion_id = %id, error = %err, "could not claim suggestion");
                return;
            }
        };

        info!(
            suggestion_id = %id,
            symbol = %suggestion.symbol,
            side = %suggestion.side,
            qty = %suggestion.qty,
            "submitting order"
        );

        match self
            .broker
            .submit_order(&suggestion.symbol, suggestion.side, suggestion.qty)
            .await
        {
            Ok(order) => {
                info!(suggestion_id = %id, broker_order_id = %order.id, "order executed");
                let outcome = ExecutionOutcome::Submitted {
                    broker_order_id: order.id,
                    raw: order.raw,
                };
                if let Err(err) = self.store.settle(id, outcome) {
                    error!(suggestion_id = %id, error = %err, "failed to record execution");
                }
            }
            Err(err) => {
                error!(suggestion_id = %id, error = %err, "execution failed");
                let detail = err.to_string();
                if let Err(note_err) = self.store.record_note("execution_failed", &detail) {
                    error!(suggestion_id = %id, error = %note_err, "failed to record note");
                }
                if let Err(settle_err) = self
                    .store
                    .settle(id, ExecutionOutcome::Failed { detail })
                {
                    error!(suggestion_id = %id, error = %settle_err, "failed to record failure");
                }
            }
        }
    }
}
