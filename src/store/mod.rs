//! Suggestion store - durable lifecycle state over a JSON memory document
//!
//! The memory document is the single source of truth for what is pending,
//! declined, executed, or failed. All mutations go through one mutex and
//! verify the current status before writing, so a losing concurrent actor
//! gets `Error::Conflict` instead of overwriting a transition. The file is
//! rewritten after every mutation; the in-memory document stays
//! authoritative if a write fails, and the next mutation retries it.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::warn;
use uuid::Uuid;

use crate::core::{
    Error, ExecutionOutcome, ExecutionRecord, OrderIntent, Result, Suggestion, SuggestionStatus,
    SuggestionStore,
};

/// One saved analysis reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub time: DateTime<Utc>,
    pub prompt: String,
    pub analysis: String,
}

/// Audit side-channel entry (malformed oracle output, failed execution).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRecord {
    pub time: DateTime<Utc>,
    pub event: String,
    pub detail: String,
}

/// The persisted document. Loaded at startup, rewritten on every mutation;
/// a corrupt or missing file resets to an empty well-formed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryDocument {
    pub created_at: DateTime<Utc>,
    pub analyses: Vec<AnalysisRecord>,
    pub suggested_orders: Vec<Suggestion>,
    pub executed_orders: Vec<ExecutionRecord>,
    pub notes: Vec<NoteRecord>,
}

impl MemoryDocument {
    fn empty() -> Self {
        Self {
            created_at: Utc::now(),
            analyses: Vec::new(),
            suggested_orders: Vec::new(),
            executed_orders: Vec::new(),
            notes: Vec::new(),
        }
    }
}

/// Summary counts for the memory endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MemorySummary {
    pub created_at: DateTime<Utc>,
    pub analyses_count: usize,
    pub suggested_orders_count: usize,
    pub executed_orders_count: usize,
    pub notes_count: usize,
}

struct Inner {
    doc: MemoryDocument,
    /// Executing-equivalent markers. Not persisted: after a restart a
    /// claimed-but-unsettled suggestion reloads as pending.
    claimed: HashSet<String>,
}

/// File-backed implementation of [`SuggestionStore`].
pub struct JsonFileStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl JsonFileStore {
    /// Load the document at `path`, or start empty when the file is
    /// missing or corrupt. Never fails startup on bad content.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let doc = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<MemoryDocument>(&text) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "memory document corrupt, resetting to empty");
                    MemoryDocument::empty()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => MemoryDocument::empty(),
            Err(e) => {
                return Err(Error::Persistence(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        let store = Self {
            path,
            inner: Mutex::new(Inner {
                doc,
                claimed: HashSet::new(),
            }),
        };
        // Materialize a well-formed file even when starting fresh.
        let inner = store.inner.lock();
        store.persist(&inner.doc);
        drop(inner);
        Ok(store)
    }

    fn persist(&self, doc: &MemoryDocument) {
        match serde_json::to_string_pretty(doc) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    warn!(path = %self.path.display(), error = %e, "failed to persist memory document");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize memory document"),
        }
    }

    /// Single mutation primitive: apply `f` under the lock, then rewrite
    /// the file. `f` sees consistent state and can refuse with Conflict.
    fn mutate<T>(&self, f: impl FnOnce(&mut Inner) -> Result<T>) -> Result<T> {
        let mut inner = self.inner.lock();
        let out = f(&mut inner)?;
        self.persist(&inner.doc);
        Ok(out)
    }
}

fn find_mut<'a>(doc: &'a mut MemoryDocument, id: &str) -> Result<&'a mut Suggestion> {
    doc.suggested_orders
        .iter_mut()
        .find(|s| s.id == id)
        .ok_or_else(|| Error::NotFound(id.to_string()))
}

impl SuggestionStore for JsonFileStore {
    fn create(
        &self,
        intent: &OrderIntent,
        qty: Decimal,
        risk_amount: Decimal,
        prompt: &str,
    ) -> Result<Suggestion> {
        let suggestion = Suggestion {
            id: Uuid::now_v7().to_string(),
            prompt: prompt.to_string(),
            symbol: intent.symbol.clone(),
            side: intent.side,
            qty,
            reason: intent.reason.clone(),
            stop: intent.stop,
            risk_amount,
            status: SuggestionStatus::Pending,
            created_at: Utc::now(),
            declined_at: None,
            executed_at: None,
        };

        self.mutate(|inner| {
            inner.doc.suggested_orders.push(suggestion.clone());
            Ok(())
        })?;
        Ok(suggestion)
    }

    fn get(&self, id: &str) -> Result<Suggestion> {
        self.inner
            .lock()
            .doc
            .suggested_orders
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    fn decline(&self, id: &str) -> Result<Suggestion> {
        self.mutate(|inner| {
            if inner.claimed.contains(id) {
                return Err(Error::Conflict(id.to_string()));
            }
            let suggestion = find_mut(&mut inner.doc, id)?;
            if suggestion.status != SuggestionStatus::Pending {
                return Err(Error::Conflict(id.to_string()));
            }
            suggestion.status = SuggestionStatus::Declined;
            suggestion.declined_at = Some(Utc::now());
            Ok(suggestion.clone())
        })
    }

    fn claim(&self, id: &str) -> Result<Suggestion> {
        // Claims are not persisted, so this skips the file rewrite.
        let mut inner = self.inner.lock();
        if inner.claimed.contains(id) {
            return Err(Error::Conflict(id.to_string()));
        }
        let suggestion = inner
            .doc
            .suggested_orders
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        if suggestion.status != SuggestionStatus::Pending {
            return Err(Error::Conflict(id.to_string()));
        }
        let suggestion = suggestion.clone();
        inner.claimed.insert(id.to_string());
        Ok(suggestion)
    }

    fn settle(&self, id: &str, outcome: ExecutionOutcome) -> Result<Suggestion> {
        self.mutate(|inner| {
            if !inner.claimed.contains(id) {
                return Err(Error::Conflict(id.to_string()));
            }
            let now = Utc::now();
            let record = ExecutionRecord {
                id: Uuid::new_v4().to_string(),
                suggestion_id: id.to_string(),
                submitted_at: now,
                outcome: outcome.clone(),
            };

            let suggestion = find_mut(&mut inner.doc, id)?;
            suggestion.status = match outcome {
                ExecutionOutcome::Submitted { .. } => SuggestionStatus::Executed,
                ExecutionOutcome::Failed { .. } => SuggestionStatus::Failed,
            };
            suggestion.executed_at = Some(now);
            let settled = suggestion.clone();

            inner.doc.executed_orders.push(record);
            inner.claimed.remove(id);
            Ok(settled)
        })
    }

    fn record_analysis(&self, prompt: &str, text: &str) -> Result<()> {
        self.mutate(|inner| {
            inner.doc.analyses.push(AnalysisRecord {
                time: Utc::now(),
                prompt: prompt.to_string(),
                analysis: text.to_string(),
            });
            Ok(())
        })
    }

    fn record_note(&self, event: &str, detail: &str) -> Result<()> {
        self.mutate(|inner| {
            inner.doc.notes.push(NoteRecord {
                time: Utc::now(),
                event: event.to_string(),
                detail: detail.to_string(),
            });
            Ok(())
        })
    }

    fn risk_committed_since(&self, since: DateTime<Utc>) -> Decimal {
        let inner = self.inner.lock();
        inner
            .doc
            .suggested_orders
            .iter()
            .filter(|s| s.status == SuggestionStatus::Executed)
            .filter(|s| s.executed_at.is_some_and(|t| t >= since))
            .fold(Decimal::ZERO, |acc, s| acc + s.risk_amount)
    }

    fn summary(&self) -> MemorySummary {
        let inner = self.inner.lock();
        MemorySummary {
            created_at: inner.doc.created_at,
            analyses_count: inner.doc.analyses.len(),
            suggested_orders_count: inner.doc.suggested_orders.len(),
            executed_orders_count: inner.doc.executed_orders.len(),
            notes_count: inner.doc.notes.len(),
        }
    }

    fn document(&self) -> MemoryDocument {
        self.inner.lock().doc.clone()
    }
}
