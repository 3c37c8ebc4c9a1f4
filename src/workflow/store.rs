//! Transaction store - workflow step and record lifecycle
//!
//! Holds the current step, the draft transaction, and the append-only
//! confirmation history. All mutations go through named transition functions
//! on a single owner; subscribers are notified of every transition over a
//! broadcast channel instead of observing shared state.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Workflow step. Strictly linear, with a reset edge back to the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStep {
    Form,
    Review,
    Confirmation,
}

impl TransactionStep {
    pub fn title(&self) -> &'static str {
        match self {
            TransactionStep::Form => "Transfer Details",
            TransactionStep::Review => "Review Transaction",
            TransactionStep::Confirmation => "Transaction Complete",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TransactionStep::Form => "Enter your transfer details",
            TransactionStep::Review => "Please confirm your transaction details",
            TransactionStep::Confirmation => "Your transfer has been processed successfully",
        }
    }
}

/// A transfer record. Immutable once confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub network_chain: String,
    pub destination_address: String,
    pub destination_amount: f64,
    pub destination_token: String,
    pub origin_token: String,
    /// Creation time, epoch milliseconds
    pub timestamp: i64,
}

/// Validated form fields; id and timestamp are assigned at draft creation
#[derive(Debug, Clone)]
pub struct TransactionFields {
    pub network_chain: String,
    pub destination_address: String,
    pub destination_amount: f64,
    pub destination_token: String,
    pub origin_token: String,
}

/// Notification emitted on every store transition
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    StepChanged(TransactionStep),
    DraftCreated { id: String },
    TransactionConfirmed { id: String },
    Reset,
}

/// In-memory workflow state. Single writer; no I/O.
pub struct TransactionStore {
    step: TransactionStep,
    draft: Option<Transaction>,
    history: Vec<Transaction>,
    loading: bool,
    error: Option<String>,
    events: broadcast::Sender<StoreEvent>,
}

impl TransactionStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            step: TransactionStep::Form,
            draft: None,
            history: Vec::new(),
            loading: false,
            error: None,
            events,
        }
    }

    /// Subscribe to store transitions
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Unconditional step transition (used for Back navigation)
    pub fn set_step(&mut self, step: TransactionStep) {
        self.step = step;
        self.emit(StoreEvent::StepChanged(step));
    }

    /// Create the draft from validated fields, assigning a fresh id and
    /// timestamp. Does not change the step; callers transition separately.
    pub fn set_transaction_data(&mut self, fields: TransactionFields) -> Transaction {
        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            network_chain: fields.network_chain,
            destination_address: fields.destination_address,
            destination_amount: fields.destination_amount,
            destination_token: fields.destination_token,
            origin_token: fields.origin_token,
            timestamp: Utc::now().timestamp_millis(),
        };

        self.draft = Some(transaction.clone());
        self.emit(StoreEvent::DraftCreated {
            id: transaction.id.clone(),
        });
        transaction
    }

    /// Append the draft to history and move to the confirmation step.
    /// A missing draft makes this a no-op; the draft itself is retained so
    /// the confirmation view can still read it.
    pub fn confirm_transaction(&mut self) -> bool {
        let Some(draft) = &self.draft else {
            return false;
        };

        let id = draft.id.clone();
        self.history.push(draft.clone());
        self.step = TransactionStep::Confirmation;
        self.emit(StoreEvent::TransactionConfirmed { id });
        self.emit(StoreEvent::StepChanged(self.step));
        true
    }

    /// Clear the draft and return to the form, unconditionally. History is
    /// retained.
    pub fn reset_transaction(&mut self) {
        self.draft = None;
        self.step = TransactionStep::Form;
        self.emit(StoreEvent::Reset);
        self.emit(StoreEvent::StepChanged(self.step));
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    pub fn step(&self) -> TransactionStep {
        self.step
    }

    pub fn draft(&self) -> Option<&Transaction> {
        self.draft.as_ref()
    }

    pub fn history(&self) -> &[Transaction] {
        &self.history
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn emit(&self, event: StoreEvent) {
        // nobody listening is fine
        let _ = self.events.send(event);
    }
}

impl Default for TransactionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> TransactionFields {
        TransactionFields {
            network_chain: "Arbitrum".to_string(),
            destination_address: "0x1111111111111111111111111111111111111111".to_string(),
            destination_amount: 100.0,
            destination_token: "USDC".to_string(),
            origin_token: "WETH".to_string(),
        }
    }

    #[test]
    fn test_draft_matches_submitted_fields() {
        let before = Utc::now().timestamp_millis();
        let mut store = TransactionStore::new();

        let draft = store.set_transaction_data(fields());

        assert!(!draft.id.is_empty());
        assert!(draft.timestamp >= before);
        assert_eq!(draft.network_chain, "Arbitrum");
        assert_eq!(draft.destination_amount, 100.0);
        assert_eq!(draft.destination_token, "USDC");
        assert_eq!(draft.origin_token, "WETH");
        // creating the draft does not advance the step
        assert_eq!(store.step(), TransactionStep::Form);
    }

    #[test]
    fn test_draft_ids_are_unique() {
        let mut store = TransactionStore::new();
        let first = store.set_transaction_data(fields());
        let second = store.set_transaction_data(fields());
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_confirm_without_draft_is_noop() {
        let mut store = TransactionStore::new();
        store.set_step(TransactionStep::Review);

        assert!(!store.confirm_transaction());
        assert!(store.history().is_empty());
        assert_eq!(store.step(), TransactionStep::Review);
    }

    #[test]
    fn test_confirm_appends_and_advances() {
        let mut store = TransactionStore::new();
        let draft = store.set_transaction_data(fields());
        store.set_step(TransactionStep::Review);

        assert!(store.confirm_transaction());

        assert_eq!(store.history().len(), 1);
        assert_eq!(store.history()[0], draft);
        assert_eq!(store.step(), TransactionStep::Confirmation);
        // the confirmation view still reads the draft
        assert_eq!(store.draft(), Some(&draft));
    }

    #[test]
    fn test_reset_clears_draft_and_keeps_history() {
        let mut store = TransactionStore::new();
        store.set_transaction_data(fields());
        store.set_step(TransactionStep::Review);
        store.confirm_transaction();

        store.reset_transaction();

        assert!(store.draft().is_none());
        assert_eq!(store.step(), TransactionStep::Form);
        assert_eq!(store.history().len(), 1);
    }

    #[test]
    fn test_history_preserves_confirmation_order() {
        let mut store = TransactionStore::new();

        let first = store.set_transaction_data(fields());
        store.confirm_transaction();

        let mut second_fields = fields();
        second_fields.destination_amount = 42.0;
        let second = store.set_transaction_data(second_fields);
        store.confirm_transaction();

        assert_eq!(store.history().len(), 2);
        assert_eq!(store.history()[0].id, first.id);
        assert_eq!(store.history()[1].id, second.id);
    }

    #[test]
    fn test_set_step_is_unconditional() {
        let mut store = TransactionStore::new();
        store.set_step(TransactionStep::Confirmation);
        assert_eq!(store.step(), TransactionStep::Confirmation);
        store.set_step(TransactionStep::Form);
        assert_eq!(store.step(), TransactionStep::Form);
    }

    #[test]
    fn test_subscribers_observe_transitions() {
        let mut store = TransactionStore::new();
        let mut events = store.subscribe();

        store.set_step(TransactionStep::Review);
        store.set_transaction_data(fields());
        store.confirm_transaction();

        assert_eq!(
            events.try_recv().unwrap(),
            StoreEvent::StepChanged(TransactionStep::Review)
        );
        assert!(matches!(
            events.try_recv().unwrap(),
            StoreEvent::DraftCreated { .. }
        ));
        assert!(matches!(
            events.try_recv().unwrap(),
            StoreEvent::TransactionConfirmed { .. }
        ));
    }

    #[test]
    fn test_step_titles() {
        assert_eq!(TransactionStep::Form.title(), "Transfer Details");
        assert_eq!(TransactionStep::Review.title(), "Review Transaction");
        assert_eq!(TransactionStep::Confirmation.title(), "Transaction Complete");
    }
}
