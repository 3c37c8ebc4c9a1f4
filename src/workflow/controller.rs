//! Workflow controller - step-machine glue and call orchestration
//!
//! Owns the transaction store (single writer) and sequences validation,
//! estimation, and the two contract calls around step transitions. A step
//! only advances after the call behind it resolves successfully; failures
//! surface as the store's error message and leave the step where it was.

use crate::config::BridgeConfig;
use crate::contracts::ContractCalls;
use crate::error::{BridgeError, BridgeResult};
use crate::metrics;
use crate::pricing::tracker::{Quote, QuoteTracker};
use crate::pricing::Estimator;
use crate::workflow::store::{
    StoreEvent, Transaction, TransactionFields, TransactionStep, TransactionStore,
};
use crate::workflow::validate::{self, FieldError, TransferForm};

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::RwLock;
use tracing::{info, warn};

const BPS_DENOMINATOR: f64 = 10_000.0;

/// Why a transfer submission was not accepted
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("validation failed")]
    Invalid(Vec<FieldError>),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Snapshot of the workflow for status reporting
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowStatus {
    pub step: TransactionStep,
    pub step_title: &'static str,
    pub step_description: &'static str,
    pub draft: Option<Transaction>,
    pub latest_quote: Option<Quote>,
    pub history_len: usize,
    pub loading: bool,
    pub error: Option<String>,
}

/// Drives the FORM -> REVIEW -> CONFIRMATION flow
pub struct WorkflowController {
    store: RwLock<TransactionStore>,
    estimator: Estimator,
    tracker: QuoteTracker,
    bridge: Arc<dyn ContractCalls>,
    policy: BridgeConfig,
}

impl WorkflowController {
    pub fn new(estimator: Estimator, bridge: Arc<dyn ContractCalls>, policy: BridgeConfig) -> Self {
        Self {
            store: RwLock::new(TransactionStore::new()),
            estimator,
            tracker: QuoteTracker::new(),
            bridge,
            policy,
        }
    }

    /// Subscribe to store transitions
    pub async fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.store.read().await.subscribe()
    }

    /// Estimate the source amount for a destination amount. Every call gets
    /// its own response; only the newest in-flight request may update the
    /// shared latest quote, so re-runs on input changes can't go backwards.
    pub async fn estimate(
        &self,
        origin: &str,
        destination: &str,
        destination_amount: f64,
    ) -> BridgeResult<Quote> {
        let generation = self.tracker.begin();

        let rate = match self.estimator.exchange_rate(origin, destination).await {
            Ok(rate) => rate,
            Err(e) => {
                metrics::record_estimate_failure();
                return Err(e);
            }
        };

        let quote = Quote {
            origin_token: origin.to_string(),
            destination_token: destination.to_string(),
            destination_amount,
            rate,
            source_amount: destination_amount / rate,
            generation,
        };

        if self.tracker.publish(quote.clone()).await {
            metrics::record_estimate(origin, destination);
        } else {
            metrics::record_estimate_stale();
        }

        Ok(quote)
    }

    /// Submit the transfer form: validate, estimate the source amount,
    /// approve the allowance (with drift buffer), then record the draft and
    /// advance to REVIEW.
    pub async fn submit_transfer(&self, form: TransferForm) -> Result<Transaction, SubmitError> {
        if let Err(errors) = validate::validate(&form, self.policy.min_amount) {
            for error in &errors {
                metrics::record_validation_failure(error.field);
            }
            return Err(SubmitError::Invalid(errors));
        }

        {
            let mut store = self.store.write().await;
            store.set_loading(true);
            store.set_error(None);
        }

        let result = self.submit_inner(&form).await;

        let mut store = self.store.write().await;
        store.set_loading(false);

        match result {
            Ok(draft) => Ok(draft),
            Err(e) => {
                warn!("Transfer submission failed: {}", e);
                store.set_error(Some(e.user_message()));
                Err(SubmitError::Bridge(e))
            }
        }
    }

    async fn submit_inner(&self, form: &TransferForm) -> BridgeResult<Transaction> {
        let quote = self
            .estimate(
                &form.origin_token,
                &form.destination_token,
                form.destination_amount,
            )
            .await?;

        // Approve a little over the estimate to tolerate rate drift between
        // estimation and execution.
        let approval_amount = quote.source_amount
            * (BPS_DENOMINATOR + self.policy.approval_buffer_bps as f64)
            / BPS_DENOMINATOR;

        self.bridge
            .approve_allowance(&form.origin_token, approval_amount)
            .await?;
        metrics::record_approval(&form.origin_token);

        let mut store = self.store.write().await;
        let draft = store.set_transaction_data(TransactionFields {
            network_chain: form.network_chain.clone(),
            destination_address: form.destination_address.clone(),
            destination_amount: form.destination_amount,
            destination_token: form.destination_token.clone(),
            origin_token: form.origin_token.clone(),
        });
        store.set_step(TransactionStep::Review);

        info!(
            "Draft {} created: {} {} -> {} {}",
            draft.id,
            quote.source_amount,
            draft.origin_token,
            draft.destination_amount,
            draft.destination_token
        );
        Ok(draft)
    }

    /// Confirm the reviewed transfer: recompute the slippage floor, submit
    /// the bridge transfer, then finalize the record and advance to
    /// CONFIRMATION.
    pub async fn confirm(&self) -> BridgeResult<Transaction> {
        let draft = match self.store.read().await.draft() {
            Some(draft) => draft.clone(),
            None => {
                return Err(BridgeError::MissingDraft {
                    operation: "confirm".to_string(),
                })
            }
        };

        {
            let mut store = self.store.write().await;
            store.set_loading(true);
            store.set_error(None);
        }

        let result = self.confirm_inner(&draft).await;

        let mut store = self.store.write().await;
        store.set_loading(false);

        match result {
            Ok(()) => {
                store.confirm_transaction();
                metrics::record_transfer(&draft.origin_token, &draft.destination_token);
                info!("Transaction {} confirmed", draft.id);
                Ok(draft)
            }
            Err(e) => {
                warn!("Bridge transfer failed: {}", e);
                store.set_error(Some(e.user_message()));
                metrics::record_transfer_failure();
                Err(e)
            }
        }
    }

    async fn confirm_inner(&self, draft: &Transaction) -> BridgeResult<()> {
        // Re-estimate at confirmation time; the form-time quote may be stale.
        let quote = self
            .estimate(
                &draft.origin_token,
                &draft.destination_token,
                draft.destination_amount,
            )
            .await?;

        // Slippage floor, enforced on-chain by the bridge contract.
        let min_destination = draft.destination_amount
            * (BPS_DENOMINATOR - self.policy.slippage_bps as f64)
            / BPS_DENOMINATOR;

        self.bridge
            .execute_bridge_transfer(
                &draft.destination_address,
                &draft.origin_token,
                &draft.destination_token,
                quote.source_amount,
                min_destination,
            )
            .await?;

        Ok(())
    }

    /// Back navigation to the form; the draft is retained so the form can be
    /// pre-filled with the previous values.
    pub async fn back(&self) {
        self.store.write().await.set_step(TransactionStep::Form);
    }

    /// Reset to a fresh form. History is retained.
    pub async fn reset(&self) {
        let mut store = self.store.write().await;
        store.reset_transaction();
        store.set_error(None);
    }

    /// Current workflow snapshot
    pub async fn status(&self) -> WorkflowStatus {
        let latest_quote = self.tracker.latest().await;
        let store = self.store.read().await;
        let step = store.step();
        WorkflowStatus {
            step,
            step_title: step.title(),
            step_description: step.description(),
            draft: store.draft().cloned(),
            latest_quote,
            history_len: store.history().len(),
            loading: store.loading(),
            error: store.error().map(str::to_string),
        }
    }

    /// Confirmed transactions, in confirmation order
    pub async fn history(&self) -> Vec<Transaction> {
        self.store.read().await.history().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::contracts::MockContractCalls;
    use crate::pricing::MockPriceSource;
    use crate::tokens::TokenRegistry;
    use ethers::types::TxHash;
    use std::collections::HashMap;

    fn policy() -> BridgeConfig {
        BridgeConfig {
            contract_address: "0xB8Bf6b9cF6D72c4D6f4149a57E55d0E400BEc162".to_string(),
            slippage_bps: 500,
            approval_buffer_bps: 500,
            deadline_secs: 1800,
            min_amount: 0.0001,
        }
    }

    fn weth_usdc_prices() -> HashMap<String, f64> {
        [("weth".to_string(), 3000.0), ("usd-coin".to_string(), 1.0)]
            .into_iter()
            .collect()
    }

    fn estimator(source: MockPriceSource) -> Estimator {
        Estimator::new(Arc::new(source), Arc::new(TokenRegistry::builtin()))
    }

    fn form() -> TransferForm {
        TransferForm {
            network_chain: "Arbitrum".to_string(),
            destination_address: "0x1111111111111111111111111111111111111111".to_string(),
            destination_amount: 300.0,
            destination_token: "USDC".to_string(),
            origin_token: "WETH".to_string(),
        }
    }

    #[tokio::test]
    async fn test_submit_approves_then_advances_to_review() {
        let mut source = MockPriceSource::new();
        source
            .expect_usd_prices()
            .returning(|_| Ok(weth_usdc_prices()));

        let mut bridge = MockContractCalls::new();
        bridge
            .expect_approve_allowance()
            .withf(|token: &str, amount: &f64| {
                // 105% of the 0.1 WETH estimate
                token == "WETH" && (*amount - 0.105).abs() < 1e-9
            })
            .times(1)
            .returning(|_, _| Ok(TxHash::zero()));

        let controller = WorkflowController::new(estimator(source), Arc::new(bridge), policy());

        let draft = controller.submit_transfer(form()).await.unwrap();

        assert_eq!(draft.destination_amount, 300.0);
        let status = controller.status().await;
        assert_eq!(status.step, TransactionStep::Review);
        assert!(status.draft.is_some());
        assert!(status.error.is_none());
    }

    #[tokio::test]
    async fn test_invalid_form_never_reaches_the_chain() {
        let source = MockPriceSource::new();
        let bridge = MockContractCalls::new(); // any call would panic

        let controller = WorkflowController::new(estimator(source), Arc::new(bridge), policy());

        let mut bad_form = form();
        bad_form.destination_amount = 0.0;

        let err = controller.submit_transfer(bad_form).await.unwrap_err();
        assert!(matches!(err, SubmitError::Invalid(_)));

        let status = controller.status().await;
        assert_eq!(status.step, TransactionStep::Form);
        assert!(status.draft.is_none());
    }

    #[tokio::test]
    async fn test_approval_failure_keeps_step_and_surfaces_error() {
        let mut source = MockPriceSource::new();
        source
            .expect_usd_prices()
            .returning(|_| Ok(weth_usdc_prices()));

        let mut bridge = MockContractCalls::new();
        bridge
            .expect_approve_allowance()
            .returning(|_, _| Err(BridgeError::ContractCall("user rejected".to_string())));

        let controller = WorkflowController::new(estimator(source), Arc::new(bridge), policy());

        assert!(controller.submit_transfer(form()).await.is_err());

        let status = controller.status().await;
        assert_eq!(status.step, TransactionStep::Form);
        assert!(status.draft.is_none());
        assert!(status.error.is_some());
        assert!(!status.loading);
    }

    #[tokio::test]
    async fn test_confirm_submits_transfer_with_slippage_floor() {
        let mut source = MockPriceSource::new();
        source
            .expect_usd_prices()
            .returning(|_| Ok(weth_usdc_prices()));

        let mut bridge = MockContractCalls::new();
        bridge
            .expect_approve_allowance()
            .returning(|_, _| Ok(TxHash::zero()));
        bridge
            .expect_execute_bridge_transfer()
            .withf(|recipient: &str, src: &str, dst: &str, amount: &f64, min: &f64| {
                recipient == "0x1111111111111111111111111111111111111111"
                    && src == "WETH"
                    && dst == "USDC"
                    && (*amount - 0.1).abs() < 1e-9
                    // 95% of 300
                    && (*min - 285.0).abs() < 1e-9
            })
            .times(1)
            .returning(|_, _, _, _, _| Ok(TxHash::zero()));

        let controller = WorkflowController::new(estimator(source), Arc::new(bridge), policy());

        controller.submit_transfer(form()).await.unwrap();
        let confirmed = controller.confirm().await.unwrap();

        let status = controller.status().await;
        assert_eq!(status.step, TransactionStep::Confirmation);
        assert_eq!(status.history_len, 1);
        assert_eq!(controller.history().await[0].id, confirmed.id);
    }

    #[tokio::test]
    async fn test_confirm_without_draft_is_rejected_without_side_effects() {
        let source = MockPriceSource::new();
        let bridge = MockContractCalls::new();

        let controller = WorkflowController::new(estimator(source), Arc::new(bridge), policy());

        let err = controller.confirm().await.unwrap_err();
        assert!(matches!(err, BridgeError::MissingDraft { .. }));

        let status = controller.status().await;
        assert_eq!(status.step, TransactionStep::Form);
        assert_eq!(status.history_len, 0);
    }

    #[tokio::test]
    async fn test_transfer_failure_stays_on_review() {
        let mut source = MockPriceSource::new();
        source
            .expect_usd_prices()
            .returning(|_| Ok(weth_usdc_prices()));

        let mut bridge = MockContractCalls::new();
        bridge
            .expect_approve_allowance()
            .returning(|_, _| Ok(TxHash::zero()));
        bridge
            .expect_execute_bridge_transfer()
            .returning(|_, _, _, _, _| Err(BridgeError::ContractCall("reverted".to_string())));

        let controller = WorkflowController::new(estimator(source), Arc::new(bridge), policy());

        controller.submit_transfer(form()).await.unwrap();
        assert!(controller.confirm().await.is_err());

        let status = controller.status().await;
        assert_eq!(status.step, TransactionStep::Review);
        assert_eq!(status.history_len, 0);
        assert!(status.error.is_some());
    }

    #[tokio::test]
    async fn test_reset_after_confirmation_retains_history() {
        let mut source = MockPriceSource::new();
        source
            .expect_usd_prices()
            .returning(|_| Ok(weth_usdc_prices()));

        let mut bridge = MockContractCalls::new();
        bridge
            .expect_approve_allowance()
            .returning(|_, _| Ok(TxHash::zero()));
        bridge
            .expect_execute_bridge_transfer()
            .returning(|_, _, _, _, _| Ok(TxHash::zero()));

        let controller = WorkflowController::new(estimator(source), Arc::new(bridge), policy());

        controller.submit_transfer(form()).await.unwrap();
        controller.confirm().await.unwrap();
        controller.reset().await;

        let status = controller.status().await;
        assert_eq!(status.step, TransactionStep::Form);
        assert!(status.draft.is_none());
        assert_eq!(status.history_len, 1);
    }

    #[tokio::test]
    async fn test_back_retains_draft_for_prefill() {
        let mut source = MockPriceSource::new();
        source
            .expect_usd_prices()
            .returning(|_| Ok(weth_usdc_prices()));

        let mut bridge = MockContractCalls::new();
        bridge
            .expect_approve_allowance()
            .returning(|_, _| Ok(TxHash::zero()));

        let controller = WorkflowController::new(estimator(source), Arc::new(bridge), policy());

        controller.submit_transfer(form()).await.unwrap();
        controller.back().await;

        let status = controller.status().await;
        assert_eq!(status.step, TransactionStep::Form);
        assert!(status.draft.is_some());
    }
}
