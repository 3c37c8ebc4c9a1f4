//! Transfer workflow - step state machine, validation, and orchestration glue
//!
//! The store holds the step and record lifecycle; the controller owns the
//! store and sequences estimation and contract calls around transitions.

pub mod controller;
pub mod store;
pub mod validate;

pub use controller::{SubmitError, WorkflowController, WorkflowStatus};
pub use store::{StoreEvent, Transaction, TransactionStep, TransactionStore};
pub use validate::{FieldError, TransferForm};
