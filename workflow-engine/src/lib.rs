//! Test-order workflow for LabDesk.
//!
//! The one multi-step process of the front desk:
//!
//! 1. [`assignment`]: pick a doctor and catalog tests for a patient; submitting
//!    creates the order and its bill on the backend.
//! 2. [`results`]: enter parameter values per test item or for the whole order
//!    at once, optionally with a file; out-of-range values are flagged.
//! 3. [`pending`]: list open orders with their next action and finalize the
//!    report once every item is COMPLETED.
//!
//! Every operation reports its outcome through an
//! [`error_common::ErrorReporter`] and leaves drafts untouched on failure.

pub mod assignment;
pub mod error;
pub mod pending;
pub mod results;
pub mod state;

pub use assignment::{AssignmentDraft, TestAssignment};
pub use error::{Result, WorkflowError};
pub use pending::{PendingOrders, PendingRow};
pub use results::{BulkResultDraft, ResultDraft, ResultEntry, ResultOutcome};
pub use state::{OrderProgress, PendingAction, StatusTransitions, SubmissionGate};
