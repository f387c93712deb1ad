//! Per-item status machine and the client-side roll-up of an order.

use lab_api::models::{TestOrder, TestStatus};
use parking_lot::Mutex;
use std::sync::Arc;

/// Allowed moves of a single test item: PENDING → IN_PROGRESS → COMPLETED,
/// with CANCELLED reachable from any non-terminal state.
pub trait StatusTransitions {
    fn can_transition_to(self, next: TestStatus) -> bool;
    fn is_terminal(self) -> bool;
}

impl StatusTransitions for TestStatus {
    fn can_transition_to(self, next: TestStatus) -> bool {
        use TestStatus::{Cancelled, Completed, InProgress, Pending};
        matches!(
            (self, next),
            (Pending, InProgress | Completed | Cancelled) | (InProgress, Completed | Cancelled)
        )
    }

    fn is_terminal(self) -> bool {
        matches!(self, TestStatus::Completed | TestStatus::Cancelled)
    }
}

/// Item counts of an order, ignoring cancelled items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderProgress {
    pub completed: usize,
    pub total: usize,
}

impl OrderProgress {
    pub fn of(order: &TestOrder) -> Self {
        let active = order.tests.iter().filter(|t| t.status != TestStatus::Cancelled);
        let (completed, total) = active.fold((0, 0), |(done, all), t| {
            (done + usize::from(t.status == TestStatus::Completed), all + 1)
        });
        Self { completed, total }
    }

    /// Every non-cancelled item COMPLETED, and at least one item exists.
    /// The backend's `overallStatus` is not consulted.
    pub fn ready_for_report(self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

/// Next step offered for an order in the pending list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    EnterResult,
    GenerateReport,
}

impl PendingAction {
    pub fn for_order(order: &TestOrder) -> Self {
        if OrderProgress::of(order).ready_for_report() {
            Self::GenerateReport
        } else {
            Self::EnterResult
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::EnterResult => "Enter Result",
            Self::GenerateReport => "Generate Report",
        }
    }
}

/// The `submitting` flag: at most one submission at a time per workflow.
#[derive(Debug, Clone, Default)]
pub struct SubmissionGate {
    busy: Arc<Mutex<bool>>,
}

impl SubmissionGate {
    /// `None` while another submission holds the gate.
    pub fn try_begin(&self) -> Option<SubmissionTicket> {
        let mut busy = self.busy.lock();
        if *busy {
            return None;
        }
        *busy = true;
        Some(SubmissionTicket {
            busy: Arc::clone(&self.busy),
        })
    }

    pub fn is_submitting(&self) -> bool {
        *self.busy.lock()
    }
}

/// Releases the gate on drop, whether the submission succeeded or not.
#[derive(Debug)]
pub struct SubmissionTicket {
    busy: Arc<Mutex<bool>>,
}

impl Drop for SubmissionTicket {
    fn drop(&mut self) {
        *self.busy.lock() = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lab_api::models::{EntityRef, OrderStatus, OrderTest};
    use rust_decimal::Decimal;

    fn item(id: &str, status: TestStatus) -> OrderTest {
        OrderTest {
            id: id.to_string(),
            test_id: None,
            name: id.to_uppercase(),
            price: Decimal::from(500),
            status,
            parameters: Vec::new(),
            results: Vec::new(),
        }
    }

    fn order(statuses: &[TestStatus]) -> TestOrder {
        TestOrder {
            id: "o-1".to_string(),
            patient_id: EntityRef::id("P-1"),
            doctor_id: EntityRef::id("D-1"),
            tests: statuses
                .iter()
                .enumerate()
                .map(|(i, s)| item(&format!("t-{i}"), *s))
                .collect(),
            overall_status: OrderStatus::Completed,
            order_date: None,
            bill_id: None,
        }
    }

    #[test]
    fn test_transitions() {
        assert!(TestStatus::Pending.can_transition_to(TestStatus::InProgress));
        assert!(TestStatus::InProgress.can_transition_to(TestStatus::Completed));
        assert!(TestStatus::Pending.can_transition_to(TestStatus::Cancelled));
        assert!(!TestStatus::Completed.can_transition_to(TestStatus::Pending));
        assert!(!TestStatus::Cancelled.can_transition_to(TestStatus::InProgress));
        assert!(TestStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_backend_roll_up_not_trusted() {
        // overall_status says COMPLETED but an item is still pending
        let order = order(&[TestStatus::Completed, TestStatus::Pending]);
        assert_eq!(PendingAction::for_order(&order), PendingAction::EnterResult);
    }

    #[test]
    fn test_cancelled_items_ignored() {
        let order = order(&[TestStatus::Completed, TestStatus::Cancelled]);
        assert_eq!(OrderProgress::of(&order), OrderProgress { completed: 1, total: 1 });
        assert_eq!(PendingAction::for_order(&order), PendingAction::GenerateReport);
    }

    #[test]
    fn test_empty_order_never_ready() {
        assert!(!OrderProgress::of(&order(&[])).ready_for_report());
        assert!(!OrderProgress::of(&order(&[TestStatus::Cancelled])).ready_for_report());
    }

    #[test]
    fn test_gate_released_on_drop() {
        let gate = SubmissionGate::default();
        let ticket = gate.try_begin().unwrap();
        assert!(gate.is_submitting());
        assert!(gate.clone().try_begin().is_none());
        drop(ticket);
        assert!(gate.try_begin().is_some());
    }
}
