//! Pending orders list and report finalization.

use crate::error::{Result, WorkflowError};
use crate::state::{OrderProgress, PendingAction, SubmissionGate};
use error_common::{ErrorContext, ErrorReporter};
use lab_api::models::TestOrder;
use lab_api::LabApi;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct PendingRow {
    pub order: TestOrder,
    pub progress: OrderProgress,
    pub action: PendingAction,
}

impl PendingRow {
    pub fn new(order: TestOrder) -> Self {
        Self {
            progress: OrderProgress::of(&order),
            action: PendingAction::for_order(&order),
            order,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PendingOrders {
    api: LabApi,
    reporter: ErrorReporter,
    gate: SubmissionGate,
    rows: Arc<RwLock<Vec<PendingRow>>>,
}

impl PendingOrders {
    pub fn new(api: LabApi, reporter: ErrorReporter) -> Self {
        Self {
            api,
            reporter,
            gate: SubmissionGate::default(),
            rows: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn rows(&self) -> Vec<PendingRow> {
        self.rows.read().clone()
    }

    pub fn row(&self, order_id: &str) -> Option<PendingRow> {
        self.rows.read().iter().find(|r| r.order.id == order_id).cloned()
    }

    /// Refetch the list; on failure the previous rows stay.
    ///
    /// # Errors
    ///
    /// Any backend failure, after it has been toasted.
    pub async fn refresh(&self) -> Result<Vec<PendingRow>> {
        match self.api.orders.pending().await {
            Ok(orders) => {
                let rows: Vec<PendingRow> = orders.into_iter().map(PendingRow::new).collect();
                *self.rows.write() = rows.clone();
                Ok(rows)
            }
            Err(e) => {
                let err = WorkflowError::from(e);
                self.reporter.report("load pending orders", &err);
                Err(err)
            }
        }
    }

    /// Generate the report for a fully completed order, then refetch so the
    /// order leaves the list.
    ///
    /// # Errors
    ///
    /// [`WorkflowError::NotReady`] unless every item is COMPLETED, otherwise
    /// any backend failure.
    pub async fn finalize(&self, order_id: &str) -> Result<()> {
        let result = self.try_finalize(order_id).await;
        match &result {
            Ok(()) => self.reporter.success("Report generated"),
            Err(e) => self
                .reporter
                .report_with_context(&ErrorContext::for_operation("generate report").with_resource_id(order_id), e),
        }
        result
    }

    async fn try_finalize(&self, order_id: &str) -> Result<()> {
        let order = match self.row(order_id) {
            Some(row) => row.order,
            None => self.api.orders.get(order_id).await?,
        };
        if PendingAction::for_order(&order) != PendingAction::GenerateReport {
            let progress = OrderProgress::of(&order);
            return Err(WorkflowError::NotReady {
                order_id: order_id.to_string(),
                reason: format!(
                    "{} of {} tests completed; enter all results first",
                    progress.completed, progress.total
                ),
            });
        }

        let _ticket = self.gate.try_begin().ok_or(WorkflowError::AlreadySubmitting)?;
        self.api.orders.finalize(order_id).await?;
        info!(order_id = %order_id, "Report generation triggered");

        if let Err(e) = self.api.orders.pending().await.map(|orders| {
            *self.rows.write() = orders.into_iter().map(PendingRow::new).collect();
        }) {
            // Finalized; the list is only stale until the next refresh.
            self.reporter.warning(format!("Report generated, but the list could not be refreshed: {e}"));
        }
        Ok(())
    }
}
