//! Assigning catalog tests to a patient under a referring doctor.

use crate::error::{Result, WorkflowError};
use crate::state::SubmissionGate;
use error_common::ErrorReporter;
use lab_api::models::{LabTest, TestOrder};
use lab_api::orders::CreateOrderRequest;
use lab_api::LabApi;
use rust_decimal::Decimal;
use tracing::info;

/// Selection state of the assignment form
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssignmentDraft {
    pub patient_id: String,
    doctor_id: Option<String>,
    selected: Vec<LabTest>,
}

impl AssignmentDraft {
    pub fn new(patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            ..Self::default()
        }
    }

    pub fn select_doctor(&mut self, doctor_id: impl Into<String>) {
        self.doctor_id = Some(doctor_id.into()).filter(|id: &String| !id.trim().is_empty());
    }

    pub fn doctor_id(&self) -> Option<&str> {
        self.doctor_id.as_deref()
    }

    /// # Errors
    ///
    /// [`WorkflowError::Blocked`] for inactive or already selected tests.
    pub fn add_test(&mut self, test: LabTest) -> Result<()> {
        if !test.is_active() {
            return Err(WorkflowError::blocked(format!("{} is not currently offered", test.name)));
        }
        if self.selected.iter().any(|t| t.id == test.id) {
            return Err(WorkflowError::blocked(format!("{} is already selected", test.name)));
        }
        self.selected.push(test);
        Ok(())
    }

    pub fn remove_test(&mut self, test_id: &str) -> bool {
        let before = self.selected.len();
        self.selected.retain(|t| t.id != test_id);
        self.selected.len() != before
    }

    pub fn selected(&self) -> &[LabTest] {
        &self.selected
    }

    /// Running invoice total of the selection.
    pub fn invoice_total(&self) -> Decimal {
        self.selected.iter().map(|t| t.price).sum()
    }

    /// Order request, or the message the operator should see.
    ///
    /// # Errors
    ///
    /// [`WorkflowError::Blocked`] without a doctor or without tests.
    pub fn to_request(&self) -> Result<CreateOrderRequest> {
        let doctor_id = self
            .doctor_id
            .clone()
            .ok_or_else(|| WorkflowError::blocked("Please select a doctor"))?;
        if self.selected.is_empty() {
            return Err(WorkflowError::blocked("Please select at least one test"));
        }
        Ok(CreateOrderRequest {
            patient_id: self.patient_id.clone(),
            doctor_id,
            test_ids: self.selected.iter().map(|t| t.id.clone()).collect(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct TestAssignment {
    api: LabApi,
    reporter: ErrorReporter,
    gate: SubmissionGate,
}

impl TestAssignment {
    pub fn new(api: LabApi, reporter: ErrorReporter) -> Self {
        Self {
            api,
            reporter,
            gate: SubmissionGate::default(),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.gate.is_submitting()
    }

    /// Create the order (and its bill). Every failure is toasted; the draft
    /// is left untouched for resubmission.
    ///
    /// # Errors
    ///
    /// Any [`WorkflowError`]; client-side rejections issue no request.
    pub async fn submit(&self, draft: &AssignmentDraft) -> Result<TestOrder> {
        let result = self.try_submit(draft).await;
        match &result {
            Ok(order) => self
                .reporter
                .success(format!("Tests assigned ({} items, total ₹{})", order.tests.len(), draft.invoice_total())),
            Err(e) => self.reporter.report("assign tests", e),
        }
        result
    }

    async fn try_submit(&self, draft: &AssignmentDraft) -> Result<TestOrder> {
        let request = draft.to_request()?;
        let _ticket = self.gate.try_begin().ok_or(WorkflowError::AlreadySubmitting)?;
        let order = self.api.orders.create(&request).await?;
        info!(order_id = %order.id, patient_id = %draft.patient_id, "Assignment submitted");
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lab_api::models::CatalogStatus;

    fn catalog(id: &str, name: &str, price: i64) -> LabTest {
        LabTest {
            id: id.to_string(),
            name: name.to_string(),
            category: "General".to_string(),
            price: Decimal::from(price),
            status: CatalogStatus::Active,
            parameters: Vec::new(),
        }
    }

    #[test]
    fn test_invoice_total_tracks_selection() {
        let mut draft = AssignmentDraft::new("P-1");
        draft.add_test(catalog("T-CBC", "CBC", 500)).unwrap();
        draft.add_test(catalog("T-LIPID", "Lipid Profile", 850)).unwrap();
        assert_eq!(draft.invoice_total(), Decimal::from(1350));

        assert!(draft.remove_test("T-CBC"));
        assert_eq!(draft.invoice_total(), Decimal::from(850));
    }

    #[test]
    fn test_duplicate_and_inactive_rejected() {
        let mut draft = AssignmentDraft::new("P-1");
        draft.add_test(catalog("T-CBC", "CBC", 500)).unwrap();
        assert!(draft.add_test(catalog("T-CBC", "CBC", 500)).is_err());

        let mut retired = catalog("T-OLD", "Old Panel", 100);
        retired.status = CatalogStatus::Inactive;
        assert!(draft.add_test(retired).is_err());
        assert_eq!(draft.selected().len(), 1);
    }

    #[test]
    fn test_request_requires_doctor_and_tests() {
        let mut draft = AssignmentDraft::new("P-1");
        draft.select_doctor("D-1");
        assert_eq!(
            draft.to_request().unwrap_err().to_string(),
            "Please select at least one test"
        );

        draft.add_test(catalog("T-CBC", "CBC", 500)).unwrap();
        draft.select_doctor("  ");
        assert_eq!(draft.to_request().unwrap_err().to_string(), "Please select a doctor");
    }
}
