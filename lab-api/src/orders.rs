//! Test orders: assignment, result entry and finalization.

use crate::error::{LabApiError, LabApiResult};
use crate::models::{OrderStatus, TestOrder, TestStatus};
use crate::resource::record_path;
use crate::validation::RequestValidation;
use crate::{validate_field, validate_required};
use api_client::ApiClient;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::info;

const PATH: &str = "/test-orders";

/// Creates an order and, server-side, its bill
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub patient_id: String,
    pub doctor_id: String,
    pub test_ids: Vec<String>,
}

impl RequestValidation for CreateOrderRequest {
    fn validate(&self) -> Result<(), LabApiError> {
        validate_required!(self.patient_id, "Select a patient");
        validate_required!(self.doctor_id, "Please select a doctor");
        validate_field!(!self.test_ids.is_empty(), "Please select at least one test");
        Ok(())
    }
}

/// One parameter value as sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultValue {
    pub parameter_name: String,
    pub value: String,
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_range: Option<String>,
}

/// File attached to a single-test result
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SingleResultRequest {
    pub results: Vec<ResultValue>,
    pub attachment: Option<Attachment>,
}

impl SingleResultRequest {
    pub fn has_values(&self) -> bool {
        self.results.iter().any(|r| !r.value.trim().is_empty())
    }
}

impl RequestValidation for SingleResultRequest {
    fn validate(&self) -> Result<(), LabApiError> {
        validate_field!(
            self.has_values() || self.attachment.is_some(),
            "Enter at least one result value or attach a file"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResultValue {
    pub test_item_id: String,
    pub parameter_name: String,
    pub value: String,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BulkResultRequest {
    pub results: Vec<BulkResultValue>,
}

impl RequestValidation for BulkResultRequest {
    fn validate(&self) -> Result<(), LabApiError> {
        validate_field!(
            self.results.iter().any(|r| !r.value.trim().is_empty()),
            "Enter at least one result value"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct ResultsPayload<'a> {
    results: Vec<&'a ResultValue>,
}

/// Order state after a result submission
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    pub order: TestOrder,
}

impl SubmissionOutcome {
    /// Backend roll-up says COMPLETED, or every item already is.
    pub fn order_completed(&self) -> bool {
        self.order.overall_status == OrderStatus::Completed
            || (!self.order.tests.is_empty()
                && self.order.tests.iter().all(|t| t.status == TestStatus::Completed))
    }
}

#[derive(Debug, Clone)]
pub struct OrderService {
    client: ApiClient,
}

impl OrderService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Validation failure without a request, otherwise any backend failure.
    pub async fn create(&self, request: &CreateOrderRequest) -> LabApiResult<TestOrder> {
        request.validate()?;
        let order: TestOrder = self.client.post(PATH, request).await?;
        info!(order_id = %order.id, tests = order.tests.len(), "Test order created");
        Ok(order)
    }

    /// # Errors
    ///
    /// Any backend failure.
    pub async fn pending(&self) -> LabApiResult<Vec<TestOrder>> {
        Ok(self.client.get(&format!("{PATH}/pending")).await?)
    }

    /// # Errors
    ///
    /// Any backend failure.
    pub async fn get(&self, order_id: &str) -> LabApiResult<TestOrder> {
        Ok(self.client.get(&record_path(PATH, order_id)?).await?)
    }

    /// Results for one test item. Sent as JSON, or as multipart with a
    /// `results` JSON part and a `file` part when a file is attached.
    ///
    /// # Errors
    ///
    /// Validation failure without a request, otherwise any backend failure.
    pub async fn submit_result(
        &self,
        order_id: &str,
        test_item_id: &str,
        request: &SingleResultRequest,
    ) -> LabApiResult<SubmissionOutcome> {
        request.validate()?;
        let path = format!(
            "{}/{}/results",
            record_path(PATH, order_id)?,
            record_path("tests", test_item_id)?
        );
        let payload = ResultsPayload {
            results: request.results.iter().filter(|r| !r.value.trim().is_empty()).collect(),
        };

        let order: TestOrder = match &request.attachment {
            None => self.client.post(&path, &payload).await?,
            Some(attachment) => {
                let json = serde_json::to_string(&payload.results)
                    .map_err(|e| LabApiError::validation(format!("Unencodable results: {e}")))?;
                let file = Part::bytes(attachment.bytes.clone())
                    .file_name(attachment.file_name.clone())
                    .mime_str(&attachment.content_type)
                    .map_err(|e| LabApiError::validation(format!("Invalid attachment type: {e}")))?;
                let form = Form::new().text("results", json).part("file", file);
                self.client.post_multipart(&path, form).await?
            }
        };

        info!(order_id = %order.id, test_item_id = %test_item_id, "Result submitted");
        Ok(SubmissionOutcome { order })
    }

    /// # Errors
    ///
    /// Validation failure without a request, otherwise any backend failure.
    pub async fn submit_bulk_results(
        &self,
        order_id: &str,
        request: &BulkResultRequest,
    ) -> LabApiResult<SubmissionOutcome> {
        request.validate()?;
        let path = format!("{}/results", record_path(PATH, order_id)?);
        let filled = BulkResultRequest {
            results: request
                .results
                .iter()
                .filter(|r| !r.value.trim().is_empty())
                .cloned()
                .collect(),
        };
        let order: TestOrder = self.client.post(&path, &filled).await?;
        info!(order_id = %order.id, values = filled.results.len(), "Bulk results submitted");
        Ok(SubmissionOutcome { order })
    }

    /// Triggers server-side report synthesis.
    ///
    /// # Errors
    ///
    /// Any backend failure.
    pub async fn finalize(&self, order_id: &str) -> LabApiResult<()> {
        let path = format!("{}/finalize", record_path(PATH, order_id)?);
        self.client.post_unit(&path, &serde_json::json!({})).await?;
        info!(order_id = %order_id, "Order finalized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(name: &str, v: &str) -> ResultValue {
        ResultValue {
            parameter_name: name.to_string(),
            value: v.to_string(),
            unit: "g/dL".to_string(),
            reference_range: None,
        }
    }

    #[test]
    fn test_assignment_requires_doctor_and_tests() {
        let mut request = CreateOrderRequest {
            patient_id: "P-1".to_string(),
            doctor_id: String::new(),
            test_ids: vec!["T-1".to_string()],
        };
        assert_eq!(
            request.validate().unwrap_err().to_string(),
            "Validation error: Please select a doctor"
        );
        request.doctor_id = "D-1".to_string();
        request.test_ids.clear();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_single_result_needs_value_or_file() {
        let mut request = SingleResultRequest {
            results: vec![value("Hemoglobin", " ")],
            attachment: None,
        };
        assert!(request.validate().is_err());

        request.attachment = Some(Attachment {
            file_name: "scan.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            bytes: vec![1, 2, 3],
        });
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_bulk_all_empty_blocked() {
        let request = BulkResultRequest {
            results: vec![BulkResultValue {
                test_item_id: "t-1".to_string(),
                parameter_name: "Hemoglobin".to_string(),
                value: String::new(),
                unit: "g/dL".to_string(),
            }],
        };
        assert!(request.validate().unwrap_err().is_validation());
    }
}
