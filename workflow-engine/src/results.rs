//! Result entry: one test item at a time, or every item of an order at once.

use crate::error::{Result, WorkflowError};
use crate::state::{StatusTransitions, SubmissionGate};
use error_common::{ErrorContext, ErrorReporter};
use lab_api::models::{Gender, OrderTest, ReferenceRange, TestOrder, TestStatus};
use lab_api::orders::{Attachment, BulkResultRequest, BulkResultValue, ResultValue, SingleResultRequest, SubmissionOutcome};
use lab_api::reports::{flag_value, ReportDocument, ResultFlag};
use lab_api::LabApi;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// One input row of the result form
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInput {
    pub name: String,
    pub unit: String,
    pub range: Option<ReferenceRange>,
    pub value: String,
}

impl ParameterInput {
    fn for_test(test: &OrderTest, gender: Option<Gender>) -> Vec<Self> {
        test.parameters
            .iter()
            .map(|p| {
                let existing = test
                    .results
                    .iter()
                    .find(|r| r.parameter_name == p.name)
                    .map(|r| r.value.clone());
                Self {
                    name: p.name.clone(),
                    unit: p.unit.clone(),
                    range: gender.and_then(|g| p.range_for(g)).copied(),
                    value: existing.unwrap_or_default(),
                }
            })
            .collect()
    }

    /// Preview flag; never blocks submission.
    pub fn flag(&self) -> ResultFlag {
        flag_value(self.range.as_ref(), &self.value)
    }

    fn range_text(&self) -> Option<String> {
        self.range.as_ref().map(ToString::to_string)
    }
}

/// Form for one test item of an order
#[derive(Debug, Clone, PartialEq)]
pub struct ResultDraft {
    pub order_id: String,
    pub test_item_id: String,
    pub test_name: String,
    pub inputs: Vec<ParameterInput>,
    pub attachment: Option<Attachment>,
}

impl ResultDraft {
    /// # Errors
    ///
    /// [`WorkflowError::Unknown`] when the order has no such item,
    /// [`WorkflowError::Blocked`] when the item can no longer move to
    /// COMPLETED.
    pub fn for_test(order: &TestOrder, test_item_id: &str, gender: Option<Gender>) -> Result<Self> {
        let test = order.test(test_item_id).ok_or_else(|| WorkflowError::Unknown {
            what: "test item",
            name: test_item_id.to_string(),
        })?;
        if !test.status.can_transition_to(TestStatus::Completed) {
            let state = if test.status == TestStatus::Cancelled { "cancelled" } else { "already completed" };
            return Err(WorkflowError::blocked(format!("{} is {state}", test.name)));
        }
        Ok(Self {
            order_id: order.id.clone(),
            test_item_id: test.id.clone(),
            test_name: test.name.clone(),
            inputs: ParameterInput::for_test(test, gender),
            attachment: None,
        })
    }

    /// # Errors
    ///
    /// [`WorkflowError::Unknown`] for a parameter this test does not have.
    pub fn set_value(&mut self, parameter: &str, value: impl Into<String>) -> Result<()> {
        let input = self
            .inputs
            .iter_mut()
            .find(|i| i.name == parameter)
            .ok_or_else(|| WorkflowError::Unknown {
                what: "parameter",
                name: parameter.to_string(),
            })?;
        input.value = value.into();
        Ok(())
    }

    pub fn attach(&mut self, attachment: Attachment) {
        self.attachment = Some(attachment);
    }

    pub fn out_of_range(&self) -> Vec<&ParameterInput> {
        self.inputs.iter().filter(|i| i.flag().is_out_of_range()).collect()
    }

    fn to_request(&self) -> SingleResultRequest {
        SingleResultRequest {
            results: self
                .inputs
                .iter()
                .map(|i| ResultValue {
                    parameter_name: i.name.clone(),
                    value: i.value.trim().to_string(),
                    unit: i.unit.clone(),
                    reference_range: i.range_text(),
                })
                .collect(),
            attachment: self.attachment.clone(),
        }
    }
}

/// Form covering every open item of an order, keyed by
/// `(test item id, parameter name)` so equal names on different tests stay
/// separate.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkResultDraft {
    pub order_id: String,
    cells: BTreeMap<(String, String), ParameterInput>,
}

impl BulkResultDraft {
    /// Items already COMPLETED or CANCELLED are left out.
    pub fn for_order(order: &TestOrder, gender: Option<Gender>) -> Self {
        let cells = order
            .tests
            .iter()
            .filter(|t| t.status.can_transition_to(TestStatus::Completed))
            .flat_map(|t| {
                ParameterInput::for_test(t, gender)
                    .into_iter()
                    .map(move |input| ((t.id.clone(), input.name.clone()), input))
            })
            .collect();
        Self {
            order_id: order.id.clone(),
            cells,
        }
    }

    /// # Errors
    ///
    /// [`WorkflowError::Unknown`] for a cell not in the draft.
    pub fn set_value(&mut self, test_item_id: &str, parameter: &str, value: impl Into<String>) -> Result<()> {
        let cell = self
            .cells
            .get_mut(&(test_item_id.to_string(), parameter.to_string()))
            .ok_or_else(|| WorkflowError::Unknown {
                what: "parameter",
                name: format!("{test_item_id}/{parameter}"),
            })?;
        cell.value = value.into();
        Ok(())
    }

    pub fn value(&self, test_item_id: &str, parameter: &str) -> Option<&str> {
        self.cells
            .get(&(test_item_id.to_string(), parameter.to_string()))
            .map(|c| c.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn is_blank(&self) -> bool {
        self.cells.values().all(|c| c.value.trim().is_empty())
    }

    fn to_request(&self) -> BulkResultRequest {
        BulkResultRequest {
            results: self
                .cells
                .iter()
                .map(|((test_item_id, _), input)| BulkResultValue {
                    test_item_id: test_item_id.clone(),
                    parameter_name: input.name.clone(),
                    value: input.value.trim().to_string(),
                    unit: input.unit.clone(),
                })
                .collect(),
        }
    }
}

/// What a successful submission produced
#[derive(Debug, Clone)]
pub struct ResultOutcome {
    pub order: TestOrder,
    /// Fetched eagerly once the whole order is COMPLETED
    pub report: Option<ReportDocument>,
}

#[derive(Debug, Clone)]
pub struct ResultEntry {
    api: LabApi,
    reporter: ErrorReporter,
    gate: SubmissionGate,
}

impl ResultEntry {
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

    /// # Errors
    ///
    /// Any [`WorkflowError`]; an empty form without attachment issues no
    /// request. Failures are toasted and the draft is kept.
    pub async fn submit(&self, draft: &ResultDraft) -> Result<ResultOutcome> {
        let result = self.try_submit(draft).await;
        self.announce("submit result", &draft.order_id, &format!("Results saved for {}", draft.test_name), &result);
        result
    }

    /// # Errors
    ///
    /// Any [`WorkflowError`]; an all-blank draft issues no request.
    pub async fn submit_bulk(&self, draft: &BulkResultDraft) -> Result<ResultOutcome> {
        let result = self.try_submit_bulk(draft).await;
        self.announce("submit bulk results", &draft.order_id, "Results saved", &result);
        result
    }

    async fn try_submit(&self, draft: &ResultDraft) -> Result<ResultOutcome> {
        let request = draft.to_request();
        if !request.has_values() && request.attachment.is_none() {
            return Err(WorkflowError::blocked("Enter at least one result value or attach a file"));
        }
        let _ticket = self.gate.try_begin().ok_or(WorkflowError::AlreadySubmitting)?;
        let outcome = self
            .api
            .orders
            .submit_result(&draft.order_id, &draft.test_item_id, &request)
            .await?;
        Ok(self.complete(outcome).await)
    }

    async fn try_submit_bulk(&self, draft: &BulkResultDraft) -> Result<ResultOutcome> {
        if draft.is_blank() {
            return Err(WorkflowError::blocked("Enter at least one result value"));
        }
        let _ticket = self.gate.try_begin().ok_or(WorkflowError::AlreadySubmitting)?;
        let outcome = self
            .api
            .orders
            .submit_bulk_results(&draft.order_id, &draft.to_request())
            .await?;
        Ok(self.complete(outcome).await)
    }

    async fn complete(&self, outcome: SubmissionOutcome) -> ResultOutcome {
        if !outcome.order_completed() {
            return ResultOutcome {
                order: outcome.order,
                report: None,
            };
        }

        info!(order_id = %outcome.order.id, "Order completed, fetching report");
        let report = match self.api.reports.get(&outcome.order.id).await {
            Ok(report) => Some(report),
            Err(e) => {
                // The results are saved; only the preview is missing.
                warn!(order_id = %outcome.order.id, error = %e, "Report not available yet");
                self.reporter.warning("Results saved, but the report could not be loaded yet");
                None
            }
        };
        ResultOutcome {
            order: outcome.order,
            report,
        }
    }

    fn announce(&self, operation: &str, order_id: &str, success: &str, result: &Result<ResultOutcome>) {
        match result {
            Ok(_) => self.reporter.success(success),
            Err(e) => self
                .reporter
                .report_with_context(&ErrorContext::for_operation(operation).with_resource_id(order_id), e),
        }
    }
}
