//! Finalized reports: preview, PDF and dispatch.
//!
//! Rendering and delivery happen on the backend; this module fetches the
//! finalized document and formats a plain-text preview with out-of-range
//! values flagged against the patient's reference ranges.

use crate::error::LabApiResult;
use crate::models::{EntityRef, Gender, LabConfig, OrderTest, Patient, ReferenceRange, TestParameter};
use crate::resource::record_path;
use api_client::{ApiClient, Download};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::info;

const PATH: &str = "/reports";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default, alias = "testOrderId", alias = "testOrder")]
    pub order_id: Option<EntityRef>,
    #[serde(alias = "patientId")]
    pub patient: Patient,
    #[serde(default, alias = "doctorId")]
    pub doctor: Option<EntityRef>,
    #[serde(default, alias = "results")]
    pub tests: Vec<OrderTest>,
    #[serde(default, alias = "lab", alias = "labConfig")]
    pub lab_config: Option<LabConfig>,
    #[serde(default, alias = "createdAt")]
    pub generated_at: Option<DateTime<Utc>>,
}

/// How a value compares with its reference range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFlag {
    Normal,
    Low,
    High,
    /// No range for this gender, or a non-numeric value
    Unflagged,
}

impl ResultFlag {
    pub fn marker(self) -> &'static str {
        match self {
            Self::Low => "L",
            Self::High => "H",
            Self::Normal | Self::Unflagged => "",
        }
    }

    pub fn is_out_of_range(self) -> bool {
        matches!(self, Self::Low | Self::High)
    }
}

pub fn flag_value(range: Option<&ReferenceRange>, value: &str) -> ResultFlag {
    let (Some(range), Ok(number)) = (range, value.trim().parse::<f64>()) else {
        return ResultFlag::Unflagged;
    };
    if number < range.min {
        ResultFlag::Low
    } else if number > range.max {
        ResultFlag::High
    } else {
        ResultFlag::Normal
    }
}

/// Flag for `parameter`'s value, using the range matching `gender`.
pub fn flag_parameter(parameter: &TestParameter, gender: Gender, value: &str) -> ResultFlag {
    flag_value(parameter.range_for(gender), value)
}

#[derive(Serialize)]
struct SendRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct ReportService {
    client: ApiClient,
}

impl ReportService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Any backend failure.
    pub async fn get(&self, order_id: &str) -> LabApiResult<ReportDocument> {
        Ok(self.client.get(&record_path(PATH, order_id)?).await?)
    }

    /// # Errors
    ///
    /// Any backend failure.
    pub async fn pdf(&self, order_id: &str) -> LabApiResult<Download> {
        let path = format!("{}/pdf", record_path(PATH, order_id)?);
        Ok(self.client.download(&path).await?)
    }

    /// Email the report; `None` sends to the address on file.
    ///
    /// # Errors
    ///
    /// Any backend failure.
    pub async fn send(&self, order_id: &str, email: Option<&str>) -> LabApiResult<()> {
        let path = format!("{}/send", record_path(PATH, order_id)?);
        self.client.post_unit(&path, &SendRequest { email }).await?;
        info!(order_id = %order_id, "Report dispatched");
        Ok(())
    }
}

/// Plain-text preview of a finalized report.
pub fn render_report_text(report: &ReportDocument) -> String {
    let mut out = String::new();
    if let Some(lab) = &report.lab_config {
        let _ = writeln!(out, "{}", lab.lab_name);
        if !lab.address.is_empty() {
            let _ = writeln!(out, "{}", lab.address);
        }
        if !lab.contact.is_empty() {
            let _ = writeln!(out, "Contact: {}", lab.contact);
        }
        out.push('\n');
    }

    let patient = &report.patient;
    let _ = writeln!(
        out,
        "Patient: {} ({} yrs, {:?})",
        patient.full_name, patient.age, patient.gender
    );
    if let Some(doctor) = &report.doctor {
        let _ = writeln!(out, "Referred by: {}", doctor.display_name());
    }
    if let Some(at) = report.generated_at {
        let _ = writeln!(out, "Date: {}", at.format("%d %b %Y"));
    }

    for test in &report.tests {
        let _ = writeln!(out, "\n{}", test.name);
        for result in &test.results {
            let parameter = test.parameters.iter().find(|p| p.name == result.parameter_name);
            let range = parameter.and_then(|p| p.range_for(patient.gender));
            let range_text = range
                .map(ToString::to_string)
                .or_else(|| result.reference_range.clone())
                .unwrap_or_default();
            let flag = flag_value(range, &result.value);
            let _ = writeln!(
                out,
                "  {:<24} {:>10} {:<3} {:<8} {}",
                result.parameter_name,
                result.value,
                flag.marker(),
                result.unit,
                range_text
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report() -> ReportDocument {
        serde_json::from_value(json!({
            "testOrderId": "o-1",
            "patientId": {
                "_id": "P-1", "fullName": "Asha Rao", "phone": "9999900000",
                "age": 34, "gender": "Female", "address": "Pune"
            },
            "doctorId": {"_id": "D-1", "name": "Dr. Mehta"},
            "labConfig": {"labName": "City Diagnostics", "address": "MG Road", "contact": "020-5555"},
            "tests": [{
                "_id": "t-1",
                "name": "CBC",
                "status": "COMPLETED",
                "parameters": [{
                    "name": "Hemoglobin",
                    "unit": "g/dL",
                    "referenceRanges": [
                        {"gender": "Male", "min": 13.5, "max": 17.5},
                        {"gender": "Female", "min": 12.0, "max": 15.5}
                    ]
                }],
                "results": [{"parameterName": "Hemoglobin", "value": "16.1", "unit": "g/dL"}]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn test_flag_value() {
        let range = ReferenceRange {
            gender: crate::models::RangeGender::All,
            min: 12.0,
            max: 15.5,
        };
        assert_eq!(flag_value(Some(&range), "11.9"), ResultFlag::Low);
        assert_eq!(flag_value(Some(&range), "15.5"), ResultFlag::Normal);
        assert_eq!(flag_value(Some(&range), "16"), ResultFlag::High);
        assert_eq!(flag_value(Some(&range), "positive"), ResultFlag::Unflagged);
        assert_eq!(flag_value(None, "16"), ResultFlag::Unflagged);
    }

    #[test]
    fn test_render_flags_by_patient_gender() {
        let text = render_report_text(&report());
        assert!(text.starts_with("City Diagnostics"));
        assert!(text.contains("Referred by: Dr. Mehta"));
        let line = text.lines().find(|l| l.contains("Hemoglobin")).unwrap();
        // 16.1 is normal for men but high against the female range
        assert!(line.contains(" H "));
        assert!(line.contains("12 - 15.5"));
    }
}
