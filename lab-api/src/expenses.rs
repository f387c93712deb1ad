//! Expenses and their PDF exports.

use crate::error::{LabApiError, LabApiResult};
use crate::models::{EntityRef, Expense, ExpenseCategory};
use crate::pagination::{ListQuery, Page};
use crate::resource::{self, ReadResource, WriteResource};
use crate::validation::RequestValidation;
use crate::{validate_field, validate_present, validate_required};
use api_client::{ApiClient, Download};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

const PATH: &str = "/expenses";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseForm {
    pub title: String,
    pub category: ExpenseCategory,
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    /// Doctor id, for commission payouts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor: Option<String>,
}

impl RequestValidation for ExpenseForm {
    fn validate(&self) -> Result<(), LabApiError> {
        validate_required!(self.title, "Title is required");
        validate_field!(self.amount > Decimal::ZERO, "Amount must be greater than 0");

        match self.category {
            ExpenseCategory::LabMaterials => {
                validate_field!(
                    self.quantity.is_some_and(|q| q > Decimal::ZERO),
                    "Quantity is required for lab materials"
                );
                validate_present!(self.unit, "Unit is required for lab materials");
                validate_present!(self.supplier, "Supplier is required for lab materials");
            }
            ExpenseCategory::Commission => {
                validate_present!(self.doctor, "Select the doctor receiving the commission");
            }
            _ => {}
        }
        Ok(())
    }
}

impl From<&Expense> for ExpenseForm {
    fn from(expense: &Expense) -> Self {
        Self {
            title: expense.title.clone(),
            category: expense.category,
            amount: expense.amount,
            date: expense.date,
            description: expense.description.clone(),
            quantity: expense.quantity,
            unit: expense.unit.clone(),
            supplier: expense.supplier.clone(),
            doctor: expense.doctor.as_ref().map(|d: &EntityRef| d.id.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ExpenseCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl ExpenseFilter {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Calendar month an export covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportPeriod {
    pub year: i32,
    pub month: u32,
}

impl std::fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Month for a monthly export: the filter's start date, else the most recent
/// loaded row, else `today`.
pub fn resolve_report_period(filter: &ExpenseFilter, rows: &[Expense], today: NaiveDate) -> ReportPeriod {
    let anchor = filter
        .start_date
        .or(filter.end_date)
        .or_else(|| rows.iter().map(|e| e.date).max())
        .unwrap_or(today);
    ReportPeriod {
        year: anchor.year(),
        month: anchor.month(),
    }
}

#[derive(Serialize)]
struct YearQuery {
    year: i32,
}

#[derive(Debug, Clone)]
pub struct ExpenseService {
    client: ApiClient,
}

impl ExpenseService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Any backend failure.
    pub async fn export_monthly(&self, period: ReportPeriod) -> LabApiResult<Download> {
        validate_field!((1..=12).contains(&period.month), "Month must be between 1 and 12");
        let download = self
            .client
            .download_with_query(&format!("{PATH}/reports/monthly"), &period)
            .await?;
        info!(period = %period, size = download.bytes.len(), "Monthly expense report downloaded");
        Ok(download)
    }

    /// # Errors
    ///
    /// Any backend failure.
    pub async fn export_yearly(&self, year: i32) -> LabApiResult<Download> {
        let download = self
            .client
            .download_with_query(&format!("{PATH}/reports/yearly"), &YearQuery { year })
            .await?;
        info!(year, size = download.bytes.len(), "Yearly expense report downloaded");
        Ok(download)
    }
}

#[async_trait]
impl ReadResource for ExpenseService {
    type Item = Expense;
    type Filter = ExpenseFilter;

    fn name(&self) -> &'static str {
        "expenses"
    }

    async fn list(&self, query: ListQuery, filter: &ExpenseFilter) -> LabApiResult<Page<Expense>> {
        resource::fetch_page(&self.client, PATH, query, filter).await
    }

    async fn get(&self, id: &str) -> LabApiResult<Expense> {
        let path = resource::record_path(PATH, id)?;
        Ok(self.client.get(&path).await?)
    }
}

#[async_trait]
impl WriteResource for ExpenseService {
    type Form = ExpenseForm;

    async fn create(&self, form: &ExpenseForm) -> LabApiResult<Expense> {
        resource::create_validated(&self.client, PATH, form).await
    }

    async fn update(&self, id: &str, form: &ExpenseForm) -> LabApiResult<Expense> {
        let path = resource::record_path(PATH, id)?;
        resource::update_validated(&self.client, &path, form).await
    }

    async fn delete(&self, id: &str) -> LabApiResult<()> {
        let path = resource::record_path(PATH, id)?;
        resource::delete_record(&self.client, &path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rent(amount: Decimal) -> ExpenseForm {
        ExpenseForm {
            title: "October rent".to_string(),
            category: ExpenseCategory::Rent,
            amount,
            date: date(2026, 10, 1),
            description: None,
            quantity: None,
            unit: None,
            supplier: None,
            doctor: None,
        }
    }

    #[test]
    fn test_lab_materials_need_quantity_unit_supplier() {
        let mut form = ExpenseForm {
            category: ExpenseCategory::LabMaterials,
            ..rent(Decimal::from(1200))
        };
        assert!(form.validate().is_err());

        form.quantity = Some(Decimal::from(4));
        form.unit = Some("boxes".to_string());
        assert!(form.validate().is_err());

        form.supplier = Some("MedSupply".to_string());
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_commission_needs_doctor() {
        let mut form = ExpenseForm {
            category: ExpenseCategory::Commission,
            ..rent(Decimal::from(300))
        };
        assert!(form.validate().is_err());
        form.doctor = Some("D-1".to_string());
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_period_falls_back_to_today() {
        let period = resolve_report_period(&ExpenseFilter::default(), &[], date(2026, 10, 18));
        assert_eq!(period, ReportPeriod { year: 2026, month: 10 });
        assert_eq!(period.to_string(), "2026-10");
    }

    #[test]
    fn test_period_prefers_filter() {
        let filter = ExpenseFilter {
            start_date: Some(date(2025, 3, 1)),
            ..ExpenseFilter::default()
        };
        let period = resolve_report_period(&filter, &[], date(2026, 10, 18));
        assert_eq!(period, ReportPeriod { year: 2025, month: 3 });
    }

    proptest! {
        #[test]
        fn prop_non_positive_amount_rejected(cents in -1_000_000i64..=0) {
            let err = rent(Decimal::new(cents, 2)).validate().unwrap_err();
            prop_assert!(err.is_validation());
        }
    }
}
