//! Lab test catalog.

use crate::error::{LabApiError, LabApiResult};
use crate::models::{CatalogStatus, LabTest, TestParameter};
use crate::pagination::{ListQuery, Page};
use crate::resource::{self, ReadResource, WriteResource};
use crate::validation::RequestValidation;
use crate::{validate_field, validate_required};
use api_client::ApiClient;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const PATH: &str = "/tests";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabTestForm {
    pub name: String,
    pub category: String,
    pub price: Decimal,
    #[serde(default)]
    pub status: CatalogStatus,
    #[serde(default)]
    pub parameters: Vec<TestParameter>,
}

impl RequestValidation for LabTestForm {
    fn validate(&self) -> Result<(), LabApiError> {
        validate_required!(self.name, "Test name is required");
        validate_required!(self.category, "Category is required");
        validate_field!(self.price >= Decimal::ZERO, "Price cannot be negative");

        for parameter in &self.parameters {
            validate_required!(parameter.name, "Every parameter needs a name");
            for range in &parameter.reference_ranges {
                validate_field!(
                    range.min < range.max,
                    format!(
                        "Reference range for {} must have min below max ({} >= {})",
                        parameter.name, range.min, range.max
                    )
                );
            }
        }
        Ok(())
    }
}

impl From<&LabTest> for LabTestForm {
    fn from(test: &LabTest) -> Self {
        Self {
            name: test.name.clone(),
            category: test.category.clone(),
            price: test.price,
            status: test.status,
            parameters: test.parameters.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabTestFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CatalogStatus>,
}

impl LabTestFilter {
    pub fn active() -> Self {
        Self {
            status: Some(CatalogStatus::Active),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogService {
    client: ApiClient,
}

impl CatalogService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Every active test, following pages until the catalog is exhausted.
    ///
    /// # Errors
    ///
    /// Any backend failure.
    pub async fn active_tests(&self) -> LabApiResult<Vec<LabTest>> {
        let mut tests = self.list_all(&LabTestFilter::active()).await?;
        tests.retain(LabTest::is_active);
        Ok(tests)
    }
}

#[async_trait]
impl ReadResource for CatalogService {
    type Item = LabTest;
    type Filter = LabTestFilter;

    fn name(&self) -> &'static str {
        "tests"
    }

    async fn list(&self, query: ListQuery, filter: &LabTestFilter) -> LabApiResult<Page<LabTest>> {
        resource::fetch_page(&self.client, PATH, query, filter).await
    }

    async fn get(&self, id: &str) -> LabApiResult<LabTest> {
        let path = resource::record_path(PATH, id)?;
        Ok(self.client.get(&path).await?)
    }
}

#[async_trait]
impl WriteResource for CatalogService {
    type Form = LabTestForm;

    async fn create(&self, form: &LabTestForm) -> LabApiResult<LabTest> {
        resource::create_validated(&self.client, PATH, form).await
    }

    async fn update(&self, id: &str, form: &LabTestForm) -> LabApiResult<LabTest> {
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
    use crate::models::{RangeGender, ReferenceRange};
    use proptest::prelude::*;

    fn cbc(min: f64, max: f64) -> LabTestForm {
        LabTestForm {
            name: "CBC".to_string(),
            category: "Hematology".to_string(),
            price: Decimal::from(500),
            status: CatalogStatus::Active,
            parameters: vec![TestParameter {
                name: "Hemoglobin".to_string(),
                unit: "g/dL".to_string(),
                reference_ranges: vec![ReferenceRange { gender: RangeGender::Female, min, max }],
            }],
        }
    }

    #[test]
    fn test_valid_catalog_entry() {
        assert!(cbc(12.0, 15.5).validate().is_ok());
    }

    #[test]
    fn test_negative_price_rejected() {
        let form = LabTestForm { price: Decimal::from(-1), ..cbc(12.0, 15.5) };
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_unnamed_parameter_rejected() {
        let mut form = cbc(12.0, 15.5);
        form.parameters[0].name = String::new();
        assert!(form.validate().is_err());
    }

    proptest! {
        #[test]
        fn prop_range_requires_min_below_max(min in -1000.0f64..1000.0, delta in 0.0f64..500.0) {
            // max <= min must always be rejected
            let form = cbc(min, min - delta);
            prop_assert!(form.validate().is_err());
            prop_assert!(cbc(min, min + delta + 0.5).validate().is_ok());
        }
    }
}
