use crate::error::LabApiResult;
use crate::models::{Gender, Patient, ReportStatus, TestOrder};
use crate::pagination::{ListQuery, Page};
use crate::resource::{self, ReadResource, WriteResource};
use crate::validation::{is_valid_phone, RequestValidation};
use crate::{validate_field, validate_optional_email, validate_required};
use api_client::ApiClient;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const PATH: &str = "/patients";
const MAX_AGE: u32 = 150;

/// Registration / edit form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientForm {
    pub full_name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub age: u32,
    pub gender: Gender,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
}

impl RequestValidation for PatientForm {
    fn validate(&self) -> Result<(), crate::LabApiError> {
        validate_required!(self.full_name, "Full name is required");
        validate_required!(self.phone, "Phone number is required");
        validate_field!(is_valid_phone(&self.phone), "Phone number must have 10 digits");
        validate_optional_email!(self.email, "Invalid email format");
        validate_field!(self.age <= MAX_AGE, "Age must be between 0 and 150");
        validate_required!(self.address, "Address is required");
        Ok(())
    }
}

impl From<&Patient> for PatientForm {
    fn from(patient: &Patient) -> Self {
        Self {
            full_name: patient.full_name.clone(),
            phone: patient.phone.clone(),
            email: patient.email.clone(),
            age: patient.age,
            gender: patient.gender,
            address: patient.address.clone(),
            date_of_birth: patient.date_of_birth,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_status: Option<ReportStatus>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryWire {
    Orders(Vec<TestOrder>),
    Wrapped {
        #[serde(alias = "orders", alias = "history")]
        #[serde(rename = "testOrders")]
        test_orders: Vec<TestOrder>,
    },
}

/// Patient registry endpoints
#[derive(Debug, Clone)]
pub struct PatientService {
    client: ApiClient,
}

impl PatientService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Past orders of a patient, newest first.
    ///
    /// # Errors
    ///
    /// Any backend failure.
    pub async fn history(&self, patient_id: &str) -> LabApiResult<Vec<TestOrder>> {
        let path = format!("{}/history", resource::record_path(PATH, patient_id)?);
        let wire: HistoryWire = self.client.get(&path).await?;
        let mut orders = match wire {
            HistoryWire::Orders(orders) | HistoryWire::Wrapped { test_orders: orders } => orders,
        };
        orders.sort_by(|a, b| b.order_date.cmp(&a.order_date));
        Ok(orders)
    }
}

#[async_trait]
impl ReadResource for PatientService {
    type Item = Patient;
    type Filter = PatientFilter;

    fn name(&self) -> &'static str {
        "patients"
    }

    async fn list(&self, query: ListQuery, filter: &PatientFilter) -> LabApiResult<Page<Patient>> {
        resource::fetch_page(&self.client, PATH, query, filter).await
    }

    async fn get(&self, id: &str) -> LabApiResult<Patient> {
        let path = resource::record_path(PATH, id)?;
        Ok(self.client.get(&path).await?)
    }
}

#[async_trait]
impl WriteResource for PatientService {
    type Form = PatientForm;

    async fn create(&self, form: &PatientForm) -> LabApiResult<Patient> {
        resource::create_validated(&self.client, PATH, form).await
    }

    async fn update(&self, id: &str, form: &PatientForm) -> LabApiResult<Patient> {
        let path = resource::record_path(PATH, id)?;
        resource::update_validated(&self.client, &path, form).await
    }

    async fn delete(&self, id: &str) -> LabApiResult<()> {
        let path = resource::record_path(PATH, id)?;
        resource::delete_record(&self.client, &path).await
    }
}
