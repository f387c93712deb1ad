use crate::error::LabApiResult;
use crate::models::Doctor;
use crate::pagination::{ListQuery, Page};
use crate::resource::{self, ReadResource, WriteResource};
use crate::validation::RequestValidation;
use crate::{validate_optional_email, validate_range, validate_required};
use api_client::ApiClient;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const PATH: &str = "/doctors";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorForm {
    pub name: String,
    pub mobile: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub specialization: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub commission_percentage: Decimal,
}

impl RequestValidation for DoctorForm {
    fn validate(&self) -> Result<(), crate::LabApiError> {
        validate_required!(self.name, "Doctor name is required");
        validate_required!(self.mobile, "Mobile number is required");
        validate_required!(self.specialization, "Specialization is required");
        validate_optional_email!(self.email, "Invalid email format");
        validate_range!(
            self.commission_percentage,
            Decimal::ZERO,
            Decimal::ONE_HUNDRED,
            "Commission must be between 0 and 100"
        );
        Ok(())
    }
}

impl From<&Doctor> for DoctorForm {
    fn from(doctor: &Doctor) -> Self {
        Self {
            name: doctor.name.clone(),
            mobile: doctor.mobile.clone(),
            email: doctor.email.clone(),
            specialization: doctor.specialization.clone(),
            degree: doctor.degree.clone(),
            address: doctor.address.clone(),
            commission_percentage: doctor.commission_percentage,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DoctorFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
}

/// Referring doctors
#[derive(Debug, Clone)]
pub struct DoctorService {
    client: ApiClient,
}

impl DoctorService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReadResource for DoctorService {
    type Item = Doctor;
    type Filter = DoctorFilter;

    fn name(&self) -> &'static str {
        "doctors"
    }

    async fn list(&self, query: ListQuery, filter: &DoctorFilter) -> LabApiResult<Page<Doctor>> {
        resource::fetch_page(&self.client, PATH, query, filter).await
    }

    async fn get(&self, id: &str) -> LabApiResult<Doctor> {
        let path = resource::record_path(PATH, id)?;
        Ok(self.client.get(&path).await?)
    }
}

#[async_trait]
impl WriteResource for DoctorService {
    type Form = DoctorForm;

    async fn create(&self, form: &DoctorForm) -> LabApiResult<Doctor> {
        resource::create_validated(&self.client, PATH, form).await
    }

    async fn update(&self, id: &str, form: &DoctorForm) -> LabApiResult<Doctor> {
        let path = resource::record_path(PATH, id)?;
        resource::update_validated(&self.client, &path, form).await
    }

    async fn delete(&self, id: &str) -> LabApiResult<()> {
        let path = resource::record_path(PATH, id)?;
        resource::delete_record(&self.client, &path).await
    }
}
