//! Typed endpoints of the LabDesk backend.
//!
//! One service per resource, each a thin wrapper over [`ApiClient`]: a call
//! is one request, forms are validated before anything is sent, and every
//! failure comes back as a [`LabApiError`] for the caller to surface.

pub mod auth;
pub mod bills;
pub mod catalog;
pub mod doctors;
pub mod error;
pub mod expenses;
pub mod lab_config;
pub mod models;
pub mod orders;
pub mod pagination;
pub mod patients;
pub mod reports;
pub mod resource;
pub mod revenue;
pub mod validation;

pub use error::{LabApiError, LabApiResult};
pub use pagination::{ListQuery, Page};
pub use resource::{ReadResource, WriteResource};
pub use validation::RequestValidation;

use api_client::ApiClient;

/// Every resource service over one shared client
#[derive(Debug, Clone)]
pub struct LabApi {
    pub auth: auth::AuthService,
    pub patients: patients::PatientService,
    pub doctors: doctors::DoctorService,
    pub catalog: catalog::CatalogService,
    pub orders: orders::OrderService,
    pub expenses: expenses::ExpenseService,
    pub revenue: revenue::RevenueService,
    pub bills: bills::BillService,
    pub lab_config: lab_config::LabConfigService,
    pub reports: reports::ReportService,
    client: ApiClient,
}

impl LabApi {
    pub fn new(client: ApiClient) -> Self {
        Self {
            auth: auth::AuthService::new(client.clone()),
            patients: patients::PatientService::new(client.clone()),
            doctors: doctors::DoctorService::new(client.clone()),
            catalog: catalog::CatalogService::new(client.clone()),
            orders: orders::OrderService::new(client.clone()),
            expenses: expenses::ExpenseService::new(client.clone()),
            revenue: revenue::RevenueService::new(client.clone()),
            bills: bills::BillService::new(client.clone()),
            lab_config: lab_config::LabConfigService::new(client.clone()),
            reports: reports::ReportService::new(client.clone()),
            client,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn session(&self) -> &api_client::Session {
        self.client.session()
    }
}
