use crate::error::{LabApiError, LabApiResult};
use crate::models::LabConfig;
use crate::validation::RequestValidation;
use crate::{validate_optional_email, validate_required};
use api_client::ApiClient;
use tracing::info;

const PATH: &str = "/lab-config";

impl RequestValidation for LabConfig {
    fn validate(&self) -> Result<(), LabApiError> {
        validate_required!(self.lab_name, "Lab name is required");
        validate_optional_email!(self.email, "Invalid email format");
        Ok(())
    }
}

/// Singleton lab settings shown on reports and invoices
#[derive(Debug, Clone)]
pub struct LabConfigService {
    client: ApiClient,
}

impl LabConfigService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Any backend failure.
    pub async fn get(&self) -> LabApiResult<LabConfig> {
        Ok(self.client.get(PATH).await?)
    }

    /// # Errors
    ///
    /// Validation failure without a request, otherwise any backend failure.
    pub async fn update(&self, config: &LabConfig) -> LabApiResult<LabConfig> {
        config.validate()?;
        let updated: LabConfig = self.client.put(PATH, config).await?;
        info!(lab = %updated.lab_name, "Lab configuration updated");
        Ok(updated)
    }
}
