use crate::error::LabApiResult;
use crate::models::Bill;
use crate::resource::record_path;
use api_client::ApiClient;
use serde::Serialize;

const PATH: &str = "/bills";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PatientQuery<'a> {
    patient_id: &'a str,
}

/// Bills created alongside test orders
#[derive(Debug, Clone)]
pub struct BillService {
    client: ApiClient,
}

impl BillService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Any backend failure.
    pub async fn by_number(&self, bill_number: &str) -> LabApiResult<Bill> {
        Ok(self.client.get(&record_path(PATH, bill_number)?).await?)
    }

    /// # Errors
    ///
    /// Any backend failure.
    pub async fn for_patient(&self, patient_id: &str) -> LabApiResult<Vec<Bill>> {
        Ok(self
            .client
            .get_with_query(PATH, &PatientQuery { patient_id })
            .await?)
    }
}
