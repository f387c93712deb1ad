//! Generic resource seams shared by the CRUD services.

use crate::error::LabApiResult;
use crate::pagination::{decode_page, ListQuery, Page, MAX_PAGE_SIZE};
use crate::validation::RequestValidation;
use api_client::ApiClient;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

/// Read side of a paginated backend collection.
#[async_trait]
pub trait ReadResource: Send + Sync {
    type Item: DeserializeOwned + Clone + Send + Sync;
    /// Filter bar state, serialized into the list query string
    type Filter: Serialize + Clone + Default + PartialEq + Send + Sync;

    /// Collection name used in logs and toasts
    fn name(&self) -> &'static str;

    /// # Errors
    ///
    /// Transport, HTTP or decode failures from the backend.
    async fn list(&self, query: ListQuery, filter: &Self::Filter) -> LabApiResult<Page<Self::Item>>;

    /// # Errors
    ///
    /// Transport, HTTP or decode failures from the backend.
    async fn get(&self, id: &str) -> LabApiResult<Self::Item>;

    /// Every matching record, following pages of [`MAX_PAGE_SIZE`] until
    /// the backend reports the last one or returns an empty page.
    ///
    /// # Errors
    ///
    /// The first failing page aborts the walk.
    async fn list_all(&self, filter: &Self::Filter) -> LabApiResult<Vec<Self::Item>> {
        let mut query = ListQuery::first(MAX_PAGE_SIZE);
        let mut items = Vec::new();
        loop {
            let page = self.list(query, filter).await?;
            let done = !page.has_next() || page.items.is_empty();
            items.extend(page.items);
            if done {
                debug!(resource = self.name(), pages = query.page, count = items.len(), "Collected all pages");
                return Ok(items);
            }
            query = query.with_page(query.page + 1);
        }
    }
}

/// Write side; forms are validated before any request is built.
#[async_trait]
pub trait WriteResource: ReadResource {
    type Form: RequestValidation + Serialize + Send + Sync;

    /// # Errors
    ///
    /// [`crate::LabApiError::Validation`] without a network call, otherwise
    /// any backend failure.
    async fn create(&self, form: &Self::Form) -> LabApiResult<Self::Item>;

    /// # Errors
    ///
    /// As [`WriteResource::create`].
    async fn update(&self, id: &str, form: &Self::Form) -> LabApiResult<Self::Item>;

    /// Immediate and irreversible.
    ///
    /// # Errors
    ///
    /// Any backend failure.
    async fn delete(&self, id: &str) -> LabApiResult<()>;
}

#[derive(Serialize)]
struct ListRequest<'a, F> {
    #[serde(flatten)]
    query: ListQuery,
    #[serde(flatten)]
    filter: &'a F,
}

pub(crate) async fn fetch_page<T, F>(
    client: &ApiClient,
    path: &str,
    query: ListQuery,
    filter: &F,
) -> LabApiResult<Page<T>>
where
    T: DeserializeOwned,
    F: Serialize + Sync,
{
    let body = client.get_raw(path, &ListRequest { query, filter }).await?;
    let page = decode_page(&format!("GET {path}"), &body, query)?;
    debug!(path = %path, page = page.page, total = page.total, "Fetched page");
    Ok(page)
}

pub(crate) async fn create_validated<F, T>(client: &ApiClient, path: &str, form: &F) -> LabApiResult<T>
where
    F: RequestValidation + Serialize + Sync,
    T: DeserializeOwned,
{
    form.validate()?;
    let created = client.post(path, form).await?;
    info!(path = %path, "Created record");
    Ok(created)
}

pub(crate) async fn update_validated<F, T>(client: &ApiClient, path: &str, form: &F) -> LabApiResult<T>
where
    F: RequestValidation + Serialize + Sync,
    T: DeserializeOwned,
{
    form.validate()?;
    let updated = client.put(path, form).await?;
    info!(path = %path, "Updated record");
    Ok(updated)
}

pub(crate) async fn delete_record(client: &ApiClient, path: &str) -> LabApiResult<()> {
    client.delete(path).await?;
    info!(path = %path, "Deleted record");
    Ok(())
}

/// `ids` are opaque; reject anything that would escape the path segment.
pub(crate) fn record_path(collection: &str, id: &str) -> LabApiResult<String> {
    let id = id.trim();
    if id.is_empty() || id.contains('/') || id.contains('?') {
        return Err(crate::error::LabApiError::validation(format!("Invalid record id: {id:?}")));
    }
    Ok(format!("{collection}/{id}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_path() {
        assert_eq!(record_path("/patients", "p-1").unwrap(), "/patients/p-1");
        assert!(record_path("/patients", "").is_err());
        assert!(record_path("/patients", "../admin").is_err());
    }
}
