//! Generic paginated resource table: list, filter, paginate, create, edit,
//! delete and view, the same way for every collection.

use crate::error::{ProviderError, ProviderResult};
use crate::fetcher::{FetchOutcome, Fetcher};
use error_common::{ErrorContext, ErrorReporter};
use lab_api::{ListQuery, Page, ReadResource, WriteResource};
use tracing::info;

/// Answer to the blocking "are you sure?" dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

pub struct ResourceTable<R: ReadResource> {
    resource: R,
    reporter: ErrorReporter,
    query: ListQuery,
    filter: R::Filter,
    rows: Fetcher<Page<R::Item>>,
}

impl<R: ReadResource> ResourceTable<R> {
    pub fn new(resource: R, reporter: ErrorReporter, limit: u32) -> Self {
        Self {
            resource,
            reporter,
            query: ListQuery::first(limit),
            filter: R::Filter::default(),
            rows: Fetcher::new(),
        }
    }

    pub fn query(&self) -> ListQuery {
        self.query
    }

    pub fn filter(&self) -> &R::Filter {
        &self.filter
    }

    pub fn page(&self) -> Option<Page<R::Item>> {
        self.rows.value()
    }

    pub fn is_loading(&self) -> bool {
        self.rows.is_loading()
    }

    /// Fetch the current page with the current filter.
    ///
    /// # Errors
    ///
    /// Any backend failure (toasted; previous rows kept), or
    /// [`ProviderError::Superseded`] when a newer load finished first.
    pub async fn load(&self) -> ProviderResult<Page<R::Item>> {
        let outcome = self.rows.fetch(self.resource.list(self.query, &self.filter)).await;
        match outcome {
            FetchOutcome::Applied => self.rows.value().ok_or(ProviderError::Superseded),
            FetchOutcome::Superseded => Err(ProviderError::Superseded),
            FetchOutcome::Failed(e) => {
                self.reporter.report(&format!("load {}", self.resource.name()), &e);
                Err(e.into())
            }
        }
    }

    /// Filter changes go back to page 1; no debounce.
    ///
    /// # Errors
    ///
    /// As [`ResourceTable::load`].
    pub async fn set_filter(&mut self, filter: R::Filter) -> ProviderResult<Page<R::Item>> {
        if filter != self.filter {
            self.filter = filter;
            self.query = self.query.with_page(1);
        }
        self.load().await
    }

    /// # Errors
    ///
    /// As [`ResourceTable::load`].
    pub async fn go_to_page(&mut self, page: u32) -> ProviderResult<Page<R::Item>> {
        let last = self.rows.with_value(|p| p.map_or(u32::MAX, |p| p.total_pages.max(1)));
        self.query = self.query.with_page(page.min(last));
        self.load().await
    }

    /// # Errors
    ///
    /// As [`ResourceTable::load`].
    pub async fn next_page(&mut self) -> ProviderResult<Page<R::Item>> {
        let page = self.query.page.saturating_add(1);
        self.go_to_page(page).await
    }

    /// # Errors
    ///
    /// As [`ResourceTable::load`].
    pub async fn previous_page(&mut self) -> ProviderResult<Page<R::Item>> {
        let page = self.query.page.saturating_sub(1);
        self.go_to_page(page).await
    }

    /// Detail view of one record.
    ///
    /// # Errors
    ///
    /// Any backend failure, toasted.
    pub async fn view(&self, id: &str) -> ProviderResult<R::Item> {
        self.resource.get(id).await.map_err(|e| self.fail("view", Some(id), e))
    }

    fn fail(&self, action: &str, id: Option<&str>, error: lab_api::LabApiError) -> ProviderError {
        let mut context = ErrorContext::for_operation(format!("{action} {}", self.resource.name()));
        if let Some(id) = id {
            context = context.with_resource_id(id);
        }
        self.reporter.report_with_context(&context, &error);
        error.into()
    }
}

impl<R: WriteResource> ResourceTable<R> {
    /// # Errors
    ///
    /// Validation (no request sent) or backend failure; both toasted.
    pub async fn create(&self, form: &R::Form) -> ProviderResult<R::Item> {
        let item = self
            .resource
            .create(form)
            .await
            .map_err(|e| self.fail("create", None, e))?;
        self.reporter.success(format!("Saved to {}", self.resource.name()));
        self.reload_quietly().await;
        Ok(item)
    }

    /// # Errors
    ///
    /// Validation (no request sent) or backend failure; both toasted.
    pub async fn update(&self, id: &str, form: &R::Form) -> ProviderResult<R::Item> {
        let item = self
            .resource
            .update(id, form)
            .await
            .map_err(|e| self.fail("update", Some(id), e))?;
        self.reporter.success("Changes saved");
        self.reload_quietly().await;
        Ok(item)
    }

    /// Irreversible. Returns `false` without any request unless confirmed.
    ///
    /// # Errors
    ///
    /// Backend failure, toasted.
    pub async fn delete(&self, id: &str, confirmation: Confirmation) -> ProviderResult<bool> {
        if confirmation != Confirmation::Confirmed {
            info!(resource = self.resource.name(), id = %id, "Delete cancelled");
            return Ok(false);
        }
        self.resource
            .delete(id)
            .await
            .map_err(|e| self.fail("delete", Some(id), e))?;
        self.reporter.success("Deleted");
        self.reload_quietly().await;
        Ok(true)
    }

    async fn reload_quietly(&self) {
        // Failures are toasted by load; the write itself succeeded.
        let _ = self.load().await;
    }
}
