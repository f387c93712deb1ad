//! One role-scoped data provider for both the admin and the front-desk
//! screens.

use crate::error::{ProviderError, ProviderResult};
use crate::fetcher::GenerationCounter;
use crate::metrics::{DashboardMetrics, MetricsCache};
use api_client::Role;
use chrono::{Datelike, Utc};
use error_common::ErrorReporter;
use lab_api::catalog::LabTestFilter;
use lab_api::doctors::DoctorFilter;
use lab_api::expenses::ExpenseFilter;
use lab_api::models::{Doctor, Expense, LabConfig, LabTest, Patient, RevenueRecord, TestOrder};
use lab_api::pagination::MAX_PAGE_SIZE;
use lab_api::patients::PatientFilter;
use lab_api::revenue::{AnalyticsPeriod, RevenueFilter, RevenuePoint};
use lab_api::{LabApi, LabApiError, LabApiResult, ListQuery, Page, ReadResource};
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Independently loaded part of the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slice {
    Patients,
    Doctors,
    Tests,
    PendingOrders,
    Revenue,
    Expenses,
    Analytics,
    LabConfig,
}

impl Slice {
    const ADMIN: &'static [Slice] = &[
        Slice::Patients,
        Slice::Doctors,
        Slice::Tests,
        Slice::PendingOrders,
        Slice::Revenue,
        Slice::Expenses,
        Slice::Analytics,
        Slice::LabConfig,
    ];
    const RECEPTIONIST: &'static [Slice] = &[
        Slice::Patients,
        Slice::Doctors,
        Slice::Tests,
        Slice::PendingOrders,
        Slice::LabConfig,
    ];

    pub fn for_role(role: Role) -> &'static [Slice] {
        match role {
            Role::Admin => Self::ADMIN,
            Role::Receptionist => Self::RECEPTIONIST,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Patients => "patients",
            Self::Doctors => "doctors",
            Self::Tests => "tests",
            Self::PendingOrders => "pending orders",
            Self::Revenue => "revenue",
            Self::Expenses => "expenses",
            Self::Analytics => "revenue analytics",
            Self::LabConfig => "lab configuration",
        }
    }
}

/// Everything the screens read. `None` means never loaded.
#[derive(Debug, Clone, Default)]
pub struct DataSnapshot {
    pub patients: Option<Page<Patient>>,
    pub doctors: Option<Page<Doctor>>,
    /// Whole catalog, every page
    pub tests: Option<Vec<LabTest>>,
    pub pending_orders: Option<Vec<TestOrder>>,
    /// Every revenue record, not just the first page
    pub revenue: Option<Vec<RevenueRecord>>,
    /// Every expense, not just the first page
    pub expenses: Option<Vec<Expense>>,
    pub analytics: Option<Vec<RevenuePoint>>,
    pub lab_config: Option<LabConfig>,
    /// Bumped whenever a refresh merged data
    pub generation: u64,
    pub loading: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// False when a newer refresh or a shutdown overtook this one
    pub applied: bool,
    pub loaded: Vec<Slice>,
    pub failed: Vec<Slice>,
}

async fn load_if<T, F>(wanted: bool, request: F) -> Option<LabApiResult<T>>
where
    F: Future<Output = LabApiResult<T>>,
{
    if wanted {
        Some(request.await)
    } else {
        None
    }
}

fn merge<T>(
    slot: &mut Option<T>,
    result: Option<LabApiResult<T>>,
    slice: Slice,
    summary: &mut RefreshSummary,
    failures: &mut Vec<(Slice, LabApiError)>,
) {
    match result {
        Some(Ok(value)) => {
            *slot = Some(value);
            summary.loaded.push(slice);
        }
        Some(Err(e)) => {
            summary.failed.push(slice);
            failures.push((slice, e));
        }
        None => {}
    }
}

#[derive(Debug, Clone)]
pub struct DataProvider {
    api: LabApi,
    reporter: ErrorReporter,
    role: Role,
    state: Arc<RwLock<DataSnapshot>>,
    counter: Arc<GenerationCounter>,
    metrics: Arc<Mutex<MetricsCache>>,
}

impl DataProvider {
    pub fn new(api: LabApi, reporter: ErrorReporter, role: Role) -> Self {
        Self {
            api,
            reporter,
            role,
            state: Arc::new(RwLock::new(DataSnapshot::default())),
            counter: Arc::new(GenerationCounter::new()),
            metrics: Arc::new(Mutex::new(MetricsCache::default())),
        }
    }

    /// Provider scoped to the role of the logged-in user.
    ///
    /// # Errors
    ///
    /// [`ProviderError::NotAuthenticated`] without a session.
    pub fn for_session(api: LabApi, reporter: ErrorReporter) -> ProviderResult<Self> {
        let role = api.session().role().ok_or(ProviderError::NotAuthenticated)?;
        Ok(Self::new(api, reporter, role))
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn api(&self) -> &LabApi {
        &self.api
    }

    pub fn snapshot(&self) -> DataSnapshot {
        self.state.read().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    pub fn lab_config(&self) -> Option<LabConfig> {
        self.state.read().lab_config.clone()
    }

    /// Re-run the whole fan-out. Every slice of the role is requested
    /// concurrently; a failed slice keeps its previous value and is
    /// reported on its own. Concurrent calls each fetch, and only the newest
    /// one is merged.
    ///
    /// # Errors
    ///
    /// [`ProviderError::NotAuthenticated`] (all data is dropped) or
    /// [`ProviderError::ShutDown`]. Per-slice failures are not errors.
    pub async fn refresh_data(&self) -> ProviderResult<RefreshSummary> {
        if self.counter.is_closed() {
            return Err(ProviderError::ShutDown);
        }
        if !self.api.session().is_authenticated() {
            *self.state.write() = DataSnapshot::default();
            return Err(ProviderError::NotAuthenticated);
        }

        let ticket = self.counter.next();
        let slices = Slice::for_role(self.role);
        let wants = |slice: Slice| slices.contains(&slice);
        let need_config = wants(Slice::LabConfig) && self.state.read().lab_config.is_none();
        self.state.write().loading = true;
        debug!(generation = ticket.generation(), role = ?self.role, "Refreshing data");

        let query = ListQuery::first(MAX_PAGE_SIZE);
        let patient_filter = PatientFilter::default();
        let doctor_filter = DoctorFilter::default();
        let test_filter = LabTestFilter::default();
        let revenue_filter = RevenueFilter::default();
        let expense_filter = ExpenseFilter::default();
        let year = Utc::now().year();

        let (patients, doctors, tests, pending, revenue, expenses, analytics, config) = tokio::join!(
            load_if(wants(Slice::Patients), self.api.patients.list(query, &patient_filter)),
            load_if(wants(Slice::Doctors), self.api.doctors.list(query, &doctor_filter)),
            load_if(wants(Slice::Tests), self.api.catalog.list_all(&test_filter)),
            load_if(wants(Slice::PendingOrders), self.api.orders.pending()),
            load_if(wants(Slice::Revenue), self.api.revenue.list_all(&revenue_filter)),
            load_if(wants(Slice::Expenses), self.api.expenses.list_all(&expense_filter)),
            load_if(
                wants(Slice::Analytics),
                self.api.revenue.analytics(AnalyticsPeriod::Monthly, Some(year))
            ),
            load_if(need_config, self.api.lab_config.get()),
        );

        let mut summary = RefreshSummary::default();
        let mut failures = Vec::new();
        {
            let mut state = self.state.write();
            if !self.counter.is_current(ticket) {
                debug!(generation = ticket.generation(), "Refresh superseded, discarding results");
                return Ok(summary);
            }

            merge(&mut state.patients, patients, Slice::Patients, &mut summary, &mut failures);
            merge(&mut state.doctors, doctors, Slice::Doctors, &mut summary, &mut failures);
            merge(&mut state.tests, tests, Slice::Tests, &mut summary, &mut failures);
            merge(&mut state.pending_orders, pending, Slice::PendingOrders, &mut summary, &mut failures);
            merge(&mut state.revenue, revenue, Slice::Revenue, &mut summary, &mut failures);
            merge(&mut state.expenses, expenses, Slice::Expenses, &mut summary, &mut failures);
            merge(&mut state.analytics, analytics, Slice::Analytics, &mut summary, &mut failures);
            merge(&mut state.lab_config, config, Slice::LabConfig, &mut summary, &mut failures);

            if !summary.loaded.is_empty() {
                state.generation += 1;
            }
            state.loading = false;
            summary.applied = true;
        }

        for (slice, error) in &failures {
            warn!(slice = slice.name(), error = %error, "Slice failed to load, keeping previous data");
            self.reporter.report(&format!("load {}", slice.name()), error);
        }
        info!(
            loaded = summary.loaded.len(),
            failed = summary.failed.len(),
            "Data refreshed"
        );
        Ok(summary)
    }

    /// Derived figures, recomputed only after a refresh merged new data.
    pub fn metrics(&self) -> DashboardMetrics {
        let today = Utc::now().date_naive();
        let snapshot = self.state.read();
        self.metrics.lock().get_or_compute(&snapshot, today)
    }

    /// Write-through update of the cached lab settings.
    ///
    /// # Errors
    ///
    /// Validation or backend failure; the cache is left unchanged.
    pub async fn update_lab_config(&self, config: &LabConfig) -> ProviderResult<LabConfig> {
        match self.api.lab_config.update(config).await {
            Ok(updated) => {
                if !self.counter.is_closed() {
                    let mut state = self.state.write();
                    state.lab_config = Some(updated.clone());
                    state.generation += 1;
                }
                self.reporter.success("Lab settings saved");
                Ok(updated)
            }
            Err(e) => {
                self.reporter.report("update lab settings", &e);
                Err(e.into())
            }
        }
    }

    /// Discard in-flight refreshes and stop writing state.
    pub fn shutdown(&self) {
        self.counter.close();
        self.state.write().loading = false;
        info!("Data provider shut down");
    }
}
