//! Shared data for the LabDesk screens.
//!
//! [`DataProvider`] loads the slices a role needs in one concurrent fan-out
//! and derives the dashboard [`DashboardMetrics`] from them;
//! [`ResourceTable`] is the list/filter/paginate/edit pattern every CRUD
//! screen shares. Both discard responses that arrive after a newer request
//! (see [`fetcher`]).

pub mod error;
pub mod fetcher;
pub mod metrics;
pub mod provider;
pub mod table;

pub use error::{ProviderError, ProviderResult};
pub use fetcher::{FetchOutcome, FetchTicket, Fetcher, GenerationCounter};
pub use metrics::{compute_metrics, DashboardMetrics};
pub use provider::{DataProvider, DataSnapshot, RefreshSummary, Slice};
pub use table::{Confirmation, ResourceTable};
