//! Read-only revenue records and analytics.

use crate::error::{LabApiError, LabApiResult};
use crate::models::RevenueRecord;
use crate::pagination::{ListQuery, Page};
use crate::resource::{self, ReadResource};
use api_client::ApiClient;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const PATH: &str = "/revenue";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsPeriod {
    Daily,
    Monthly,
}

#[derive(Serialize)]
struct AnalyticsQuery {
    period: AnalyticsPeriod,
    #[serde(skip_serializing_if = "Option::is_none")]
    year: Option<i32>,
}

/// One bucket of the revenue chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenuePoint {
    #[serde(alias = "_id", alias = "date", alias = "month")]
    #[serde(deserialize_with = "crate::models::string_or_number")]
    pub label: String,
    #[serde(alias = "totalRevenue", alias = "total")]
    pub revenue: Decimal,
    #[serde(default, alias = "totalCommission")]
    pub commission: Decimal,
    #[serde(default, alias = "netRevenue")]
    pub net: Decimal,
    #[serde(default, alias = "bills")]
    pub count: u64,
}

#[derive(Debug, Clone)]
pub struct RevenueService {
    client: ApiClient,
}

impl RevenueService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Any backend failure.
    pub async fn analytics(&self, period: AnalyticsPeriod, year: Option<i32>) -> LabApiResult<Vec<RevenuePoint>> {
        Ok(self
            .client
            .get_with_query(&format!("{PATH}/analytics"), &AnalyticsQuery { period, year })
            .await?)
    }
}

#[async_trait]
impl ReadResource for RevenueService {
    type Item = RevenueRecord;
    type Filter = RevenueFilter;

    fn name(&self) -> &'static str {
        "revenue"
    }

    async fn list(&self, query: ListQuery, filter: &RevenueFilter) -> LabApiResult<Page<RevenueRecord>> {
        if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
            if start > end {
                return Err(LabApiError::validation("Start date must not be after end date"));
            }
        }
        resource::fetch_page(&self.client, PATH, query, filter).await
    }

    async fn get(&self, id: &str) -> LabApiResult<RevenueRecord> {
        let path = resource::record_path(PATH, id)?;
        Ok(self.client.get(&path).await?)
    }
}
