//! Dashboard figures derived from already-fetched data. No I/O here.

use crate::provider::DataSnapshot;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use lab_api::models::{BillStatus, ReportStatus};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_patients: u64,
    pub total_doctors: u64,
    pub active_tests: usize,
    pub total_revenue: Decimal,
    pub current_month_revenue: Decimal,
    pub total_expenses: Decimal,
    pub current_month_expenses: Decimal,
    pub total_commission: Decimal,
    pub net_profit: Decimal,
    pub pending_reports: usize,
}

fn same_month(date: NaiveDate, today: NaiveDate) -> bool {
    date.year() == today.year() && date.month() == today.month()
}

fn in_month(at: Option<DateTime<Utc>>, today: NaiveDate) -> bool {
    at.is_some_and(|at| same_month(at.date_naive(), today))
}

/// Pure function of the snapshot; `today` selects the current month.
pub fn compute_metrics(snapshot: &DataSnapshot, today: NaiveDate) -> DashboardMetrics {
    let bills: Vec<_> = snapshot
        .revenue
        .as_ref()
        .map(|records| {
            records
                .iter()
                .filter(|b| !matches!(b.status, BillStatus::Cancelled | BillStatus::Refunded))
                .collect()
        })
        .unwrap_or_default();
    let expenses = snapshot.expenses.as_deref().unwrap_or_default();

    let total_revenue: Decimal = bills.iter().map(|b| b.total_amount).sum();
    let total_expenses: Decimal = expenses.iter().map(|e| e.amount).sum();

    let pending_reports = match &snapshot.pending_orders {
        Some(orders) => orders.len(),
        None => snapshot.patients.as_ref().map_or(0, |p| {
            p.items.iter().filter(|p| p.report_status == ReportStatus::Pending).count()
        }),
    };

    DashboardMetrics {
        total_patients: snapshot.patients.as_ref().map_or(0, |p| p.total),
        total_doctors: snapshot.doctors.as_ref().map_or(0, |p| p.total),
        active_tests: snapshot
            .tests
            .as_ref()
            .map_or(0, |tests| tests.iter().filter(|t| t.is_active()).count()),
        total_revenue,
        current_month_revenue: bills
            .iter()
            .filter(|b| in_month(b.created_at, today))
            .map(|b| b.total_amount)
            .sum(),
        total_expenses,
        current_month_expenses: expenses
            .iter()
            .filter(|e| same_month(e.date, today))
            .map(|e| e.amount)
            .sum(),
        total_commission: bills.iter().map(|b| b.commission_amount).sum(),
        net_profit: total_revenue - total_expenses,
        pending_reports,
    }
}

/// Metrics memoized per snapshot generation
#[derive(Debug, Default)]
pub(crate) struct MetricsCache {
    entry: Option<(u64, NaiveDate, DashboardMetrics)>,
}

impl MetricsCache {
    pub(crate) fn get_or_compute(&mut self, snapshot: &DataSnapshot, today: NaiveDate) -> DashboardMetrics {
        if let Some((generation, day, metrics)) = &self.entry {
            if *generation == snapshot.generation && *day == today {
                return metrics.clone();
            }
        }
        let metrics = compute_metrics(snapshot, today);
        self.entry = Some((snapshot.generation, today, metrics.clone()));
        metrics
    }

    #[cfg(test)]
    pub(crate) fn cached_generation(&self) -> Option<u64> {
        self.entry.as_ref().map(|(g, _, _)| *g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lab_api::models::{Bill, Expense};
    use serde_json::json;

    fn bill(amount: i64, commission: i64, created: &str, status: &str) -> Bill {
        serde_json::from_value(json!({
            "billNumber": format!("B-{amount}"),
            "patientId": "P-1",
            "totalAmount": amount,
            "commissionAmount": commission,
            "status": status,
            "createdAt": created
        }))
        .unwrap()
    }

    fn expense(amount: i64, date: &str) -> Expense {
        serde_json::from_value(json!({
            "_id": format!("e-{amount}"),
            "title": "Reagents",
            "category": "LAB_MATERIALS",
            "amount": amount,
            "date": date
        }))
        .unwrap()
    }

    fn snapshot() -> DataSnapshot {
        DataSnapshot {
            revenue: Some(vec![
                bill(1350, 135, "2026-10-02T10:00:00Z", "PAID"),
                bill(500, 50, "2026-09-20T10:00:00Z", "PAID"),
                bill(900, 90, "2026-10-05T10:00:00Z", "CANCELLED"),
            ]),
            expenses: Some(vec![expense(400, "2026-10-01"), expense(100, "2026-08-11")]),
            generation: 4,
            ..DataSnapshot::default()
        }
    }

    #[test]
    fn test_revenue_and_expense_totals() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let metrics = compute_metrics(&snapshot(), today);

        assert_eq!(metrics.total_revenue, Decimal::from(1850));
        assert_eq!(metrics.current_month_revenue, Decimal::from(1350));
        assert_eq!(metrics.total_commission, Decimal::from(185));
        assert_eq!(metrics.total_expenses, Decimal::from(500));
        assert_eq!(metrics.current_month_expenses, Decimal::from(400));
        assert_eq!(metrics.net_profit, Decimal::from(1350));
    }

    #[test]
    fn test_empty_snapshot() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(compute_metrics(&DataSnapshot::default(), today), DashboardMetrics::default());
    }

    #[test]
    fn test_cache_recomputes_only_on_new_generation() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let mut cache = MetricsCache::default();
        let mut snap = snapshot();

        let first = cache.get_or_compute(&snap, today);
        assert_eq!(cache.cached_generation(), Some(4));

        // Same generation: stale data is served from the cache
        snap.revenue = None;
        assert_eq!(cache.get_or_compute(&snap, today), first);

        snap.generation = 5;
        assert_eq!(cache.get_or_compute(&snap, today).total_revenue, Decimal::ZERO);
    }
}
