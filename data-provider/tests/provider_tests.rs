//! DataProvider and ResourceTable against a mock backend

use api_client::{ApiClient, AuthSession, ClientConfig, Role, Session, SessionUser};
use data_provider::{Confirmation, DataProvider, ProviderError, ResourceTable, Slice};
use error_common::{ErrorReporter, MemoryNotifier, ToastLevel};
use lab_api::models::LabConfig;
use lab_api::patients::PatientFilter;
use lab_api::LabApi;
use mockito::{Matcher, Server, ServerGuard};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;

fn session(role: Role) -> Session {
    Session::with_auth(AuthSession::new(
        "tok",
        None,
        SessionUser {
            id: "u-1".to_string(),
            name: "Staff".to_string(),
            email: "staff@lab.example".to_string(),
            role,
        },
    ))
}

fn api_for(server: &ServerGuard, session: Session) -> LabApi {
    LabApi::new(ApiClient::new(ClientConfig::new(format!("{}/api", server.url())), session).unwrap())
}

fn envelope(data: Value) -> String {
    json!({"success": true, "data": data}).to_string()
}

fn paged(key: &str, items: Value, total: u64) -> String {
    envelope(json!({key: items, "pagination": {"page": 1, "limit": 100, "total": total}}))
}

fn patient(id: &str, name: &str) -> Value {
    json!({"_id": id, "fullName": name, "phone": "9999900000", "age": 34, "gender": "Female", "address": "Pune"})
}

async fn mock_get(server: &mut ServerGuard, path: &str, body: String) -> mockito::Mock {
    server
        .mock("GET", path)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(body)
        .create_async()
        .await
}

async fn mock_front_desk(server: &mut ServerGuard) {
    mock_get(server, "/api/patients", paged("patients", json!([patient("P-1", "Asha Rao")]), 42)).await;
    mock_get(
        server,
        "/api/doctors",
        paged(
            "doctors",
            json!([{"_id": "D-1", "name": "Dr. Mehta", "mobile": "9876543210", "specialization": "Pathology", "commissionPercentage": 10}]),
            3,
        ),
    )
    .await;
    mock_get(
        server,
        "/api/tests",
        paged(
            "tests",
            json!([
                {"_id": "T-CBC", "name": "CBC", "category": "Hematology", "price": 500, "status": "Active"},
                {"_id": "T-OLD", "name": "Old Panel", "category": "Misc", "price": 100, "status": "Inactive"}
            ]),
            2,
        ),
    )
    .await;
    mock_get(server, "/api/test-orders/pending", envelope(json!([]))).await;
    mock_get(server, "/api/lab-config", envelope(json!({"labName": "City Diagnostics", "address": "MG Road"}))).await;
}

#[tokio::test]
async fn test_admin_refresh_tolerates_failed_slice() {
    let mut server = Server::new_async().await;
    mock_front_desk(&mut server).await;
    server
        .mock("GET", "/api/revenue")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body(json!({"success": false, "message": "Revenue service unavailable"}).to_string())
        .create_async()
        .await;
    mock_get(
        &mut server,
        "/api/expenses",
        paged(
            "expenses",
            json!([{"_id": "e-1", "title": "Rent", "category": "RENT", "amount": 20000, "date": "2026-10-01"}]),
            1,
        ),
    )
    .await;
    mock_get(
        &mut server,
        "/api/revenue/analytics",
        envelope(json!([{"_id": 10, "totalRevenue": 1350}])),
    )
    .await;

    let notifier = Arc::new(MemoryNotifier::new());
    let provider = DataProvider::new(
        api_for(&server, session(Role::Admin)),
        ErrorReporter::new(notifier.clone()),
        Role::Admin,
    );

    let summary = provider.refresh_data().await.unwrap();
    assert!(summary.applied);
    assert_eq!(summary.failed, vec![Slice::Revenue]);
    assert!(summary.loaded.contains(&Slice::Expenses));

    let snapshot = provider.snapshot();
    assert!(snapshot.revenue.is_none());
    assert_eq!(snapshot.analytics.unwrap()[0].label, "10");
    assert_eq!(notifier.last_message().as_deref(), Some("Revenue service unavailable"));

    let metrics = provider.metrics();
    assert_eq!(metrics.total_patients, 42);
    assert_eq!(metrics.total_doctors, 3);
    assert_eq!(metrics.active_tests, 1);
    assert_eq!(metrics.total_expenses, Decimal::from(20000));
    assert_eq!(metrics.net_profit, Decimal::from(-20000));
    assert!(!provider.is_loading());
}

fn bill(number: &str, amount: u32) -> Value {
    json!({
        "billNumber": number,
        "patientId": "P-1",
        "totalAmount": amount,
        "commissionAmount": amount / 10,
        "status": "PAID",
        "createdAt": "2026-10-02T10:00:00Z"
    })
}

async fn mock_page(server: &mut ServerGuard, path: &str, page: u32, body: Value) -> mockito::Mock {
    server
        .mock("GET", path)
        .match_query(Matcher::UrlEncoded("page".into(), page.to_string()))
        .with_status(200)
        .with_body(envelope(body))
        .expect(1)
        .create_async()
        .await
}

#[tokio::test]
async fn test_admin_totals_cover_every_page() {
    let mut server = Server::new_async().await;
    mock_front_desk(&mut server).await;
    let pagination = |page: u32| json!({"page": page, "limit": 100, "total": 101});
    let revenue_first = mock_page(
        &mut server,
        "/api/revenue",
        1,
        json!({"bills": [bill("B-1", 1000)], "pagination": pagination(1)}),
    )
    .await;
    let revenue_second = mock_page(
        &mut server,
        "/api/revenue",
        2,
        json!({"bills": [bill("B-101", 350)], "pagination": pagination(2)}),
    )
    .await;
    let expenses_first = mock_page(
        &mut server,
        "/api/expenses",
        1,
        json!({
            "expenses": [{"_id": "e-1", "title": "Rent", "category": "RENT", "amount": 200, "date": "2026-10-01"}],
            "pagination": pagination(1)
        }),
    )
    .await;
    let expenses_second = mock_page(
        &mut server,
        "/api/expenses",
        2,
        json!({
            "expenses": [{"_id": "e-2", "title": "Reagents", "category": "LAB_MATERIALS", "amount": 50, "date": "2026-09-14"}],
            "pagination": pagination(2)
        }),
    )
    .await;
    mock_get(&mut server, "/api/revenue/analytics", envelope(json!([]))).await;

    let provider = DataProvider::new(
        api_for(&server, session(Role::Admin)),
        ErrorReporter::new(Arc::new(MemoryNotifier::new())),
        Role::Admin,
    );
    let summary = provider.refresh_data().await.unwrap();
    assert!(summary.failed.is_empty());

    let metrics = provider.metrics();
    assert_eq!(metrics.total_revenue, Decimal::from(1350));
    assert_eq!(metrics.total_commission, Decimal::from(135));
    assert_eq!(metrics.total_expenses, Decimal::from(250));
    assert_eq!(metrics.net_profit, Decimal::from(1100));
    assert_eq!(provider.snapshot().revenue.map(|r| r.len()), Some(2));

    revenue_first.assert_async().await;
    revenue_second.assert_async().await;
    expenses_first.assert_async().await;
    expenses_second.assert_async().await;
}

#[tokio::test]
async fn test_receptionist_never_loads_finance() {
    let mut server = Server::new_async().await;
    mock_front_desk(&mut server).await;
    let revenue = server.mock("GET", "/api/revenue").match_query(Matcher::Any).expect(0).create_async().await;
    let expenses = server.mock("GET", "/api/expenses").match_query(Matcher::Any).expect(0).create_async().await;

    let api = api_for(&server, session(Role::Receptionist));
    let provider = DataProvider::for_session(api, ErrorReporter::new(Arc::new(MemoryNotifier::new()))).unwrap();
    assert_eq!(provider.role(), Role::Receptionist);

    let summary = provider.refresh_data().await.unwrap();
    assert!(summary.failed.is_empty());
    assert_eq!(provider.lab_config().unwrap().lab_name, "City Diagnostics");

    revenue.assert_async().await;
    expenses.assert_async().await;
}

#[tokio::test]
async fn test_refresh_requires_session_and_stops_after_shutdown() {
    let mut server = Server::new_async().await;
    let untouched = server.mock("GET", Matcher::Any).expect(0).create_async().await;

    let notifier = Arc::new(MemoryNotifier::new());
    let anonymous = DataProvider::new(
        api_for(&server, Session::new()),
        ErrorReporter::new(notifier.clone()),
        Role::Admin,
    );
    assert!(matches!(anonymous.refresh_data().await, Err(ProviderError::NotAuthenticated)));

    let provider = DataProvider::new(
        api_for(&server, session(Role::Admin)),
        ErrorReporter::new(notifier),
        Role::Admin,
    );
    provider.shutdown();
    assert!(matches!(provider.refresh_data().await, Err(ProviderError::ShutDown)));
    untouched.assert_async().await;
}

#[tokio::test]
async fn test_lab_config_update_replaces_cache() {
    let mut server = Server::new_async().await;
    server
        .mock("PUT", "/api/lab-config")
        .match_body(Matcher::PartialJson(json!({"labName": "City Diagnostics Pvt Ltd"})))
        .with_status(200)
        .with_body(envelope(json!({"labName": "City Diagnostics Pvt Ltd", "timings": "8am-8pm"})))
        .create_async()
        .await;

    let notifier = Arc::new(MemoryNotifier::new());
    let provider = DataProvider::new(
        api_for(&server, session(Role::Admin)),
        ErrorReporter::new(notifier.clone()),
        Role::Admin,
    );
    let config = LabConfig {
        lab_name: "City Diagnostics Pvt Ltd".to_string(),
        timings: "8am-8pm".to_string(),
        ..LabConfig::default()
    };
    provider.update_lab_config(&config).await.unwrap();

    assert_eq!(provider.lab_config().unwrap().timings, "8am-8pm");
    assert_eq!(notifier.count(ToastLevel::Success), 1);
}

#[tokio::test]
async fn test_table_filter_resets_page_and_delete_needs_confirmation() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/patients")
        .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
        .with_status(200)
        .with_body(envelope(json!({"patients": [patient("P-11", "Ravi Kumar")], "page": 2, "limit": 10, "total": 11})))
        .create_async()
        .await;
    let filtered = server
        .mock("GET", "/api/patients")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), "1".into()),
            Matcher::UrlEncoded("search".into(), "Asha".into()),
        ]))
        .with_status(200)
        .with_body(envelope(json!({"patients": [patient("P-1", "Asha Rao")], "page": 1, "limit": 10, "total": 1})))
        .expect_at_least(1)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", "/api/patients/P-1")
        .with_status(200)
        .with_body(json!({"success": true, "message": "Patient deleted"}).to_string())
        .expect(1)
        .create_async()
        .await;

    let notifier = Arc::new(MemoryNotifier::new());
    let api = api_for(&server, session(Role::Receptionist));
    let mut table = ResourceTable::new(api.patients.clone(), ErrorReporter::new(notifier), 10);

    let second = table.go_to_page(2).await.unwrap();
    assert_eq!(second.page, 2);
    assert!(second.has_previous());

    let filter = PatientFilter {
        search: Some("Asha".to_string()),
        report_status: None,
    };
    let page = table.set_filter(filter).await.unwrap();
    assert_eq!(table.query().page, 1);
    assert_eq!(page.items[0].full_name, "Asha Rao");

    assert!(!table.delete("P-1", Confirmation::Declined).await.unwrap());
    assert!(table.delete("P-1", Confirmation::Confirmed).await.unwrap());

    filtered.assert_async().await;
    delete.assert_async().await;
}
