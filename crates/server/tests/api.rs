use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::Engine;
use migration::MigratorTrait;
use server::{ServerState, router};

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    router(ServerState {
        engine: Arc::new(engine),
        db,
    })
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, number: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/members",
        Some(json!({"member_number": number, "name": "Siti", "nik": "3201"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn member_lifecycle_over_http() {
    let app = app().await;
    let id = register(&app, "AGT-001").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/members",
        Some(json!({"member_number": "AGT-001", "name": "Other", "nik": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");

    let (status, body) = send(&app, Method::POST, &format!("/api/members/{id}/verify"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "verified");

    let (status, body) = send(&app, Method::POST, &format!("/api/members/{id}/verify"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "invalid_transition");

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/members/{id}/activities"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["member_id"], id);
    assert_eq!(body["activities"][0]["kind"], "registered");
    assert_eq!(body["activities"][1]["kind"], "verified");
    assert_eq!(body["activities"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, Method::GET, "/api/members?status=verified&q=AGT", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["members"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, Method::GET, "/api/members/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn savings_over_http() {
    let app = app().await;
    let member_id = register(&app, "AGT-002").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/savings/deposit",
        Some(json!({
            "member_id": member_id,
            "category": "voluntary",
            "amount_minor": 1000,
            "occurred_at": "2026-03-01T09:00:00+07:00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["balance_after_minor"], 1000);
    assert_eq!(body["kind"], "deposit");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/savings/withdrawal",
        Some(json!({"member_id": member_id, "category": "voluntary", "amount_minor": 1001})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "insufficient_balance");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/savings/withdrawal",
        Some(json!({"member_id": member_id, "category": "voluntary", "amount_minor": 600})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["balance_after_minor"], 400);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/savings/deposit",
        Some(json!({"member_id": member_id, "category": "voluntary", "amount_minor": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_input");

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/savings/balances/{member_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["voluntary_minor"], 400);
    assert_eq!(body["mandatory_minor"], 0);
    assert_eq!(body["total_minor"], 400);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/savings?member_id={member_id}&limit=1"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["movements"].as_array().unwrap().len(), 1);
    assert_eq!(body["movements"][0]["kind"], "withdrawal");
    assert_eq!(body["balances"]["voluntary_minor"], 400);
    assert!(body["next_cursor"].is_string());

    let (status, body) = send(&app, Method::GET, "/api/savings/balances/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn loan_lifecycle_over_http() {
    let app = app().await;
    let member_id = register(&app, "AGT-003").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/loans",
        Some(json!({
            "member_id": member_id,
            "principal_minor": 0,
            "term_months": 10,
            "flat_rate_bps": 1200
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_input");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/loans",
        Some(json!({
            "member_id": member_id,
            "principal_minor": 1_000_000,
            "term_months": 10,
            "flat_rate_bps": 1200
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "application");
    assert!(body["loan_number"].as_str().unwrap().starts_with("PJ-"));
    let loan_id = body["id"].as_i64().unwrap();

    let (status, body) = send(&app, Method::POST, &format!("/api/loans/{loan_id}/disburse"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "invalid_transition");

    let (status, body) = send(&app, Method::POST, &format!("/api/loans/{loan_id}/approve"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/loans/{loan_id}/disburse"),
        Some(json!({"disbursed_at": "2026-01-15T09:00:00Z"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "active");

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/installments?loan_id={loan_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let installments = body["installments"].as_array().unwrap().clone();
    assert_eq!(installments.len(), 10);
    assert_eq!(installments[0]["amount_due_minor"], 112_000);
    assert_eq!(installments[0]["due_date"], "2026-02-15");

    let first_id = installments[0]["id"].as_i64().unwrap();
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/installments/{first_id}/pay"),
        Some(json!({"amount_minor": 100, "payment_date": "2026-02-15T10:00:00Z"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "insufficient_payment");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/installments/{first_id}/pay"),
        Some(json!({"amount_minor": 112_000, "payment_date": "2026-02-16T10:00:00Z"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["installment"]["late_fee_minor"], 1_120);
    assert_eq!(body["loan_settled"], false);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/installments/{first_id}/pay"),
        Some(json!({"amount_minor": 112_000})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "already_paid");

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/loans?member_id={member_id}&status=active"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loans"].as_array().unwrap().len(), 1);
    assert_eq!(body["loans"][0]["id"], loan_id);
}

#[tokio::test]
async fn invalid_cursor_is_invalid_input() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/api/loans?cursor=nope", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_input");
}
