use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::{Engine, TeamRole};
use migration::MigratorTrait;
use uuid::Uuid;

async fn setup() -> (Router, Engine) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    for username in ["alice", "bob", "carol", "dave"] {
        engine.create_user(username, "password").await.unwrap();
    }
    (server::router(Arc::new(engine.clone())), engine)
}

async fn team_for_alice(engine: &Engine) -> Uuid {
    let team = engine.new_team("Platform", "Engineering", "alice").await.unwrap();
    engine
        .upsert_team_member(team.id, "bob", TeamRole::Member)
        .await
        .unwrap();
    engine
        .upsert_team_member(team.id, "carol", TeamRole::Viewer)
        .await
        .unwrap();
    team.id
}

fn basic(username: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:password")))
}

async fn call(
    router: &Router,
    user: Option<&str>,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(user) = user {
        request = request.header(header::AUTHORIZATION, basic(user));
    }
    let body = match body {
        Some(json) => Body::from(serde_json::to_vec(&json).unwrap()),
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn lunch(amount_minor: i64) -> Value {
    json!({
        "title": "Lunch",
        "amount_minor": amount_minor,
        "category": "Food",
        "occurred_at": "2024-06-10T12:00:00+00:00",
        "notes": null
    })
}

#[tokio::test]
async fn requests_without_valid_credentials_are_rejected() {
    let (router, _) = setup().await;

    let (status, _) = call(&router, None, "GET", "/expenses", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/expenses")
        .header(
            header::AUTHORIZATION,
            format!("Basic {}", STANDARD.encode("alice:wrong")),
        )
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn personal_budget_and_expense_flow() {
    let (router, _) = setup().await;

    let (status, body) = call(
        &router,
        Some("alice"),
        "PUT",
        "/budget",
        Some(json!({ "month": "2024-06", "limit_minor": 50000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alert"]["breached"], json!(false));

    let (status, body) = call(&router, Some("alice"), "POST", "/expenses", Some(lunch(60000))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["total_spent_minor"], json!(60000));
    assert_eq!(body["alert"]["breached"], json!(true));
    assert_eq!(body["budget"]["limit_minor"], json!(50000));

    let (status, body) = call(&router, Some("alice"), "GET", "/alerts?month=2024-06", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_spent_minor"], json!(60000));
    assert_eq!(body["limit_minor"], json!(50000));

    let (status, body) = call(
        &router,
        Some("alice"),
        "GET",
        "/reports/monthly?month=2024-06",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["categories"][0]["category"], json!("Food"));
    assert_eq!(body["expense_count"], json!(1));
    assert!(body.get("members").is_none());

    let (status, body) = call(&router, Some("alice"), "GET", "/expenses?month=2024-06", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expenses"].as_array().unwrap().len(), 1);

    // Bob's personal scope is separate.
    let (_, body) = call(&router, Some("bob"), "GET", "/expenses", None).await;
    assert!(body["expenses"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn update_and_delete_refresh_the_alert() {
    let (router, _) = setup().await;
    let (_, created) = call(&router, Some("alice"), "POST", "/expenses", Some(lunch(1000))).await;
    let id = created["expense"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &router,
        Some("alice"),
        "PATCH",
        &format!("/expenses/{id}"),
        Some(json!({ "amount_minor": 2500 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expense"]["title"], json!("Lunch"));
    assert_eq!(body["total_spent_minor"], json!(2500));

    let (status, _) = call(
        &router,
        Some("alice"),
        "PATCH",
        &format!("/expenses/{id}"),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&router, Some("alice"), "DELETE", &format!("/expenses/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_spent_minor"], json!(0));

    let (status, _) = call(&router, Some("alice"), "DELETE", &format!("/expenses/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_input_is_unprocessable() {
    let (router, _) = setup().await;

    let (status, body) = call(&router, Some("alice"), "GET", "/alerts?month=2024-13", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("Invalid month"));

    let (status, _) = call(&router, Some("alice"), "POST", "/expenses", Some(lunch(-5))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(
        &router,
        Some("alice"),
        "PUT",
        "/budget",
        Some(json!({
            "month": "2024-06",
            "limit_minor": 100,
            "category_limits": [{ "category": "Food", "limit_minor": 10 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn team_roles_gate_the_team_routes() {
    let (router, engine) = setup().await;
    let team_id = team_for_alice(&engine).await;
    let base = format!("/teams/{team_id}");

    let (status, body) = call(&router, Some("carol"), "GET", &base, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], json!("viewer"));

    let (status, _) = call(&router, Some("dave"), "GET", &base, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &router,
        Some("carol"),
        "POST",
        &format!("{base}/expenses"),
        Some(lunch(100)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let budget = json!({
        "month": "2024-06",
        "limit_minor": 10000,
        "category_limits": [{ "category": "Food", "limit_minor": 5000 }]
    });
    let (status, _) = call(&router, Some("bob"), "PUT", &format!("{base}/budget"), Some(budget.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&router, Some("alice"), "PUT", &format!("{base}/budget"), Some(budget)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &router,
        Some("bob"),
        "POST",
        &format!("{base}/expenses"),
        Some(lunch(6000)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["alert"]["breached"], json!(false));
    assert_eq!(body["alert"]["category_breaches"][0]["category"], json!("Food"));

    let (status, body) = call(
        &router,
        Some("carol"),
        "GET",
        &format!("{base}/reports/monthly?month=2024-06"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["members"][0]["member"], json!("bob"));
    assert_eq!(body["limit_minor"], json!(10000));
    assert_eq!(body["remaining_minor"], json!(4000));

    let (status, body) = call(
        &router,
        Some("alice"),
        "GET",
        &format!("{base}/alerts?month=2024-06"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["category_breaches"][0]["spent_minor"], json!(6000));
}

#[tokio::test]
async fn only_creator_or_manager_can_change_team_expenses() {
    let (router, engine) = setup().await;
    let team_id = team_for_alice(&engine).await;
    engine
        .upsert_team_member(team_id, "dave", TeamRole::Member)
        .await
        .unwrap();
    let base = format!("/teams/{team_id}/expenses");

    let (_, created) = call(&router, Some("bob"), "POST", &base, Some(lunch(100))).await;
    let id = created["expense"]["id"].as_str().unwrap().to_string();

    let (status, _) = call(
        &router,
        Some("dave"),
        "PATCH",
        &format!("{base}/{id}"),
        Some(json!({ "amount_minor": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &router,
        Some("alice"),
        "PATCH",
        &format!("{base}/{id}"),
        Some(json!({ "category": "Travel" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&router, Some("bob"), "DELETE", &format!("{base}/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
}
