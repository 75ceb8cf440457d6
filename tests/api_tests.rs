//! API integration tests against a running server

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_register_equipment_schedules_first_job() {
    let client = Client::new();

    client
        .post(format!("{}/operators", BASE_URL))
        .json(&json!({
            "name": "Ana Rojas",
            "email": "ana@fleet.test",
            "phone": "3115550134"
        }))
        .send()
        .await
        .expect("Failed to create operator");

    let response = client
        .post(format!("{}/equipment", BASE_URL))
        .json(&json!({
            "plate": "API-001",
            "brand": "Toyota",
            "model": "Hilux",
            "year": 2021,
            "current_usage": 0
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["equipment"]["id"].is_number());
    assert_eq!(body["first_job"]["state"], "pending");
}

#[tokio::test]
#[ignore]
async fn test_record_usage_rejects_regression() {
    let client = Client::new();

    let response = client
        .post(format!("{}/equipment", BASE_URL))
        .json(&json!({
            "plate": "API-002",
            "brand": "Chevrolet",
            "model": "NPR",
            "current_usage": 5000
        }))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let id = body["equipment"]["id"].as_i64().expect("No equipment id");

    let response = client
        .post(format!("{}/equipment/{}/usage", BASE_URL, id))
        .json(&json!({ "usage": 4000 }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 422);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "usage_regression");
}

#[tokio::test]
#[ignore]
async fn test_scheduler_tick_returns_summary() {
    let client = Client::new();

    let response = client
        .post(format!("{}/scheduler/tick", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["jobs_overdue"].is_number());
    assert!(body["jobs_created"].is_number());
    assert!(body["notifications_sent"].is_number());
    assert!(body["notifications_failed"].is_number());
}
