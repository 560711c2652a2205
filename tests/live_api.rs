//! Smoke tests against a running server
//!
//! Start the server with `GEARGUARD__AUTH__BOOTSTRAP_ADMIN_PASSWORD=admin-pw`,
//! then run: cargo test --test live_api -- --ignored

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Helper to get an admin token
async fn get_auth_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "admin-pw"
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

#[tokio::test]
#[ignore]
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
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_request_lifecycle() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let suffix = chrono::Utc::now().timestamp_millis();

    let team: Value = client
        .post(format!("{}/teams", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "name": format!("Smoke team {}", suffix) }))
        .send()
        .await
        .expect("Failed to create team")
        .json()
        .await
        .expect("Failed to parse team");

    let equipment: Value = client
        .post(format!("{}/equipment", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Smoke press",
            "serial_no": format!("SMOKE-{}", suffix),
            "team_id": team["id"]
        }))
        .send()
        .await
        .expect("Failed to create equipment")
        .json()
        .await
        .expect("Failed to parse equipment");

    let response = client
        .post(format!("{}/requests", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "subject": "Smoke test",
            "equipment_id": equipment["id"],
            "team_id": team["id"],
            "request_type": "Corrective"
        }))
        .send()
        .await
        .expect("Failed to create request");
    assert_eq!(response.status(), 201);
    let request: Value = response.json().await.expect("Failed to parse request");
    assert_eq!(request["status"], "New");

    let response = client
        .put(format!("{}/requests/{}/status", BASE_URL, request["id"]))
        .bearer_auth(&token)
        .json(&json!({ "status": "Scrap" }))
        .send()
        .await
        .expect("Failed to set status");
    assert!(response.status().is_success());

    let equipment: Value = client
        .get(format!("{}/equipment/{}", BASE_URL, equipment["id"]))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to fetch equipment")
        .json()
        .await
        .expect("Failed to parse equipment");
    assert_eq!(equipment["is_scrapped"], true);

    let response = client
        .delete(format!("{}/teams/{}", BASE_URL, team["id"]))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to delete team");
    let report: Value = response.json().await.expect("Failed to parse report");
    assert_eq!(report["requests"], 1);
}
