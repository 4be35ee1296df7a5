mod common;

use chrono::{DateTime, Duration, Utc};
use common::{TestApp, TEST_CLIENT_STATE};
use reqwest::Client;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn create_subscription_returns_provider_id() {
    let app = TestApp::spawn().await;
    app.mock_token_issuance().await;

    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .and(header("authorization", "Bearer test-access-token"))
        .and(body_partial_json(json!({
            "changeType": "created,updated",
            "notificationUrl": "https://bot.example.com/api/notifications",
            "resource": "/communications/callRecords",
            "clientState": TEST_CLIENT_STATE
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "sub-12345",
            "resource": "/communications/callRecords",
            "expirationDateTime": "2099-01-01T00:00:00Z"
        })))
        .expect(1)
        .mount(&app.graph_server)
        .await;

    let response = Client::new()
        .get(format!("{}/subscriptions/create", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["id"], "sub-12345");
    assert_eq!(body["resource"], "/communications/callRecords");
    assert!(body["expires_at"]
        .as_str()
        .expect("expires_at missing")
        .starts_with("2099-01-01"));
}

#[tokio::test]
async fn subscription_request_carries_a_24h_expiration_window() {
    let app = TestApp::spawn().await;
    app.mock_token_issuance().await;

    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "sub-1" })))
        .mount(&app.graph_server)
        .await;

    let before = Utc::now();
    Client::new()
        .get(format!("{}/subscriptions/create", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    let requests = app.graph_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let request_body: serde_json::Value =
        serde_json::from_slice(&requests[0].body).expect("Failed to parse request body");
    let expiry: DateTime<Utc> = request_body["expirationDateTime"]
        .as_str()
        .expect("expirationDateTime missing")
        .parse()
        .expect("expirationDateTime is not a timestamp");

    assert!(expiry > before + Duration::hours(23));
    assert!(expiry < before + Duration::hours(25));
}

#[tokio::test]
async fn upstream_rejection_surfaces_status_and_body() {
    let app = TestApp::spawn().await;
    app.mock_token_issuance().await;

    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(403).set_body_string("quota exceeded for tenant"))
        .mount(&app.graph_server)
        .await;

    let response = Client::new()
        .get(format!("{}/subscriptions/create", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 500);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert!(body["error"].as_str().unwrap().contains("403"));
    assert!(body["details"]
        .as_str()
        .unwrap()
        .contains("quota exceeded for tenant"));
}

#[tokio::test]
async fn identity_failure_prevents_any_subscription_attempt() {
    let app = TestApp::spawn().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(500).set_body_string("identity outage"))
        .mount(&app.identity_server)
        .await;

    let response = Client::new()
        .get(format!("{}/subscriptions/create", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 500);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["error"], "Credential acquisition failed");

    assert!(app
        .graph_server
        .received_requests()
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn repeated_triggers_register_independent_subscriptions() {
    let app = TestApp::spawn().await;
    app.mock_token_issuance().await;

    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "sub-1" })))
        .expect(2)
        .mount(&app.graph_server)
        .await;

    let client = Client::new();
    for _ in 0..2 {
        let response = client
            .get(format!("{}/subscriptions/create", app.address))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 200);
    }

    // No dedup or update-in-place: each trigger registers upstream again.
    assert_eq!(app.graph_server.received_requests().await.unwrap().len(), 2);
}
