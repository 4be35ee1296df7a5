use call_intake_service::config::{
    Config, GraphConfig, IdentityConfig, IntakeConfig, ServerConfig, SpeechConfig,
    SubscriptionConfig,
};
use call_intake_service::startup::Application;
use secrecy::Secret;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_CLIENT_STATE: &str = "test-shared-client-state";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub identity_server: MockServer,
    pub graph_server: MockServer,
    pub speech_server: MockServer,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_inner(true, 5).await
    }

    /// Spawn with the clientState gate disabled, mirroring deployments that
    /// accept notifications without authenticating them.
    pub async fn spawn_permissive() -> Self {
        Self::spawn_inner(false, 5).await
    }

    /// Spawn with a short outbound timeout so tests can hold an upstream
    /// response past it.
    pub async fn spawn_with_upstream_timeout(timeout_secs: u64) -> Self {
        Self::spawn_inner(true, timeout_secs).await
    }

    async fn spawn_inner(require_client_state: bool, upstream_timeout_secs: u64) -> Self {
        let identity_server = MockServer::start().await;
        let graph_server = MockServer::start().await;
        let speech_server = MockServer::start().await;

        let config = Config {
            service_name: "call-intake-service-test".to_string(),
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Random port
            },
            identity: IdentityConfig {
                token_url: format!("{}/token", identity_server.uri()),
                client_id: "test-client-id".to_string(),
                client_secret: Secret::new("test-client-secret".to_string()),
            },
            graph: GraphConfig {
                base_url: graph_server.uri(),
                scope: "https://graph.test/.default".to_string(),
                timeout_secs: upstream_timeout_secs,
            },
            subscription: SubscriptionConfig {
                notification_url: "https://bot.example.com/api/notifications".to_string(),
                resource: "/communications/callRecords".to_string(),
                change_type: "created,updated".to_string(),
                ttl_secs: 86_400,
                client_state: Secret::new(TEST_CLIENT_STATE.to_string()),
            },
            intake: IntakeConfig {
                require_client_state,
                worker_count: 2,
                queue_size: 32,
            },
            speech: SpeechConfig {
                endpoint: Some(format!("{}/speech", speech_server.uri())),
                api_key: Secret::new("test-speech-key".to_string()),
            },
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            identity_server,
            graph_server,
            speech_server,
        }
    }

    /// Mount the standard happy-path token issuance on the identity server.
    pub async fn mock_token_issuance(&self) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "test-access-token",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .mount(&self.identity_server)
            .await;
    }

    /// Mount a media descriptor for one call on the graph server.
    pub async fn mock_call_media(&self, call_id: &str, descriptor: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("/communications/calls/{}/media", call_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(descriptor))
            .mount(&self.graph_server)
            .await;
    }

    /// Mount a transcript response on the speech server.
    pub async fn mock_transcription(&self, text: &str) {
        Mock::given(method("POST"))
            .and(path("/speech"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": text })))
            .mount(&self.speech_server)
            .await;
    }

    /// Deliver a content notification and return the response.
    pub async fn post_notification(&self, body: &serde_json::Value) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{}/api/notifications", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// Provider-shaped content notification for one call record.
pub fn call_notification(call_id: &str, client_state: &str) -> serde_json::Value {
    json!({
        "value": [{
            "subscriptionId": "test-subscription-id",
            "changeType": "created",
            "clientState": client_state,
            "resource": format!("/communications/callRecords/{}", call_id),
            "resourceData": {
                "@odata.type": "#microsoft.graph.callRecord",
                "id": call_id
            }
        }]
    })
}

/// Poll `server` until it has received at least `count` requests.
///
/// Content notifications are processed after the HTTP response has been
/// sent, so tests wait for the observable side effects rather than the
/// response.
pub async fn wait_for_requests(server: &MockServer, count: usize) {
    for _ in 0..200 {
        let received = server.received_requests().await.unwrap_or_default().len();
        if received >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("expected at least {} requests, server never received them", count);
}

/// Grace period for asserting that processing did NOT reach a server.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(400)).await;
}
