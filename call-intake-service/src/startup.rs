//! Application startup and lifecycle management.
//!
//! Wires the credential provider, subscription manager, call-media service
//! and the notification worker pool into one axum application.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::AppError;
use crate::handlers;
use crate::middleware::metrics::metrics_middleware;
use crate::middleware::tracing::request_id_middleware;
use crate::services::providers::{
    MockTranscriptionProvider, SpeechApiConfig, SpeechApiProvider, TranscriptionProvider,
};
use crate::services::{CallMediaService, CredentialProvider, SubscriptionManager};
use crate::workers::{NotificationDispatcher, NotificationJob, NotificationProcessor};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub subscriptions: Arc<SubscriptionManager>,
    pub job_tx: mpsc::Sender<NotificationJob>,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    worker_shutdown: CancellationToken,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: Config) -> Result<Self, AppError> {
        let credentials = Arc::new(CredentialProvider::new(
            config.identity.clone(),
            config.graph.timeout(),
        )?);

        let subscriptions = Arc::new(SubscriptionManager::new(
            config.graph.clone(),
            config.subscription.clone(),
            Arc::clone(&credentials),
        )?);

        // Transcription provider: hosted speech API when configured, mock otherwise.
        let transcription: Arc<dyn TranscriptionProvider> = match &config.speech.endpoint {
            Some(endpoint) => match SpeechApiProvider::new(SpeechApiConfig {
                endpoint: endpoint.clone(),
                api_key: config.speech.api_key.clone(),
                timeout: config.graph.timeout(),
            }) {
                Ok(provider) => {
                    tracing::info!(endpoint = %endpoint, "Speech transcription provider initialized");
                    Arc::new(provider)
                }
                Err(e) => {
                    tracing::warn!("Failed to initialize speech provider: {}. Using mock.", e);
                    Arc::new(MockTranscriptionProvider::new(true))
                }
            },
            None => {
                tracing::info!("Speech endpoint not configured, using mock transcription provider");
                Arc::new(MockTranscriptionProvider::new(true))
            }
        };

        let media = Arc::new(CallMediaService::new(
            config.graph.clone(),
            Arc::clone(&credentials),
            transcription,
        )?);

        if !config.intake.require_client_state {
            tracing::warn!(
                "clientState verification is disabled - inbound notifications will not be authenticated"
            );
        }

        let processor = Arc::new(NotificationProcessor::new(
            config.intake.clone(),
            config.subscription.client_state.clone(),
            Arc::clone(&subscriptions),
            media,
        ));

        let (dispatcher, job_tx) = NotificationDispatcher::new(config.intake.clone(), processor);
        let worker_shutdown = dispatcher.shutdown_token();

        // Start worker pool
        tokio::spawn(async move {
            dispatcher.start().await;
        });

        let state = AppState {
            config: config.clone(),
            subscriptions,
            job_tx,
        };

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .route("/metrics", get(handlers::metrics_endpoint))
            .route(
                "/api/notifications",
                post(handlers::notifications::receive_notification),
            )
            .route(
                "/subscriptions/create",
                get(handlers::subscriptions::create_subscription),
            )
            .layer(from_fn(metrics_middleware))
            .layer(from_fn(request_id_middleware))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                }),
            )
            .with_state(state);

        // Bind listener (port 0 = random port for testing)
        let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        Ok(Self {
            port,
            listener,
            router,
            worker_shutdown,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let result = axum::serve(self.listener, self.router).await;

        // The HTTP surface is gone; stop draining the notification queue too.
        self.worker_shutdown.cancel();
        result
    }
}
