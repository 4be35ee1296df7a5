//! Out-of-band notification processing pool.
//!
//! The webhook handler acknowledges deliveries and enqueues the raw payload
//! here. Parsing, validation and the per-call media side effect all happen
//! on this pool, after the response has already been decided, so no failure
//! in this module can reach the notification sender.

pub mod processor;

pub use processor::{NotificationProcessor, ProcessingOutcome};

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::IntakeConfig;
use crate::error::AppError;
use crate::services::metrics::{record_call_outcome, record_drop};

#[derive(Debug, Clone)]
pub struct NotificationJob {
    pub payload: Bytes,
}

pub struct NotificationDispatcher {
    config: IntakeConfig,
    processor: Arc<NotificationProcessor>,
    job_rx: Option<mpsc::Receiver<NotificationJob>>,
    shutdown_token: CancellationToken,
}

impl NotificationDispatcher {
    pub fn new(
        config: IntakeConfig,
        processor: Arc<NotificationProcessor>,
    ) -> (Self, mpsc::Sender<NotificationJob>) {
        let (job_tx, job_rx) = mpsc::channel(config.queue_size.max(1));
        let shutdown_token = CancellationToken::new();

        let dispatcher = Self {
            config,
            processor,
            job_rx: Some(job_rx),
            shutdown_token,
        };

        (dispatcher, job_tx)
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub async fn start(mut self) {
        let mut job_rx = self.job_rx.take().expect("start() can only be called once");

        tracing::info!(
            worker_count = self.config.worker_count,
            queue_size = self.config.queue_size,
            "Starting notification worker pool"
        );

        // Create workers
        let mut workers = Vec::new();
        for worker_id in 0..self.config.worker_count.max(1) {
            workers.push(Worker {
                id: worker_id,
                processor: Arc::clone(&self.processor),
            });
        }

        let shutdown = self.shutdown_token.clone();

        // Spawn a single task to distribute jobs to workers
        tokio::spawn(async move {
            let mut next_worker = 0;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::info!("Notification dispatcher shutting down");
                        break;
                    }
                    job = job_rx.recv() => {
                        match job {
                            Some(job) => {
                                // Round-robin distribution
                                let worker = &workers[next_worker];
                                next_worker = (next_worker + 1) % workers.len();

                                // Clone worker and spawn processing task
                                let worker_clone = worker.clone();
                                tokio::spawn(async move {
                                    worker_clone.process_job(job).await;
                                });
                            }
                            None => {
                                tracing::info!("Channel closed, notification dispatcher exiting");
                                break;
                            }
                        }
                    }
                }
            }
        });
    }
}

#[derive(Clone)]
struct Worker {
    id: usize,
    processor: Arc<NotificationProcessor>,
}

impl Worker {
    /// Run one queued payload to its terminal outcome. Never propagates:
    /// every failure is logged and counted here, then the worker moves on.
    async fn process_job(&self, job: NotificationJob) {
        let start = Instant::now();

        match self.processor.process(&job.payload).await {
            Ok(ProcessingOutcome::Transcribed { call_id }) => {
                record_call_outcome("transcribed");
                metrics::histogram!("call_processing_duration_seconds")
                    .record(start.elapsed().as_secs_f64());

                tracing::info!(
                    worker_id = self.id,
                    call_id = %call_id,
                    duration_ms = start.elapsed().as_millis(),
                    "Notification processing succeeded"
                );
            }
            Ok(ProcessingOutcome::NoAudio { call_id }) => {
                record_call_outcome("no_audio");
                tracing::info!(
                    worker_id = self.id,
                    call_id = %call_id,
                    "Notification processed, call advertises no audio stream"
                );
            }
            Ok(ProcessingOutcome::Rejected { reason }) => {
                record_drop(reason);
            }
            Err(AppError::MalformedNotification(detail)) => {
                record_drop("malformed");
                tracing::warn!(
                    worker_id = self.id,
                    detail = %detail,
                    "Dropping malformed notification"
                );
            }
            Err(e) => {
                let outcome = match &e {
                    AppError::UpstreamTimeout(_) => "timeout",
                    AppError::CredentialError(_) => "credential_error",
                    AppError::MediaFetchError { .. } => "fetch_error",
                    _ => "error",
                };
                record_call_outcome(outcome);

                tracing::error!(
                    worker_id = self.id,
                    error = %e,
                    "Notification processing failed"
                );
            }
        }
    }
}
