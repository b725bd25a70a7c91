//! Collector client.
//!
//! Delivery is best-effort and at-most-once: each sample gets one POST.
//! A failure is logged and reflected in [`DeliveryStatus`], then the sample
//! is dropped. Nothing is retried, buffered or queued.

use crate::aggregator::TelemetrySample;
use crate::config::AgentConfig;
use crate::error::DeliveryError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

/// Outcome of the most recent delivery attempt, for local display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// No cycle has completed yet.
    Idle,
    Sent,
    /// Collector answered with a non-2xx status.
    Error(u16),
    Unreachable,
    /// Dropped because too many requests were already in flight.
    Skipped,
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Sent => f.write_str("sent"),
            Self::Error(code) => write!(f, "error: {code}"),
            Self::Unreachable => f.write_str("unreachable"),
            Self::Skipped => f.write_str("skipped"),
        }
    }
}

impl Serialize for DeliveryStatus {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl From<&Result<(), DeliveryError>> for DeliveryStatus {
    fn from(result: &Result<(), DeliveryError>) -> Self {
        match result {
            Ok(()) => Self::Sent,
            Err(DeliveryError::Status(code)) => Self::Error(*code),
            Err(DeliveryError::Transport(_)) => Self::Unreachable,
            Err(DeliveryError::Saturated) => Self::Skipped,
        }
    }
}

/// HTTP client bound to one collector endpoint.
#[derive(Debug, Clone)]
pub struct Collector {
    client: reqwest::Client,
    endpoint: String,
    in_flight: Option<Arc<Semaphore>>,
}

impl Collector {
    pub fn new(config: &AgentConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        let in_flight = (config.max_in_flight > 0)
            .then(|| Arc::new(Semaphore::new(config.max_in_flight)));

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            in_flight,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POSTs one sample as JSON. Any 2xx is success; the body is ignored.
    pub async fn post(&self, sample: &TelemetrySample) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(sample)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Status(status.as_u16()))
        }
    }

    /// Sends `sample` on a background task without waiting for it.
    ///
    /// `on_done` receives the outcome. When the in-flight limit is reached
    /// the sample is dropped immediately, `on_done` gets
    /// [`DeliveryStatus::Skipped`] and no task is spawned.
    pub fn dispatch<F>(&self, sample: TelemetrySample, on_done: F) -> Option<JoinHandle<()>>
    where
        F: FnOnce(DeliveryStatus) + Send + 'static,
    {
        let permit = match self.try_acquire() {
            Ok(permit) => permit,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping sample");
                on_done(DeliveryStatus::Skipped);
                return None;
            }
        };

        let collector = self.clone();
        Some(tokio::spawn(async move {
            let _permit = permit;
            let result = collector.post(&sample).await;

            match &result {
                Ok(()) => tracing::debug!(endpoint = %collector.endpoint, "Sample delivered"),
                Err(e) => tracing::warn!(
                    endpoint = %collector.endpoint,
                    error = %e,
                    "Sample delivery failed, discarding"
                ),
            }

            on_done(DeliveryStatus::from(&result));
        }))
    }

    fn try_acquire(&self) -> Result<Option<OwnedSemaphorePermit>, DeliveryError> {
        match &self.in_flight {
            None => Ok(None),
            Some(sem) => Arc::clone(sem)
                .try_acquire_owned()
                .map(Some)
                .map_err(|_| DeliveryError::Saturated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{MouseStats, TypingStats};
    use axum::{http::StatusCode, routing::post, Json, Router};
    use chrono::Utc;
    use std::time::Duration;
    use tokio::sync::{mpsc, oneshot};

    fn sample() -> TelemetrySample {
        TelemetrySample {
            typing: TypingStats {
                mean_iki_ms: 100.0,
                variance_iki: 0.0,
                burstiness: 0.0,
                total_keys: 10,
                backspace_rate: 0.0,
            },
            mouse: MouseStats {
                distance_px: 0,
                click_rate_per_sec: 0.0,
            },
            idle_time_ms: 0,
            timestamp: Utc::now(),
        }
    }

    fn config_for(endpoint: String) -> AgentConfig {
        AgentConfig {
            endpoint,
            request_timeout_ms: 2000,
            ..Default::default()
        }
    }

    /// Serves `router` on an ephemeral loopback port and returns its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(DeliveryStatus::Idle.to_string(), "idle");
        assert_eq!(DeliveryStatus::Sent.to_string(), "sent");
        assert_eq!(DeliveryStatus::Error(500).to_string(), "error: 500");
        assert_eq!(DeliveryStatus::Unreachable.to_string(), "unreachable");
        assert_eq!(
            serde_json::to_string(&DeliveryStatus::Error(404)).unwrap(),
            "\"error: 404\""
        );
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let (tx, mut rx) = mpsc::unbounded_channel::<serde_json::Value>();
        let router = Router::new().route(
            "/biometric/",
            post(move |Json(body): Json<serde_json::Value>| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(body);
                    StatusCode::CREATED
                }
            }),
        );
        let base = serve(router).await;
        let collector = Collector::new(&config_for(format!("{base}/biometric/"))).unwrap();

        collector.post(&sample()).await.unwrap();

        let body = rx.recv().await.unwrap();
        assert_eq!(body["typing"]["total_keys"], 10);
        assert_eq!(body["typing"]["mean_iki_ms"], 100.0);
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_post_reports_server_error() {
        let router = Router::new().route(
            "/biometric/",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let base = serve(router).await;
        let collector = Collector::new(&config_for(format!("{base}/biometric/"))).unwrap();

        let result = collector.post(&sample()).await;
        assert!(matches!(result, Err(DeliveryError::Status(500))));
        assert_eq!(DeliveryStatus::from(&result), DeliveryStatus::Error(500));
    }

    #[tokio::test]
    async fn test_post_reports_unreachable() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let collector = Collector::new(&config_for(format!("http://{addr}/biometric/"))).unwrap();
        let result = collector.post(&sample()).await;

        assert!(matches!(result, Err(DeliveryError::Transport(_))));
        assert_eq!(DeliveryStatus::from(&result), DeliveryStatus::Unreachable);
    }

    #[tokio::test]
    async fn test_dispatch_reports_outcome() {
        let router = Router::new().route("/biometric/", post(|| async { StatusCode::OK }));
        let base = serve(router).await;
        let collector = Collector::new(&config_for(format!("{base}/biometric/"))).unwrap();

        let (tx, rx) = oneshot::channel();
        let handle = collector.dispatch(sample(), move |status| {
            let _ = tx.send(status);
        });

        assert!(handle.is_some());
        assert_eq!(rx.await.unwrap(), DeliveryStatus::Sent);
    }

    #[tokio::test]
    async fn test_dispatch_skips_when_saturated() {
        let router = Router::new().route(
            "/biometric/",
            post(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                StatusCode::OK
            }),
        );
        let base = serve(router).await;
        let config = AgentConfig {
            max_in_flight: 1,
            ..config_for(format!("{base}/biometric/"))
        };
        let collector = Collector::new(&config).unwrap();

        let first = collector.dispatch(sample(), |_| {});
        let (tx, rx) = oneshot::channel();
        let second = collector.dispatch(sample(), move |status| {
            let _ = tx.send(status);
        });

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(rx.await.unwrap(), DeliveryStatus::Skipped);
    }
}
