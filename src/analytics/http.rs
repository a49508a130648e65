//! HTTP analytics collector client.

use super::{AnalyticsError, AnalyticsSink, PurchaseEvent};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Posts purchase events as JSON to `{base_url}/events/purchase`.
#[derive(Debug, Clone)]
pub struct HttpAnalyticsSink {
    client: Client,
    base_url: String,
    max_elapsed: Duration,
}

impl HttpAnalyticsSink {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_elapsed: Duration::from_secs(30),
        }
    }

    /// Cap the total time spent retrying one event.
    pub fn with_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = max_elapsed;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/events/purchase", self.base_url)
    }
}

#[async_trait]
impl AnalyticsSink for HttpAnalyticsSink {
    async fn track_purchase(&self, event: &PurchaseEvent) -> Result<(), AnalyticsError> {
        let url = self.endpoint();
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.max_elapsed),
            ..Default::default()
        };

        debug!(
            transaction_id = %event.transaction_id,
            event_id = %event.event_id,
            "sending purchase event"
        );

        retry(backoff, || async {
            let response = self
                .client
                .post(&url)
                .json(event)
                .send()
                .await
                .map_err(|e| backoff::Error::transient(AnalyticsError::Network(e.to_string())))?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(AnalyticsError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(AnalyticsError::Http {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(AnalyticsError::Http {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }
            Ok(())
        })
        .await
    }
}
