//! In-memory analytics sink for tests.

use super::{AnalyticsError, AnalyticsSink, PurchaseEvent};
use async_trait::async_trait;
use std::sync::Mutex;

/// Records every event it receives; optionally fails each delivery after recording.
#[derive(Debug, Default)]
pub struct MockAnalytics {
    events: Mutex<Vec<PurchaseEvent>>,
    fail: bool,
}

impl MockAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose deliveries all fail.
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn events(&self) -> Vec<PurchaseEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AnalyticsSink for MockAnalytics {
    async fn track_purchase(&self, event: &PurchaseEvent) -> Result<(), AnalyticsError> {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
        if self.fail {
            return Err(AnalyticsError::Network("mock failure".to_string()));
        }
        Ok(())
    }
}
