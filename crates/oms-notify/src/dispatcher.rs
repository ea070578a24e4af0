//! Failure-isolating notification dispatcher.

use std::time::Duration;

use oms_telemetry::Metrics;
use tracing::warn;

use crate::notifier::DynNotifier;

/// Fire-and-forget front for a `Notifier`.
///
/// `send` never fails. Delivery errors and deliveries slower than the
/// timeout are logged, counted and dropped.
#[derive(Clone)]
pub struct Notifications {
    inner: DynNotifier,
    timeout: Duration,
}

impl Notifications {
    pub fn new(inner: DynNotifier, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub async fn send(&self, text: impl Into<String>) {
        match tokio::time::timeout(self.timeout, self.inner.send(text.into())).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                Metrics::notification_failed();
                warn!(error = %e, "Notification delivery failed");
            }
            Err(_) => {
                Metrics::notification_failed();
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Notification delivery timed out"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotifyResult;
    use crate::notifier::{BoxFuture, Notifier, RecordingNotifier};
    use std::sync::Arc;

    struct StuckNotifier;

    impl Notifier for StuckNotifier {
        fn send(&self, _text: String) -> BoxFuture<'_, NotifyResult<()>> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let recorder = Arc::new(RecordingNotifier::failing());
        let notifications = Notifications::new(recorder.clone(), Duration::from_secs(1));
        notifications.send("order placed").await;
        assert_eq!(recorder.messages(), vec!["order placed"]);
    }

    #[tokio::test]
    async fn test_slow_delivery_is_bounded() {
        let notifications = Notifications::new(Arc::new(StuckNotifier), Duration::from_millis(10));
        let started = std::time::Instant::now();
        notifications.send("hello").await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
