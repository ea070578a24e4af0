//! Notifier trait and in-process implementations.

use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::error::{NotifyError, NotifyResult};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// A channel that delivers status text to a human.
pub trait Notifier: Send + Sync {
    fn send(&self, text: String) -> BoxFuture<'_, NotifyResult<()>>;
}

/// Arc wrapper for Notifier trait objects.
pub type DynNotifier = Arc<dyn Notifier>;

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, text: String) -> BoxFuture<'_, NotifyResult<()>> {
        Box::pin(async move {
            info!(target: "oms::notify", %text, "Notification");
            Ok(())
        })
    }
}

/// Discards notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn send(&self, _text: String) -> BoxFuture<'_, NotifyResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// Keeps notifications in memory for inspection.
///
/// Built with `failing()`, it records each message and then reports a
/// delivery error.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Messages containing `needle`.
    pub fn matching(&self, needle: &str) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.contains(needle))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, text: String) -> BoxFuture<'_, NotifyResult<()>> {
        Box::pin(async move {
            self.messages.lock().push(text);
            if self.fail {
                return Err(NotifyError::Delivery("recording notifier set to fail".into()));
            }
            Ok(())
        })
    }
}
