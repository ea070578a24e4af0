//! Human-readable status notifications.
//!
//! `Notifier` is the delivery channel. `Notifications` wraps one so callers
//! never see a delivery error: failures and slow deliveries are logged and
//! counted, then dropped.

pub mod dispatcher;
pub mod error;
pub mod notifier;
pub mod telegram;

pub use dispatcher::Notifications;
pub use error::{NotifyError, NotifyResult};
pub use notifier::{BoxFuture, DynNotifier, LogNotifier, Notifier, NullNotifier, RecordingNotifier};
pub use telegram::{TelegramConfig, TelegramNotifier};
