//! Order manager configuration.
//!
//! Loaded from TOML by the caller and handed to `OrderManager::new`. Every
//! section except `credentials` has defaults.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use oms_core::ValidationError;
use oms_executor::RouterConfig;
use oms_notify::TelegramConfig;
use oms_position::CloserConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{OmsError, OmsResult};

/// Exchange API credentials.
///
/// Both fields are wiped from memory on drop. `Debug` never prints them.
#[derive(Clone, Default, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.trim().is_empty() || self.api_secret.trim().is_empty() {
            return Err(ValidationError::MissingCredentials);
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

/// Gateway deadline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySection {
    /// Deadline for each gateway call (ms). Default: 10,000.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Instrument filter cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecisionSection {
    /// Age after which cached filters are reloaded (s). Default: 3,600.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

fn default_max_age_secs() -> u64 {
    3_600
}

impl Default for PrecisionSection {
    fn default() -> Self {
        Self {
            max_age_secs: default_max_age_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterSection {
    /// Batch rows in flight at once. Default: 1 (sequential).
    #[serde(default = "default_concurrency")]
    pub batch_concurrency: usize,
}

fn default_concurrency() -> usize {
    1
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            batch_concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloserSection {
    /// Exchange minimum order notional (quote currency). Default: 5.
    #[serde(default = "default_min_notional")]
    pub min_notional: Decimal,
    /// Clamp close quantities larger than the position. Default: false.
    #[serde(default)]
    pub clamp_over_close: bool,
    /// Positions closed at once. Default: 1 (sequential).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_min_notional() -> Decimal {
    Decimal::from(5)
}

impl Default for CloserSection {
    fn default() -> Self {
        Self {
            min_notional: default_min_notional(),
            clamp_over_close: false,
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierSection {
    /// Upper bound on one delivery (ms). Default: 5,000.
    #[serde(default = "default_notify_timeout_ms")]
    pub timeout_ms: u64,
    /// Telegram delivery. Without it messages go to the log.
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
}

fn default_notify_timeout_ms() -> u64 {
    5_000
}

impl Default for NotifierSection {
    fn default() -> Self {
        Self {
            timeout_ms: default_notify_timeout_ms(),
            telegram: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditSection {
    /// Keep at most this many audit entries. Unbounded when absent.
    #[serde(default)]
    pub capacity: Option<usize>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OmsConfig {
    pub credentials: Credentials,
    #[serde(default)]
    pub gateway: GatewaySection,
    #[serde(default)]
    pub precision: PrecisionSection,
    #[serde(default)]
    pub router: RouterSection,
    #[serde(default)]
    pub closer: CloserSection,
    #[serde(default)]
    pub notifier: NotifierSection,
    #[serde(default)]
    pub audit: AuditSection,
}

impl OmsConfig {
    /// Defaults plus credentials.
    pub fn with_credentials(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(api_key, api_secret),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> OmsResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> OmsResult<Self> {
        toml::from_str(content)
            .map_err(|e| OmsError::Config(format!("Failed to parse config: {e}")))
    }

    /// Check credentials and numeric settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.credentials.validate()?;
        if self.gateway.request_timeout_ms == 0 {
            return Err(ValidationError::InvalidConfig(
                "gateway.request_timeout_ms must be positive".to_string(),
            ));
        }
        if self.router.batch_concurrency == 0 {
            return Err(ValidationError::InvalidConfig(
                "router.batch_concurrency must be at least 1".to_string(),
            ));
        }
        if self.closer.concurrency == 0 {
            return Err(ValidationError::InvalidConfig(
                "closer.concurrency must be at least 1".to_string(),
            ));
        }
        if self.closer.min_notional.is_sign_negative() {
            return Err(ValidationError::InvalidConfig(format!(
                "closer.min_notional must not be negative, got {}",
                self.closer.min_notional
            )));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.gateway.request_timeout_ms)
    }

    pub fn precision_max_age(&self) -> Duration {
        Duration::from_secs(self.precision.max_age_secs)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.notifier.timeout_ms)
    }

    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            batch_concurrency: self.router.batch_concurrency,
        }
    }

    pub fn closer_config(&self) -> CloserConfig {
        CloserConfig {
            min_notional: self.closer.min_notional,
            clamp_over_close: self.closer.clamp_over_close,
            concurrency: self.closer.concurrency,
        }
    }
}
