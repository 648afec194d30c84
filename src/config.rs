//! Configuration for a paygate endpoint.

use serde::{Deserialize, Serialize};

/// Gate configuration for one protected endpoint.
///
/// Each [`Paywall`](crate::Paywall) instance guards one resource; hosts that
/// protect several endpoints construct one gate per endpoint (state maps are
/// per-instance, not process-wide).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Resource name used as the usage-ledger key.
    pub resource: String,

    /// Price charged per allowed request.
    pub price: f64,

    /// Currency code reported in rejection payloads.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Require a verified phone before serving the caller.
    #[serde(default)]
    pub phone_required: bool,

    /// Maximum requests per caller per window; `None` disables limiting.
    #[serde(default)]
    pub rate_limit: Option<u32>,

    /// Rate-limit window in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// How long a verification result stays cached, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum number of cached verification entries.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Payment endpoint advertised in the payment-required payload.
    #[serde(default = "default_payment_endpoint")]
    pub payment_endpoint: String,

    /// Phone-verification URL advertised in the phone-required payload.
    #[serde(default = "default_verify_url")]
    pub verify_url: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            resource: String::new(),
            price: 0.0,
            currency: default_currency(),
            phone_required: false,
            rate_limit: None,
            window_secs: default_window_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
            payment_endpoint: default_payment_endpoint(),
            verify_url: default_verify_url(),
        }
    }
}

impl GateConfig {
    /// Create a config for `resource` priced at `price`, defaults elsewhere.
    #[must_use]
    pub fn new(resource: impl Into<String>, price: f64) -> Self {
        Self {
            resource: resource.into(),
            price,
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &std::path::Path) -> crate::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

const fn default_window_secs() -> u64 {
    60
}

const fn default_cache_ttl_secs() -> u64 {
    300
}

const fn default_cache_capacity() -> usize {
    10_000
}

fn default_payment_endpoint() -> String {
    "https://pay.example.com/pay".to_string()
}

fn default_verify_url() -> String {
    "https://example.com/verify".to_string()
}
