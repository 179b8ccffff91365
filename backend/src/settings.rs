//! Service configuration loaded via OrthoConfig.
//!
//! Values layer CLI flags over `MARKETPLACE_*` environment variables over the
//! configuration file. Secrets stay plain strings here only until startup
//! wraps them in `Zeroizing`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Errors raised when required settings are missing or malformed.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("missing required setting MARKETPLACE_{name}")]
    Missing { name: &'static str },
    #[error("invalid value for MARKETPLACE_{name}: {message}")]
    Invalid { name: &'static str, message: String },
}

/// Configuration for the payments service.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "MARKETPLACE")]
pub struct MarketplaceSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Stripe secret API key.
    pub stripe_secret_key: Option<String>,
    /// Signing secret of the Stripe webhook endpoint.
    pub stripe_webhook_secret: Option<String>,
    /// Override for the Stripe API origin.
    pub stripe_api_base: Option<String>,
    /// Allowed clock skew for Stripe signature timestamps.
    #[ortho_config(default = 300)]
    pub stripe_signature_tolerance_secs: u64,
    /// Stripe price sold as a product boost.
    pub boost_price_id: Option<String>,
    /// Stripe price sold as a carousel highlight.
    pub carousel_price_id: Option<String>,
    /// Where Stripe sends the browser after payment.
    pub checkout_success_url: Option<String>,
    /// Where Stripe sends the browser when checkout is abandoned.
    pub checkout_cancel_url: Option<String>,
    /// PIX gateway API origin.
    pub pix_base_url: Option<String>,
    pub pix_client_id: Option<String>,
    pub pix_client_secret: Option<String>,
    /// PIX key charges are paid into.
    pub pix_key: Option<String>,
    /// PEM client certificate for the PIX gateway.
    pub pix_certificate_path: Option<PathBuf>,
    /// PEM private key matching `pix_certificate_path`.
    pub pix_key_path: Option<PathBuf>,
    /// Timeout for each outbound gateway request.
    #[ortho_config(default = 15)]
    pub http_timeout_secs: u64,
}

fn require<'a, T: ?Sized>(
    value: Option<&'a T>,
    name: &'static str,
) -> Result<&'a T, SettingsError> {
    value.ok_or(SettingsError::Missing { name })
}

impl MarketplaceSettings {
    /// Listener address, defaulting to `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        self.bind_addr
            .as_deref()
            .unwrap_or(DEFAULT_BIND_ADDR)
            .parse()
            .map_err(|err: std::net::AddrParseError| SettingsError::Invalid {
                name: "BIND_ADDR",
                message: err.to_string(),
            })
    }

    pub fn database_url(&self) -> Result<&str, SettingsError> {
        require(self.database_url.as_deref(), "DATABASE_URL")
    }

    pub fn stripe_secret_key(&self) -> Result<&str, SettingsError> {
        require(self.stripe_secret_key.as_deref(), "STRIPE_SECRET_KEY")
    }

    pub fn stripe_webhook_secret(&self) -> Result<&str, SettingsError> {
        require(self.stripe_webhook_secret.as_deref(), "STRIPE_WEBHOOK_SECRET")
    }

    pub fn checkout_success_url(&self) -> Result<&str, SettingsError> {
        require(self.checkout_success_url.as_deref(), "CHECKOUT_SUCCESS_URL")
    }

    pub fn checkout_cancel_url(&self) -> Result<&str, SettingsError> {
        require(self.checkout_cancel_url.as_deref(), "CHECKOUT_CANCEL_URL")
    }

    pub fn pix_base_url(&self) -> Result<&str, SettingsError> {
        require(self.pix_base_url.as_deref(), "PIX_BASE_URL")
    }

    pub fn pix_client_id(&self) -> Result<&str, SettingsError> {
        require(self.pix_client_id.as_deref(), "PIX_CLIENT_ID")
    }

    pub fn pix_client_secret(&self) -> Result<&str, SettingsError> {
        require(self.pix_client_secret.as_deref(), "PIX_CLIENT_SECRET")
    }

    pub fn pix_key(&self) -> Result<&str, SettingsError> {
        require(self.pix_key.as_deref(), "PIX_KEY")
    }

    pub fn pix_certificate_path(&self) -> Result<&std::path::Path, SettingsError> {
        require(self.pix_certificate_path.as_deref(), "PIX_CERTIFICATE_PATH")
    }

    pub fn pix_key_path(&self) -> Result<&std::path::Path, SettingsError> {
        require(self.pix_key_path.as_deref(), "PIX_KEY_PATH")
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn stripe_signature_tolerance(&self) -> Duration {
        Duration::from_secs(self.stripe_signature_tolerance_secs)
    }
}
