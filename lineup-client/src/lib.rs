pub mod app_config;
pub mod rest;
pub mod retry;

use lineup_checkout::CheckoutDeps;
use lineup_core::ports::{HostRuntime, Navigator, ReauthHandler};
use rest::{RestBookingsApi, RestClient, RestPaymentsApi};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use app_config::Config;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("http client error: {0}")]
    Http(String),
}

/// Wires the REST adapters and config-driven tunables into ready-to-use
/// checkout dependencies. The host runtime, navigator and re-auth handler
/// stay with the embedding page layer.
pub fn checkout_deps(
    config: &Config,
    host: Arc<dyn HostRuntime>,
    navigator: Arc<dyn Navigator>,
    reauth: Arc<dyn ReauthHandler>,
) -> Result<CheckoutDeps, ClientError> {
    let client = Arc::new(RestClient::new(config)?);
    let bookings = Arc::new(RestBookingsApi::new(Arc::clone(&client)));
    let payments = Arc::new(RestPaymentsApi::new(client));
    let mut deps = CheckoutDeps::new(bookings, payments, host, navigator, reauth);
    deps.dialog_deadline = Duration::from_secs(config.checkout.dialog_deadline_seconds);
    Ok(deps)
}
