use std::sync::Arc;

use lectern_accounts::AccountStore;
use lectern_core::config::Config;

use crate::meter::UsageMeter;

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
pub struct AppState {
    /// The account/plan store behind the usage meter. Kept separately so the
    /// health route can ping it.
    pub accounts: Arc<dyn AccountStore>,

    /// The quota enforcement and metering service.
    pub meter: UsageMeter,

    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(accounts: Arc<dyn AccountStore>, config: Config) -> Self {
        Self {
            meter: UsageMeter::new(Arc::clone(&accounts)),
            accounts,
            config: Arc::new(config),
        }
    }
}
