//! Server state

use std::sync::Arc;

use crate::cache::results::ResultStore;
use crate::dispatch::Dispatcher;
use crate::storage::settings::TokenSettings;

/// Server state shared across handlers
pub struct ServerState {
    pub dispatcher: Arc<dyn Dispatcher>,
    pub results: Arc<ResultStore>,
    /// Prefix of the status links handed back to callers
    pub vlab_url: String,
    pub token: TokenSettings,
}

impl ServerState {
    pub fn new(
        dispatcher: Arc<dyn Dispatcher>,
        results: Arc<ResultStore>,
        vlab_url: String,
        token: TokenSettings,
    ) -> Self {
        Self {
            dispatcher,
            results,
            vlab_url: vlab_url.trim_end_matches('/').to_string(),
            token,
        }
    }
}
