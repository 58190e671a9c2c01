//! Shared handler state

use mailgate_common::Config;
use mailgate_core::AuthEngine;

/// State shared by all handlers.
///
/// `config` is `None` when startup configuration failed to load; the
/// responder keeps serving in that state and answers 5xx so the proxy sees
/// a retryable error instead of a refused connection.
pub struct AppState {
    pub config: Option<Config>,
    pub engine: AuthEngine,
}

impl AppState {
    pub fn new(config: Option<Config>, engine: AuthEngine) -> Self {
        Self { config, engine }
    }
}
