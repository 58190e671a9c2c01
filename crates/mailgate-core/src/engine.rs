//! The auth decision engine
//!
//! Consumes a parsed [`AuthRequest`] plus the immutable [`Config`] and
//! produces one [`AuthDecision`]. Two disjoint paths, selected on whether
//! the query carries credentials:
//!
//! - anonymous queries are inbound SMTP delivery attempts and are judged
//!   purely on the envelope's local-domain membership;
//! - credentialed queries are checked against the directory service,
//!   bounded by a timeout so a stalled backend cannot stall the proxy.

use std::sync::Arc;
use std::time::Duration;

use mailgate_common::Config;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::codec;
use crate::directory::Directory;
use crate::domain;
use crate::request::AuthRequest;

/// Authorization outcome for one query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    InvalidCredentials,
    RelayRequiresAuth,
    RelayDenied,
    BackendError,
}

/// The engine's answer, produced once per query and never mutated.
///
/// `resolved_user`/`resolved_password` carry the decoded credentials on a
/// credentialed success and stay empty everywhere else. `error_code` is
/// populated only for the two relay refusals.
#[derive(Debug, Clone)]
pub struct AuthDecision {
    pub outcome: Outcome,
    pub resolved_user: String,
    pub resolved_password: String,
    pub error_code: Option<u16>,
}

impl AuthDecision {
    fn success(resolved_user: String, resolved_password: String) -> Self {
        Self {
            outcome: Outcome::Success,
            resolved_user,
            resolved_password,
            error_code: None,
        }
    }

    fn invalid_credentials() -> Self {
        Self {
            outcome: Outcome::InvalidCredentials,
            resolved_user: String::new(),
            resolved_password: String::new(),
            error_code: None,
        }
    }

    fn relay_requires_auth() -> Self {
        Self {
            outcome: Outcome::RelayRequiresAuth,
            resolved_user: String::new(),
            resolved_password: String::new(),
            error_code: Some(551),
        }
    }

    fn relay_denied() -> Self {
        Self {
            outcome: Outcome::RelayDenied,
            resolved_user: String::new(),
            resolved_password: String::new(),
            error_code: Some(550),
        }
    }

    fn backend_error() -> Self {
        Self {
            outcome: Outcome::BackendError,
            resolved_user: String::new(),
            resolved_password: String::new(),
            error_code: None,
        }
    }
}

/// Decision engine, stateless across queries
pub struct AuthEngine {
    directory: Arc<dyn Directory>,
}

impl AuthEngine {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    /// Decide one auth query.
    ///
    /// Never returns an error: backend failures become
    /// [`Outcome::BackendError`] and are logged here, with no backend
    /// detail reaching the client.
    pub async fn decide(&self, req: &AuthRequest, config: &Config) -> AuthDecision {
        if req.is_anonymous() {
            self.decide_anonymous(req, config)
        } else {
            self.decide_credentialed(req, config).await
        }
    }

    /// Anonymous SMTP delivery: allowed only towards our own users.
    /// The directory is never consulted here.
    fn decide_anonymous(&self, req: &AuthRequest, config: &Config) -> AuthDecision {
        let from_local = req
            .smtp_from
            .as_deref()
            .map(|addr| domain::is_local_address(addr, &config.local_domains))
            .unwrap_or(false);
        let to_local = req
            .smtp_to
            .as_deref()
            .map(|addr| domain::is_local_address(addr, &config.local_domains))
            .unwrap_or(false);

        if to_local {
            debug!(
                from = req.smtp_from.as_deref().unwrap_or(""),
                to = req.smtp_to.as_deref().unwrap_or(""),
                client_ip = %req.client_ip,
                "anonymous delivery to local recipient accepted"
            );
            return AuthDecision::success(String::new(), String::new());
        }

        if from_local {
            // a local sender must authenticate before relaying outwards
            debug!(
                from = req.smtp_from.as_deref().unwrap_or(""),
                to = req.smtp_to.as_deref().unwrap_or(""),
                client_ip = %req.client_ip,
                attempt = %req.login_attempt,
                "authentication required for sending mail to external hosts"
            );
            return AuthDecision::relay_requires_auth();
        }

        debug!(
            from = req.smtp_from.as_deref().unwrap_or(""),
            to = req.smtp_to.as_deref().unwrap_or(""),
            client_ip = %req.client_ip,
            attempt = %req.login_attempt,
            "relaying denied"
        );
        AuthDecision::relay_denied()
    }

    /// Credentialed login: directory lookup then password verification,
    /// each bounded by the configured timeout. A user that does not exist
    /// and a wrong password produce the same outcome so the client cannot
    /// enumerate accounts; the log records which one it was.
    async fn decide_credentialed(&self, req: &AuthRequest, config: &Config) -> AuthDecision {
        let user = codec::decode(&req.encoded_user);
        let password = codec::decode(&req.encoded_password);
        let bound = Duration::from_secs(config.directory_timeout_secs);

        let record = match timeout(bound, self.directory.lookup_user(&user)).await {
            Ok(Ok(Some(record))) => record,
            Ok(Ok(None)) => {
                debug!(
                    user = %user,
                    client_ip = %req.client_ip,
                    attempt = %req.login_attempt,
                    "user not found in directory"
                );
                return AuthDecision::invalid_credentials();
            }
            Ok(Err(e)) => {
                warn!(user = %user, error = %e, "directory lookup failed");
                return AuthDecision::backend_error();
            }
            Err(_) => {
                warn!(
                    user = %user,
                    timeout_secs = config.directory_timeout_secs,
                    "directory lookup timed out"
                );
                return AuthDecision::backend_error();
            }
        };

        match timeout(
            bound,
            self.directory.verify_password(&password, &record.hashed_password),
        )
        .await
        {
            Ok(Ok(true)) => AuthDecision::success(user, password),
            Ok(Ok(false)) => {
                debug!(
                    user = %user,
                    client_ip = %req.client_ip,
                    attempt = %req.login_attempt,
                    "password mismatch"
                );
                AuthDecision::invalid_credentials()
            }
            Ok(Err(e)) => {
                warn!(user = %user, error = %e, "password verification failed");
                AuthDecision::backend_error()
            }
            Err(_) => {
                warn!(
                    user = %user,
                    timeout_secs = config.directory_timeout_secs,
                    "password verification timed out"
                );
                AuthDecision::backend_error()
            }
        }
    }
}
