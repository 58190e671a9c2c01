//! Response encoding for the auth protocol
//!
//! Every policy outcome is an HTTP 200 with an empty body; the proxy reads
//! the verdict from the `Auth-*` headers alone. Only a backend failure
//! surfaces as a 5xx, and then with no protocol headers at all.

use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use mailgate_common::Config;
use tracing::warn;

use crate::engine::{AuthDecision, Outcome};
use crate::request::AuthRequest;

const STATUS_OK: &str = "OK";
const STATUS_INVALID_LOGIN: &str = "Invalid login or password";
const STATUS_RELAY_DENIED: &str = "Relaying denied";
const STATUS_AUTH_REQUIRED: &str = "This mail server requires authentication before sending \
     mail from a locally hosted domain. Please reconfigure your mail client to authenticate \
     before sending mail.";

/// Encoded answer, ready for the transport layer
#[derive(Debug)]
pub struct AuthResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// Encode a decision into the proxy-facing status and headers.
pub fn encode(decision: &AuthDecision, config: &Config, req: &AuthRequest) -> AuthResponse {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
    headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));

    match decision.outcome {
        Outcome::BackendError => {
            // the proxy retries on a bare 5xx; backend detail stays in the log
            return AuthResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                headers: HeaderMap::new(),
            };
        }
        Outcome::Success => {
            set(&mut headers, "auth-status", STATUS_OK);
            set(&mut headers, "auth-user", &decision.resolved_user);
            set(&mut headers, "auth-pass", &decision.resolved_password);

            // nginx rejects a hostname here ("sent invalid server address"
            // while in http auth state); it must be an IP literal
            if let Some(address) = server_address(config) {
                set(&mut headers, "auth-server", &address);
            }
            if let Some(port) = req.protocol.port() {
                set(&mut headers, "auth-port", &port.to_string());
            }

            // shared secret proving the answer came from this responder
            if let (Some(name), Some(value)) = (&config.auth_key_header, &config.auth_key_value) {
                set_configured(&mut headers, name, value);
            }
        }
        Outcome::InvalidCredentials => {
            set(&mut headers, "auth-status", STATUS_INVALID_LOGIN);
        }
        Outcome::RelayRequiresAuth => {
            set(&mut headers, "auth-status", STATUS_AUTH_REQUIRED);
            set(&mut headers, "auth-error-code", "551");
        }
        Outcome::RelayDenied => {
            set(&mut headers, "auth-status", STATUS_RELAY_DENIED);
            set(&mut headers, "auth-error-code", "550");
        }
    }

    if decision.outcome != Outcome::Success {
        if let Some(wait) = &config.wait_on_error {
            set(&mut headers, "auth-wait", wait);
        }
    }

    AuthResponse {
        status: StatusCode::OK,
        headers,
    }
}

/// Address the proxy should connect to: the configured public IP, else
/// this host's own address. Resolution failure only costs the header;
/// the proxy treats its absence as retryable.
fn server_address(config: &Config) -> Option<String> {
    if let Some(ip) = &config.public_server_ip {
        return Some(ip.clone());
    }
    match local_ip_address::local_ip() {
        Ok(ip) => Some(ip.to_string()),
        Err(e) => {
            warn!(error = %e, "could not resolve a local address, omitting auth-server");
            None
        }
    }
}

fn set(headers: &mut HeaderMap, name: &'static str, value: &str) {
    match HeaderValue::from_bytes(value.as_bytes()) {
        Ok(value) => {
            headers.insert(HeaderName::from_static(name), value);
        }
        Err(_) => warn!(header = name, "dropping response header with non-encodable value"),
    }
}

fn set_configured(headers: &mut HeaderMap, name: &str, value: &str) {
    let name = match HeaderName::from_bytes(name.as_bytes()) {
        Ok(name) => name,
        Err(_) => {
            warn!(header = name, "configured auth key header is not a legal header name");
            return;
        }
    };
    match HeaderValue::from_bytes(value.as_bytes()) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => warn!(header = %name, "configured auth key value is not a legal header value"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Protocol;
    use pretty_assertions::assert_eq;

    fn test_config() -> Config {
        Config {
            local_domains: vec!["local.com".to_string()],
            public_server_ip: Some("198.51.100.1".to_string()),
            auth_key_header: None,
            auth_key_value: None,
            wait_on_error: None,
            directory_timeout_secs: 5,
            debug: false,
            enabled: true,
            bind: "127.0.0.1:0".to_string(),
            users_file: None,
        }
    }

    fn request(protocol: Protocol) -> AuthRequest {
        AuthRequest {
            encoded_user: "bob".to_string(),
            encoded_password: "pw".to_string(),
            protocol,
            login_attempt: "1".to_string(),
            client_ip: "192.0.2.42".to_string(),
            smtp_from: None,
            smtp_to: None,
            debug_requested: false,
        }
    }

    fn success(user: &str, password: &str) -> AuthDecision {
        AuthDecision {
            outcome: Outcome::Success,
            resolved_user: user.to_string(),
            resolved_password: password.to_string(),
            error_code: None,
        }
    }

    fn refusal(outcome: Outcome, error_code: Option<u16>) -> AuthDecision {
        AuthDecision {
            outcome,
            resolved_user: String::new(),
            resolved_password: String::new(),
            error_code,
        }
    }

    fn header<'a>(resp: &'a AuthResponse, name: &str) -> Option<&'a str> {
        resp.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_success_headers() {
        let resp = encode(&success("bob", "pw"), &test_config(), &request(Protocol::Imap));

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(header(&resp, "auth-status"), Some("OK"));
        assert_eq!(header(&resp, "auth-user"), Some("bob"));
        assert_eq!(header(&resp, "auth-pass"), Some("pw"));
        assert_eq!(header(&resp, "auth-server"), Some("198.51.100.1"));
        assert_eq!(header(&resp, "auth-port"), Some("143"));
        assert_eq!(header(&resp, "content-length"), Some("0"));
        assert_eq!(header(&resp, "auth-wait"), None);
    }

    #[test]
    fn test_port_per_protocol() {
        let config = test_config();
        let decision = success("bob", "pw");

        let pop3 = encode(&decision, &config, &request(Protocol::Pop3));
        assert_eq!(header(&pop3, "auth-port"), Some("110"));

        let smtp = encode(&decision, &config, &request(Protocol::Smtp));
        assert_eq!(header(&smtp, "auth-port"), Some("25"));

        let unknown = encode(&decision, &config, &request(Protocol::Unknown));
        assert_eq!(header(&unknown, "auth-port"), None);
    }

    #[test]
    fn test_shared_secret_header() {
        let mut config = test_config();
        config.auth_key_header = Some("X-Ngx-Auth-Key".to_string());
        config.auth_key_value = Some("81jbdvdl".to_string());

        let resp = encode(&success("bob", "pw"), &config, &request(Protocol::Imap));
        assert_eq!(header(&resp, "x-ngx-auth-key"), Some("81jbdvdl"));

        // refusals never carry the secret
        let resp = encode(
            &refusal(Outcome::InvalidCredentials, None),
            &config,
            &request(Protocol::Imap),
        );
        assert_eq!(header(&resp, "x-ngx-auth-key"), None);
    }

    #[test]
    fn test_invalid_credentials_with_wait() {
        let mut config = test_config();
        config.wait_on_error = Some("3".to_string());

        let resp = encode(
            &refusal(Outcome::InvalidCredentials, None),
            &config,
            &request(Protocol::Imap),
        );
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(header(&resp, "auth-status"), Some("Invalid login or password"));
        assert_eq!(header(&resp, "auth-wait"), Some("3"));
        assert_eq!(header(&resp, "auth-user"), None);
        assert_eq!(header(&resp, "auth-port"), None);
    }

    #[test]
    fn test_relay_refusal_codes() {
        let config = test_config();

        let requires_auth = encode(
            &refusal(Outcome::RelayRequiresAuth, Some(551)),
            &config,
            &request(Protocol::Smtp),
        );
        assert_eq!(requires_auth.status, StatusCode::OK);
        assert_eq!(header(&requires_auth, "auth-error-code"), Some("551"));
        assert!(header(&requires_auth, "auth-status")
            .unwrap()
            .starts_with("This mail server requires authentication"));

        let denied = encode(
            &refusal(Outcome::RelayDenied, Some(550)),
            &config,
            &request(Protocol::Smtp),
        );
        assert_eq!(header(&denied, "auth-status"), Some("Relaying denied"));
        assert_eq!(header(&denied, "auth-error-code"), Some("550"));
    }

    #[test]
    fn test_backend_error_is_bare_500() {
        let resp = encode(
            &refusal(Outcome::BackendError, None),
            &test_config(),
            &request(Protocol::Imap),
        );
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(resp.headers.is_empty());
    }

    #[test]
    fn test_header_injection_in_resolved_values_is_dropped() {
        let resp = encode(
            &success("bob", "pw\r\nAuth-Status: OK"),
            &test_config(),
            &request(Protocol::Imap),
        );
        assert_eq!(header(&resp, "auth-pass"), None);
        assert_eq!(header(&resp, "auth-user"), Some("bob"));
    }

    #[test]
    fn test_illegal_configured_header_name_is_skipped() {
        let mut config = test_config();
        config.auth_key_header = Some("bad header\nname".to_string());
        config.auth_key_value = Some("v".to_string());

        let resp = encode(&success("bob", "pw"), &config, &request(Protocol::Imap));
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(header(&resp, "auth-status"), Some("OK"));
    }
}
