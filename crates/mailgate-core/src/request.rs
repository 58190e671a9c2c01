//! Auth protocol request parsing
//!
//! The proxy asks its question entirely through request headers:
//!
//! ```text
//! GET /auth HTTP/1.0
//! Auth-Method: plain
//! Auth-User: user
//! Auth-Pass: password
//! Auth-Protocol: imap
//! Auth-Login-Attempt: 1
//! Client-IP: 192.0.2.42
//! ```
//!
//! Absent optional headers are tolerated and default to empty values;
//! parsing never fails.

use http::HeaderMap;
use mailgate_common::Config;

/// Mail protocol named in `Auth-Protocol`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Imap,
    Pop3,
    Smtp,
    Unknown,
}

impl Protocol {
    /// Exact, case-sensitive match on the wire values. Anything else is
    /// `Unknown` and gets no `Auth-Port` in the response.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "imap" => Protocol::Imap,
            "pop3" => Protocol::Pop3,
            "smtp" => Protocol::Smtp,
            _ => Protocol::Unknown,
        }
    }

    /// Backend port the proxy should connect to for this protocol
    pub fn port(self) -> Option<u16> {
        match self {
            Protocol::Pop3 => Some(110),
            Protocol::Imap => Some(143),
            Protocol::Smtp => Some(25),
            Protocol::Unknown => None,
        }
    }
}

/// One auth query, parsed from the proxy's request headers.
///
/// `encoded_user` and `encoded_password` are kept exactly as received;
/// decoded values are derived by the engine and never written back here.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub encoded_user: String,
    pub encoded_password: String,
    pub protocol: Protocol,
    pub login_attempt: String,
    pub client_ip: String,
    /// Raw `Mail From:<addr>` style envelope sender, when present
    pub smtp_from: Option<String>,
    /// Raw `Rcpt To:<addr>` style envelope recipient, when present
    pub smtp_to: Option<String>,
    pub debug_requested: bool,
}

impl AuthRequest {
    /// Parse an auth query from the request headers. Missing headers become
    /// empty values; this never errors.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let debug_requested = header_str(headers, "x-auth-debug")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            encoded_user: header_str(headers, "auth-user").unwrap_or_default().to_string(),
            encoded_password: header_str(headers, "auth-pass").unwrap_or_default().to_string(),
            protocol: Protocol::parse(header_str(headers, "auth-protocol").unwrap_or_default()),
            login_attempt: header_str(headers, "auth-login-attempt")
                .unwrap_or_default()
                .to_string(),
            client_ip: header_str(headers, "client-ip").unwrap_or_default().to_string(),
            smtp_from: header_str(headers, "auth-smtp-from").map(str::to_string),
            smtp_to: header_str(headers, "auth-smtp-to").map(str::to_string),
            debug_requested,
        }
    }

    /// Anonymous queries carry neither user nor password; the proxy sends
    /// them for inbound SMTP delivery (`smtp_auth none`).
    pub fn is_anonymous(&self) -> bool {
        self.encoded_user.is_empty() && self.encoded_password.is_empty()
    }

    /// Whether diagnostic dumps are active for this request
    pub fn debug_active(&self, config: &Config) -> bool {
        config.debug || self.debug_requested
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Render the full header set for a diagnostic dump, with the password
/// value masked. The mask is mandatory: this is the only way request
/// headers may be logged wholesale.
pub fn masked_headers(headers: &HeaderMap) -> String {
    let mut parts = Vec::with_capacity(headers.len());
    for (name, value) in headers {
        if name.as_str() == "auth-pass" {
            parts.push(format!("{}: ***", name));
        } else {
            parts.push(format!("{}: {}", name, value.to_str().unwrap_or("<binary>")));
        }
    }
    format!("{{{}}}", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use pretty_assertions::assert_eq;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_parse_full_request() {
        let req = AuthRequest::from_headers(&headers(&[
            ("Auth-User", "peter%40example.com"),
            ("Auth-Pass", "secret"),
            ("Auth-Protocol", "imap"),
            ("Auth-Login-Attempt", "1"),
            ("Client-IP", "192.0.2.42"),
        ]));

        assert_eq!(req.encoded_user, "peter%40example.com");
        assert_eq!(req.encoded_password, "secret");
        assert_eq!(req.protocol, Protocol::Imap);
        assert_eq!(req.login_attempt, "1");
        assert_eq!(req.client_ip, "192.0.2.42");
        assert_eq!(req.smtp_from, None);
        assert_eq!(req.smtp_to, None);
        assert!(!req.is_anonymous());
        assert!(!req.debug_requested);
    }

    #[test]
    fn test_missing_headers_default_to_empty() {
        let req = AuthRequest::from_headers(&HeaderMap::new());
        assert_eq!(req.encoded_user, "");
        assert_eq!(req.encoded_password, "");
        assert_eq!(req.protocol, Protocol::Unknown);
        assert!(req.is_anonymous());
    }

    #[test]
    fn test_protocol_is_case_sensitive() {
        assert_eq!(Protocol::parse("imap"), Protocol::Imap);
        assert_eq!(Protocol::parse("IMAP"), Protocol::Unknown);
        assert_eq!(Protocol::parse("pop3"), Protocol::Pop3);
        assert_eq!(Protocol::parse("smtp"), Protocol::Smtp);
        assert_eq!(Protocol::parse("submission"), Protocol::Unknown);
        assert_eq!(Protocol::parse(""), Protocol::Unknown);
    }

    #[test]
    fn test_protocol_ports() {
        assert_eq!(Protocol::Pop3.port(), Some(110));
        assert_eq!(Protocol::Imap.port(), Some(143));
        assert_eq!(Protocol::Smtp.port(), Some(25));
        assert_eq!(Protocol::Unknown.port(), None);
    }

    #[test]
    fn test_debug_override_header() {
        let req = AuthRequest::from_headers(&headers(&[("X-Auth-Debug", "TRUE")]));
        assert!(req.debug_requested);

        let req = AuthRequest::from_headers(&headers(&[("X-Auth-Debug", "1")]));
        assert!(!req.debug_requested);
    }

    #[test]
    fn test_masked_headers_hides_password() {
        let dump = masked_headers(&headers(&[
            ("Auth-User", "bob"),
            ("Auth-Pass", "hunter2"),
        ]));
        assert!(dump.contains("auth-user: bob"));
        assert!(dump.contains("auth-pass: ***"));
        assert!(!dump.contains("hunter2"));
    }
}
