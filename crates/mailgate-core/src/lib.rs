//! MailGate Core - mail-proxy auth decisions
//!
//! This crate turns a mail proxy's auth query (claimed credentials, SMTP
//! envelope, protocol) into an authorization decision, and encodes that
//! decision back into the response headers the proxy acts on.

pub mod codec;
pub mod directory;
pub mod domain;
pub mod engine;
pub mod request;
pub mod response;

pub use directory::{Directory, DirectoryError, MemoryDirectory, UserRecord};
pub use engine::{AuthDecision, AuthEngine, Outcome};
pub use request::{AuthRequest, Protocol};
pub use response::{encode, AuthResponse};
