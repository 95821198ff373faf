//! Authenticators for the `AUTHENTICATE` handshake.
//!
//! The connection asks the authenticator for an initial token once, sends it
//! as `AUTH_RESPONSE`, and expects `AUTH_SUCCESS`. Multi-step SASL exchanges
//! (`AUTH_CHALLENGE`) are not supported.
//!
//! # Example
//!
//! ```
//! use cqlwire_client::auth::{Authenticator, PasswordAuthenticator};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let auth = PasswordAuthenticator::new("cassandra", "cassandra");
//! let token = auth.initial_response(&[]).await.unwrap();
//! assert_eq!(&token[..], b"\0cassandra\0cassandra");
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{CqlError, Result};

/// Server-side authenticator class this client can answer.
pub const PASSWORD_AUTHENTICATOR: &str = "org.apache.cassandra.auth.PasswordAuthenticator";

/// Boxed future for authenticator results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Produces the token sent in `AUTH_RESPONSE`.
///
/// The future may suspend, for example to prompt for or derive a credential.
pub trait Authenticator: Send + Sync {
    /// Return the response to `challenge` (empty for the initial response).
    fn initial_response<'a>(&'a self, challenge: &'a [u8]) -> BoxFuture<'a, Result<Bytes>>;
}

/// SASL PLAIN credentials for `PasswordAuthenticator`.
#[derive(Clone)]
pub struct PasswordAuthenticator {
    username: String,
    password: String,
}

impl PasswordAuthenticator {
    /// Create from a username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The configured username.
    pub fn username(&self) -> &str {
        &self.username
    }

    fn token(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(2 + self.username.len() + self.password.len());
        buf.put_u8(0);
        buf.put_slice(self.username.as_bytes());
        buf.put_u8(0);
        buf.put_slice(self.password.as_bytes());
        buf.freeze()
    }
}

impl std::fmt::Debug for PasswordAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordAuthenticator")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Authenticator for PasswordAuthenticator {
    fn initial_response<'a>(&'a self, _challenge: &'a [u8]) -> BoxFuture<'a, Result<Bytes>> {
        let token = self.token();
        Box::pin(async move { Ok(token) })
    }
}

/// Authenticator for servers that never ask for credentials.
///
/// Fails if the server does send `AUTHENTICATE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuthenticator;

impl Authenticator for NoAuthenticator {
    fn initial_response<'a>(&'a self, _challenge: &'a [u8]) -> BoxFuture<'a, Result<Bytes>> {
        Box::pin(async {
            Err(CqlError::Protocol(
                "server requested authentication but no credentials were configured".to_string(),
            ))
        })
    }
}
