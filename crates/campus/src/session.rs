//! Admin login and the session gate
//!
//! The admin area is guarded by a single cookie. Logging in with the
//! configured credentials sets `session=true`; the gate only checks that the
//! cookie is present. There is no expiry and no per-user identity.
//!
//! Passwords may be configured as an argon2 PHC hash or as plaintext.
//! Plaintext is compared through SHA-256 digests so the comparison does not
//! short-circuit on the first differing byte of the secret.

use std::fmt;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::{Error, Result};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Value stored in the session cookie after a successful login
pub const SESSION_VALUE: &str = "true";

/// Login page
pub const LOGIN_PATH: &str = "/login";

/// Admin dashboard, and prefix of every gated path
pub const ADMIN_PATH: &str = "/admin";

/// What the gate does with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Let the request through
    Allow,
    /// Send the client elsewhere
    Redirect(&'static str),
}

/// Whether `path` is part of the admin area
#[must_use]
pub fn is_admin_path(path: &str) -> bool {
    path == ADMIN_PATH
        || path
            .strip_prefix(ADMIN_PATH)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Decide a request from its path and whether the session cookie is present.
///
/// ```rust
/// use campus::session::{gate, GateDecision};
///
/// assert_eq!(gate("/admin/events", false), GateDecision::Redirect("/login"));
/// assert_eq!(gate("/login", true), GateDecision::Redirect("/admin"));
/// assert_eq!(gate("/events", false), GateDecision::Allow);
/// ```
#[must_use]
pub fn gate(path: &str, has_session: bool) -> GateDecision {
    if !has_session && is_admin_path(path) {
        GateDecision::Redirect(LOGIN_PATH)
    } else if has_session && path == LOGIN_PATH {
        GateDecision::Redirect(ADMIN_PATH)
    } else {
        GateDecision::Allow
    }
}

#[derive(Clone)]
enum Secret {
    /// argon2 PHC string
    Hashed(String),
    Plain(String),
}

/// The configured admin username and password
#[derive(Clone)]
pub struct AdminCredentials {
    username: String,
    secret: Secret,
}

impl AdminCredentials {
    /// Credentials with a plaintext password
    pub fn plain(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: Secret::Plain(password.into()),
        }
    }

    /// Credentials with an argon2 PHC password hash.
    ///
    /// Fails if `phc` is not a parseable PHC string.
    pub fn hashed(username: impl Into<String>, phc: impl Into<String>) -> Result<Self> {
        let phc = phc.into();
        PasswordHash::new(&phc)
            .map_err(|e| Error::config(format!("invalid admin password hash: {e}")))?;
        Ok(Self {
            username: username.into(),
            secret: Secret::Hashed(phc),
        })
    }

    /// The admin username
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Whether the password is stored as plaintext
    #[must_use]
    pub const fn is_plaintext(&self) -> bool {
        matches!(self.secret, Secret::Plain(_))
    }

    /// Check a submitted username and password
    #[must_use]
    pub fn verify(&self, username: &str, password: &str) -> bool {
        let username_ok = digest_eq(username, &self.username);
        let password_ok = match &self.secret {
            Secret::Plain(expected) => digest_eq(password, expected),
            Secret::Hashed(phc) => match PasswordHash::new(phc) {
                Ok(hash) => Argon2::default()
                    .verify_password(password.as_bytes(), &hash)
                    .is_ok(),
                Err(e) => {
                    warn!(error = %e, "Stored admin password hash is unreadable");
                    false
                }
            },
        };
        username_ok && password_ok
    }
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("plaintext", &self.is_plaintext())
            .finish_non_exhaustive()
    }
}

/// Hash a password into an argon2 PHC string for `ADMIN_PASSWORD_HASH`
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::config(format!("failed to hash password: {e}")))
}

fn digest_eq(a: &str, b: &str) -> bool {
    Sha256::digest(a.as_bytes()) == Sha256::digest(b.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_redirects() {
        assert_eq!(gate("/admin", false), GateDecision::Redirect(LOGIN_PATH));
        assert_eq!(
            gate("/admin/projects/new", false),
            GateDecision::Redirect(LOGIN_PATH)
        );
        assert_eq!(gate("/admin", true), GateDecision::Allow);
        assert_eq!(gate("/login", true), GateDecision::Redirect(ADMIN_PATH));
        assert_eq!(gate("/login", false), GateDecision::Allow);
    }

    #[test]
    fn test_gate_ignores_lookalike_paths() {
        assert_eq!(gate("/administrator", false), GateDecision::Allow);
        assert_eq!(gate("/events", false), GateDecision::Allow);
        assert_eq!(gate("/login/help", true), GateDecision::Allow);
    }

    #[test]
    fn test_plain_credentials() {
        let creds = AdminCredentials::plain("admin", "s3cret");
        assert!(creds.is_plaintext());
        assert!(creds.verify("admin", "s3cret"));
        assert!(!creds.verify("admin", "s3cret "));
        assert!(!creds.verify("Admin", "s3cret"));
        assert!(!creds.verify("", ""));
    }

    #[test]
    fn test_hashed_credentials() {
        let phc = hash_password("correct horse").unwrap();
        let creds = AdminCredentials::hashed("admin", phc).unwrap();

        assert!(!creds.is_plaintext());
        assert!(creds.verify("admin", "correct horse"));
        assert!(!creds.verify("admin", "battery staple"));
    }

    #[test]
    fn test_rejects_bad_hash() {
        assert!(AdminCredentials::hashed("admin", "not a phc string").is_err());
    }

    #[test]
    fn test_debug_hides_password() {
        let creds = AdminCredentials::plain("admin", "hunter2");
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
