//! Built-in collaborator service contracts.
//!
//! These are the narrow surfaces the dispatch core wires at startup:
//! configuration setters and opaque operations only. Storage, transport
//! and cryptographic internals belong to the hosting application, not to
//! this core.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Deserialize;

/// Configuration sub-tree for the cookie service (`services.Cookie`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CookieConfig {
    /// Cookie domain attribute.
    pub domain: String,
    /// Cookie path attribute.
    pub path: String,
    /// Secure flag.
    pub secure: bool,
    /// HttpOnly flag.
    pub http_only: bool,
}

/// Cookie attribute holder.
#[derive(Debug, Clone, Default)]
pub struct CookieService {
    domain: String,
    path: String,
    secure: bool,
    http_only: bool,
}

impl CookieService {
    /// Creates a cookie service with empty attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a configuration sub-tree wholesale.
    pub fn configure(&mut self, config: &CookieConfig) {
        self.set_domain(&config.domain);
        self.set_path(&config.path);
        self.set_secure(config.secure);
        self.set_http_only(config.http_only);
    }

    /// Sets the domain attribute.
    pub fn set_domain(&mut self, domain: &str) {
        self.domain = domain.to_string();
    }

    /// Sets the path attribute.
    pub fn set_path(&mut self, path: &str) {
        self.path = path.to_string();
    }

    /// Sets the secure flag.
    pub fn set_secure(&mut self, secure: bool) {
        self.secure = secure;
    }

    /// Sets the HttpOnly flag.
    pub fn set_http_only(&mut self, http_only: bool) {
        self.http_only = http_only;
    }

    /// The domain attribute.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The path attribute.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The secure flag.
    #[must_use]
    pub fn secure(&self) -> bool {
        self.secure
    }

    /// The HttpOnly flag.
    #[must_use]
    pub fn http_only(&self) -> bool {
        self.http_only
    }
}

/// Configuration sub-tree for the session service (`services.Session`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session cookie name.
    pub name: String,
    /// Session storage directory.
    pub dir: String,
    /// Garbage-collection probability numerator.
    pub gc_probability: u32,
    /// Garbage-collection lifetime in seconds.
    pub gc_lifetime: u64,
    /// Garbage-collection probability divisor.
    pub gc_divisor: u32,
}

/// Session configuration holder: session attributes plus the cookie
/// attributes sessions are written with.
#[derive(Debug, Clone, Default)]
pub struct SessionService {
    name: String,
    dir: String,
    gc_probability: u32,
    gc_lifetime: u64,
    gc_divisor: u32,
    cookie: CookieService,
}

impl SessionService {
    /// Creates a session service with empty attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the session configuration sub-tree.
    pub fn configure(&mut self, config: &SessionConfig) {
        self.set_name(&config.name);
        self.set_dir(&config.dir);
        self.set_gc_probability(config.gc_probability);
        self.set_gc_lifetime(config.gc_lifetime);
        self.set_gc_divisor(config.gc_divisor);
    }

    /// Applies the shared cookie attributes.
    pub fn configure_cookie(&mut self, config: &CookieConfig) {
        self.cookie.configure(config);
    }

    /// Sets the session cookie name.
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Sets the session storage directory.
    pub fn set_dir(&mut self, dir: &str) {
        self.dir = dir.to_string();
    }

    /// Sets the garbage-collection probability numerator.
    pub fn set_gc_probability(&mut self, probability: u32) {
        self.gc_probability = probability;
    }

    /// Sets the garbage-collection lifetime in seconds.
    pub fn set_gc_lifetime(&mut self, lifetime: u64) {
        self.gc_lifetime = lifetime;
    }

    /// Sets the garbage-collection probability divisor.
    pub fn set_gc_divisor(&mut self, divisor: u32) {
        self.gc_divisor = divisor;
    }

    /// The session cookie name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The session storage directory.
    #[must_use]
    pub fn dir(&self) -> &str {
        &self.dir
    }

    /// The cookie attributes sessions are written with.
    #[must_use]
    pub fn cookie(&self) -> &CookieService {
        &self.cookie
    }

    /// Garbage-collection parameters as `(probability, lifetime, divisor)`.
    #[must_use]
    pub fn gc(&self) -> (u32, u64, u32) {
        (self.gc_probability, self.gc_lifetime, self.gc_divisor)
    }
}

/// Opaque token issue/verify operations.
///
/// Token generation internals are a collaborator concern; this core only
/// guarantees that issued tokens are distinct within a process and that
/// verification compares without early exit.
#[derive(Debug, Default)]
pub struct TokenService {
    counter: AtomicU64,
}

impl TokenService {
    /// Creates a token service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh opaque token.
    pub fn issue(&self) -> String {
        let nonce = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{:016x}", nonce.wrapping_mul(0x9e37_79b9_7f4a_7c15) ^ 0x5bf0_3635)
    }

    /// Verifies a presented token against the expected one.
    #[must_use]
    pub fn verify(&self, presented: &str, expected: &str) -> bool {
        if presented.len() != expected.len() {
            return false;
        }
        presented
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

/// Configuration sub-tree for the CSRF service (`services.Csrf`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Form-field / storage name for CSRF tokens.
    pub name: String,
    /// Maximum number of tokens kept per session.
    pub max: usize,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            name: "csrf".to_string(),
            max: 5,
        }
    }
}

/// CSRF token operations, built on the token and session services.
#[derive(Debug)]
pub struct CsrfService {
    name: String,
    max: usize,
    token: Arc<TokenService>,
    #[allow(dead_code)]
    session: Arc<SessionService>,
}

impl CsrfService {
    /// Creates a CSRF service over its collaborator services.
    #[must_use]
    pub fn new(token: Arc<TokenService>, session: Arc<SessionService>) -> Self {
        Self {
            name: CsrfConfig::default().name,
            max: CsrfConfig::default().max,
            token,
            session,
        }
    }

    /// Applies the CSRF configuration sub-tree.
    pub fn configure(&mut self, config: &CsrfConfig) {
        self.set_name(&config.name);
        self.set_max(config.max);
    }

    /// Sets the token name.
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Sets the per-session token cap.
    pub fn set_max(&mut self, max: usize) {
        self.max = max;
    }

    /// The token name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The per-session token cap.
    #[must_use]
    pub fn max(&self) -> usize {
        self.max
    }

    /// Issues a CSRF token.
    pub fn issue(&self) -> String {
        self.token.issue()
    }

    /// Verifies a presented CSRF token.
    #[must_use]
    pub fn verify(&self, presented: &str, expected: &str) -> bool {
        self.token.verify(presented, expected)
    }
}

/// The error-reporting collaborator.
///
/// When a service named `ErrorReporter` is registered, the orchestrator
/// resolves it eagerly once at the end of startup: constructing the
/// reporter is what installs process-wide error handling. Afterwards the
/// dispatch surfaces per-request pipeline failures through
/// [`ErrorReporter::report`].
pub trait ErrorReporter: Send + Sync {
    /// Reports a request-processing failure.
    fn report(&self, error: &(dyn std::error::Error + 'static));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_configure_applies_all_attributes() {
        let mut cookie = CookieService::new();
        cookie.configure(&CookieConfig {
            domain: "example.com".to_string(),
            path: "/app".to_string(),
            secure: true,
            http_only: true,
        });

        assert_eq!(cookie.domain(), "example.com");
        assert_eq!(cookie.path(), "/app");
        assert!(cookie.secure());
        assert!(cookie.http_only());
    }

    #[test]
    fn session_carries_its_own_cookie_attributes() {
        let mut session = SessionService::new();
        session.configure(&SessionConfig {
            name: "SID".to_string(),
            dir: "/tmp/sessions".to_string(),
            gc_probability: 1,
            gc_lifetime: 1440,
            gc_divisor: 100,
        });
        session.configure_cookie(&CookieConfig {
            domain: "example.com".to_string(),
            ..CookieConfig::default()
        });

        assert_eq!(session.name(), "SID");
        assert_eq!(session.gc(), (1, 1440, 100));
        assert_eq!(session.cookie().domain(), "example.com");
    }

    #[test]
    fn tokens_are_distinct_and_verify() {
        let token = TokenService::new();
        let a = token.issue();
        let b = token.issue();

        assert_ne!(a, b);
        assert!(token.verify(&a, &a));
        assert!(!token.verify(&a, &b));
        assert!(!token.verify(&a, &a[1..]));
    }

    #[test]
    fn csrf_delegates_to_its_token_service() {
        let token = Arc::new(TokenService::new());
        let session = Arc::new(SessionService::new());
        let mut csrf = CsrfService::new(token, session);
        csrf.configure(&CsrfConfig {
            name: "form_token".to_string(),
            max: 3,
        });

        assert_eq!(csrf.name(), "form_token");
        assert_eq!(csrf.max(), 3);

        let issued = csrf.issue();
        assert!(csrf.verify(&issued, &issued));
        assert!(!csrf.verify(&issued, "other"));
    }
}
