//! Login inputs: where to post and who to log in as.

use std::fmt;

/// Username and password for the portal's login form.
///
/// The password never appears in `Debug` output, and neither field is ever
/// attached to a tracing span or event.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates credentials from a username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

// Custom Debug impl that redacts the password.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Endpoints involved in a login.
///
/// `login_url` receives the POST. `base_url` is only echoed back as the
/// `Referer` header, which the portal checks before accepting the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTarget {
    login_url: String,
    base_url: String,
}

impl SessionTarget {
    /// Creates a target from the login endpoint and the portal's base URL.
    pub fn new(login_url: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            login_url: login_url.into(),
            base_url: base_url.into(),
        }
    }

    /// Endpoint that receives the login form.
    #[must_use]
    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    /// Value sent as the `Referer` header.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
