//! User-Agent sent with login and session traffic.
//!
//! The portal gates its login form on a browser-looking client, so every
//! request from this crate carries the same fixed identifier. Keeping it in
//! one place means the login POST and the client default can never drift.

/// Fixed User-Agent for the login exchange and the session client.
pub const LOGIN_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
