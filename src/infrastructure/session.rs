//! HTTP session - infrastructure layer
//!
//! Owns the only scarce resources of a workflow run (cookie jar and
//! connection pool) and exposes them as capabilities

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::redirect::Policy;
use reqwest::{Client, Url};

use crate::error::AppResult;

/// Default bound on every outbound request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP session
///
/// Responsibilities:
/// - Holds one cookie jar for the whole run
/// - Hands out a redirect-following client and a no-redirect client, both
///   backed by that jar
/// - Knows nothing about AISR, schools or tokens
///
/// Created by the workflow executor at the start of a run and dropped once
/// logout has been attempted.
pub struct Session {
    client: Client,
    no_redirect_client: Client,
    cookies: Arc<Jar>,
}

impl Session {
    /// Create a new session whose requests all time out after `timeout`
    pub fn new(timeout: Duration) -> AppResult<Self> {
        let cookies = Arc::new(Jar::default());

        let client = Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .timeout(timeout)
            .build()?;

        let no_redirect_client = Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .redirect(Policy::none())
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            no_redirect_client,
            cookies,
        })
    }

    /// Client that follows redirects
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Client that hands 3xx responses back to the caller
    pub fn no_redirect_client(&self) -> &Client {
        &self.no_redirect_client
    }

    /// Whether the jar would send a cookie named `name` to `url`
    pub fn has_cookie(&self, url: &Url, name: &str) -> bool {
        let Some(header) = self.cookies.cookies(url) else {
            return false;
        };
        let Ok(header) = header.to_str() else {
            return false;
        };
        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .any(|(key, _)| key == name)
    }
}
