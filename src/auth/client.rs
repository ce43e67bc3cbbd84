//! AISR authentication client
//!
//! Drives the identity provider's browser-first login headlessly:
//!
//! 1. GET the authorization page and scrape the correlation tokens
//! 2. POST the credentials without following redirects
//! 3. Success = redirect status + identity cookie in the jar
//! 4. Read the authorization code from the redirect's `Location`
//! 5. Exchange the code for a bearer token
//!
//! Logout is a separate call made by the workflow executor.

use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::auth::login_form::extract_correlation_tokens;
use crate::error::{AuthError, ConfigError};
use crate::infrastructure::Session;
use crate::models::{AuthResult, CorrelationTokens, Credentials};
use crate::utils::logging::truncate_text;

// ========== Provider constants ==========

/// Realm path below the configured auth base URL
pub const REALM_PATH: &str = "auth/realms/idepc-aisr-realm";

/// Client identifier registered with the provider
pub const CLIENT_ID: &str = "aisr-app";

/// Redirect URI registered for `CLIENT_ID`
pub const REDIRECT_URI: &str = "https://aisr.web.health.state.mn.us/home";

/// Execution id of the provider's username/password authenticator
pub const LOGIN_EXECUTION_ID: &str = "084dee30-925f-4a8f-829d-7a372e38d0de";

/// Cookie the provider sets once the credentials are accepted
pub const IDENTITY_COOKIE: &str = "KEYCLOAK_IDENTITY";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Base used to resolve a relative `Location` header
const RELATIVE_LOCATION_BASE: &str = "http://localhost/";

/// Response from the token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    token_type: String,
}

/// AISR authentication client
///
/// Stateless apart from the realm URL; all cookie state lives in the
/// `Session` passed to each call.
#[derive(Debug, Clone)]
pub struct AuthClient {
    realm_url: Url,
}

impl AuthClient {
    /// Create a client for the provider at `auth_base_url`
    ///
    /// # Arguments
    /// - `auth_base_url`: provider root, e.g. `https://authenticator4.web.health.state.mn.us`
    pub fn new(auth_base_url: &str) -> Result<Self, ConfigError> {
        let raw = format!("{}/{}", auth_base_url.trim_end_matches('/'), REALM_PATH);
        let realm_url = Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;

        if realm_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl {
                url: raw,
                reason: "not a hierarchical URL".to_string(),
            });
        }

        Ok(Self { realm_url })
    }

    /// Log in and obtain a bearer token
    ///
    /// # Returns
    /// - `Ok(AuthResult)` with `is_successful == false` when the provider
    ///   rejects the credentials or the identity cookie is missing
    /// - `Ok(AuthResult)` with a token when every step succeeds
    /// - `Err(AuthError)` for protocol breakage: no login form, no code in the
    ///   redirect, failed token exchange, or a network error
    pub async fn login(
        &self,
        session: &Session,
        credentials: &Credentials,
    ) -> Result<AuthResult, AuthError> {
        info!("🔐 Logging into AISR with username {}", credentials.username);

        let tokens = self.request_correlation_tokens(session).await?;

        let authenticate_url = self.authenticate_url(&tokens);
        let response = self
            .submit_credentials(session, &authenticate_url, credentials)
            .await?;

        let status = response.status();
        if !status.is_redirection() || !session.has_cookie(&authenticate_url, IDENTITY_COOKIE) {
            error!(
                "Login failed or {} cookie is missing (status {})",
                IDENTITY_COOKIE, status
            );
            return Ok(AuthResult::failure(format!(
                "Login failed or {} cookie is missing",
                IDENTITY_COOKIE
            )));
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok());
        let code = extract_authorization_code(location)?;

        let access_token = self.exchange_code_for_token(session, &code).await?;

        info!("✓ Logged in successfully");
        Ok(AuthResult::success(access_token))
    }

    /// End the provider session
    ///
    /// Best effort: the caller decides what to do with an error.
    pub async fn logout(&self, session: &Session) -> Result<(), AuthError> {
        let mut url = self.endpoint(&["protocol", "openid-connect", "logout"]);
        url.query_pairs_mut().append_pair("client_id", CLIENT_ID);

        let response = session
            .client()
            .get(url)
            .send()
            .await
            .map_err(|e| AuthError::request("logout", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::LogoutFailed {
                status: status.as_u16(),
            });
        }

        info!("✓ Logged out of AISR");
        Ok(())
    }

    /// Step 1: fetch the login page and scrape `session_code` / `tab_id`
    async fn request_correlation_tokens(
        &self,
        session: &Session,
    ) -> Result<CorrelationTokens, AuthError> {
        let url = self.authorization_url();
        debug!("Requesting login page: {}", url.path());

        let body = session
            .client()
            .get(url)
            .send()
            .await
            .map_err(|e| AuthError::request("authorization page", e))?
            .text()
            .await
            .map_err(|e| AuthError::request("authorization page", e))?;

        extract_correlation_tokens(&body)
    }

    /// Step 2: POST the credentials; the redirect is returned, not followed
    async fn submit_credentials(
        &self,
        session: &Session,
        authenticate_url: &Url,
        credentials: &Credentials,
    ) -> Result<reqwest::Response, AuthError> {
        let password: String =
            url::form_urlencoded::byte_serialize(credentials.password.expose_secret().as_bytes())
                .collect();
        let payload = format!("password={}&username={}", password, credentials.username);

        session
            .no_redirect_client()
            .post(authenticate_url.clone())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(payload)
            .send()
            .await
            .map_err(|e| AuthError::request("credential submission", e))
    }

    /// Step 5: trade the single-use code for a bearer token
    async fn exchange_code_for_token(
        &self,
        session: &Session,
        code: &str,
    ) -> Result<SecretString, AuthError> {
        let url = self.endpoint(&["protocol", "openid-connect", "token"]);
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", REDIRECT_URI),
            ("client_id", CLIENT_ID),
        ];

        let response = session
            .no_redirect_client()
            .post(url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::request("token exchange", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                "Token request failed with status {}: {}",
                status,
                truncate_text(&body, 200)
            );
            return Err(AuthError::TokenRequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidTokenResponse(e.to_string()))?;

        debug!("Token endpoint issued a {} token", token.token_type);
        if token.access_token.is_empty() {
            return Err(AuthError::InvalidTokenResponse(
                "response has no access_token".to_string(),
            ));
        }

        Ok(SecretString::from(token.access_token))
    }

    // ========== URL helpers ==========

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.realm_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorization_url(&self) -> Url {
        let state = Uuid::new_v4().to_string();
        let nonce = Uuid::new_v4().to_string();

        let mut url = self.endpoint(&["protocol", "openid-connect", "auth"]);
        url.query_pairs_mut()
            .append_pair("client_id", CLIENT_ID)
            .append_pair("redirect_uri", REDIRECT_URI)
            .append_pair("state", &state)
            .append_pair("response_mode", "fragment")
            .append_pair("response_type", "code")
            .append_pair("scope", "openid")
            .append_pair("nonce", &nonce);
        url
    }

    fn authenticate_url(&self, tokens: &CorrelationTokens) -> Url {
        let mut url = self.endpoint(&["login-actions", "authenticate"]);
        url.query_pairs_mut()
            .append_pair("session_code", &tokens.session_code)
            .append_pair("execution", LOGIN_EXECUTION_ID)
            .append_pair("client_id", CLIENT_ID)
            .append_pair("tab_id", &tokens.tab_id);
        url
    }
}

/// Step 4: read the authorization code from a redirect target
///
/// The provider puts the code in the fragment (`response_mode=fragment`) but
/// the query is checked as well.
pub fn extract_authorization_code(location: Option<&str>) -> Result<String, AuthError> {
    let location = location.ok_or_else(|| {
        AuthError::CodeNotFound("response has no Location header".to_string())
    })?;

    let base = Url::parse(RELATIVE_LOCATION_BASE)
        .map_err(|e| AuthError::CodeNotFound(e.to_string()))?;
    let url = Url::options()
        .base_url(Some(&base))
        .parse(location)
        .map_err(|e| AuthError::CodeNotFound(format!("malformed Location header: {}", e)))?;

    url.fragment()
        .and_then(find_code)
        .or_else(|| url.query().and_then(find_code))
        .ok_or_else(|| {
            AuthError::CodeNotFound("no code in Location fragment or query".to_string())
        })
}

fn find_code(pairs: &str) -> Option<String> {
    url::form_urlencoded::parse(pairs.as_bytes())
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
