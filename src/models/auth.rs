//! Authentication data carried between the login steps

use secrecy::SecretString;

/// AISR login credentials
///
/// Held only for the duration of a workflow run. The password is wrapped in
/// `SecretString` so it never shows up in `Debug` output.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Outcome of one login attempt
///
/// `access_token` is `Some` only when `is_successful` is true.
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub is_successful: bool,
    pub message: String,
    pub access_token: Option<SecretString>,
}

impl AuthResult {
    pub fn success(access_token: SecretString) -> Self {
        Self {
            is_successful: true,
            message: "Logged in successfully".to_string(),
            access_token: Some(access_token),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            is_successful: false,
            message: message.into(),
            access_token: None,
        }
    }
}

/// Correlation values scraped from the login form's action URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationTokens {
    pub session_code: String,
    pub tab_id: String,
}
