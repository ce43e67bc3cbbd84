use thiserror::Error;

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication against the identity provider failed
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// CSV transform error
    #[error("etl error: {0}")]
    Etl(#[from] EtlError),
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// True for failures that mean the workflow never got a usable session.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, AppError::Auth(_))
    }
}

// ========== Authentication ==========

/// Identity provider errors
///
/// Rejected credentials are not an error of the authentication client itself:
/// `login` reports them as an unsuccessful `AuthResult`. `AuthenticationFailed`
/// is raised by the workflow executor once it has seen that result.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The authorization page did not contain a usable login form
    #[error("login form not found: {0}")]
    LoginFormNotFound(String),
    /// The credential response redirected without an authorization code
    #[error("authorization code not found: {0}")]
    CodeNotFound(String),
    /// The token endpoint answered with a non-success status
    #[error("token request failed with status {status}: {body}")]
    TokenRequestFailed { status: u16, body: String },
    /// The token endpoint answered 2xx but the body was unusable
    #[error("invalid token response: {0}")]
    InvalidTokenResponse(String),
    /// Credentials rejected or identity cookie absent
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    /// The logout endpoint answered with a non-success status
    #[error("logout failed with status {status}")]
    LogoutFailed { status: u16 },
    /// Network-level failure (including timeouts) during a login step
    #[error("{step} request failed: {source}")]
    Request {
        step: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl AuthError {
    pub fn request(step: &'static str, source: reqwest::Error) -> Self {
        AuthError::Request { step, source }
    }
}

// ========== Actions ==========

/// Failure of one workflow action, tagged with the target it ran for
#[derive(Debug, Clone, Error)]
#[error("action for {target} failed: {message}")]
pub struct ActionError {
    pub target: String,
    pub message: String,
}

impl ActionError {
    pub fn new(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            message: message.into(),
        }
    }
}

/// Attaches a target identifier to any displayable error
pub trait ActionResultExt<T> {
    fn for_target(self, target: &str, what: &str) -> Result<T, ActionError>;
}

impl<T, E: std::fmt::Display> ActionResultExt<T> for Result<T, E> {
    fn for_target(self, target: &str, what: &str) -> Result<T, ActionError> {
        self.map_err(|e| ActionError::new(target, format!("{}: {}", what, e)))
    }
}

// ========== Configuration ==========

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: String },
    #[error("failed to parse config file {path}: {reason}")]
    ParseFailed { path: String, reason: String },
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("missing API URLs in configuration")]
    MissingApiUrls,
    #[error("no valid schools to process")]
    NoValidSchools,
    #[error("no query file found at {path} for {school}")]
    QueryFileNotFound { school: String, path: String },
    #[error("missing folder in configuration: {name}")]
    MissingFolder { name: &'static str },
    #[error("folder does not exist: {path}")]
    FolderNotFound { path: String },
}

// ========== ETL ==========

#[derive(Debug, Error)]
pub enum EtlError {
    #[error("failed to read {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("failed to write {path}: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("{path} is missing required column {column}")]
    MissingColumn { path: String, column: &'static str },
    #[error("unrecognized vaccination date '{value}' in {path}")]
    InvalidDate { path: String, value: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ========== Result alias ==========

/// Application result type
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_target_tags_the_error() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ));
        let err = result.for_target("1234", "read query file").unwrap_err();
        assert_eq!(err.target, "1234");
        assert_eq!(err.message, "read query file: no such file");
        assert_eq!(
            err.to_string(),
            "action for 1234 failed: read query file: no such file"
        );
    }

    #[test]
    fn token_failure_display_carries_status_and_body() {
        let err = AuthError::TokenRequestFailed {
            status: 400,
            body: "invalid_request".into(),
        };
        assert_eq!(
            err.to_string(),
            "token request failed with status 400: invalid_request"
        );
        assert!(AppError::from(err).is_authentication_failure());
    }

    #[test]
    fn only_auth_errors_count_as_authentication_failures() {
        let io = || std::io::Error::new(std::io::ErrorKind::Other, "disk");
        let errors = vec![
            AppError::Auth(AuthError::CodeNotFound("no Location".into())),
            AppError::Config(ConfigError::MissingApiUrls),
            AppError::Etl(EtlError::Io(io())),
            AppError::Io(io()),
        ];

        for err in errors {
            let expected = match &err {
                AppError::Auth(_) => true,
                AppError::Config(_) | AppError::Etl(_) | AppError::Http(_) | AppError::Io(_) => false,
            };
            assert_eq!(err.is_authentication_failure(), expected, "{}", err);
        }
    }
}
