//! Login form field extraction
//!
//! The identity provider has no JSON login API. Its login page is a server
//! rendered form whose action URL carries the two correlation values that the
//! credential POST must echo back. This module is the only place that looks
//! at markup.

use reqwest::Url;
use scraper::{Html, Selector};

use crate::error::AuthError;
use crate::models::CorrelationTokens;

/// Fixed id of the provider's login form
pub const LOGIN_FORM_ID: &str = "kc-form-login";

/// Base used to resolve relative form actions
const RELATIVE_ACTION_BASE: &str = "http://localhost/";

/// Extract `session_code` and `tab_id` from the login page
///
/// # Arguments
/// - `html`: raw body of the authorization page
///
/// # Returns
/// Both correlation tokens, or `AuthError::LoginFormNotFound` if the form,
/// its action attribute, or either query parameter is missing. Partial data
/// is never returned.
pub fn extract_correlation_tokens(html: &str) -> Result<CorrelationTokens, AuthError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(&format!("#{}", LOGIN_FORM_ID))
        .map_err(|e| AuthError::LoginFormNotFound(format!("bad selector: {:?}", e)))?;

    let mut candidates = document.select(&selector).peekable();
    if candidates.peek().is_none() {
        return Err(AuthError::LoginFormNotFound(format!(
            "no element with id '{}'",
            LOGIN_FORM_ID
        )));
    }

    let form = candidates
        .find(|element| element.value().name().eq_ignore_ascii_case("form"))
        .ok_or_else(|| {
            AuthError::LoginFormNotFound(format!("'{}' is not a form element", LOGIN_FORM_ID))
        })?;

    let action = form
        .value()
        .attr("action")
        .map(str::trim)
        .filter(|action| !action.is_empty())
        .ok_or_else(|| AuthError::LoginFormNotFound("form has no action URL".to_string()))?;

    let base = Url::parse(RELATIVE_ACTION_BASE)
        .map_err(|e| AuthError::LoginFormNotFound(format!("bad base URL: {}", e)))?;
    let action_url = Url::options()
        .base_url(Some(&base))
        .parse(action)
        .map_err(|e| AuthError::LoginFormNotFound(format!("malformed action URL: {}", e)))?;

    let session_code = query_value(&action_url, "session_code")?;
    let tab_id = query_value(&action_url, "tab_id")?;

    Ok(CorrelationTokens {
        session_code,
        tab_id,
    })
}

fn query_value(url: &Url, key: &str) -> Result<String, AuthError> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AuthError::LoginFormNotFound(format!("action URL has no {}", key)))
}
