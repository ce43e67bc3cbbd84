//! Identity provider login
//!
//! - `login_form` - scrapes the correlation tokens out of the login page
//! - `client` - runs the login / token exchange / logout calls

pub mod client;
pub mod login_form;

pub use client::{extract_authorization_code, AuthClient};
pub use login_form::extract_correlation_tokens;
