//! Action primitives - remote operations run inside a workflow
//!
//! Each action is a small value object bound to one school. It receives the
//! session and bearer token from the executor on every call and keeps nothing
//! between calls.

pub mod bulk_query;
pub mod download;

pub use bulk_query::{bulk_query_aisr, BulkQueryAction, S3UploadHeaders};
pub use download::{download_vaccination_records, get_latest_vaccination_url, DownloadAction};

use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};

/// `Authorization: Bearer <token>` with the value marked sensitive
pub(crate) fn bearer_header(access_token: &SecretString) -> Result<HeaderValue, String> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", access_token.expose_secret()))
        .map_err(|_| "access token is not a valid header value".to_string())?;
    value.set_sensitive(true);
    Ok(value)
}
