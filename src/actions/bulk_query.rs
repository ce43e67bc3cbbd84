//! Bulk query upload
//!
//! 1. Ask the API for a signed upload URL
//! 2. PUT the school's query file to it with the metadata headers AISR
//!    uses to route the query

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HOST};
use reqwest::Url;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::actions::bearer_header;
use crate::error::{ActionError, ActionResultExt};
use crate::infrastructure::Session;
use crate::models::SchoolQueryInformation;
use crate::utils::logging::truncate_text;
use crate::workflow::WorkflowAction;

const CSV_CONTENT_TYPE: &str = "text/csv";

/// District code AISR expects on every upload
const DISTRICT_ID: &str = "0197";

/// Request body for `/signing/puturl`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PutUrlRequest<'a> {
    file_path: &'a str,
    content_type: &'a str,
    school_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct PutUrlResponse {
    url: Option<String>,
}

/// Metadata headers sent with the file upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3UploadHeaders {
    pub classification: String,
    pub school_id: String,
    pub email_contact: String,
    pub content_type: &'static str,
    pub iddis: &'static str,
}

impl S3UploadHeaders {
    pub fn for_school(school: &SchoolQueryInformation) -> Self {
        Self {
            classification: school.classification.clone(),
            school_id: school.school_id.clone(),
            email_contact: school.email_contact.clone(),
            content_type: CSV_CONTENT_TYPE,
            iddis: DISTRICT_ID,
        }
    }
}

/// Upload one school's bulk query file
///
/// # Arguments
/// - `session`: the workflow's HTTP session
/// - `access_token`: bearer token from login
/// - `api_base_url`: AISR API root
/// - `school`: target school; must carry a query file path
pub async fn bulk_query_aisr(
    session: &Session,
    access_token: &SecretString,
    api_base_url: &str,
    school: &SchoolQueryInformation,
) -> Result<(), ActionError> {
    let target = school.school_id.as_str();
    let query_file = school
        .query_file_path
        .as_ref()
        .ok_or_else(|| ActionError::new(target, "query file path is not set"))?;
    let file_path = query_file.to_string_lossy();

    let signed_url =
        request_put_url(session, access_token, api_base_url, &file_path, target).await?;

    let payload = tokio::fs::read(query_file)
        .await
        .for_target(target, &format!("failed to read {}", file_path))?;

    put_file_to_s3(
        session,
        &signed_url,
        &S3UploadHeaders::for_school(school),
        payload,
    )
    .await
    .map_err(|message| ActionError::new(target, message))?;

    info!("✓ Uploaded bulk query for {}", school);
    Ok(())
}

async fn request_put_url(
    session: &Session,
    access_token: &SecretString,
    api_base_url: &str,
    file_path: &str,
    school_id: &str,
) -> Result<Url, ActionError> {
    let endpoint = format!("{}/signing/puturl", api_base_url.trim_end_matches('/'));
    let body = PutUrlRequest {
        file_path,
        content_type: CSV_CONTENT_TYPE,
        school_id,
    };

    let response = session
        .client()
        .post(endpoint)
        .header(
            AUTHORIZATION,
            bearer_header(access_token).map_err(|e| ActionError::new(school_id, e))?,
        )
        .json(&body)
        .send()
        .await
        .for_target(school_id, "signed URL request failed")?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(ActionError::new(
            school_id,
            format!(
                "signed URL request returned {}: {}",
                status.as_u16(),
                truncate_text(&text, 200)
            ),
        ));
    }

    let signed = response
        .json::<PutUrlResponse>()
        .await
        .for_target(school_id, "invalid signed URL response")?;

    let url = signed
        .url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ActionError::new(school_id, "signed URL response has no url"))?;

    Url::parse(&url).for_target(school_id, "malformed signed URL")
}

/// PUT the file bytes; anything but 200 is a failure carrying status and body
async fn put_file_to_s3(
    session: &Session,
    signed_url: &Url,
    headers: &S3UploadHeaders,
    payload: Vec<u8>,
) -> Result<(), String> {
    let host = signed_url
        .host_str()
        .map(|host| match signed_url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
        .ok_or_else(|| "signed URL has no host".to_string())?;

    let response = session
        .client()
        .put(signed_url.clone())
        .header("x-amz-meta-classification", &headers.classification)
        .header("x-amz-meta-school_id", &headers.school_id)
        .header("x-amz-meta-email_contact", &headers.email_contact)
        .header(CONTENT_TYPE, headers.content_type)
        .header("x-amz-meta-iddis", headers.iddis)
        .header(HOST, host)
        .body(payload)
        .send()
        .await
        .map_err(|e| format!("upload request failed: {}", e))?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        let text = response.text().await.unwrap_or_default();
        return Err(format!(
            "failed to upload file: {} - {}",
            status.as_u16(),
            truncate_text(&text, 200)
        ));
    }

    Ok(())
}

/// Upload action bound to one school
#[derive(Debug, Clone)]
pub struct BulkQueryAction {
    api_base_url: String,
    school: SchoolQueryInformation,
}

impl BulkQueryAction {
    pub fn new(api_base_url: impl Into<String>, school: SchoolQueryInformation) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            school,
        }
    }

    pub fn school(&self) -> &SchoolQueryInformation {
        &self.school
    }
}

#[async_trait]
impl WorkflowAction for BulkQueryAction {
    fn name(&self) -> &'static str {
        "bulk query upload"
    }

    fn target(&self) -> String {
        self.school.school_id.clone()
    }

    async fn execute(
        &self,
        session: &Session,
        access_token: &SecretString,
    ) -> Result<(), ActionError> {
        bulk_query_aisr(session, access_token, &self.api_base_url, &self.school).await
    }
}
