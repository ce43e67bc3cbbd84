//! Vaccination records download
//!
//! Looks up the latest result file AISR produced for a school and streams it
//! to `<output>/<school name>_vaccinations.csv`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::AUTHORIZATION;
use secrecy::SecretString;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::actions::bearer_header;
use crate::error::{ActionError, ActionResultExt};
use crate::infrastructure::Session;
use crate::models::SchoolQueryInformation;
use crate::utils::logging::truncate_text;
use crate::workflow::WorkflowAction;

/// One entry of `/school/query/{school_id}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryRecordDescriptor {
    #[serde(default)]
    upload_date_time: i64,
    #[serde(default)]
    full_vaccine_file_url: Option<String>,
}

/// Find the signed URL of the newest full vaccination file for a school
pub async fn get_latest_vaccination_url(
    session: &Session,
    access_token: &SecretString,
    api_base_url: &str,
    school_id: &str,
) -> Result<String, ActionError> {
    let endpoint = format!(
        "{}/school/query/{}",
        api_base_url.trim_end_matches('/'),
        school_id
    );

    let response = session
        .client()
        .get(endpoint)
        .header(
            AUTHORIZATION,
            bearer_header(access_token).map_err(|e| ActionError::new(school_id, e))?,
        )
        .send()
        .await
        .for_target(school_id, "vaccination query failed")?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(ActionError::new(
            school_id,
            format!(
                "vaccination query returned {}: {}",
                status.as_u16(),
                truncate_text(&text, 200)
            ),
        ));
    }

    let records: Vec<QueryRecordDescriptor> = response
        .json()
        .await
        .for_target(school_id, "invalid vaccination query response")?;
    debug!("{} query records for school {}", records.len(), school_id);

    records
        .into_iter()
        .max_by_key(|record| record.upload_date_time)
        .ok_or_else(|| ActionError::new(school_id, "no query results available"))?
        .full_vaccine_file_url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ActionError::new(school_id, "latest query result has no vaccination file URL"))
}

/// Stream a signed file to `destination`
///
/// The body lands in `<destination>.part` first and is renamed onto
/// `destination` only once the stream has ended and is non-empty, so a failed
/// download never leaves a file the transform would pick up.
///
/// # Returns
/// Number of bytes written. An HTTP error status, a broken stream or an empty
/// file is a failure.
pub async fn download_vaccination_records(
    session: &Session,
    signed_url: &str,
    destination: &Path,
    target: &str,
) -> Result<u64, ActionError> {
    let response = session
        .client()
        .get(signed_url)
        .send()
        .await
        .for_target(target, "download request failed")?;

    let status = response.status();
    if !status.is_success() {
        return Err(ActionError::new(
            target,
            format!("download returned {}", status.as_u16()),
        ));
    }

    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .for_target(target, "failed to create output folder")?;
    }

    let partial = partial_path(destination);
    let written = match stream_to_file(response, &partial, target).await {
        Ok(written) => written,
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                debug!("Could not remove {}: {}", partial.display(), cleanup);
            }
            return Err(e);
        }
    };

    tokio::fs::rename(&partial, destination)
        .await
        .for_target(target, &format!("failed to move download to {}", destination.display()))?;

    Ok(written)
}

/// `<name>.part` next to `destination`
fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

async fn stream_to_file(
    response: reqwest::Response,
    path: &Path,
    target: &str,
) -> Result<u64, ActionError> {
    let mut file = tokio::fs::File::create(path)
        .await
        .for_target(target, &format!("failed to create {}", path.display()))?;

    let mut written: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.for_target(target, "download interrupted")?;
        file.write_all(&chunk)
            .await
            .for_target(target, "failed to write download")?;
        written += chunk.len() as u64;
    }
    file.flush()
        .await
        .for_target(target, "failed to write download")?;

    if written == 0 {
        return Err(ActionError::new(target, "downloaded file is empty"));
    }
    Ok(written)
}

/// Download action bound to one school
#[derive(Debug, Clone)]
pub struct DownloadAction {
    api_base_url: String,
    school: SchoolQueryInformation,
    output_folder: PathBuf,
}

impl DownloadAction {
    pub fn new(
        api_base_url: impl Into<String>,
        school: SchoolQueryInformation,
        output_folder: impl Into<PathBuf>,
    ) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            school,
            output_folder: output_folder.into(),
        }
    }

    /// Where this school's file lands
    pub fn destination(&self) -> PathBuf {
        self.output_folder
            .join(format!("{}_vaccinations.csv", self.school.file_stem()))
    }
}

#[async_trait]
impl WorkflowAction for DownloadAction {
    fn name(&self) -> &'static str {
        "vaccination download"
    }

    fn target(&self) -> String {
        self.school.school_id.clone()
    }

    async fn execute(
        &self,
        session: &Session,
        access_token: &SecretString,
    ) -> Result<(), ActionError> {
        let school_id = self.school.school_id.as_str();
        let signed_url =
            get_latest_vaccination_url(session, access_token, &self.api_base_url, school_id)
                .await?;

        let destination = self.destination();
        let bytes =
            download_vaccination_records(session, &signed_url, &destination, school_id).await?;

        info!(
            "✓ Downloaded {} bytes for {} to {}",
            bytes,
            self.school,
            destination.display()
        );
        Ok(())
    }
}
