//! Configuration file
//!
//! JSON by default, TOML when the file ends in `.toml`:
//!
//! ```json
//! {
//!   "paths": {"input_folder": "...", "output_folder": "...", "logs_folder": "..."},
//!   "api": {"auth_base_url": "...", "aisr_api_base_url": "..."},
//!   "schools": [{"name": "...", "id": "...", "classification": "N",
//!                "email": "...", "bulk_query_file": "..."}]
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::error::ConfigError;
use crate::infrastructure::session::DEFAULT_REQUEST_TIMEOUT;
use crate::models::SchoolQueryInformation;

/// Overrides `api.request_timeout_secs`
pub const REQUEST_TIMEOUT_ENV: &str = "AISR_REQUEST_TIMEOUT_SECS";

/// Program configuration
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub schools: Vec<SchoolConfig>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PathsConfig {
    /// AISR exports waiting to be transformed
    pub input_folder: Option<PathBuf>,
    /// Infinite Campus files
    pub output_folder: Option<PathBuf>,
    /// Where `app.log` is appended
    pub logs_folder: Option<PathBuf>,
    /// Download target; falls back to `input_folder`
    pub aisr_downloads_folder: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ApiConfig {
    pub auth_base_url: Option<String>,
    pub aisr_api_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

/// One school entry as written in the file
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SchoolConfig {
    pub name: Option<String>,
    pub id: Option<String>,
    pub classification: Option<String>,
    pub email: Option<String>,
    pub bulk_query_file: Option<PathBuf>,
}

impl Config {
    /// Load, parse and apply environment overrides
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);
        let parsed = if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        };

        let config = parsed.map_err(|reason| ConfigError::ParseFailed {
            path: path.display().to_string(),
            reason,
        })?;

        Ok(config.with_timeout_override(std::env::var(REQUEST_TIMEOUT_ENV).ok()))
    }

    pub fn from_json_str(content: &str) -> Result<Self, String> {
        serde_json::from_str(content).map_err(|e| e.to_string())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Replace the timeout when `value` parses as seconds; ignore it otherwise
    pub fn with_timeout_override(mut self, value: Option<String>) -> Self {
        if let Some(secs) = value.and_then(|v| v.trim().parse::<u64>().ok()) {
            self.api.request_timeout_secs = Some(secs);
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        self.api
            .request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    /// `(auth_base_url, aisr_api_base_url)`; both are required
    pub fn api_urls(&self) -> Result<(&str, &str), ConfigError> {
        let auth = self.api.auth_base_url.as_deref().filter(|s| !s.is_empty());
        let api = self.api.aisr_api_base_url.as_deref().filter(|s| !s.is_empty());
        match (auth, api) {
            (Some(auth), Some(api)) => Ok((auth, api)),
            _ => Err(ConfigError::MissingApiUrls),
        }
    }

    /// Schools usable for bulk queries
    ///
    /// Entries missing an id, classification, email or query file are logged
    /// and skipped. A query file that is configured but absent is an error.
    pub fn bulk_query_schools(&self) -> Result<Vec<SchoolQueryInformation>, ConfigError> {
        self.collect_schools(true)
    }

    /// Schools usable for downloads; no query file needed
    pub fn download_schools(&self) -> Result<Vec<SchoolQueryInformation>, ConfigError> {
        self.collect_schools(false)
    }

    fn collect_schools(&self, needs_query_file: bool) -> Result<Vec<SchoolQueryInformation>, ConfigError> {
        info!("Found {} school(s) in configuration", self.schools.len());

        let mut schools = Vec::new();
        for entry in &self.schools {
            let name = entry.name.clone().unwrap_or_else(|| "Unknown".to_string());
            let present = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

            let (Some(id), Some(classification), Some(email)) = (
                present(&entry.id),
                present(&entry.classification),
                present(&entry.email),
            ) else {
                error!("School {} is missing required information", name);
                continue;
            };

            let query_file = match (&entry.bulk_query_file, needs_query_file) {
                (Some(file), true) => {
                    if !file.exists() {
                        error!("Query file not found for school {}: {}", name, file.display());
                        return Err(ConfigError::QueryFileNotFound {
                            school: name,
                            path: file.display().to_string(),
                        });
                    }
                    Some(file.clone())
                }
                (None, true) => {
                    error!("School {} is missing required information", name);
                    continue;
                }
                (file, false) => file.clone(),
            };

            schools.push(SchoolQueryInformation::new(name, classification, id, email, query_file));
        }

        if schools.is_empty() {
            return Err(ConfigError::NoValidSchools);
        }
        Ok(schools)
    }

    /// Download target folder, `aisr_downloads_folder` or else `input_folder`
    pub fn downloads_folder(&self) -> Result<PathBuf, ConfigError> {
        self.paths
            .aisr_downloads_folder
            .clone()
            .or_else(|| self.paths.input_folder.clone())
            .ok_or(ConfigError::MissingFolder {
                name: "aisr_downloads_folder",
            })
    }

    /// `(input_folder, output_folder)` for the transform; the input must exist
    pub fn transform_folders(&self) -> Result<(PathBuf, PathBuf), ConfigError> {
        let input = self
            .paths
            .input_folder
            .clone()
            .ok_or(ConfigError::MissingFolder { name: "input_folder" })?;
        let output = self
            .paths
            .output_folder
            .clone()
            .ok_or(ConfigError::MissingFolder { name: "output_folder" })?;

        if !input.is_dir() {
            return Err(ConfigError::FolderNotFound {
                path: input.display().to_string(),
            });
        }
        Ok((input, output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_schools(schools: serde_json::Value) -> Config {
        let json = serde_json::json!({
            "paths": {"input_folder": "/in", "output_folder": "/out"},
            "api": {"auth_base_url": "https://auth", "aisr_api_base_url": "https://api"},
            "schools": schools,
        });
        Config::from_json_str(&json.to_string()).unwrap()
    }

    #[test]
    fn json_and_toml_are_equivalent() {
        let json = r#"{
            "paths": {"input_folder": "in", "output_folder": "out", "logs_folder": "logs"},
            "api": {"auth_base_url": "https://auth", "aisr_api_base_url": "https://api"},
            "schools": [{"name": "Friendly Hills", "id": "1234", "classification": "N",
                         "email": "a@b.c"}]
        }"#;
        let toml = r#"
            [paths]
            input_folder = "in"
            output_folder = "out"
            logs_folder = "logs"

            [api]
            auth_base_url = "https://auth"
            aisr_api_base_url = "https://api"

            [[schools]]
            name = "Friendly Hills"
            id = "1234"
            classification = "N"
            email = "a@b.c"
        "#;

        let from_json = Config::from_json_str(json).unwrap();
        let from_toml = Config::from_toml_str(toml).unwrap();

        assert_eq!(from_json.api_urls().unwrap(), from_toml.api_urls().unwrap());
        assert_eq!(
            from_json.download_schools().unwrap(),
            from_toml.download_schools().unwrap()
        );
        assert_eq!(from_toml.paths.logs_folder, Some(PathBuf::from("logs")));
    }

    #[test]
    fn load_picks_parser_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api]\nauth_base_url = \"https://auth\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.auth_base_url.as_deref(), Some("https://auth"));
        assert!(matches!(config.api_urls(), Err(ConfigError::MissingApiUrls)));
    }

    #[test]
    fn missing_file_and_bad_json_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::load(&dir.path().join("nope.json")),
            Err(ConfigError::NotFound { .. })
        ));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        assert!(matches!(Config::load(&bad), Err(ConfigError::ParseFailed { .. })));
    }

    #[test]
    fn incomplete_schools_are_skipped() {
        let config = config_with_schools(serde_json::json!([
            {"name": "No Email", "id": "1", "classification": "N"},
            {"name": "Complete", "id": "2", "classification": "N", "email": "a@b.c"}
        ]));

        let schools = config.download_schools().unwrap();
        assert_eq!(schools.len(), 1);
        assert_eq!(schools[0].school_id, "2");
        assert_eq!(schools[0].query_file_path, None);
    }

    #[test]
    fn bulk_query_needs_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let query = dir.path().join("query.csv");
        std::fs::write(&query, "a,b\n").unwrap();

        let config = config_with_schools(serde_json::json!([
            {"name": "No File", "id": "1", "classification": "N", "email": "a@b.c"},
            {"name": "Has File", "id": "2", "classification": "N", "email": "a@b.c",
             "bulk_query_file": query}
        ]));
        let schools = config.bulk_query_schools().unwrap();
        assert_eq!(schools.len(), 1);
        assert_eq!(schools[0].query_file_path.as_deref(), Some(query.as_path()));

        let missing = config_with_schools(serde_json::json!([
            {"name": "Gone", "id": "3", "classification": "N", "email": "a@b.c",
             "bulk_query_file": dir.path().join("gone.csv")}
        ]));
        assert!(matches!(
            missing.bulk_query_schools(),
            Err(ConfigError::QueryFileNotFound { .. })
        ));
    }

    #[test]
    fn no_valid_schools_is_an_error() {
        let config = config_with_schools(serde_json::json!([{"name": "Empty"}]));
        assert!(matches!(config.download_schools(), Err(ConfigError::NoValidSchools)));
        assert!(matches!(
            Config::default().download_schools(),
            Err(ConfigError::NoValidSchools)
        ));
    }

    #[test]
    fn downloads_folder_falls_back_to_input() {
        let config = config_with_schools(serde_json::json!([]));
        assert_eq!(config.downloads_folder().unwrap(), PathBuf::from("/in"));
        assert!(Config::default().downloads_folder().is_err());
    }

    #[test]
    fn timeout_override_and_default() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), DEFAULT_REQUEST_TIMEOUT);

        let config = config.with_timeout_override(Some("15".into()));
        assert_eq!(config.request_timeout(), Duration::from_secs(15));

        let config = config.with_timeout_override(Some("soon".into()));
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
    }
}
