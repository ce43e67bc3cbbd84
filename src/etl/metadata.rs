//! Run manifests
//!
//! Every successfully transformed file leaves a small JSON record behind in
//! `<output>/metadata/manifest_<run_id>.json`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EtlError;

/// Timestamp layout used in manifests
pub const MANIFEST_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub input_file: String,
    pub output_folder: String,
    pub timestamp: String,
    pub version: String,
    pub result_message: String,
}

impl RunManifest {
    /// New manifest with a fresh 8 character run id
    pub fn new(input_file: &Path, output_folder: &Path, result_message: impl Into<String>) -> Self {
        let run_id = Uuid::new_v4().simple().to_string()[..8].to_string();
        Self {
            run_id,
            input_file: input_file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            output_folder: output_folder.display().to_string(),
            timestamp: chrono::Local::now()
                .format(MANIFEST_TIMESTAMP_FORMAT)
                .to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            result_message: result_message.into(),
        }
    }
}

/// Write `manifest` into `manifest_folder`, creating the folder if needed
pub fn write_manifest(manifest: &RunManifest, manifest_folder: &Path) -> Result<PathBuf, EtlError> {
    std::fs::create_dir_all(manifest_folder)?;
    let path = manifest_folder.join(format!("manifest_{}.json", manifest.run_id));
    let json = serde_json::to_string_pretty(manifest)
        .map_err(|e| EtlError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    std::fs::write(&path, json)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_is_written_under_its_run_id() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = RunManifest::new(
            Path::new("/data/input/friendly_hills.csv"),
            Path::new("/data/output"),
            "Data pipeline executed successfully",
        );
        assert_eq!(manifest.run_id.len(), 8);
        assert!(manifest.run_id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(manifest.input_file, "friendly_hills.csv");
        assert_eq!(manifest.timestamp.len(), "20240101_120000".len());

        let path = write_manifest(&manifest, &dir.path().join("metadata")).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            format!("manifest_{}.json", manifest.run_id)
        );

        let stored: RunManifest =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(stored, manifest);
    }
}
