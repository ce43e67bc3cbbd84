//! Folder runner
//!
//! Transforms every `*.csv` in the input folder. A file that fails is logged
//! and skipped so the rest of the folder still gets processed.

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::error::EtlError;
use crate::etl::metadata::{write_manifest, RunManifest};
use crate::etl::transform::run_file_etl;

/// Name of the manifest folder inside the output folder
pub const METADATA_FOLDER: &str = "metadata";

/// Outcome of one folder run
#[derive(Debug, Default, Clone)]
pub struct EtlSummary {
    pub processed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl EtlSummary {
    pub fn total(&self) -> usize {
        self.processed.len() + self.failed.len()
    }
}

/// `*.csv` files directly inside `folder`, sorted by name
pub fn list_csv_files(folder: &Path) -> Result<Vec<PathBuf>, EtlError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Run the ETL for every CSV in `input_folder`
///
/// # Arguments
/// - `input_folder`: AISR exports
/// - `output_folder`: created if missing; manifests go to `metadata/` below it
pub fn run_etl_on_folder(input_folder: &Path, output_folder: &Path) -> Result<EtlSummary, EtlError> {
    std::fs::create_dir_all(output_folder)?;
    let manifest_folder = output_folder.join(METADATA_FOLDER);

    let files = list_csv_files(input_folder)?;
    if files.is_empty() {
        warn!("⚠️ No CSV files found in {}", input_folder.display());
    }

    let mut summary = EtlSummary::default();
    for input_file in files {
        match run_file_etl(&input_file, output_folder) {
            Ok(message) => {
                let manifest = RunManifest::new(&input_file, output_folder, &message);
                if let Err(e) = write_manifest(&manifest, &manifest_folder) {
                    warn!("⚠️ Could not write manifest for {}: {}", input_file.display(), e);
                }
                info!("✓ Processed {}: {}", manifest.input_file, message);
                summary.processed.push(input_file);
            }
            Err(e) => {
                error!("❌ Failed to process {}: {}", input_file.display(), e);
                summary.failed.push((input_file, e.to_string()));
            }
        }
    }

    info!(
        "📊 ETL finished: {} processed, {} failed",
        summary.processed.len(),
        summary.failed.len()
    );
    Ok(summary)
}
