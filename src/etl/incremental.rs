//! Incremental vaccinations
//!
//! Combines every Infinite Campus file in the output folder, compares the
//! result with the master file of known records and writes only the new
//! records to `changes/<date>_new_vaccinations.csv`. The master file is then
//! replaced by the combined current data.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::ReaderBuilder;
use tracing::{info, warn};

use crate::error::EtlError;
use crate::etl::folder::list_csv_files;
use crate::etl::transform::write_infinite_campus_csv;
use crate::models::VaccinationRecord;

pub const ALL_KNOWN_VACCINATIONS_FILE: &str = "all_known_vaccinations.csv";

pub const CHANGES_FOLDER: &str = "changes";

#[derive(Debug, Clone)]
pub struct IncrementalSummary {
    pub current_records: usize,
    pub new_records: usize,
    pub diff_file: PathBuf,
    pub master_file: PathBuf,
}

/// Read a headerless Infinite Campus file
fn read_infinite_campus_csv(path: &Path) -> Result<Vec<VaccinationRecord>, EtlError> {
    let read_failed = |source| EtlError::ReadFailed {
        path: path.display().to_string(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(read_failed)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(read_failed)?;
        if row.len() < 4 {
            continue;
        }
        records.push(VaccinationRecord {
            id_1: row[0].to_string(),
            id_2: row[1].to_string(),
            vaccine_group_name: row[2].to_string(),
            vaccination_date: row[3].to_string(),
        });
    }
    Ok(records)
}

/// Concatenate files in order, dropping exact duplicates
///
/// Unreadable files are logged and skipped.
pub fn combine_vaccination_files(files: &[PathBuf]) -> Vec<VaccinationRecord> {
    let mut seen = HashSet::new();
    let mut combined = Vec::new();
    let mut total = 0usize;

    for file in files {
        match read_infinite_campus_csv(file) {
            Ok(records) => {
                total += records.len();
                combined.extend(records.into_iter().filter(|r| seen.insert(r.clone())));
            }
            Err(e) => warn!("⚠️ Skipping {}: {}", file.display(), e),
        }
    }

    if total != combined.len() {
        info!("Removed {} duplicate records", total - combined.len());
    }
    combined
}

/// Load the master file; a missing or unreadable file means nothing is known yet
pub fn load_all_known_vaccinations(master_file: &Path) -> Vec<VaccinationRecord> {
    if !master_file.exists() {
        info!("No master file yet, starting with an empty known set");
        return Vec::new();
    }
    match read_infinite_campus_csv(master_file) {
        Ok(records) => {
            info!("Loaded {} known vaccination records", records.len());
            records
        }
        Err(e) => {
            warn!("⚠️ Master file unreadable, treating as empty: {}", e);
            Vec::new()
        }
    }
}

/// Records of `current` whose composite key is not in `known`, in `current` order
pub fn compute_vaccination_diff(
    current: &[VaccinationRecord],
    known: &[VaccinationRecord],
) -> Vec<VaccinationRecord> {
    let known: HashSet<&VaccinationRecord> = known.iter().collect();
    current
        .iter()
        .filter(|record| !known.contains(record))
        .cloned()
        .collect()
}

/// Run the incremental step over `output_folder`
///
/// # Arguments
/// - `output_folder`: folder holding the freshly transformed files
/// - `run_date`: date used in the diff file name
pub fn process_incremental_vaccinations(
    output_folder: &Path,
    run_date: NaiveDate,
) -> Result<IncrementalSummary, EtlError> {
    info!("🚀 Starting incremental vaccination processing");

    let master_file = output_folder.join(ALL_KNOWN_VACCINATIONS_FILE);
    let output_files: Vec<PathBuf> = list_csv_files(output_folder)?
        .into_iter()
        .filter(|file| file.file_name() != master_file.file_name())
        .collect();

    let current = combine_vaccination_files(&output_files);
    let known = load_all_known_vaccinations(&master_file);
    let new_records = compute_vaccination_diff(&current, &known);
    info!(
        "Found {} new vaccination records out of {} total",
        new_records.len(),
        current.len()
    );

    let changes_folder = output_folder.join(CHANGES_FOLDER);
    std::fs::create_dir_all(&changes_folder)?;
    let diff_file = changes_folder.join(format!(
        "{}_new_vaccinations.csv",
        run_date.format("%Y-%m-%d")
    ));
    write_infinite_campus_csv(&new_records, &diff_file)?;
    write_infinite_campus_csv(&current, &master_file)?;

    info!("✓ Saved {} new records to {}", new_records.len(), diff_file.display());
    Ok(IncrementalSummary {
        current_records: current.len(),
        new_records: new_records.len(),
        diff_file,
        master_file,
    })
}
