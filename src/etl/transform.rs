//! Single-file ETL
//!
//! Extract: pipe-delimited AISR export with a header row
//! Transform: keep the four Infinite Campus columns, normalize the date
//! Load: comma-separated, no header, same file name in the output folder

use std::path::Path;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::error::EtlError;
use crate::models::VaccinationRecord;

pub const ETL_SUCCESS_MESSAGE: &str = "Data pipeline executed successfully";

const AISR_DELIMITER: u8 = b'|';

const REQUIRED_COLUMNS: [&str; 4] = ["id_1", "id_2", "vaccine_group_name", "vaccination_date"];

const OUTPUT_DATE_FORMAT: &str = "%m/%d/%Y";

/// Accepted input layouts; `M/D/YYYY` is covered by the first one
const INPUT_DATE_FORMATS: [&str; 2] = ["%m/%d/%Y", "%Y-%m-%d"];

/// Normalize a vaccination date to `MM/DD/YYYY`
///
/// Accepts `MM/DD/YYYY`, `M/D/YYYY`, `YYYY-MM-DD` and `YYYYMMDD`.
pub fn normalize_vaccination_date(value: &str) -> Option<String> {
    let value = value.trim();

    let date = if value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()) {
        let dashed = format!("{}-{}-{}", &value[..4], &value[4..6], &value[6..]);
        NaiveDate::parse_from_str(&dashed, "%Y-%m-%d").ok()
    } else {
        INPUT_DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
    }?;

    Some(date.format(OUTPUT_DATE_FORMAT).to_string())
}

/// Read an AISR export
pub fn extract_aisr_records(input_file: &Path) -> Result<Vec<VaccinationRecord>, EtlError> {
    let path = input_file.display().to_string();
    let read_failed = |source| EtlError::ReadFailed {
        path: path.clone(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .delimiter(AISR_DELIMITER)
        .flexible(true)
        .from_path(input_file)
        .map_err(read_failed)?;

    let headers = reader.headers().map_err(read_failed)?.clone();
    let mut positions = [0usize; 4];
    for (slot, column) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| EtlError::MissingColumn {
                path: path.clone(),
                column,
            })?;
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(read_failed)?;
        if row.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        records.push(select_columns(&row, &positions));
    }

    Ok(records)
}

fn select_columns(row: &StringRecord, positions: &[usize; 4]) -> VaccinationRecord {
    let field = |i: usize| row.get(positions[i]).unwrap_or_default().trim().to_string();
    VaccinationRecord {
        id_1: field(0),
        id_2: field(1),
        vaccine_group_name: field(2),
        vaccination_date: field(3),
    }
}

/// Reformat dates; a date in an unknown layout fails the whole file
pub fn transform_records(
    records: Vec<VaccinationRecord>,
    source: &Path,
) -> Result<Vec<VaccinationRecord>, EtlError> {
    records
        .into_iter()
        .map(|mut record| {
            record.vaccination_date = normalize_vaccination_date(&record.vaccination_date)
                .ok_or_else(|| EtlError::InvalidDate {
                    path: source.display().to_string(),
                    value: record.vaccination_date.clone(),
                })?;
            Ok(record)
        })
        .collect()
}

/// Write records in Infinite Campus layout
pub fn write_infinite_campus_csv(
    records: &[VaccinationRecord],
    output_file: &Path,
) -> Result<(), EtlError> {
    let path = output_file.display().to_string();
    let write_failed = |source| EtlError::WriteFailed {
        path: path.clone(),
        source,
    };

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(output_file)
        .map_err(write_failed)?;
    for record in records {
        writer.serialize(record).map_err(write_failed)?;
    }
    writer.flush()?;
    Ok(())
}

/// Run extract → transform → load for one file
///
/// # Returns
/// The result message recorded in the run manifest
pub fn run_file_etl(input_file: &Path, output_folder: &Path) -> Result<String, EtlError> {
    let records = extract_aisr_records(input_file)?;
    let records = transform_records(records, input_file)?;

    let file_name = input_file
        .file_name()
        .ok_or_else(|| EtlError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} has no file name", input_file.display()),
        )))?;
    write_infinite_campus_csv(&records, &output_folder.join(file_name))?;

    Ok(ETL_SUCCESS_MESSAGE.to_string())
}
