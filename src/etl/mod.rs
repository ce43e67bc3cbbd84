//! AISR → Infinite Campus CSV pipeline
//!
//! - `transform` - extract / transform / load for one file
//! - `folder` - runs the pipeline over every CSV in a folder
//! - `metadata` - per-run manifest files
//! - `incremental` - diff of current records against everything seen before

pub mod folder;
pub mod incremental;
pub mod metadata;
pub mod transform;

pub use folder::{run_etl_on_folder, EtlSummary};
pub use incremental::{process_incremental_vaccinations, IncrementalSummary};
pub use metadata::{write_manifest, RunManifest};
pub use transform::{run_file_etl, ETL_SUCCESS_MESSAGE};
