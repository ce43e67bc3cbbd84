pub mod logging;

pub use logging::{init_logging, log_startup, log_workflow_summary, truncate_text};
