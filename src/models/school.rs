//! Per-school target of a workflow action
//!
//! One `SchoolQueryInformation` is built per configured school and bound into
//! exactly one action. It is never mutated after construction.

use std::fmt::Display;
use std::path::PathBuf;

/// Everything an action needs to know about one school
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchoolQueryInformation {
    /// Display name (also used to name downloaded files)
    pub school_name: String,
    /// AISR classification code, e.g. "N"
    pub classification: String,
    /// AISR school identifier
    pub school_id: String,
    /// Contact address attached to bulk query uploads
    pub email_contact: String,
    /// Local bulk query CSV; not needed for downloads
    pub query_file_path: Option<PathBuf>,
}

impl SchoolQueryInformation {
    pub fn new(
        school_name: impl Into<String>,
        classification: impl Into<String>,
        school_id: impl Into<String>,
        email_contact: impl Into<String>,
        query_file_path: Option<PathBuf>,
    ) -> Self {
        Self {
            school_name: school_name.into(),
            classification: classification.into(),
            school_id: school_id.into(),
            email_contact: email_contact.into(),
            query_file_path,
        }
    }

    /// File-system friendly version of the school name
    pub fn file_stem(&self) -> String {
        self.school_name.replace(' ', "_")
    }
}

impl Display for SchoolQueryInformation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[school {} #{}]", self.school_name, self.school_id)
    }
}
