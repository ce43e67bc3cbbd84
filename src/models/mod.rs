pub mod auth;
pub mod school;
pub mod vaccination;

pub use auth::{AuthResult, CorrelationTokens, Credentials};
pub use school::SchoolQueryInformation;
pub use vaccination::VaccinationRecord;
