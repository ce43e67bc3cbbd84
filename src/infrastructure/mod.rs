//! Infrastructure layer
//!
//! Holds the scarce resources of a run and exposes them as capabilities.

pub mod session;

pub use session::{Session, DEFAULT_REQUEST_TIMEOUT};
