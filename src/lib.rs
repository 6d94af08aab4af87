//! tailtrim library
//!
//! Cuts the trailing three seconds off a video with a stream-copy pass of an
//! external engine, reporting one composite progress bar along the way.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod output;
pub mod ports;
pub mod probe;
pub mod utils;

// Re-export commonly used types
pub use app::{AppContainer, TrimSession};
pub use domain::errors::DomainError;
pub use domain::model::{RunOutcome, SessionSnapshot, TrimSummary};
pub use error::{TailTrimError, TailTrimResult};
