pub mod config;
pub mod error;

pub use config::{AppConfig, RejectionPolicy};
pub use error::{AppError, Result};
