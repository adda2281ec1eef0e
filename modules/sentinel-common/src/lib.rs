pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, EnrichmentPolicy};
pub use error::SentinelError;
pub use types::*;
