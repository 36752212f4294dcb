pub mod canonical;
pub mod config;
pub mod error;
pub mod types;

pub use canonical::{canonical_domain, domain_of_url, normalize_key};
pub use config::Config;
pub use error::BrandPulseError;
pub use types::*;
