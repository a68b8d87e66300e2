pub mod availability;
pub mod config;
pub mod error;

pub use availability::Availability;
pub use config::{Config, Environment};
pub use error::ConfigError;
