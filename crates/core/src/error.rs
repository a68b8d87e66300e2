use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingVars(Vec<String>),

    #[error("failed to load env file {path}: {message}")]
    EnvFile { path: String, message: String },

    #[error("{service} is not configured: {reason}")]
    Unavailable { service: &'static str, reason: String },
}
