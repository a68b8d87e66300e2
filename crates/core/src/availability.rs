//! Tagged handle for external-service clients that may be disabled.
//!
//! Clients are built once at startup. When their credentials are missing in
//! production they are kept as `Unavailable`, and every call through them
//! yields a [`ConfigError::Unavailable`] instead of failing on a null client.

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub enum Availability<T> {
    Ready(T),
    Unavailable {
        service: &'static str,
        reason: String,
    },
}

impl<T> Availability<T> {
    pub fn unavailable(service: &'static str, reason: impl Into<String>) -> Self {
        Availability::Unavailable {
            service,
            reason: reason.into(),
        }
    }

    /// Wrap a construction result, keeping the error text as the reason.
    pub fn from_result<E: std::fmt::Display>(service: &'static str, result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Availability::Ready(value),
            Err(e) => Availability::unavailable(service, e.to_string()),
        }
    }

    pub fn get(&self) -> Result<&T, ConfigError> {
        match self {
            Availability::Ready(value) => Ok(value),
            Availability::Unavailable { service, reason } => Err(ConfigError::Unavailable {
                service: *service,
                reason: reason.clone(),
            }),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Availability::Ready(_))
    }
}
