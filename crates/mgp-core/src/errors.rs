use std::fmt;

use serde::Serialize;

/// Handshake step an authentication failure originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStage {
    Identifier,
    PrimaryFactor,
    SecondaryFactor,
}

impl AuthStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::PrimaryFactor => "primary_factor",
            Self::SecondaryFactor => "secondary_factor",
        }
    }
}

impl fmt::Display for AuthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core error type.
///
/// Adapter crates map their specific errors into `Platform` (the remote side
/// rejected the call) or `External` (transport). The controllers re-tag those
/// as `Auth`, `Directory` or `Dispatch` so the presentation layer can show the
/// failing component.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("authentication failed at {stage}: {cause}")]
    Auth { stage: AuthStage, cause: String },

    #[error("directory error: {0}")]
    Directory(String),

    #[error("dispatch error: {cause}")]
    Dispatch { cause: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("config error: {0}")]
    Config(String),

    #[error("platform rejected request: {0}")]
    Platform(String),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    pub fn auth(stage: AuthStage, cause: impl Into<String>) -> Self {
        Self::Auth {
            stage,
            cause: cause.into(),
        }
    }

    /// Dispatch precondition violation. Raised before any platform call.
    pub fn precondition(detail: &str) -> Self {
        Self::Dispatch {
            cause: format!("precondition: {detail}"),
        }
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Dispatch { cause } if cause.starts_with("precondition"))
    }

    /// Message without the variant prefix, for user-visible text.
    pub fn cause(&self) -> String {
        match self {
            Self::Auth { cause, .. } => cause.clone(),
            Self::Directory(cause) => cause.clone(),
            Self::Dispatch { cause } => cause.clone(),
            Self::Platform(cause) | Self::External(cause) | Self::Config(cause) => cause.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
