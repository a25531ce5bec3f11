use std::fmt::{Display, Formatter};

use reqwest::{Method, StatusCode};
use serde::Deserialize;

use crate::{cookies::CookieError, two_factor::CodeError};

/// Misconfiguration of the program or its environment.
///
/// Retrying cannot help; these are meant to travel unhandled up to `main`.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error("Unknown region {0:?}")]
    UnknownRegion(String),
    #[error("Could not resolve the region of app {app_id}")]
    RegionLookup {
        app_id: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Unsupported method {0}")]
    UnsupportedMethod(Method),
    #[error("Could not infer a config directory")]
    ConfigDir,
    #[error("Invalid dashboard URL {0:?}")]
    InvalidBaseUrl(String),
}

/// Error reported by the dashboard in the body of a non-success response.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ApiError {
    #[serde(default)]
    pub code: i64,
    pub error: String,
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let Self { code, error } = self;
        write!(f, "LeanCloud API error {code}: {error}")
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Fatal(#[from] FatalError),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("HTTP Error: {}, {method} {path}", .status.as_u16())]
    Http {
        status: StatusCode,
        method: Method,
        path: String,
    },
    #[error("Two-factor challenge did not contain a token")]
    MalformedChallenge(#[source] serde_json::Error),
    #[error(transparent)]
    Code(#[from] CodeError),
    #[error("Two-factor exchange failed")]
    TwoFactorExchange(#[source] Box<Error>),
    #[error(transparent)]
    Cookies(#[from] CookieError),
    #[error("Could not decode response to {method} {path}")]
    Decode {
        method: Method,
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Fatal(_) => true,
            Error::TwoFactorExchange(e) => e.is_fatal(),
            _ => false,
        }
    }
}
