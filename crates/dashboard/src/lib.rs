//! Blocking client for the LeanCloud dashboard API.
//!
//! Sessions are kept in a file-backed cookie jar so that consecutive invocations of a CLI share
//! them, and two-factor challenges are completed transparently through a [`CodeSource`].
#![forbid(unsafe_code)]

mod client;
pub mod cookies;
mod error;
pub mod regions;
pub mod resolver;
mod settings;
pub mod two_factor;

pub use client::{Client, RequestOptions, Response, Target, USER_AGENT};
pub use error::{ApiError, Error, FatalError};
pub use regions::Region;
pub use reqwest::Method;
pub use resolver::{AppRegions, RegionResolver};
pub use settings::{Settings, DASHBOARD_ENV};
pub use two_factor::{CodeError, CodeSource, Prompt};
