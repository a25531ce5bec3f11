//! Completion of the two-factor challenge the dashboard issues with a `401`.
//!
//! The exchange upgrades the session stored in the cookie jar; the request that triggered the
//! challenge is not sent again and the exchange response is handed to the caller in its place.
use std::{
    io::{self, IsTerminal},
    sync::Arc,
};

use log::{debug, info};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{
    client::{classify, RequestOptions, Response},
    cookies::CookieJar,
    Error,
};

pub const EXCHANGE_PATH: &str = "/1.1/do2fa";

const PROMPT: &str = "Enter the two-factor authentication code:";

#[derive(Debug, thiserror::Error)]
pub enum CodeError {
    #[error("Two-factor authentication code must be numeric")]
    NotNumeric(String),
    #[error("Failed to read the two-factor authentication code")]
    Prompt(#[source] io::Error),
}

/// Parse a one-time code as typed by a human.
pub fn parse_code(s: &str) -> Result<u32, CodeError> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodeError::NotNumeric(s.to_string()));
    }
    s.parse().map_err(|_| CodeError::NotNumeric(s.to_string()))
}

/// Where one-time codes come from when the dashboard asks for one.
pub trait CodeSource {
    fn code(&self) -> Result<u32, CodeError>;
}

impl<F> CodeSource for F
where
    F: Fn() -> Result<u32, CodeError>,
{
    fn code(&self) -> Result<u32, CodeError> {
        self()
    }
}

/// Ask for the code on stdin.
#[derive(Clone, Copy, Debug, Default)]
pub struct Prompt;

impl CodeSource for Prompt {
    fn code(&self) -> Result<u32, CodeError> {
        if io::stdin().is_terminal() {
            eprintln!("{PROMPT}");
        }
        let mut buf = String::new();
        io::stdin().read_line(&mut buf).map_err(CodeError::Prompt)?;
        parse_code(&buf)
    }
}

#[derive(Debug, Deserialize)]
struct Challenge {
    token: String,
}

#[derive(Debug, Serialize)]
struct Exchange<'a> {
    token: &'a str,
    code: u32,
}

/// Pass `response` through unless it is a two-factor challenge, in which case the challenge is
/// completed and the response of the exchange is returned instead.
pub(crate) fn resolve(
    response: Response,
    base_url: &str,
    jar: &Arc<CookieJar>,
    source: &dyn CodeSource,
) -> Result<Response, Error> {
    if response.status() != StatusCode::UNAUTHORIZED {
        return Ok(response);
    }
    let Challenge { token } = response.json::<Challenge>().map_err(Error::MalformedChallenge)?;
    debug!("Received a two-factor challenge");
    let code = source.code()?;

    info!("Submitting two-factor authentication code ...");
    let response = exchange(base_url, jar, &token, code)
        .map_err(|e| Error::TwoFactorExchange(Box::new(e)))?;
    jar.save()?;
    Ok(response)
}

fn exchange(
    base_url: &str,
    jar: &Arc<CookieJar>,
    token: &str,
    code: u32,
) -> Result<Response, Error> {
    let response = RequestOptions::default()
        .jar(Arc::clone(jar))
        .build()?
        .post(format!("{base_url}{EXCHANGE_PATH}"))
        .json(&Exchange { token, code })
        .send()?;
    classify(&Method::POST, EXCHANGE_PATH, Response::read(response)?)
}
