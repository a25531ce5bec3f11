use std::{
    borrow::Cow,
    fmt::{Debug, Formatter},
    sync::Arc,
};

use log::{debug, trace};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::{
    cookies::CookieJar,
    two_factor::{self, CodeSource, Prompt},
    ApiError, Error, FatalError, Region, RegionResolver, Settings,
};

pub const USER_AGENT: &str = concat!("LeanCloud-CLI/", env!("CARGO_PKG_VERSION"));

const XSRF_HEADER: &str = "x-xsrf-token";

/// A response that has been read to the end.
#[derive(Clone, Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Response {
    pub(crate) fn read(response: reqwest::blocking::Response) -> reqwest::Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes()?.to_vec();
        Ok(Self {
            status,
            headers,
            body,
        })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// True if the content type announces JSON, regardless of whether the body parses.
    pub fn is_json(&self) -> bool {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim().starts_with("application/json"))
    }
}

/// Everything that goes into the reqwest client used for a single call.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    headers: HeaderMap,
    jar: Option<Arc<CookieJar>>,
    user_agent: Option<String>,
}

impl RequestOptions {
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn jar(mut self, jar: Arc<CookieJar>) -> Self {
        self.jar = Some(jar);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub(crate) fn build(self) -> reqwest::Result<reqwest::blocking::Client> {
        let Self {
            headers,
            jar,
            user_agent,
        } = self;
        let mut builder = reqwest::blocking::Client::builder().default_headers(headers);
        if let Some(jar) = jar {
            builder = builder.cookie_provider(jar);
        }
        if let Some(user_agent) = user_agent {
            builder = builder.user_agent(user_agent);
        }
        builder.build()
    }
}

/// What a client talks to.
pub enum Target {
    Region(Region),
    /// An app whose region is looked up on every call.
    App {
        id: String,
        resolver: Box<dyn RegionResolver>,
    },
}

impl Debug for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Region(region) => f.debug_tuple("Region").field(region).finish(),
            Target::App { id, .. } => f.debug_struct("App").field("id", id).finish_non_exhaustive(),
        }
    }
}

/// Succeed on 2xx, otherwise turn the response into the most specific error possible.
pub(crate) fn classify(method: &Method, path: &str, response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    trace!("Received {status} from {method} {path}: {}", response.text());
    if response.is_json() {
        match response.json::<ApiError>() {
            Ok(e) => return Err(e.into()),
            Err(e) => debug!("Could not parse error from JSON body because {e}"),
        }
    }
    Err(Error::Http {
        status,
        method: method.clone(),
        path: path.to_string(),
    })
}

/// Client for the dashboard API of one region or app.
pub struct Client {
    target: Target,
    settings: Settings,
    jar: Arc<CookieJar>,
    code_source: Box<dyn CodeSource>,
}

impl Client {
    pub fn by_region(settings: Settings, region: Region) -> Result<Self, Error> {
        Self::new(settings, Target::Region(region))
    }

    pub fn by_app(
        settings: Settings,
        app_id: impl Into<String>,
        resolver: impl RegionResolver + 'static,
    ) -> Result<Self, Error> {
        Self::new(
            settings,
            Target::App {
                id: app_id.into(),
                resolver: Box::new(resolver),
            },
        )
    }

    fn new(settings: Settings, target: Target) -> Result<Self, Error> {
        let jar = CookieJar::open(settings.cookie_path())?;
        Ok(Self {
            target,
            settings,
            jar: Arc::new(jar),
            code_source: Box::new(Prompt),
        })
    }

    /// Replace the interactive prompt used to obtain two-factor codes.
    pub fn with_code_source(mut self, code_source: impl CodeSource + 'static) -> Self {
        self.code_source = Box::new(code_source);
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn jar(&self) -> &Arc<CookieJar> {
        &self.jar
    }

    /// Origin of the dashboard, without a trailing slash.
    pub fn base_url(&self) -> Result<String, FatalError> {
        if let Some(dashboard) = self.settings.dashboard() {
            return Ok(dashboard.to_string());
        }
        let region = match &self.target {
            Target::Region(region) => *region,
            Target::App { id, resolver } => resolver
                .region(id)
                .map_err(|source| FatalError::RegionLookup {
                    app_id: id.clone(),
                    source,
                })?
                .parse::<Region>()?,
        };
        Ok(region.dashboard_url().to_string())
    }

    /// The options used for calls that don't provide their own.
    pub fn options(&self) -> Result<RequestOptions, FatalError> {
        let base_url = self.base_url()?;
        self.default_options(&base_url)
    }

    fn default_options(&self, base_url: &str) -> Result<RequestOptions, FatalError> {
        let url =
            Url::parse(base_url).map_err(|_| FatalError::InvalidBaseUrl(base_url.to_string()))?;
        let xsrf = self
            .jar
            .xsrf_token(&url)
            .and_then(|t| HeaderValue::from_str(&t).ok())
            .unwrap_or_else(|| HeaderValue::from_static(""));
        Ok(RequestOptions::default()
            .header(HeaderName::from_static(XSRF_HEADER), xsrf)
            .jar(Arc::clone(&self.jar))
            .user_agent(USER_AGENT))
    }

    /// Perform one logical call against the dashboard.
    ///
    /// A two-factor challenge is completed before the response is classified, so the caller never
    /// sees a `401`. The cookie jar is saved after every successful call.
    pub fn request(
        &self,
        method: Method,
        path: &str,
        params: Option<&Value>,
        options: Option<RequestOptions>,
    ) -> Result<Response, Error> {
        let base_url = self.base_url()?;
        let options = match options {
            Some(options) => options,
            None => self.default_options(&base_url)?,
        };
        let url = format!("{base_url}{path}");
        let client = options.build()?;
        let request = match method.as_str() {
            "GET" => client.get(&url),
            "POST" => client.post(&url),
            "PUT" => client.put(&url),
            "DELETE" => client.delete(&url),
            "PATCH" => client.patch(&url),
            _ => return Err(FatalError::UnsupportedMethod(method).into()),
        };
        let request = match params {
            Some(params) => request.json(params),
            None => request,
        };

        debug!("Sending {method} {url}");
        let response = Response::read(request.send()?)?;
        debug!("Received {} from {method} {path}", response.status());

        let response =
            two_factor::resolve(response, &base_url, &self.jar, self.code_source.as_ref())?;
        let response = classify(&method, path, response)?;
        self.jar.save()?;
        Ok(response)
    }

    pub fn get(&self, path: &str) -> Result<Response, Error> {
        self.request(Method::GET, path, None, None)
    }

    pub fn post(&self, path: &str, params: &Value) -> Result<Response, Error> {
        self.request(Method::POST, path, Some(params), None)
    }

    pub fn put(&self, path: &str, params: &Value) -> Result<Response, Error> {
        self.request(Method::PUT, path, Some(params), None)
    }

    pub fn patch(&self, path: &str, params: &Value) -> Result<Response, Error> {
        self.request(Method::PATCH, path, Some(params), None)
    }

    pub fn delete(&self, path: &str) -> Result<Response, Error> {
        self.request(Method::DELETE, path, None, None)
    }

    pub fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let response = self.get(path)?;
        decode(Method::GET, path, &response)
    }

    pub fn post_json<T: DeserializeOwned>(&self, path: &str, params: &Value) -> Result<T, Error> {
        let response = self.post(path, params)?;
        decode(Method::POST, path, &response)
    }
}

fn decode<T: DeserializeOwned>(method: Method, path: &str, response: &Response) -> Result<T, Error> {
    response.json().map_err(|source| Error::Decode {
        method,
        path: path.to_string(),
        source,
    })
}
