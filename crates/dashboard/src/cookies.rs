//! Cookie jar that survives across process invocations.
//!
//! The jar is read fully when opened and written fully when saved; nothing coordinates concurrent
//! processes beyond the atomic replacement of the file.
use std::{
    fmt::{Debug, Formatter},
    fs::{self, File},
    io::{self, BufReader},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
};

use cookie::Cookie;
use cookie_store::CookieStore;
use log::debug;
use reqwest::header::HeaderValue;
use url::Url;

pub const XSRF_COOKIE_NAME: &str = "XSRF-TOKEN";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    #[error("Failed to create the directory {path:?}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to read cookies from {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse cookies from {path:?}, consider removing it")]
    Parse {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
    #[error("Failed to serialize cookies")]
    Serialize(#[source] BoxError),
    #[error("Failed to write cookies to {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// File-backed cookie jar that can be plugged into a reqwest client.
pub struct CookieJar {
    path: PathBuf,
    store: Mutex<CookieStore>,
    saves: AtomicUsize,
}

impl CookieJar {
    /// Open the jar stored at `path`, creating its directory if needed.
    ///
    /// A missing file yields an empty jar.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CookieError> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| CookieError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let store = match File::open(&path) {
            Ok(file) => cookie_store::serde::json::load(BufReader::new(file)).map_err(|source| {
                CookieError::Parse {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{path:?} not found, starting with an empty jar");
                CookieStore::default()
            }
            Err(source) => return Err(CookieError::Read { path, source }),
        };
        Ok(Self {
            path,
            store: Mutex::new(store),
            saves: AtomicUsize::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write every cookie, including session cookies, back to the file.
    ///
    /// The content is written to a sibling file first and then renamed over the old one.
    pub fn save(&self) -> Result<(), CookieError> {
        let mut content = Vec::new();
        cookie_store::serde::json::save_incl_expired_and_nonpersistent(
            &self.lock(),
            &mut content,
        )
        .map_err(CookieError::Serialize)?;
        let staging = self.path.with_extension("tmp");
        let written = fs::write(&staging, content).and_then(|()| {
            fs::rename(&staging, &self.path).inspect_err(|_| {
                if let Err(e) = fs::remove_file(&staging) {
                    debug!("Could not remove {staging:?} because {e}");
                }
            })
        });
        written.map_err(|source| CookieError::Write {
            path: self.path.clone(),
            source,
        })?;
        self.saves.fetch_add(1, Ordering::Relaxed);
        debug!("Saved cookies to {:?}", self.path);
        Ok(())
    }

    /// Number of successful saves since the jar was opened.
    #[cfg(test)]
    pub(crate) fn saves(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }

    /// Value of the cookie called `name` that would be sent to `url`.
    pub fn get(&self, url: &Url, name: &str) -> Option<String> {
        self.lock()
            .get_request_values(url)
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.to_string())
    }

    pub fn xsrf_token(&self, url: &Url) -> Option<String> {
        self.get(url, XSRF_COOKIE_NAME)
    }

    /// Store a cookie as if it had been received in a `Set-Cookie` header from `url`.
    pub fn insert(&self, set_cookie: &str, url: &Url) -> Result<(), cookie::ParseError> {
        let cookie = Cookie::parse(set_cookie.to_string())?;
        self.lock().store_response_cookies(std::iter::once(cookie), url);
        Ok(())
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Forget all cookies and delete the backing file.
    pub fn remove_file(&self) -> Result<(), CookieError> {
        self.clear();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CookieError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CookieStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Debug for CookieJar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieJar")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl reqwest::cookie::CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let cookies = cookie_headers
            .filter_map(|h| h.to_str().ok())
            .filter_map(|s| Cookie::parse(s.to_string()).ok());
        self.lock().store_response_cookies(cookies, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let header = self
            .lock()
            .get_request_values(url)
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        if header.is_empty() {
            return None;
        }
        HeaderValue::from_str(&header).ok()
    }
}
