//! URL parsing for storage backends.
//!
//! A manifest's `base_url` is either an HTTP(S) prefix or a local directory.

use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::error::{InvalidUrlSnafu, StorageError};

const HTTP_URL: &str = r"^(?P<url>https?://[^/\s]+(/\S*)?)$";

const FILE_URI: &str = r"^file://(?P<path>.*)$";
const FILE_URL: &str = r"^file:(?P<path>.*)$";
const FILE_PATH: &str = r"^/(?P<path>.*)$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Http,
    Local,
}

fn matchers() -> &'static [(Backend, Vec<Regex>)] {
    static MATCHERS: OnceLock<Vec<(Backend, Vec<Regex>)>> = OnceLock::new();
    MATCHERS.get_or_init(|| {
        let compile = |patterns: &[&str]| {
            patterns
                .iter()
                .map(|p| Regex::new(p).expect("storage URL patterns are valid"))
                .collect::<Vec<_>>()
        };
        vec![
            (Backend::Http, compile(&[HTTP_URL])),
            (Backend::Local, compile(&[FILE_URI, FILE_URL, FILE_PATH])),
        ]
    })
}

/// HTTP(S) backend configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Base URL without a trailing slash.
    pub url: String,
}

/// Local filesystem configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    /// Absolute directory path without a trailing slash (except for `/`).
    pub path: String,
}

/// Backend configuration enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Http(HttpConfig),
    Local(LocalConfig),
}

impl BackendConfig {
    /// Parse a URL into a backend configuration.
    pub fn parse_url(url: &str) -> Result<Self, StorageError> {
        for (backend, regexes) in matchers() {
            if let Some(caps) = regexes.iter().find_map(|r| r.captures(url)) {
                return match backend {
                    Backend::Http => Ok(Self::parse_http(&caps)),
                    Backend::Local => Ok(Self::parse_local(&caps)),
                };
            }
        }

        InvalidUrlSnafu {
            url: url.to_string(),
        }
        .fail()
    }

    fn parse_http(caps: &Captures) -> Self {
        let url = caps["url"].trim_end_matches('/').to_string();
        BackendConfig::Http(HttpConfig { url })
    }

    fn parse_local(caps: &Captures) -> Self {
        let raw = &caps["path"];
        let path = format!("/{}", raw.trim_start_matches('/'));
        let path = match path.trim_end_matches('/') {
            "" => "/".to_string(),
            trimmed => trimmed.to_string(),
        };
        BackendConfig::Local(LocalConfig { path })
    }

    /// Canonical form used in logs.
    pub fn canonical_url(&self) -> String {
        match self {
            BackendConfig::Http(http) => http.url.clone(),
            BackendConfig::Local(local) => format!("file://{}", local.path),
        }
    }
}
