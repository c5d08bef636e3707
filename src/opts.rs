use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result};

/// Default base URL of the Google Cloud Vision REST API.
pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com";

/// Authentication material for the OCR provider.
///
/// This is an explicit value handed to the recognizer constructor; nothing is read from or
/// written to process-wide state.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// API key sent as the `key` query parameter.
    ApiKey(String),

    /// OAuth2 access token sent as an `Authorization: Bearer` header.
    BearerToken(String),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secrets.
        match self {
            Self::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            Self::BearerToken(_) => f.write_str("BearerToken(<redacted>)"),
        }
    }
}

#[derive(Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

impl Credentials {
    /// Pick credentials from the usual sources, in precedence order.
    ///
    /// A non-blank API key wins, then a non-blank access token, then the credentials file.
    /// Returns `Ok(None)` when nothing was supplied.
    pub fn resolve(
        api_key: Option<&str>,
        access_token: Option<&str>,
        file: Option<&Path>,
    ) -> Result<Option<Self>> {
        let non_blank = |v: Option<&str>| v.filter(|s| !s.trim().is_empty()).map(str::to_owned);

        if let Some(key) = non_blank(api_key) {
            return Ok(Some(Self::ApiKey(key)));
        }
        if let Some(token) = non_blank(access_token) {
            return Ok(Some(Self::BearerToken(token)));
        }
        file.map(Self::from_file).transpose()
    }

    /// Load credentials from a JSON file holding either `api_key` or `access_token`.
    ///
    /// When both are present the API key wins.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: CredentialsFile = serde_json::from_str(raw)?;
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        if let Some(key) = non_empty(file.api_key) {
            return Ok(Self::ApiKey(key));
        }
        if let Some(token) = non_empty(file.access_token) {
            return Ok(Self::BearerToken(token));
        }
        Err(Error::msg(
            "credentials file must contain a non-empty `api_key` or `access_token`",
        ))
    }
}

/// Configuration for the Vision text recognizer.
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// Base URL; `/v1/images:annotate` is appended.
    pub endpoint: String,

    pub credentials: Credentials,

    /// Optional per-request timeout. `None` leaves requests unbounded.
    pub timeout: Option<Duration>,
}

impl VisionConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            endpoint: DEFAULT_VISION_ENDPOINT.to_owned(),
            credentials,
            timeout: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Full annotate URL for this endpoint.
    pub fn annotate_url(&self) -> String {
        format!("{}/v1/images:annotate", self.endpoint.trim_end_matches('/'))
    }
}

/// Options that control a batch run over a folder of images.
///
/// This is library-level configuration; the CLI maps its flags onto it.
#[derive(Debug, Clone)]
pub struct BatchOpts {
    /// Process files in file-name order instead of directory-listing order.
    ///
    /// Directory order is platform dependent, and with last-write-wins merging it decides
    /// which image a repeated room comes from.
    pub sort_inputs: bool,

    /// Abort the whole batch on the first per-image failure instead of skipping the image.
    pub fail_fast: bool,
}

impl Default for BatchOpts {
    fn default() -> Self {
        Self {
            sort_inputs: true,
            fail_fast: false,
        }
    }
}
