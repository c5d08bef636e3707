use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Url;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::opts::{Credentials, VisionConfig};
use crate::recognizer::{Recognition, TextRecognizer};
use crate::{Error, Result};

/// Text recognizer backed by the Google Cloud Vision `images:annotate` REST endpoint.
///
/// The client is built once and reused for every image. Requests are blocking and are not
/// retried.
pub struct VisionRecognizer {
    client: Client,
    config: VisionConfig,
}

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    requests: [ImageRequest<'a>; 1],
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    image: ImageContent,
    features: [Feature<'a>; 1],
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
struct Feature<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
    #[serde(default)]
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

impl VisionRecognizer {
    pub fn new(config: VisionConfig) -> Result<Self> {
        let mut builder =
            Client::builder().user_agent(concat!("rollcall/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?, config))
    }

    /// Use a preconfigured client, e.g. one with custom proxy or TLS settings.
    ///
    /// `config.timeout` is ignored here; set it on the client instead.
    pub fn with_client(client: Client, config: VisionConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    fn request_url(&self) -> Result<Url> {
        let base = self.config.annotate_url();
        let url = match &self.config.credentials {
            Credentials::ApiKey(key) => Url::parse_with_params(&base, [("key", key.as_str())]),
            Credentials::BearerToken(_) => Url::parse(&base),
        };
        url.map_err(|err| Error::msg(format!("invalid Vision endpoint '{base}': {err}")))
    }
}

impl TextRecognizer for VisionRecognizer {
    fn recognize(&self, image: &[u8]) -> Result<Recognition> {
        let body = AnnotateRequest {
            requests: [ImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(image),
                },
                features: [Feature {
                    kind: "TEXT_DETECTION",
                }],
            }],
        };

        let mut request = self.client.post(self.request_url()?).json(&body);
        if let Credentials::BearerToken(token) = &self.config.credentials {
            request = request.bearer_auth(token);
        }

        debug!(bytes = image.len(), "sending text detection request");
        let response = request.send()?;

        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(Error::provider(format!("HTTP {status}: {}", text.trim())));
        }

        let parsed: AnnotateResponse = serde_json::from_str(&text)?;
        interpret(parsed)
    }
}

/// Turn a decoded annotate response into a recognition outcome.
///
/// A provider-reported error takes priority over the text annotations; only an error-free
/// response without annotations counts as "no text".
fn interpret(response: AnnotateResponse) -> Result<Recognition> {
    let Some(first) = response.responses.into_iter().next() else {
        return Ok(Recognition::NoText);
    };

    if let Some(status) = first.error.filter(|s| !s.message.trim().is_empty()) {
        return Err(Error::provider(format!(
            "Vision API error {}: {}",
            status.code, status.message
        )));
    }

    let text = first
        .text_annotations
        .into_iter()
        .next()
        .map(|annotation| annotation.description);
    Ok(Recognition::from_text(text))
}
