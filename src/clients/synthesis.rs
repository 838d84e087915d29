//! Image-edit client: one multipart request per composite image.
//!
//! Upstream latency is typically 60-180 seconds, so the configured timeout
//! is generous and a timeout is reported distinctly from other failures.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};

use super::{transport_error, ImageSynthesizer};
use crate::error::ToolError;
use crate::image::{ImageFormat, SourceImage, SynthesizedImage};

/// Connection settings for the image-edit service.
#[derive(Debug, Clone)]
pub struct SynthesisSettings {
    /// Base URL up to and including the API version (e.g. `.../v1`).
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

/// Client for the image-edit call.
pub struct SynthesisClient {
    http: reqwest::Client,
    settings: SynthesisSettings,
}

impl SynthesisClient {
    pub fn new(settings: SynthesisSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("Failed to build HTTP client for the image service")?;
        Ok(Self { http, settings })
    }

    fn endpoint(&self) -> String {
        format!("{}/images/edits", self.settings.base_url.trim_end_matches('/'))
    }

    fn image_part(image: &SourceImage, name: &str) -> Result<Part, ToolError> {
        Part::bytes(image.bytes().to_vec())
            .file_name(format!("{name}.{}", image.format().extension()))
            .mime_str(image.format().mime())
            .map_err(|e| ToolError::InvalidInput(format!("{name} image part: {e}")))
    }

    async fn download(&self, url: &str) -> Result<(Vec<u8>, Option<String>), ToolError> {
        debug!(%url, "downloading synthesized image");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(e, self.settings.timeout))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::upstream(
                Some(status.as_u16()),
                format!("image download from {url} failed"),
            ));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, self.settings.timeout))?;
        Ok((bytes.to_vec(), content_type))
    }
}

/// Either of the response shapes image endpoints use.
#[derive(Debug, Deserialize)]
pub(crate) struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
    #[serde(default)]
    images: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageData {
    url: Option<String>,
    b64_json: Option<String>,
    content_type: Option<String>,
}

impl ImageResponse {
    fn first(self) -> Option<ImageData> {
        self.data.into_iter().chain(self.images).next()
    }
}

/// Picks the output format from a declared MIME type, falling back to magic bytes.
fn resolve_format(bytes: &[u8], declared: Option<&str>) -> Result<ImageFormat, ToolError> {
    declared
        .and_then(ImageFormat::from_mime)
        .filter(|f| ImageFormat::detect(bytes).map_or(true, |sniffed| sniffed == *f))
        .or_else(|| ImageFormat::detect(bytes))
        .ok_or_else(|| ToolError::upstream(None, "synthesized image has an unknown format"))
}

#[async_trait]
impl ImageSynthesizer for SynthesisClient {
    async fn synthesize(
        &self,
        prompt: &str,
        person: &SourceImage,
        product: &SourceImage,
    ) -> Result<SynthesizedImage, ToolError> {
        if prompt.trim().is_empty() {
            return Err(ToolError::InvalidInput("prompt is empty".into()));
        }
        for (role, image) in [("person", person), ("product", product)] {
            if image.bytes().is_empty() || !image.format().is_source_format() {
                return Err(ToolError::InvalidInput(format!(
                    "{role} image must be a non-empty JPEG or PNG"
                )));
            }
        }

        let form = Form::new()
            .text("model", self.settings.model.clone())
            .text("prompt", prompt.to_string())
            .text("response_format", "b64_json")
            .part("image[]", Self::image_part(person, "person")?)
            .part("image[]", Self::image_part(product, "product")?);

        info!(model = %self.settings.model, prompt_len = prompt.len(), "requesting image synthesis");
        let mut request = self.http.post(self.endpoint()).multipart(form);
        if let Some(key) = &self.settings.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(e, self.settings.timeout))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, self.settings.timeout))?;
        if !status.is_success() {
            return Err(ToolError::upstream(Some(status.as_u16()), body));
        }

        let parsed: ImageResponse = serde_json::from_str(&body).map_err(|e| {
            ToolError::upstream(Some(status.as_u16()), format!("malformed response: {e}"))
        })?;
        let data = parsed
            .first()
            .ok_or_else(|| ToolError::upstream(Some(status.as_u16()), "response has no images"))?;

        let (bytes, declared) = match (data.b64_json, data.url) {
            (Some(b64), _) => {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(b64.trim())
                    .map_err(|e| ToolError::upstream(None, format!("invalid base64 image: {e}")))?;
                (bytes, data.content_type)
            }
            (None, Some(url)) => {
                let (bytes, header) = self.download(&url).await?;
                (bytes, data.content_type.or(header))
            }
            (None, None) => {
                return Err(ToolError::upstream(
                    Some(status.as_u16()),
                    "image entry has neither b64_json nor url",
                ))
            }
        };
        if bytes.is_empty() {
            return Err(ToolError::upstream(None, "synthesized image is empty"));
        }

        let format = resolve_format(&bytes, declared.as_deref())?;
        debug!(size = bytes.len(), format = format.extension(), "image synthesized");
        Ok(SynthesizedImage { format, bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3];

    fn client() -> SynthesisClient {
        SynthesisClient::new(SynthesisSettings {
            base_url: "http://127.0.0.1:9/v1/".into(),
            api_key: None,
            model: "m".into(),
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        assert_eq!(client().endpoint(), "http://127.0.0.1:9/v1/images/edits");
    }

    #[test]
    fn test_response_shapes() {
        let openai: ImageResponse =
            serde_json::from_str(r#"{"created": 1, "data": [{"b64_json": "aGk="}]}"#).unwrap();
        assert_eq!(openai.first().unwrap().b64_json.as_deref(), Some("aGk="));

        let gateway: ImageResponse = serde_json::from_str(
            r#"{"images": [{"url": "https://x/y.png", "content_type": "image/png"}]}"#,
        )
        .unwrap();
        let first = gateway.first().unwrap();
        assert_eq!(first.url.as_deref(), Some("https://x/y.png"));
        assert_eq!(first.content_type.as_deref(), Some("image/png"));

        let empty: ImageResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.first().is_none());
    }

    #[test]
    fn test_resolve_format_prefers_bytes_over_wrong_header() {
        assert_eq!(resolve_format(PNG, Some("image/png")).unwrap(), ImageFormat::Png);
        assert_eq!(resolve_format(JPEG, Some("image/png")).unwrap(), ImageFormat::Jpeg);
        assert_eq!(resolve_format(JPEG, None).unwrap(), ImageFormat::Jpeg);
        assert!(resolve_format(b"????", None).is_err());
    }

    #[tokio::test]
    async fn test_invalid_input_fails_fast() {
        let person = SourceImage::decode("person", PNG.to_vec(), None).unwrap();
        let product = SourceImage::decode("product", JPEG.to_vec(), None).unwrap();
        let err = client().synthesize("  ", &person, &product).await.unwrap_err();
        assert_eq!(err, ToolError::InvalidInput("prompt is empty".into()));
    }
}
