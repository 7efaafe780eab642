//! [`HttpTransport`]: the reqwest-backed transport.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::debug;
use trailguard_core::{ApiError, ApiRequest, FilePart, Method, RequestBody, ValidationError};

use crate::application::api::ApiTransport;
use crate::infrastructure::storage::config::ApiConfig;

/// Sends requests to the back end at a fixed base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Builds a transport from the `[api]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the client cannot be built (for example
    /// when no TLS backend can be initialised).
    pub fn new(config: &ApiConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<serde_json::Value, ApiError> {
        debug!(request = %request, "sending");
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };
        let builder = self
            .http
            .request(method, self.url(&request.path))
            .query(&request.query);
        let builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Multipart(parts) => builder.multipart(multipart_form(parts)?),
        };

        let resp = builder.send().await.map_err(network_error)?;
        let resp = check_response(resp).await?;
        let bytes = resp.bytes().await.map_err(network_error)?;
        if bytes.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Maps a non-2xx response to [`ApiError::Server`], passing 2xx through.
///
/// # Errors
///
/// [`ApiError::Server`] carrying the status and the FastAPI `detail` (or the
/// raw body).
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::from_response(status.as_u16(), &body))
}

fn multipart_form(parts: Vec<FilePart>) -> Result<Form, ApiError> {
    parts.into_iter().try_fold(Form::new(), |form, part| {
        let invalid = ValidationError::InvalidContentType {
            name: part.file_name.clone(),
            content_type: part.content_type.clone(),
        };
        let file = Part::bytes(part.bytes)
            .file_name(part.file_name)
            .mime_str(&part.content_type)
            .map_err(|_| invalid)?;
        Ok(form.part(part.field, file))
    })
}

fn network_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Network(format!("request timed out: {err}"))
    } else {
        ApiError::Network(err.to_string())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
