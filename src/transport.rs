//! HTTP transport to the remote QR generation service

use crate::config::ServiceOptions;
use crate::error::{Error, Result};
use crate::request::QrRequest;
use serde::{Deserialize, Serialize};

/// JSON body returned by the generation service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceResponse {
    /// PNG bytes encoded as a hexadecimal string
    Generated {
        /// Hexadecimal image payload
        qr_code: String,
    },
    /// Server-side failure description
    Failed {
        /// Human readable message
        error: String,
    },
}

/// A remote service able to turn a request into a hexadecimal PNG payload
#[async_trait::async_trait]
pub trait QrService: Send + Sync {
    /// Perform exactly one generation attempt.
    async fn generate(&self, request: &QrRequest) -> Result<String>;
}

/// `reqwest` backed client posting multipart forms to the generate endpoint
#[derive(Debug, Clone)]
pub struct HttpQrService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpQrService {
    /// Build a client from service options.
    pub fn new(options: &ServiceOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(client, options.endpoint.clone()))
    }

    /// Use an existing client against the given endpoint.
    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Endpoint requests are posted to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl QrService for HttpQrService {
    async fn generate(&self, request: &QrRequest) -> Result<String> {
        let form = request.to_form().await?;

        tracing::info!(endpoint = %self.endpoint, url = request.target_url(), "Requesting QR code");

        // reqwest sets `multipart/form-data; boundary=...` from the form.
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(timeout = e.is_timeout(), "QR service request failed: {e}");
                Error::Transport { message: None }
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            tracing::warn!(%status, "Failed to read QR service response: {e}");
            Error::Transport { message: None }
        })?;

        interpret_response(status, &body)
    }
}

/// Normalise a raw service reply into the hexadecimal payload or an error.
///
/// Non-2xx replies become [`Error::Transport`] carrying the server's `error`
/// text when the body has one. 2xx replies without a usable `qr_code` become
/// [`Error::Decode`].
pub fn interpret_response(status: reqwest::StatusCode, body: &[u8]) -> Result<String> {
    let parsed = serde_json::from_slice::<ServiceResponse>(body);

    if !status.is_success() {
        let message = match parsed {
            Ok(ServiceResponse::Failed { error }) => Some(error),
            _ => None,
        };
        tracing::warn!(%status, message = message.as_deref(), "QR service rejected request");
        return Err(Error::Transport { message });
    }

    match parsed? {
        ServiceResponse::Generated { qr_code } if !qr_code.is_empty() => {
            tracing::debug!(%status, hex_len = qr_code.len(), "QR service responded");
            Ok(qr_code)
        }
        ServiceResponse::Generated { .. } => {
            Err(Error::Decode("Empty qr_code in response".to_string()))
        }
        ServiceResponse::Failed { error } => Err(Error::Decode(format!(
            "Response missing qr_code (server said: {error})"
        ))),
    }
}
