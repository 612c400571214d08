//! HTTP Generation Backend
//!
//! Posts the conversation to `{base_url}/api/generate` and streams the raw
//! response body back as text fragments.
//!
//! # Endpoint
//!
//! - `POST /api/generate` with `{ messages, model, existingHtml? }`
//! - Success: a plain text body, streamed as the model produces it
//! - Failure: any non-2xx status, optionally with a JSON `error`/`message`

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::traits::{GenerateRequest, GenerationBackend, StreamChunk};
use crate::config::ApiConfig;
use crate::error::TransportError;

/// Channel capacity between the body reader and the builder
const CHUNK_BUFFER: usize = 100;

/// HTTP backend client
#[derive(Clone)]
pub struct HttpBackend {
    /// Base URL of the generation service (no trailing slash)
    base_url: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend for `base_url` with an overall request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Create from the `[api]` config section
    pub fn from_config(config: &ApiConfig) -> anyhow::Result<Self> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    /// Base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get generate endpoint URL
    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(&self.base_url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .is_ok()
    }

    async fn send_streaming(
        &self,
        request: &GenerateRequest,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<StreamChunk> {
        let (tx, rx) = mpsc::channel(CHUNK_BUFFER);

        let client = self.http_client.clone();
        let url = self.generate_url();
        let request = request.clone();

        tracing::debug!(
            url = %url,
            model = %request.model,
            messages = request.messages.len(),
            refinement = request.existing_html.is_some(),
            "Opening generation stream"
        );

        // Spawn task to process stream
        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::debug!("Generation stream cancelled");
                    return;
                }
                outcome = pump(&client, &url, &request, &tx) => outcome,
            };

            let terminal = match outcome {
                Ok(()) => StreamChunk::Complete,
                Err(e) => {
                    tracing::warn!(error = %e, "Generation stream failed");
                    StreamChunk::Error(e)
                }
            };
            if !cancel.is_cancelled() {
                let _ = tx.send(terminal).await;
            }
        });

        rx
    }
}

/// Send the request and forward decoded body fragments until end of stream
async fn pump(
    client: &reqwest::Client,
    url: &str,
    request: &GenerateRequest,
    tx: &mpsc::Sender<StreamChunk>,
) -> Result<(), TransportError> {
    let response = client
        .post(url)
        .json(request)
        .send()
        .await
        .map_err(|e| TransportError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TransportError::Status {
            status: status.as_u16(),
            message: error_message(status.as_u16(), &body),
        });
    }

    let mut stream = response.bytes_stream();
    let mut decoder = Utf8Decoder::default();
    let mut received = 0usize;

    while let Some(chunk) = stream.next().await {
        let bytes = chunk.map_err(|e| TransportError::Read(e.to_string()))?;
        received += bytes.len();
        let text = decoder.push(&bytes);
        if !text.is_empty() && tx.send(StreamChunk::Text(text)).await.is_err() {
            // Receiver dropped, stop streaming
            return Ok(());
        }
    }

    if received == 0 {
        return Err(TransportError::MissingBody);
    }

    let rest = decoder.finish();
    if !rest.is_empty() {
        let _ = tx.send(StreamChunk::Text(rest)).await;
    }

    tracing::debug!(bytes = received, "Generation stream finished");
    Ok(())
}

/// Human-readable message for a failed response
///
/// Prefers a JSON `error` (string or `{message}`) or `message` field, then
/// the raw body, then a generic status line.
pub(crate) fn error_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let field = value
            .get("error")
            .and_then(|e| e.as_str().or_else(|| e.get("message")?.as_str()))
            .or_else(|| value.get("message").and_then(|m| m.as_str()));
        if let Some(message) = field.filter(|m| !m.trim().is_empty()) {
            return message.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("Request failed with status {status}")
    } else {
        trimmed.to_string()
    }
}

/// Incremental UTF-8 decoder
///
/// Holds back an incomplete trailing sequence until the next read completes
/// it. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub(crate) struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Feed bytes, returning everything that decodes completely
    pub(crate) fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(s) => {
                    out.push_str(s);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    match e.error_len() {
                        // Incomplete sequence at the end: keep it for later
                        None => {
                            out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                            self.pending.drain(..valid);
                            break;
                        }
                        Some(bad) => {
                            out.push_str(&String::from_utf8_lossy(&self.pending[..valid + bad]));
                            self.pending.drain(..valid + bad);
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush whatever is left at end of stream
    pub(crate) fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}
