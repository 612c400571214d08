//! Generation Backend Traits
//!
//! The builder talks to its generation endpoint through [`GenerationBackend`]
//! so the state machine can be driven by a real HTTP stream or by a scripted
//! test double without changing core logic.
//!
//! # Stream Contract
//!
//! A call to [`GenerationBackend::send_streaming`] yields zero or more
//! [`StreamChunk::Text`] in arrival order followed by exactly one terminal
//! chunk ([`StreamChunk::Complete`] or [`StreamChunk::Error`]). Nothing is
//! sent after the terminal chunk. Once the cancellation token fires, nothing
//! more is sent at all and the channel closes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::session::ChatTurn;

/// Stream events from a generation backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamChunk {
    /// A decoded text fragment
    Text(String),
    /// The body ended normally
    Complete,
    /// The request or the body read failed
    Error(TransportError),
}

impl StreamChunk {
    /// Whether this chunk ends the stream
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Text(_))
    }
}

/// Body of a generation request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Conversation history, oldest first, ending with the new user turn
    pub messages: Vec<ChatTurn>,
    /// Provider model identifier
    pub model: String,
    /// HTML being refined (refinements only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_html: Option<String>,
}

impl GenerateRequest {
    /// Create a request for `model` with the given history
    pub fn new(messages: Vec<ChatTurn>, model: impl Into<String>) -> Self {
        Self {
            messages,
            model: model.into(),
            existing_html: None,
        }
    }

    /// Attach HTML to refine
    #[must_use]
    pub fn with_existing_html(mut self, html: impl Into<String>) -> Self {
        self.existing_html = Some(html.into());
        self
    }
}

/// Generation backend
///
/// Implement this trait to plug a different endpoint or a test double into
/// the builder.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Check if the endpoint is reachable
    async fn health_check(&self) -> bool;

    /// Issue one generation request and stream its response
    ///
    /// Failures never surface as a `Result`: they arrive as the terminal
    /// [`StreamChunk::Error`] on the returned channel.
    async fn send_streaming(
        &self,
        request: &GenerateRequest,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<StreamChunk>;
}

/// Drive a chunk stream to its end through callbacks
///
/// `on_chunk` runs for every text fragment in order, then exactly one of
/// `on_complete`/`on_error`. If the channel closes without a terminal chunk
/// (the request was cancelled) no terminal callback runs.
pub async fn drive_stream<C, D, E>(
    mut rx: mpsc::Receiver<StreamChunk>,
    mut on_chunk: C,
    on_complete: D,
    on_error: E,
) where
    C: FnMut(String),
    D: FnOnce(),
    E: FnOnce(TransportError),
{
    while let Some(chunk) = rx.recv().await {
        match chunk {
            StreamChunk::Text(text) => on_chunk(text),
            StreamChunk::Complete => {
                on_complete();
                return;
            }
            StreamChunk::Error(e) => {
                on_error(e);
                return;
            }
        }
    }
    tracing::debug!("Stream closed without a terminal chunk");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::MessageRole;

    #[test]
    fn test_request_wire_format() {
        let request = GenerateRequest::new(
            vec![ChatTurn {
                role: MessageRole::User,
                content: "Build a landing page".into(),
            }],
            "openai/gpt-3.5-turbo",
        );
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "messages": [{"role": "user", "content": "Build a landing page"}],
                "model": "openai/gpt-3.5-turbo"
            })
        );

        let request = request.with_existing_html("<div>old</div>");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["existingHtml"], "<div>old</div>");
    }

    #[tokio::test]
    async fn test_drive_stream_order_and_single_terminal() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(StreamChunk::Text("a".into())).await.unwrap();
        tx.send(StreamChunk::Text("b".into())).await.unwrap();
        tx.send(StreamChunk::Complete).await.unwrap();
        // Anything after the terminal chunk is never observed
        tx.send(StreamChunk::Text("late".into())).await.unwrap();
        drop(tx);

        let mut chunks = Vec::new();
        let mut completed = 0;
        let mut errored = 0;
        drive_stream(
            rx,
            |t| chunks.push(t),
            || completed += 1,
            |_| errored += 1,
        )
        .await;

        assert_eq!(chunks, vec!["a", "b"]);
        assert_eq!(completed, 1);
        assert_eq!(errored, 0);
    }

    #[tokio::test]
    async fn test_drive_stream_error() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(StreamChunk::Text("partial".into())).await.unwrap();
        tx.send(StreamChunk::Error(TransportError::Read("reset".into())))
            .await
            .unwrap();
        drop(tx);

        let mut error = None;
        drive_stream(rx, |_| {}, || panic!("should not complete"), |e| error = Some(e)).await;
        assert_eq!(error, Some(TransportError::Read("reset".into())));
    }

    #[tokio::test]
    async fn test_drive_stream_cancelled_is_silent() {
        let (tx, rx) = mpsc::channel::<StreamChunk>(8);
        drop(tx);
        drive_stream(
            rx,
            |_| panic!("no chunks"),
            || panic!("no completion"),
            |_| panic!("no error"),
        )
        .await;
    }
}
