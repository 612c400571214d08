//! Site Builder - The Conversation/Response State Machine
//!
//! The `SiteBuilder` turns prompts into websites. It orchestrates:
//! - The conversation history sent with every request
//! - One streaming generation request at a time
//! - The live preview, refreshed as the HTML document streams in
//! - The synthetic progress stage shown while waiting
//! - Version history, written once per completed generation
//!
//! # Design Philosophy
//!
//! The builder is UI-agnostic. A terminal, a web page and a test harness all
//! drive it the same way: call an action (`send_message`,
//! `handle_refinement_request`, `clear_chat`, ...), then pump the response
//! with [`SiteBuilder::poll_streaming`] or [`SiteBuilder::await_response`].
//! Everything observable is both readable through getters and announced as a
//! [`BuilderEvent`].
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──send/refine──▶ Sending ──chunk──▶ Streaming ──complete──▶ Finalizing ──▶ Idle
//!                          │                   │
//!                          └──────error────────┴──▶ Errored ──▶ Idle
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::backend::{GenerateRequest, GenerationBackend, StreamChunk};
use crate::config::BuilderConfig;
use crate::error::{BuilderError, TransportError};
use crate::extract::{extract_html, to_data_url};
use crate::messages::{BuilderEvent, BuilderState, MessageRole};
use crate::models::{resolve_model, ModelInfo};
use crate::progress::{ProgressDriver, ProgressStage};
use crate::refinement::{RefinementKind, RefinementRequest};
use crate::session::{ConversationMessage, Session};
use crate::versions::{VersionEntry, VersionStore};

/// Assistant notice appended after every completed generation
pub const COMPLETION_NOTICE: &str =
    "Your website is ready! Check the preview to see it, or ask for changes.";

/// Refinement failure reason when the reply has no HTML document
const NO_DOCUMENT: &str = "response contained no HTML document";

/// The in-flight generation request
struct ActiveStream {
    rx: mpsc::Receiver<StreamChunk>,
    cancel: CancellationToken,
    /// Text that triggered the request, saved as the version description
    prompt: String,
}

/// The Site Builder - headless prompt-to-website core
pub struct SiteBuilder<B: GenerationBackend> {
    /// Generation backend
    backend: Arc<B>,
    /// Persisted version history
    store: VersionStore,
    /// Conversation history
    session: Session,
    /// Synthetic progress ticker
    progress: ProgressDriver,
    /// Current lifecycle state
    state: BuilderState,
    /// Selected model key
    model: String,
    /// Channel to the surface
    tx: mpsc::Sender<BuilderEvent>,
    /// Current streaming request
    stream: Option<ActiveStream>,
    /// Raw text of the in-flight response
    current_response: String,
    /// Latest extracted HTML
    html_content: Option<String>,
    /// Data URL of `html_content`
    data_url: Option<String>,
    /// Last request error
    error: Option<String>,
    /// The in-flight refinement, if the current request is one
    refinement: Option<RefinementRequest>,
}

impl<B: GenerationBackend + 'static> SiteBuilder<B> {
    /// Create a new builder with the given backend and version store
    pub fn new(
        backend: B,
        store: VersionStore,
        config: &BuilderConfig,
        tx: mpsc::Sender<BuilderEvent>,
    ) -> Self {
        Self {
            backend: Arc::new(backend),
            store,
            session: Session::new(),
            progress: ProgressDriver::with_events(config.progress, tx.clone()),
            state: BuilderState::Idle,
            model: config.default_model.clone(),
            tx,
            stream: None,
            current_response: String::new(),
            html_content: None,
            data_url: None,
            error: None,
            refinement: None,
        }
    }

    // ========================================================================
    // Observable state
    // ========================================================================

    /// Conversation so far, oldest first
    pub fn messages(&self) -> &[ConversationMessage] {
        self.session.all_messages()
    }

    /// Whether a request is in flight
    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    /// Current lifecycle state
    pub fn state(&self) -> BuilderState {
        self.state
    }

    /// Latest preview HTML
    pub fn html_content(&self) -> Option<&str> {
        self.html_content.as_deref()
    }

    /// Preview HTML as a `data:` URL
    pub fn data_url(&self) -> Option<&str> {
        self.data_url.as_deref()
    }

    /// Raw text received so far for the in-flight response
    pub fn current_response(&self) -> &str {
        &self.current_response
    }

    /// Current progress stage (`None` = hidden)
    pub fn current_stage(&self) -> Option<ProgressStage> {
        self.progress.current()
    }

    /// Watch progress stage changes, including timer-driven ones
    pub fn subscribe_progress(&self) -> watch::Receiver<Option<ProgressStage>> {
        self.progress.subscribe()
    }

    /// Last request error, cleared when the next request starts
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The in-flight refinement
    pub fn refinement(&self) -> Option<&RefinementRequest> {
        self.refinement.as_ref()
    }

    /// Selected model key
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Saved versions, most recent first
    pub fn versions(&self) -> &[VersionEntry] {
        self.store.versions()
    }

    /// Backend in use
    pub fn backend(&self) -> &B {
        &self.backend
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Send a user prompt
    ///
    /// # Errors
    ///
    /// - [`BuilderError::EmptyMessage`] for blank input
    /// - [`BuilderError::Busy`] while another request is in flight
    /// - [`BuilderError::ModelUnavailable`] if the selected model is unknown;
    ///   this is also reported in the conversation
    pub async fn send_message(&mut self, text: impl Into<String>) -> Result<(), BuilderError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(BuilderError::EmptyMessage);
        }
        self.ensure_idle()?;

        self.begin_request(text, None).await
    }

    /// Ask the model to rework existing HTML
    ///
    /// `prompt` defaults to the kind's built-in instruction. `original_html`
    /// defaults to the current preview.
    ///
    /// # Errors
    ///
    /// - [`BuilderError::Busy`] while another request is in flight
    /// - [`BuilderError::NothingToRefine`] with no HTML given and no preview
    /// - [`BuilderError::ModelUnavailable`] as for [`Self::send_message`]
    pub async fn handle_refinement_request(
        &mut self,
        kind: RefinementKind,
        prompt: Option<String>,
        original_html: Option<String>,
    ) -> Result<(), BuilderError> {
        self.ensure_idle()?;

        let original_html = original_html
            .filter(|html| !html.trim().is_empty())
            .or_else(|| self.html_content.clone())
            .ok_or(BuilderError::NothingToRefine)?;

        let mut request = RefinementRequest::new(kind, prompt, original_html);
        request.begin();
        let message = request.user_message();
        let existing_html = request.original_html.clone();
        tracing::info!(kind = %kind, "Starting refinement");
        self.refinement = Some(request);

        self.begin_request(message, Some(existing_html)).await
    }

    /// Start a new chat
    ///
    /// Cancels any in-flight request and clears the conversation, preview,
    /// error, stage and refinement. Version history is kept.
    pub async fn clear_chat(&mut self) {
        if let Some(active) = self.stream.take() {
            active.cancel.cancel();
        }
        self.session.clear_history();
        self.current_response.clear();
        self.html_content = None;
        self.data_url = None;
        self.error = None;
        self.refinement = None;
        self.progress.fail();

        self.send(BuilderEvent::Cleared).await;
        self.set_state(BuilderState::Idle).await;
    }

    /// Abandon the in-flight request, if any
    ///
    /// Returns whether a request was cancelled. Late chunks from the
    /// abandoned request are never applied.
    pub async fn cancel(&mut self) -> bool {
        let Some(active) = self.stream.take() else {
            return false;
        };
        active.cancel.cancel();
        tracing::info!("Generation cancelled");

        self.current_response.clear();
        self.progress.fail();
        if let Some(mut refinement) = self.refinement.take() {
            refinement.fail("Cancelled");
            self.send(BuilderEvent::RefinementFinished {
                request: refinement,
            })
            .await;
        }
        self.set_state(BuilderState::Idle).await;
        true
    }

    /// Show `html` in the preview
    pub async fn restore_html_content(&mut self, html: impl Into<String>) {
        self.set_preview(html.into()).await;
    }

    /// Show a saved version in the preview
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::VersionNotFound`] for an unknown ID.
    pub async fn restore_version(&mut self, id: &str) -> Result<(), BuilderError> {
        let html = self
            .store
            .get_version(id)
            .map(|v| v.html_content.clone())
            .ok_or_else(|| BuilderError::VersionNotFound(id.to_string()))?;
        tracing::debug!(id, "Restoring version");
        self.set_preview(html).await;
        Ok(())
    }

    /// Delete a saved version; returns whether it existed
    pub async fn delete_version(&mut self, id: &str) -> bool {
        self.store.delete_version(id).await
    }

    /// Select the model for subsequent requests
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::ModelUnavailable`] for an unknown key; the
    /// selection is left unchanged.
    pub fn set_model(&mut self, key: &str) -> Result<&'static ModelInfo, BuilderError> {
        let info = resolve_model(key)?;
        self.model = info.key.to_string();
        Ok(info)
    }

    // ========================================================================
    // Streaming
    // ========================================================================

    /// Poll for streamed chunks
    ///
    /// Call this regularly to apply incoming chunks without blocking.
    /// Returns true if there was activity.
    pub async fn poll_streaming(&mut self) -> bool {
        // First, collect all available chunks to avoid borrow issues
        let chunks: Vec<Option<StreamChunk>> = {
            let Some(active) = self.stream.as_mut() else {
                return false;
            };

            let mut collected = Vec::new();
            loop {
                match active.rx.try_recv() {
                    Ok(chunk) => {
                        let is_terminal = chunk.is_terminal();
                        collected.push(Some(chunk));
                        if is_terminal {
                            break;
                        }
                    }
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => {
                        collected.push(None);
                        break;
                    }
                }
            }
            collected
        };

        if chunks.is_empty() {
            return false;
        }

        for chunk in chunks {
            self.apply_chunk(chunk).await;
        }
        true
    }

    /// Drive the in-flight request until it completes, fails or is cancelled
    pub async fn await_response(&mut self) {
        while let Some(active) = self.stream.as_mut() {
            let chunk = active.rx.recv().await;
            self.apply_chunk(chunk).await;
        }
    }

    /// Apply one chunk; `None` means the stream closed without a terminal chunk
    async fn apply_chunk(&mut self, chunk: Option<StreamChunk>) {
        if self.stream.is_none() {
            return;
        }

        match chunk {
            Some(StreamChunk::Text(text)) => {
                if self.state == BuilderState::Sending {
                    self.set_state(BuilderState::Streaming).await;
                }
                self.current_response.push_str(&text);
                self.send(BuilderEvent::Chunk { text }).await;

                if let Some(html) = extract_html(&self.current_response) {
                    if self.html_content.as_deref() != Some(html.as_str()) {
                        self.set_preview(html).await;
                    }
                }
            }
            Some(StreamChunk::Complete) => self.finish_request().await,
            Some(StreamChunk::Error(e)) => self.fail_request(e.to_string()).await,
            None => {
                let e = TransportError::Read("stream closed before completion".to_string());
                self.fail_request(e.to_string()).await;
            }
        }
    }

    // ========================================================================
    // Request lifecycle
    // ========================================================================

    fn ensure_idle(&self) -> Result<(), BuilderError> {
        if self.stream.is_some() || self.state.is_loading() {
            tracing::debug!(state = ?self.state, "Rejecting request while busy");
            return Err(BuilderError::Busy);
        }
        Ok(())
    }

    /// Append the user turn and open the stream
    async fn begin_request(
        &mut self,
        text: String,
        existing_html: Option<String>,
    ) -> Result<(), BuilderError> {
        let message = self.session.add_user_message(text.clone()).clone();
        self.send(BuilderEvent::Message {
            id: message.id,
            role: MessageRole::User,
            content: message.content,
        })
        .await;

        self.current_response.clear();
        self.error = None;
        self.set_state(BuilderState::Sending).await;
        self.progress.start();

        let model = match resolve_model(&self.model) {
            Ok(model) => model,
            Err(e) => {
                tracing::warn!(model = %self.model, "Selected model is not available");
                self.fail_request(e.to_string()).await;
                return Err(e);
            }
        };

        let mut request = GenerateRequest::new(self.session.history(), model.id);
        if let Some(html) = existing_html {
            request = request.with_existing_html(html);
        }

        tracing::info!(
            model = model.id,
            backend = self.backend.name(),
            turns = request.messages.len(),
            "Sending generation request"
        );

        let cancel = CancellationToken::new();
        let rx = self.backend.send_streaming(&request, cancel.clone()).await;
        self.stream = Some(ActiveStream {
            rx,
            cancel,
            prompt: text,
        });
        Ok(())
    }

    /// Commit a completed response
    async fn finish_request(&mut self) {
        let Some(active) = self.stream.take() else {
            return;
        };
        self.set_state(BuilderState::Finalizing).await;

        let response = std::mem::take(&mut self.current_response);
        self.add_assistant_message(response.clone()).await;
        self.add_assistant_message(COMPLETION_NOTICE.to_string())
            .await;

        let html = extract_html(&response);
        match html {
            Some(ref html) => {
                self.set_preview(html.clone()).await;
                let entry = self
                    .store
                    .add_version(html.clone(), Some(active.prompt), None, None)
                    .await;
                self.send(BuilderEvent::VersionSaved { entry }).await;
            }
            None => {
                tracing::info!(
                    bytes = response.len(),
                    "Response contained no HTML document; no version saved"
                );
            }
        }

        if let Some(mut refinement) = self.refinement.take() {
            match html {
                Some(html) => refinement.complete(html),
                None => refinement.fail(NO_DOCUMENT),
            }
            self.send(BuilderEvent::RefinementFinished {
                request: refinement,
            })
            .await;
        }

        self.progress.complete();
        self.set_state(BuilderState::Idle).await;
    }

    /// Report a failed request in the conversation and return to idle
    async fn fail_request(&mut self, error: String) {
        if let Some(active) = self.stream.take() {
            active.cancel.cancel();
        }
        tracing::warn!(error = %error, "Generation failed");
        self.set_state(BuilderState::Errored).await;

        self.current_response.clear();
        self.add_assistant_message(format!(
            "Sorry, I couldn't generate the website: {error}. Please try again."
        ))
        .await;
        self.error = Some(error.clone());
        self.send(BuilderEvent::StreamError {
            error: error.clone(),
        })
        .await;

        self.progress.fail();
        if let Some(mut refinement) = self.refinement.take() {
            refinement.fail(error);
            self.send(BuilderEvent::RefinementFinished {
                request: refinement,
            })
            .await;
        }

        self.set_state(BuilderState::Idle).await;
    }

    async fn add_assistant_message(&mut self, content: String) {
        let message = self.session.add_assistant_message(content).clone();
        self.send(BuilderEvent::Message {
            id: message.id,
            role: MessageRole::Assistant,
            content: message.content,
        })
        .await;
    }

    async fn set_preview(&mut self, html: String) {
        let data_url = to_data_url(&html);
        self.html_content = Some(html.clone());
        self.data_url = Some(data_url.clone());
        self.send(BuilderEvent::Preview { html, data_url }).await;
    }

    /// Set state and notify the surface
    async fn set_state(&mut self, state: BuilderState) {
        self.state = state;
        self.send(BuilderEvent::State { state }).await;
    }

    /// Send an event to the surface
    async fn send(&self, event: BuilderEvent) {
        if let Err(e) = self.tx.send(event).await {
            tracing::warn!("Failed to send event to surface: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::versions::MemoryStorage;

    const PAGE: &str = "<!DOCTYPE html><html><body>Hi</body></html>";

    // Mock backend for testing
    struct MockBackend {
        script: Vec<StreamChunk>,
        requests: Mutex<Vec<GenerateRequest>>,
    }

    impl MockBackend {
        fn new(script: Vec<StreamChunk>) -> Self {
            Self {
                script,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl GenerationBackend for MockBackend {
        fn name(&self) -> &str {
            "Mock"
        }

        async fn health_check(&self) -> bool {
            true
        }

        async fn send_streaming(
            &self,
            request: &GenerateRequest,
            _cancel: CancellationToken,
        ) -> mpsc::Receiver<StreamChunk> {
            self.requests.lock().push(request.clone());
            let (tx, rx) = mpsc::channel(10);
            let script = self.script.clone();
            tokio::spawn(async move {
                for chunk in script {
                    let _ = tx.send(chunk).await;
                }
            });
            rx
        }
    }

    async fn new_builder(
        script: Vec<StreamChunk>,
    ) -> (SiteBuilder<MockBackend>, mpsc::Receiver<BuilderEvent>) {
        let (tx, rx) = mpsc::channel(256);
        let store = VersionStore::load(Arc::new(MemoryStorage::new())).await;
        let builder = SiteBuilder::new(
            MockBackend::new(script),
            store,
            &BuilderConfig::default(),
            tx,
        );
        (builder, rx)
    }

    fn text(s: &str) -> StreamChunk {
        StreamChunk::Text(s.to_string())
    }

    #[tokio::test]
    async fn test_builder_creation() {
        let (builder, _rx) = new_builder(vec![]).await;
        assert_eq!(builder.state(), BuilderState::Idle);
        assert!(!builder.is_loading());
        assert!(builder.messages().is_empty());
        assert_eq!(builder.model(), "gpt-3.5-turbo");
        assert!(builder.current_stage().is_none());
    }

    #[tokio::test]
    async fn test_send_message_happy_path() {
        let (mut builder, _rx) = new_builder(vec![text(PAGE), StreamChunk::Complete]).await;

        builder.send_message("Build a page").await.unwrap();
        assert!(builder.is_loading());
        assert_eq!(builder.current_stage(), Some(ProgressStage::Initializing));

        builder.await_response().await;

        assert_eq!(builder.state(), BuilderState::Idle);
        assert_eq!(builder.html_content(), Some(PAGE));
        assert!(builder.data_url().unwrap().starts_with("data:text/html"));
        assert_eq!(builder.current_response(), "");
        assert_eq!(builder.current_stage(), Some(ProgressStage::Complete));
        assert_eq!(builder.messages().len(), 3);
        assert_eq!(builder.messages()[1].content, PAGE);
        assert_eq!(builder.messages()[2].content, COMPLETION_NOTICE);
        assert_eq!(builder.versions().len(), 1);
        assert_eq!(
            builder.versions()[0].description.as_deref(),
            Some("Build a page")
        );
    }

    #[tokio::test]
    async fn test_request_carries_history_and_model_id() {
        let (mut builder, _rx) = new_builder(vec![text(PAGE), StreamChunk::Complete]).await;
        builder.send_message("first").await.unwrap();
        builder.await_response().await;
        builder.send_message("second").await.unwrap();
        builder.await_response().await;

        let requests = builder.backend().requests.lock();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].model, "openai/gpt-3.5-turbo");
        assert_eq!(requests[0].messages.len(), 1);
        // first prompt, response, notice, second prompt
        assert_eq!(requests[1].messages.len(), 4);
        assert_eq!(requests[1].messages[3].content, "second");
        assert!(requests[1].existing_html.is_none());
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let (mut builder, _rx) = new_builder(vec![]).await;
        assert_eq!(
            builder.send_message("   ").await,
            Err(BuilderError::EmptyMessage)
        );
        assert!(builder.messages().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_resets_to_idle() {
        let (mut builder, _rx) = new_builder(vec![
            text("partial"),
            StreamChunk::Error(TransportError::Status {
                status: 429,
                message: "Rate limit exceeded".into(),
            }),
        ])
        .await;

        builder.send_message("Build a page").await.unwrap();
        builder.await_response().await;

        assert!(!builder.is_loading());
        assert_eq!(builder.error(), Some("Rate limit exceeded"));
        assert!(builder.current_stage().is_none());
        assert_eq!(builder.current_response(), "");
        assert!(builder.versions().is_empty());
        let last = builder.messages().last().unwrap();
        assert_eq!(last.role, MessageRole::Assistant);
        assert!(last.content.contains("Rate limit exceeded"));
    }

    #[tokio::test]
    async fn test_unknown_model_surfaces_in_chat() {
        let (mut builder, _rx) = new_builder(vec![]).await;
        builder.model = "gpt-9".to_string();

        let result = builder.send_message("Build a page").await;
        assert_eq!(result, Err(BuilderError::ModelUnavailable("gpt-9".into())));
        assert_eq!(builder.state(), BuilderState::Idle);
        assert!(builder.error().unwrap().contains("gpt-9"));
        assert_eq!(builder.messages().len(), 2);
        assert!(builder.backend().requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_set_model_validates() {
        let (mut builder, _rx) = new_builder(vec![]).await;
        assert_err!(builder.set_model("nope"));
        assert_eq!(builder.model(), "gpt-3.5-turbo");
        let info = assert_ok!(builder.set_model("gpt-4o"));
        assert_eq!(info.id, "openai/gpt-4o");
        assert_eq!(builder.model(), "gpt-4o");
    }

    #[tokio::test]
    async fn test_refinement_without_html_rejected() {
        let (mut builder, _rx) = new_builder(vec![]).await;
        let result = builder
            .handle_refinement_request(RefinementKind::Style, None, None)
            .await;
        assert_eq!(result, Err(BuilderError::NothingToRefine));
        assert!(builder.messages().is_empty());
    }

    #[tokio::test]
    async fn test_refinement_uses_preview_and_default_prompt() {
        let (mut builder, _rx) = new_builder(vec![text(PAGE), StreamChunk::Complete]).await;
        builder.restore_html_content("<div>old</div>").await;

        builder
            .handle_refinement_request(RefinementKind::Accessibility, None, None)
            .await
            .unwrap();
        assert_eq!(
            builder.refinement().map(|r| r.kind),
            Some(RefinementKind::Accessibility)
        );
        builder.await_response().await;

        assert!(builder.refinement().is_none());
        let requests = builder.backend().requests.lock();
        assert_eq!(requests[0].existing_html.as_deref(), Some("<div>old</div>"));
        assert_eq!(
            requests[0].messages[0].content,
            RefinementKind::Accessibility.default_instruction()
        );
    }

    #[tokio::test]
    async fn test_restore_unknown_version() {
        let (mut builder, _rx) = new_builder(vec![]).await;
        assert_eq!(
            builder.restore_version("v_0_0").await,
            Err(BuilderError::VersionNotFound("v_0_0".into()))
        );
    }

    #[tokio::test]
    async fn test_events_announce_lifecycle() {
        let (mut builder, mut rx) = new_builder(vec![text(PAGE), StreamChunk::Complete]).await;
        builder.send_message("Build a page").await.unwrap();
        builder.await_response().await;

        let mut states = Vec::new();
        let mut saved = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                BuilderEvent::State { state } => states.push(state),
                BuilderEvent::VersionSaved { .. } => saved += 1,
                _ => {}
            }
        }
        assert_eq!(
            states,
            vec![
                BuilderState::Sending,
                BuilderState::Streaming,
                BuilderState::Finalizing,
                BuilderState::Idle
            ]
        );
        assert_eq!(saved, 1);
    }

    #[tokio::test]
    async fn test_refinement_without_document_fails_and_keeps_preview() {
        let (mut builder, mut rx) =
            new_builder(vec![text("I could not change that."), StreamChunk::Complete]).await;
        builder.restore_html_content("<div>old</div>").await;

        builder
            .handle_refinement_request(RefinementKind::Style, None, None)
            .await
            .unwrap();
        builder.await_response().await;

        assert_eq!(builder.html_content(), Some("<div>old</div>"));
        assert!(builder.versions().is_empty());
        assert!(builder.refinement().is_none());

        let mut finished = None;
        while let Ok(event) = rx.try_recv() {
            if let BuilderEvent::RefinementFinished { request } = event {
                finished = Some(request);
            }
        }
        let finished = finished.unwrap();
        assert_eq!(finished.status, crate::refinement::RefinementStatus::Failed);
        assert_eq!(finished.error.as_deref(), Some(NO_DOCUMENT));
        assert!(finished.refined_html.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_subscription_sees_timer_ticks() {
        // Empty script: the request stays in flight until cancelled
        let (mut builder, _rx) = new_builder(vec![]).await;
        builder.send_message("Build a page").await.unwrap();

        let mut stages = builder.subscribe_progress();
        assert_eq!(*stages.borrow(), Some(ProgressStage::Initializing));

        stages.changed().await.unwrap();
        assert_eq!(*stages.borrow_and_update(), Some(ProgressStage::Scaffolding));
        stages.changed().await.unwrap();
        assert_eq!(*stages.borrow_and_update(), Some(ProgressStage::Layout));

        builder.cancel().await;
        stages.changed().await.unwrap();
        assert_eq!(*stages.borrow_and_update(), None);
    }
}
