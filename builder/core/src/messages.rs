//! Builder Events
//!
//! Events sent from the [`SiteBuilder`](crate::SiteBuilder) to whatever surface
//! renders it (terminal, web page, test harness).
//!
//! # Design Philosophy
//!
//! The builder owns all state. Surfaces are renderers: they display the chat,
//! the live preview and the progress stage they are told about, and forward
//! user actions back as method calls. Every event here is also reflected in
//! the builder's read-only getters, so a surface that connects late can
//! render from a snapshot instead of replaying events.

use serde::{Deserialize, Serialize};

use crate::progress::ProgressStage;
use crate::refinement::RefinementRequest;
use crate::versions::VersionEntry;

/// Events from the builder to a surface
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BuilderEvent {
    // ============================================
    // Conversation
    // ============================================
    /// A message was appended to the conversation
    Message {
        /// Message ID
        id: MessageId,
        /// Who sent it
        role: MessageRole,
        /// Full content
        content: String,
    },

    /// A streamed fragment of the in-flight response
    Chunk {
        /// The decoded text fragment
        text: String,
    },

    /// The in-flight request failed
    StreamError {
        /// Human-readable error
        error: String,
    },

    // ============================================
    // Preview
    // ============================================
    /// The preview HTML changed
    Preview {
        /// Extracted HTML document
        html: String,
        /// Data URL encoding of `html`
        data_url: String,
    },

    // ============================================
    // Progress
    // ============================================
    /// The synthetic progress stage changed (`None` = hidden)
    Stage {
        /// The new stage
        stage: Option<ProgressStage>,
    },

    /// Builder state change
    State {
        /// The new state
        state: BuilderState,
    },

    // ============================================
    // History
    // ============================================
    /// A generation was committed to version history
    VersionSaved {
        /// The stored entry
        entry: VersionEntry,
    },

    /// A refinement cycle ended (successfully or not)
    RefinementFinished {
        /// Final snapshot of the refinement
        request: RefinementRequest,
    },

    /// The conversation was cleared ("new chat")
    Cleared,
}

/// Message identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        Self(format!("msg_{id}"))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who sent a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User input
    User,
    /// Generated response or builder notice
    Assistant,
}

impl MessageRole {
    /// Wire name used in the generation payload
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Request lifecycle states
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuilderState {
    /// No request in flight
    Idle,
    /// Request issued, no chunk received yet
    Sending,
    /// Chunks arriving
    Streaming,
    /// Completion handler running
    Finalizing,
    /// Request failed; returns to `Idle` once the error is recorded
    Errored,
}

impl BuilderState {
    /// Human-readable description
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Idle => "Ready",
            Self::Sending => "Sending...",
            Self::Streaming => "Generating...",
            Self::Finalizing => "Saving...",
            Self::Errored => "Error",
        }
    }

    /// Whether a request is in flight
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Sending | Self::Streaming | Self::Finalizing)
    }
}
