//! Builder Core - Headless Prompt-to-Website Engine
//!
//! This crate turns a conversation with a language model into a live HTML
//! preview and a short, persisted version history. It is completely
//! independent of any UI: a terminal, a web page or a test harness can drive
//! it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Surfaces                             │
//! │        CLI (site-builder)   │   Web page   │   Tests          │
//! │                             │                                │
//! │         method calls (down) │ BuilderEvent (up)              │
//! └─────────────────────────────┼────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────┼────────────────────────────────┐
//! │                        BUILDER CORE                          │
//! │  ┌──────────────────────────┴─────────────────────────────┐  │
//! │  │                      SiteBuilder                       │  │
//! │  │  ┌─────────┐  ┌──────────┐  ┌──────────┐  ┌─────────┐  │  │
//! │  │  │ Session │  │ Progress │  │ Versions │  │ Backend │  │  │
//! │  │  │         │  │  Driver  │  │  Store   │  │ (HTTP)  │  │  │
//! │  │  └─────────┘  └──────────┘  └──────────┘  └─────────┘  │  │
//! │  │                  extract_html (pure)                   │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use builder_core::{
//!     load_config, FileStorage, HttpBackend, SiteBuilder, VersionStore,
//! };
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let backend = HttpBackend::from_config(&config.api)?;
//!     let storage = FileStorage::new(config.resolved_data_dir().unwrap());
//!     let store = VersionStore::load(Arc::new(storage)).await;
//!
//!     let (tx, mut rx) = mpsc::channel(100);
//!     let mut builder = SiteBuilder::new(backend, store, &config, tx);
//!
//!     builder.send_message("A landing page for a bakery").await?;
//!     builder.await_response().await;
//!
//!     while let Ok(event) = rx.try_recv() {
//!         // Render event
//!     }
//!     println!("{}", builder.html_content().unwrap_or_default());
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: Generation endpoint abstraction and the HTTP streaming client
//! - [`builder`]: The [`SiteBuilder`] state machine
//! - [`config`]: TOML + environment configuration
//! - [`error`]: Error types
//! - [`extract`]: Incremental HTML extraction from streamed text
//! - [`messages`]: Events from the builder to surfaces
//! - [`models`]: Selectable model registry
//! - [`progress`]: Synthetic progress stages
//! - [`refinement`]: Refine-and-replace requests
//! - [`session`]: Conversation history
//! - [`versions`]: Capped version history and its storage

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod builder;
pub mod config;
pub mod error;
pub mod extract;
pub mod messages;
pub mod models;
pub mod progress;
pub mod refinement;
pub mod session;
pub mod versions;

// Re-exports for convenience
pub use backend::{drive_stream, GenerateRequest, GenerationBackend, HttpBackend, StreamChunk};
pub use builder::{SiteBuilder, COMPLETION_NOTICE};
pub use error::{BuilderError, StorageError, TransportError};
pub use extract::{extract_html, has_html_marker, to_data_url};
pub use messages::{BuilderEvent, BuilderState, MessageId, MessageRole};
pub use models::{all_models, find_model, resolve_model, ModelInfo, DEFAULT_MODEL};
pub use progress::{ProgressDriver, ProgressStage, ProgressTiming};
pub use refinement::{RefinementKind, RefinementRequest, RefinementStatus};
pub use session::{ChatTurn, ConversationMessage, Session};
pub use versions::{
    FileStorage, MemoryStorage, VersionEntry, VersionStorage, VersionStore, MAX_VERSIONS,
    VERSIONS_KEY,
};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ApiConfig, BuilderConfig,
    BuilderToml, ConfigError, ConfigOverrides, ConfigSource,
};
