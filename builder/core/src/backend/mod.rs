//! Generation Backend Integration
//!
//! Access to the website generation endpoint through a common trait.
//!
//! # Available Backends
//!
//! - **HTTP**: streams from `POST {base_url}/api/generate`
//!
//! # Usage
//!
//! ```ignore
//! use builder_core::backend::{GenerateRequest, GenerationBackend, HttpBackend};
//!
//! let backend = HttpBackend::new("http://localhost:3000", Duration::from_secs(300))?;
//! let request = GenerateRequest::new(history, "openai/gpt-3.5-turbo");
//! let rx = backend.send_streaming(&request, CancellationToken::new()).await;
//! ```

mod http;
mod traits;

pub use http::HttpBackend;
pub use traits::{drive_stream, GenerateRequest, GenerationBackend, StreamChunk};
