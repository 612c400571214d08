//! Refinement Requests
//!
//! A refinement asks the model to rework HTML it already produced. The
//! builder keeps exactly one [`RefinementRequest`] for the in-flight cycle;
//! there is no separate refinement history.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What aspect of the page to refine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefinementKind {
    /// Visual design
    Style,
    /// Behavior and features
    Functionality,
    /// Accessibility compliance
    Accessibility,
    /// Load and runtime performance
    Performance,
    /// Free-form instruction
    Custom,
}

impl RefinementKind {
    /// All refinement kinds
    pub const ALL: [RefinementKind; 5] = [
        Self::Style,
        Self::Functionality,
        Self::Accessibility,
        Self::Performance,
        Self::Custom,
    ];

    /// Stable name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Style => "style",
            Self::Functionality => "functionality",
            Self::Accessibility => "accessibility",
            Self::Performance => "performance",
            Self::Custom => "custom",
        }
    }

    /// Instruction used when the user supplies no prompt
    #[must_use]
    pub fn default_instruction(&self) -> &'static str {
        match self {
            Self::Style => {
                "Improve the visual design of this website: refine the color palette, \
                 typography, spacing and layout so it looks modern and polished."
            }
            Self::Functionality => {
                "Improve the functionality of this website: add useful interactive \
                 features and make sure all existing controls work."
            }
            Self::Accessibility => {
                "Improve the accessibility of this website: use semantic HTML, add ARIA \
                 attributes and alt text, ensure sufficient contrast and keyboard navigation."
            }
            Self::Performance => {
                "Improve the performance of this website: reduce unnecessary markup, \
                 optimize CSS and JavaScript, and lazy-load heavy resources."
            }
            Self::Custom => "Refine this website.",
        }
    }
}

impl fmt::Display for RefinementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefinementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown refinement type '{s}' (expected one of: style, functionality, \
                     accessibility, performance, custom)"
                )
            })
    }
}

/// Lifecycle of a refinement
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefinementStatus {
    /// Created, not yet sent
    Pending,
    /// Request in flight
    InProgress,
    /// Refined HTML committed (`refined_html` is always set)
    Completed,
    /// Request failed
    Failed,
}

/// One refine-and-replace cycle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementRequest {
    /// Refinement kind
    pub kind: RefinementKind,
    /// Instruction sent to the model
    pub prompt: String,
    /// HTML being refined
    pub original_html: String,
    /// Current status
    pub status: RefinementStatus,
    /// Result, once completed
    pub refined_html: Option<String>,
    /// Failure reason, once failed
    pub error: Option<String>,
}

impl RefinementRequest {
    /// Create a pending refinement; `prompt` falls back to the kind's default
    pub fn new(kind: RefinementKind, prompt: Option<String>, original_html: String) -> Self {
        let prompt = prompt
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| kind.default_instruction().to_string());
        Self {
            kind,
            prompt,
            original_html,
            status: RefinementStatus::Pending,
            refined_html: None,
            error: None,
        }
    }

    /// Message shown in the chat for this refinement
    #[must_use]
    pub fn user_message(&self) -> String {
        self.prompt.clone()
    }

    /// Mark as sent
    pub fn begin(&mut self) {
        self.status = RefinementStatus::InProgress;
    }

    /// Mark as completed with the refined HTML
    pub fn complete(&mut self, refined_html: String) {
        self.status = RefinementStatus::Completed;
        self.refined_html = Some(refined_html);
    }

    /// Mark as failed
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = RefinementStatus::Failed;
        self.error = Some(error.into());
    }
}
