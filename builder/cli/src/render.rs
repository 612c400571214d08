//! Terminal rendering of builder events
//!
//! Everything here writes to stderr; stdout is reserved for HTML.

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use builder_core::{
    BuilderEvent, MessageRole, ModelInfo, ProgressStage, RefinementStatus, VersionEntry,
    COMPLETION_NOTICE,
};

/// Spawn a task that prints builder events until the channel closes
pub fn spawn_renderer(mut rx: mpsc::Receiver<BuilderEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Some(line) = describe_event(&event) {
                eprintln!("{line}");
            }
        }
    })
}

/// One status line for an event, or `None` if it is not shown
pub fn describe_event(event: &BuilderEvent) -> Option<String> {
    match event {
        BuilderEvent::Stage { stage: Some(stage) } => Some(stage_line(*stage)),
        BuilderEvent::Message {
            role: MessageRole::Assistant,
            content,
            ..
        } if content == COMPLETION_NOTICE => Some(format!("✅ {content}")),
        BuilderEvent::StreamError { error } => Some(format!("❌ {error}")),
        BuilderEvent::VersionSaved { entry } => Some(format!("💾 Saved version {}", entry.id)),
        BuilderEvent::RefinementFinished { request } => match request.status {
            RefinementStatus::Completed => Some(format!("✨ {} refinement applied", request.kind)),
            RefinementStatus::Failed => Some(format!(
                "⚠️  {} refinement not applied: {}",
                request.kind,
                request.error.as_deref().unwrap_or("unknown error")
            )),
            _ => None,
        },
        BuilderEvent::Cleared => Some("🆕 Started a new chat".to_string()),
        _ => None,
    }
}

/// Progress line such as `🎨 Styling (55%) - Applying colors...`
pub fn stage_line(stage: ProgressStage) -> String {
    format!(
        "{} {} ({}%) - {}",
        glyph(stage.icon()),
        stage.display_name(),
        stage.progress_percent(),
        stage.description()
    )
}

/// Terminal glyph for a stage icon name
fn glyph(icon: &str) -> &'static str {
    match icon {
        "sparkles" => "✨",
        "layers" => "🧱",
        "layout" => "📐",
        "palette" => "🎨",
        "zap" => "⚡",
        "wand" => "🪄",
        "check-circle" => "✅",
        _ => "•",
    }
}

/// One row of `versions list`
pub fn version_row(entry: &VersionEntry) -> String {
    format!(
        "{:<28} {:>10} {:>8}  {}",
        entry.id,
        age(entry.timestamp, now_ms()),
        format_size(entry.html_content.len()),
        entry.description.as_deref().unwrap_or("-")
    )
}

/// One row of `models`
pub fn model_row(model: &ModelInfo, selected: bool) -> String {
    format!(
        "{} {:<18} {:<22} {:>5}  {}{}",
        if selected { "*" } else { " " },
        model.key,
        model.name,
        model.context,
        model.description,
        if model.is_free { " (free)" } else { "" }
    )
}

/// Relative age of a millisecond timestamp
pub fn age(timestamp_ms: u64, now_ms: u64) -> String {
    let secs = now_ms.saturating_sub(timestamp_ms) / 1000;
    match secs {
        0..=59 => "just now".to_string(),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

/// Human-readable byte count
pub fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else {
        #[allow(clippy::cast_precision_loss)]
        let kib = bytes as f64 / 1024.0;
        format!("{kib:.1} KB")
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
