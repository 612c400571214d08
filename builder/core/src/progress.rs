//! Synthetic Progress
//!
//! Generation has no native progress signal, so the builder manufactures
//! perceived progress from wall-clock time: a fixed table of stages walked by
//! a timer while a request is in flight.
//!
//! # Rules
//!
//! - `start` shows [`ProgressStage::Initializing`] immediately, then
//!   [`ProgressStage::Scaffolding`] after a short delay, then one middle stage
//!   per interval, holding at [`ProgressStage::Polishing`].
//! - Only `complete` reaches [`ProgressStage::Complete`]; `fail` hides the stage.
//! - After `complete`/`fail` (or a restart) the old ticker can never change
//!   the stage again: every write is checked against an epoch under the same
//!   lock that bumps it.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::messages::BuilderEvent;

/// One named step of the synthetic progress display
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressStage {
    /// Request accepted
    Initializing,
    /// Document skeleton
    Scaffolding,
    /// Page sections and structure
    Layout,
    /// Colors, typography and spacing
    Styling,
    /// Scripts and interactive behavior
    Interactivity,
    /// Final touches; held until the real response ends
    Polishing,
    /// Response committed
    Complete,
}

impl ProgressStage {
    /// All stages in display order
    pub const ALL: [ProgressStage; 7] = [
        Self::Initializing,
        Self::Scaffolding,
        Self::Layout,
        Self::Styling,
        Self::Interactivity,
        Self::Polishing,
        Self::Complete,
    ];

    /// Position in [`ProgressStage::ALL`]
    #[must_use]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Stable identifier
    #[must_use]
    pub fn id(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Scaffolding => "scaffolding",
            Self::Layout => "layout",
            Self::Styling => "styling",
            Self::Interactivity => "interactivity",
            Self::Polishing => "polishing",
            Self::Complete => "complete",
        }
    }

    /// Short label for display
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::Scaffolding => "Scaffolding",
            Self::Layout => "Building layout",
            Self::Styling => "Styling",
            Self::Interactivity => "Adding interactivity",
            Self::Polishing => "Polishing",
            Self::Complete => "Complete",
        }
    }

    /// One-line description for display
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Initializing => "Preparing your request",
            Self::Scaffolding => "Setting up the document structure",
            Self::Layout => "Arranging sections and content",
            Self::Styling => "Applying colors, fonts and spacing",
            Self::Interactivity => "Wiring up scripts and behavior",
            Self::Polishing => "Finishing touches",
            Self::Complete => "Your website is ready",
        }
    }

    /// Icon name for surfaces that render icons
    #[must_use]
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Initializing => "sparkles",
            Self::Scaffolding => "layers",
            Self::Layout => "layout",
            Self::Styling => "palette",
            Self::Interactivity => "zap",
            Self::Polishing => "wand",
            Self::Complete => "check-circle",
        }
    }

    /// Displayed completion percentage
    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        match self {
            Self::Initializing => 5,
            Self::Scaffolding => 15,
            Self::Layout => 35,
            Self::Styling => 55,
            Self::Interactivity => 75,
            Self::Polishing => 90,
            Self::Complete => 100,
        }
    }
}

/// Stages the ticker walks through on its own (never the final one)
const TICKED_STAGES: [ProgressStage; 5] = [
    ProgressStage::Scaffolding,
    ProgressStage::Layout,
    ProgressStage::Styling,
    ProgressStage::Interactivity,
    ProgressStage::Polishing,
];

/// Ticker timing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressTiming {
    /// Delay before leaving the first stage
    pub initial_delay: Duration,
    /// Interval between later stages
    pub interval: Duration,
}

impl Default for ProgressTiming {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            interval: Duration::from_millis(2000),
        }
    }
}

struct Shared {
    epoch: Mutex<u64>,
    stage: watch::Sender<Option<ProgressStage>>,
    events: Option<mpsc::Sender<BuilderEvent>>,
}

impl Shared {
    /// Publish `stage` if `epoch` is still current
    fn publish_if_current(&self, epoch: u64, stage: Option<ProgressStage>) -> bool {
        let guard = self.epoch.lock();
        if *guard != epoch {
            return false;
        }
        self.publish(stage);
        true
    }

    /// Invalidate any running ticker and publish `stage`
    fn restart_with(&self, stage: Option<ProgressStage>) -> u64 {
        let mut guard = self.epoch.lock();
        *guard += 1;
        self.publish(stage);
        *guard
    }

    fn publish(&self, stage: Option<ProgressStage>) {
        let previous = self.stage.send_replace(stage);
        if previous == stage {
            return;
        }
        tracing::debug!(stage = ?stage.map(|s| s.id()), "Progress stage changed");
        if let Some(ref events) = self.events {
            if let Err(e) = events.try_send(BuilderEvent::Stage { stage }) {
                tracing::debug!("Dropped stage event: {}", e);
            }
        }
    }
}

/// Timer-driven progress stage ticker
pub struct ProgressDriver {
    timing: ProgressTiming,
    shared: Arc<Shared>,
    ticker: Option<JoinHandle<()>>,
}

impl ProgressDriver {
    /// Create an idle driver (no stage shown)
    pub fn new(timing: ProgressTiming) -> Self {
        Self::build(timing, None)
    }

    /// Create a driver that also reports stage changes as [`BuilderEvent::Stage`]
    pub fn with_events(timing: ProgressTiming, events: mpsc::Sender<BuilderEvent>) -> Self {
        Self::build(timing, Some(events))
    }

    fn build(timing: ProgressTiming, events: Option<mpsc::Sender<BuilderEvent>>) -> Self {
        let (stage, _) = watch::channel(None);
        Self {
            timing,
            shared: Arc::new(Shared {
                epoch: Mutex::new(0),
                stage,
                events,
            }),
            ticker: None,
        }
    }

    /// Current stage (`None` = hidden)
    pub fn current(&self) -> Option<ProgressStage> {
        *self.shared.stage.borrow()
    }

    /// Watch stage changes, including timer-driven ones
    pub fn subscribe(&self) -> watch::Receiver<Option<ProgressStage>> {
        self.shared.stage.subscribe()
    }

    /// Whether the ticker task is still advancing stages
    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Begin a new progress run
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        self.abort_ticker();
        let epoch = self.shared.restart_with(Some(ProgressStage::Initializing));

        let shared = Arc::clone(&self.shared);
        let timing = self.timing;
        self.ticker = Some(tokio::spawn(async move {
            let mut ticks = tokio::time::interval_at(
                Instant::now() + timing.initial_delay,
                timing.interval,
            );
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

            for stage in TICKED_STAGES {
                ticks.tick().await;
                if !shared.publish_if_current(epoch, Some(stage)) {
                    return;
                }
            }
        }));
    }

    /// The real response completed: jump to the final stage
    pub fn complete(&mut self) {
        self.shared.restart_with(Some(ProgressStage::Complete));
        self.abort_ticker();
    }

    /// The request failed or was abandoned: hide the stage
    pub fn fail(&mut self) {
        self.shared.restart_with(None);
        self.abort_ticker();
    }

    fn abort_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl Default for ProgressDriver {
    fn default() -> Self {
        Self::new(ProgressTiming::default())
    }
}

impl Drop for ProgressDriver {
    fn drop(&mut self) {
        self.abort_ticker();
    }
}
