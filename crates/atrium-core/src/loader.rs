//! Asset load state machine
//!
//! [`AssetLoadController`] never performs I/O. The engine asks it which
//! path to fetch ([`AssetLoadController::poll_due`]), reports progress and
//! completion back tagged with the ticket's generation, and acts on the
//! returned [`LoadOutcome`]. Every issued attempt gets a fresh generation,
//! so a result arriving for anything but the newest ticket is discarded.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::asset_path::{AssetCatalog, ModelRequest};
use crate::config::AssetConfig;
use crate::error::LoadError;
use crate::timing::Throttle;

pub type Generation = u64;

/// Lifecycle of the current model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    /// Waiting for the initial or retry delay
    Requested,
    Loading { progress: Option<u8> },
    Loaded,
    Failed { reason: String },
}

/// Observable state for whatever UI sits on top of the viewer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewerStatus {
    pub loading: bool,
    pub progress: u8,
    pub error: Option<String>,
}

/// One fetch the engine should perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub generation: Generation,
    pub request: ModelRequest,
    pub path: String,
    /// 1 for the first attempt of a chain
    pub attempt: u32,
}

/// Retry bookkeeping for the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadAttempt {
    /// What the caller asked for
    pub requested: ModelRequest,
    /// What is being tried now
    pub current: ModelRequest,
    /// Attempts started so far
    pub count: u32,
    /// Paths already tried in this chain, oldest first
    pub tried: Vec<String>,
}

impl LoadAttempt {
    fn new(request: ModelRequest) -> Self {
        Self {
            requested: request,
            current: request,
            count: 0,
            tried: Vec::new(),
        }
    }

    pub fn retries(&self) -> u32 {
        self.count.saturating_sub(1)
    }
}

/// What the engine should do after a completion report
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Attach this ticket's scene and release the previous model
    Apply(LoadTicket),
    /// A fallback is scheduled; it comes out of `poll_due` once due
    Retry {
        request: ModelRequest,
        path: String,
        due_ms: f64,
    },
    /// Terminal failure; detach any partial content
    Failed { reason: String },
    /// Stale or torn-down result, drop it silently
    Discarded(LoadError),
}

pub struct AssetLoadController {
    catalog: AssetCatalog,
    max_retries: u32,
    retry_delay_ms: f64,
    initial_delay_ms: f64,
    failure_message: String,
    generation: Generation,
    attempt: Option<LoadAttempt>,
    scheduled: Option<(LoadTicket, f64)>,
    in_flight: Option<LoadTicket>,
    displayed: Option<LoadTicket>,
    phase: LoadPhase,
    progress: u8,
    started: bool,
    active: bool,
}

impl AssetLoadController {
    pub fn new(config: &AssetConfig) -> Self {
        Self {
            catalog: AssetCatalog::new(config),
            max_retries: config.max_retries,
            retry_delay_ms: config.retry_delay_ms,
            initial_delay_ms: config.initial_delay_ms,
            failure_message: config.failure_message.clone(),
            generation: 0,
            attempt: None,
            scheduled: None,
            in_flight: None,
            displayed: None,
            phase: LoadPhase::Idle,
            progress: 0,
            started: false,
            active: true,
        }
    }

    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn phase(&self) -> &LoadPhase {
        &self.phase
    }

    pub fn attempt(&self) -> Option<&LoadAttempt> {
        self.attempt.as_ref()
    }

    /// Ticket whose scene is currently displayed
    pub fn displayed(&self) -> Option<&LoadTicket> {
        self.displayed.as_ref()
    }

    pub fn in_flight(&self) -> Option<&LoadTicket> {
        self.in_flight.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Start a new request, superseding anything scheduled or in flight
    ///
    /// Out-of-range units are replaced by the default unit here. Returns
    /// `None` once the controller has been torn down.
    pub fn request(&mut self, request: ModelRequest, now_ms: f64) -> Option<Generation> {
        if !self.active {
            return None;
        }
        let request = self.catalog.normalize(request);
        if let Some(stale) = self.in_flight.take() {
            debug!(
                generation = stale.generation,
                path = %stale.path,
                "Superseding in-flight load"
            );
        }
        self.attempt = Some(LoadAttempt::new(request));
        self.progress = 0;
        self.phase = LoadPhase::Requested;

        let delay = if self.started { 0.0 } else { self.initial_delay_ms };
        self.started = true;
        let generation = self.schedule(request, now_ms + delay);
        info!(%request, generation, "Model requested");
        Some(generation)
    }

    fn schedule(&mut self, request: ModelRequest, due_ms: f64) -> Generation {
        self.generation += 1;
        let attempt = self.attempt.as_ref().map(|a| a.count + 1).unwrap_or(1);
        let ticket = LoadTicket {
            generation: self.generation,
            path: self.catalog.path_for(&request),
            request,
            attempt,
        };
        self.scheduled = Some((ticket, due_ms));
        self.generation
    }

    /// Hand out the scheduled ticket once its delay has elapsed
    pub fn poll_due(&mut self, now_ms: f64) -> Option<LoadTicket> {
        if !self.active {
            return None;
        }
        match &self.scheduled {
            Some((_, due)) if now_ms >= *due => {}
            _ => return None,
        }
        let (ticket, _) = self.scheduled.take()?;
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.count += 1;
            attempt.current = ticket.request;
            attempt.tried.push(ticket.path.clone());
        }
        info!(
            path = %ticket.path,
            generation = ticket.generation,
            attempt = ticket.attempt,
            "Loading model"
        );
        self.phase = LoadPhase::Loading { progress: None };
        self.in_flight = Some(ticket.clone());
        Some(ticket)
    }

    fn is_current(&self, generation: Generation) -> bool {
        self.active
            && self
                .in_flight
                .as_ref()
                .is_some_and(|t| t.generation == generation)
    }

    /// Record byte progress; returns the new percentage when it is reportable
    ///
    /// Percentages never decrease within one request. Unknown or zero totals
    /// produce no event.
    pub fn on_progress(&mut self, generation: Generation, loaded: u64, total: Option<u64>) -> Option<u8> {
        if !self.is_current(generation) {
            return None;
        }
        let total = total.filter(|t| *t > 0)?;
        let pct = (loaded.saturating_mul(100) / total).min(100) as u8;
        self.progress = self.progress.max(pct);
        self.phase = LoadPhase::Loading {
            progress: Some(self.progress),
        };
        Some(self.progress)
    }

    /// The engine finished decoding `generation`
    pub fn on_success(&mut self, generation: Generation) -> LoadOutcome {
        if !self.is_current(generation) {
            debug!(generation, current = self.generation, "Discarding stale load result");
            return LoadOutcome::Discarded(LoadError::Superseded(self.generation));
        }
        let Some(ticket) = self.in_flight.take() else {
            return LoadOutcome::Discarded(LoadError::Superseded(self.generation));
        };
        info!(path = %ticket.path, attempt = ticket.attempt, "Model loaded");
        self.attempt = None;
        self.progress = 100;
        self.phase = LoadPhase::Loaded;
        self.displayed = Some(ticket.clone());
        LoadOutcome::Apply(ticket)
    }

    /// The engine failed to fetch or decode `generation`
    pub fn on_failure(&mut self, generation: Generation, error: LoadError, now_ms: f64) -> LoadOutcome {
        if !self.is_current(generation) {
            debug!(generation, error = %error, "Discarding stale load failure");
            return LoadOutcome::Discarded(LoadError::Superseded(self.generation));
        }
        let Some(ticket) = self.in_flight.take() else {
            return LoadOutcome::Discarded(LoadError::Superseded(self.generation));
        };

        if !error.is_retryable() {
            return self.fail(error.to_string(), &ticket, &error);
        }

        let Some(attempt) = self.attempt.as_ref() else {
            return self.fail(self.failure_message.clone(), &ticket, &error);
        };
        if attempt.retries() >= self.max_retries {
            return self.fail(self.failure_message.clone(), &ticket, &error);
        }

        let next = self
            .catalog
            .fallback_candidates(&attempt.current)
            .into_iter()
            .find(|candidate| {
                let path = self.catalog.path_for(candidate);
                !attempt.tried.contains(&path)
            });
        let Some(next) = next else {
            return self.fail(self.failure_message.clone(), &ticket, &error);
        };

        let due_ms = now_ms + self.retry_delay_ms;
        self.schedule(next, due_ms);
        self.phase = LoadPhase::Requested;
        let path = self.catalog.path_for(&next);
        warn!(
            failed = %ticket.path,
            error = %error,
            fallback = %path,
            "Model load failed, retrying with fallback"
        );
        LoadOutcome::Retry {
            request: next,
            path,
            due_ms,
        }
    }

    fn fail(&mut self, reason: String, ticket: &LoadTicket, error: &LoadError) -> LoadOutcome {
        tracing::error!(
            path = %ticket.path,
            kind = error.kind(),
            error = %error,
            "Model load failed"
        );
        self.attempt = None;
        self.scheduled = None;
        self.phase = LoadPhase::Failed {
            reason: reason.clone(),
        };
        LoadOutcome::Failed { reason }
    }

    pub fn status(&self) -> ViewerStatus {
        match &self.phase {
            LoadPhase::Idle => ViewerStatus::default(),
            LoadPhase::Requested | LoadPhase::Loading { .. } => ViewerStatus {
                loading: true,
                progress: self.progress,
                error: None,
            },
            LoadPhase::Loaded => ViewerStatus {
                loading: false,
                progress: 100,
                error: None,
            },
            LoadPhase::Failed { reason } => ViewerStatus {
                loading: false,
                progress: self.progress,
                error: Some(reason.clone()),
            },
        }
    }

    /// Stop for good: cancel timers and make every later report a no-op
    pub fn teardown(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.generation += 1;
        self.scheduled = None;
        self.in_flight = None;
        self.attempt = None;
        self.displayed = None;
        self.phase = LoadPhase::Idle;
        info!("Asset loader torn down");
    }
}

/// Drops model switches that repeat the active model or arrive too quickly
#[derive(Debug, Clone)]
pub struct ModelSwitchGate {
    throttle: Throttle,
    active: Option<ModelRequest>,
}

impl ModelSwitchGate {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            throttle: Throttle::new(interval_ms),
            active: None,
        }
    }

    /// Record the initial model without starting the throttle interval
    pub fn set_active(&mut self, request: ModelRequest) {
        self.active = Some(request);
    }

    pub fn active(&self) -> Option<ModelRequest> {
        self.active
    }

    pub fn admit(&mut self, request: ModelRequest, now_ms: f64) -> bool {
        if self.active == Some(request) {
            return false;
        }
        if !self.throttle.admit(now_ms) {
            debug!(%request, "Model switch throttled");
            return false;
        }
        self.active = Some(request);
        true
    }
}
