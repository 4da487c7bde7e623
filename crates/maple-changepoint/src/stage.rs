//! Detection stage: lifecycle owner for one CUSUM stream.
//!
//! The hosting runtime drives the stage through three calls:
//!
//! ```text
//!   activate(config) ──► ActivationHandle
//!        │
//!        ▼
//!   process(handle, event) ──► event + [cumSumLow, cumSumHigh,
//!        │                              changeDetectedLow, changeDetectionHigh]
//!        ▼
//!   deactivate(handle) ──► ActivationSummary
//! ```
//!
//! Each activation starts from zeroed statistics. Nothing carries over from a
//! previous activation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::config::CusumConfig;
use crate::detector::{ChangePointDetector, DetectorState, Observation};
use crate::error::{ChangePointError, ChangePointResult};
use crate::event::{Event, FieldSelector};

// ── Handle ──────────────────────────────────────────────────────────────

/// Opaque identifier of one activation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivationHandle(uuid::Uuid);

impl ActivationHandle {
    fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl std::fmt::Display for ActivationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "activation:{}", self.0)
    }
}

// ── Summary ─────────────────────────────────────────────────────────────

/// Returned by `deactivate`; the statistics themselves are discarded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivationSummary {
    pub handle: ActivationHandle,
    pub activated_at: DateTime<Utc>,
    pub deactivated_at: DateTime<Utc>,
    pub events_processed: u64,
    pub events_rejected: u64,
    pub low_detections: u64,
    pub high_detections: u64,
    pub final_state: DetectorState,
}

// ── Stage ───────────────────────────────────────────────────────────────

struct Activation {
    handle: ActivationHandle,
    config: CusumConfig,
    selector: FieldSelector,
    detector: ChangePointDetector,
    activated_at: DateTime<Utc>,
    events_processed: u64,
    events_rejected: u64,
    low_detections: u64,
    high_detections: u64,
}

impl Activation {
    fn observe(&mut self, value: f64) -> Observation {
        let observation = self.detector.update(value);
        self.events_processed += 1;

        let output = &observation.output;
        trace!(
            handle = %self.handle,
            value,
            normalized = observation.normalized,
            cum_sum_low = output.cum_sum_low,
            cum_sum_high = output.cum_sum_high,
            "observation folded"
        );
        if output.change_detected_low {
            self.low_detections += 1;
            debug!(handle = %self.handle, cum_sum_low = output.cum_sum_low, "downward change detected");
        }
        if output.change_detected_high {
            self.high_detections += 1;
            debug!(handle = %self.handle, cum_sum_high = output.cum_sum_high, "upward change detected");
        }
        observation
    }

    fn into_summary(self) -> ActivationSummary {
        ActivationSummary {
            final_state: self.detector.state(),
            handle: self.handle,
            activated_at: self.activated_at,
            deactivated_at: Utc::now(),
            events_processed: self.events_processed,
            events_rejected: self.events_rejected,
            low_detections: self.low_detections,
            high_detections: self.high_detections,
        }
    }
}

/// Change-point detection stage for a single ordered stream.
///
/// Not shareable across streams: fan-out by key needs one stage per key.
#[derive(Default)]
pub struct DetectionStage {
    active: Option<Activation>,
}

impl DetectionStage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `config` and start a fresh activation.
    ///
    /// An activation that is still running is discarded first.
    pub fn activate(&mut self, config: CusumConfig) -> ChangePointResult<ActivationHandle> {
        config.validate()?;
        let selector = config.selector()?;
        let detector = ChangePointDetector::new(config.k, config.h, config.low_decision)?;

        if let Some(previous) = self.active.take() {
            warn!(
                handle = %previous.handle,
                events_processed = previous.events_processed,
                "replacing running activation"
            );
        }

        let handle = ActivationHandle::new();
        info!(
            handle = %handle,
            field = %selector,
            k = config.k,
            h = config.h,
            low_decision = ?config.low_decision,
            "detection stage activated"
        );

        self.active = Some(Activation {
            handle: handle.clone(),
            config,
            selector,
            detector,
            activated_at: Utc::now(),
            events_processed: 0,
            events_rejected: 0,
            low_detections: 0,
            high_detections: 0,
        });
        Ok(handle)
    }

    /// Run one event through the detector and return it with outputs appended.
    ///
    /// A field-extraction failure leaves the statistics untouched.
    pub fn process(&mut self, handle: &ActivationHandle, event: &Event) -> ChangePointResult<Event> {
        let activation = self.activation_mut(handle)?;

        let value = match event.number(&activation.selector) {
            Ok(value) => value,
            Err(e) => {
                activation.events_rejected += 1;
                warn!(handle = %activation.handle, error = %e, "event rejected");
                return Err(e);
            }
        };

        let observation = activation.observe(value);
        Ok(event.with_output(&observation.output))
    }

    /// Fold an already-extracted value.
    pub fn observe(&mut self, handle: &ActivationHandle, value: f64) -> ChangePointResult<Observation> {
        Ok(self.activation_mut(handle)?.observe(value))
    }

    /// End the activation and discard its statistics.
    pub fn deactivate(&mut self, handle: ActivationHandle) -> ChangePointResult<ActivationSummary> {
        self.activation_mut(&handle)?;
        let activation = self.active.take().ok_or(ChangePointError::NotActive)?;
        let summary = activation.into_summary();

        info!(
            handle = %summary.handle,
            events_processed = summary.events_processed,
            events_rejected = summary.events_rejected,
            low_detections = summary.low_detections,
            high_detections = summary.high_detections,
            "detection stage deactivated"
        );
        Ok(summary)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Configuration of the running activation.
    pub fn config(&self) -> Option<&CusumConfig> {
        self.active.as_ref().map(|a| &a.config)
    }

    /// Snapshot of the running statistics.
    pub fn state(&self) -> Option<DetectorState> {
        self.active.as_ref().map(|a| a.detector.state())
    }

    fn activation_mut(&mut self, handle: &ActivationHandle) -> ChangePointResult<&mut Activation> {
        match self.active.as_mut() {
            Some(activation) if activation.handle == *handle => Ok(activation),
            Some(_) => Err(ChangePointError::StaleHandle {
                handle: handle.to_string(),
            }),
            None => Err(ChangePointError::NotActive),
        }
    }
}
