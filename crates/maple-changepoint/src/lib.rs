//! # maple-changepoint
//!
//! Streaming change-point detection for a single ordered numeric stream.
//!
//! Each observation is z-score normalized against running moments (Welford)
//! and folded into a two-sided CUSUM. Every input event yields exactly one
//! output event, synchronously, in O(1) time and space.
//!
//! ## Architecture
//!
//! ```text
//!   Event ──► DetectionStage
//!                │ FieldSelector → f64
//!                ▼
//!         ┌──────────────────────┐
//!         │ ChangePointDetector  │
//!         │  ┌────────────────┐  │
//!         │  │RunningMoments  │  │  ← count / mean / M2
//!         │  └───────┬────────┘  │
//!         │          │ z (or NaN)│
//!         │  ┌───────▼────────┐  │
//!         │  │ CUSUM low/high │  │  ← clamped sums, flags vs h
//!         │  └────────────────┘  │
//!         └──────────┬───────────┘
//!                    ▼
//!   Event + [cumSumLow, cumSumHigh, changeDetectedLow, changeDetectionHigh]
//! ```
//!
//! ## Invariants
//!
//! - `high_sum >= 0` and `low_sum <= 0` after every update
//! - A NaN normalized value never moves either sum
//! - Statistics never advance on an event whose field cannot be extracted
//! - Every activation starts from zeroed statistics
//!
//! ## Quick Start
//!
//! ```rust
//! use maple_changepoint::{CusumConfig, DetectionStage, Event};
//! use serde_json::json;
//!
//! let mut stage = DetectionStage::new();
//! let handle = stage
//!     .activate(CusumConfig::new("s0::temperature", 0.5, 4.0))
//!     .unwrap();
//!
//! let event = Event::from_value(json!({"temperature": 21.5})).unwrap();
//! let out = stage.process(&handle, &event).unwrap();
//! assert_eq!(out.fields()["changeDetectionHigh"], json!(false));
//!
//! let summary = stage.deactivate(handle).unwrap();
//! assert_eq!(summary.events_processed, 1);
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod cusum;
pub mod detector;
pub mod error;
pub mod event;
pub mod moments;
pub mod stage;

// ── Re-exports ──────────────────────────────────────────────────────────

pub use config::{
    CusumConfig, PARAM_H, PARAM_K, PARAM_LOW_DECISION, PARAM_MAX, PARAM_MIN,
    PARAM_NUMBER_MAPPING,
};
pub use cusum::{CumulativeDeviationDetector, CusumOutput, LowDecision};
pub use detector::{ChangePointDetector, DetectorState, Observation};
pub use error::{ChangePointError, ChangePointResult};
pub use event::{Event, FieldSelector};
pub use moments::RunningMomentEstimator;
pub use stage::{ActivationHandle, ActivationSummary, DetectionStage};
