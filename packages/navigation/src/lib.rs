#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Instruction cursor.
//!
//! A live position is snapped to the nearest sampled polyline point. That
//! point's index, as a fraction of the polyline, is mapped proportionally
//! onto the instruction list. The mapping is not aware of maneuver
//! locations; it assumes instructions are spread evenly along the route.
//!
//! Noisy positions can snap to an earlier point and move the index back.
//! [`ProgressPolicy`] decides whether that is allowed.

use saferoute_geometry::{LatLng, nearest_sample};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Default upper bound on polyline points examined per update.
pub const DEFAULT_MAX_SAMPLES: usize = 1000;

/// Whether the cursor may move backward.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ProgressPolicy {
    /// Follow the nearest point, backward included.
    #[default]
    AllowRegression,
    /// Never move to an earlier instruction.
    NonDecreasing,
}

/// Proportional progress fraction for a polyline index, in `[0, 1]`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn progress_fraction(index: usize, point_count: usize) -> f64 {
    let denom = point_count.saturating_sub(1).max(1);
    (index as f64 / denom as f64).clamp(0.0, 1.0)
}

/// Instruction index for a progress fraction, clamped to the list.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn instruction_index(fraction: f64, instruction_count: usize) -> usize {
    if instruction_count == 0 {
        return 0;
    }
    let last = instruction_count - 1;
    let raw = (fraction * last as f64).round();
    if raw.is_nan() || raw <= 0.0 {
        0
    } else {
        (raw as usize).min(last)
    }
}

/// Tracks the current instruction of an active route.
#[derive(Debug, Clone, PartialEq)]
pub struct InstructionCursor {
    index: usize,
    policy: ProgressPolicy,
    max_samples: usize,
}

impl Default for InstructionCursor {
    fn default() -> Self {
        Self::new(ProgressPolicy::default(), DEFAULT_MAX_SAMPLES)
    }
}

impl InstructionCursor {
    #[must_use]
    pub const fn new(policy: ProgressPolicy, max_samples: usize) -> Self {
        Self {
            index: 0,
            policy,
            max_samples,
        }
    }

    /// Current instruction index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub const fn policy(&self) -> ProgressPolicy {
        self.policy
    }

    /// Back to the first instruction.
    pub const fn reset(&mut self) {
        self.index = 0;
    }

    /// Moves the cursor for a new live position and returns the new index.
    ///
    /// The result is always within `[0, instruction_count - 1]` (or 0 for
    /// an empty list), however far the position is from the route. An
    /// empty polyline or a non-finite position leaves the cursor where it
    /// is.
    pub fn advance(&mut self, position: LatLng, route: &[LatLng], instruction_count: usize) -> usize {
        if instruction_count == 0 {
            self.index = 0;
            return 0;
        }
        let last = instruction_count - 1;

        if !position.is_finite() {
            self.index = self.index.min(last);
            return self.index;
        }

        let Some(nearest) = nearest_sample(route, position, self.max_samples) else {
            self.index = self.index.min(last);
            return self.index;
        };

        let fraction = progress_fraction(nearest.index, route.len());
        let next = instruction_index(fraction, instruction_count);

        self.index = match self.policy {
            ProgressPolicy::AllowRegression => next,
            ProgressPolicy::NonDecreasing => next.max(self.index).min(last),
        };
        self.index
    }
}
