//! Stream Status Engine
//!
//! Pure mapping from a stream's remaining time to a lifecycle status against
//! two configurable thresholds. Callers are expected to configure
//! `warning_level > critical_level > 0`; the engine does not defend against
//! inverted thresholds at runtime.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a stream, derived from its remaining time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    /// Plenty of time left.
    Normal,
    /// Below the warning threshold; the payer should top up soon.
    Warning,
    /// Below the critical threshold; the stream is about to run dry.
    Critical,
    /// No time left: exhausted or cancelled.
    Inactive,
}

impl StreamStatus {
    /// Classify `time_left` against the two thresholds.
    #[must_use]
    pub fn from_time_left(time_left: Duration, warning: Duration, critical: Duration) -> Self {
        if time_left > warning {
            Self::Normal
        } else if time_left > critical {
            Self::Warning
        } else if time_left > Duration::ZERO {
            Self::Critical
        } else {
            Self::Inactive
        }
    }

    /// Whether the stream still has time left.
    #[must_use]
    pub fn is_active(self) -> bool {
        self != Self::Inactive
    }
}

impl std::fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}
