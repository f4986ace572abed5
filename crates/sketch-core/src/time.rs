//! Frame/time cursor shared by the live preview loop and deterministic exports.

use std::time::{Duration, Instant};

/// Hint for where elapsed time comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeCursor {
    /// Wall-clock time since `started`.
    Live { started: Instant },
    /// Fixed frame index converted to time at a fixed frame rate.
    Deterministic { frame: u64, fps: u32 },
}

impl TimeCursor {
    pub fn live() -> Self {
        TimeCursor::Live {
            started: Instant::now(),
        }
    }

    /// Elapsed seconds for the active mode.
    pub fn elapsed(&self) -> f64 {
        match *self {
            TimeCursor::Live { started } => started.elapsed().as_secs_f64(),
            TimeCursor::Deterministic { frame, fps } => frame as f64 / fps.max(1) as f64,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, TimeCursor::Live { .. })
    }
}

impl Default for TimeCursor {
    fn default() -> Self {
        Self::live()
    }
}

/// Interval between frames at `fps`.
pub fn frame_interval(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / fps.max(1) as f64)
}
