//! Stoppable windows and their handles

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Closed interval of playback position, in milliseconds from the start.
///
/// Bounds are normalized at construction (`start <= end`) and never change
/// afterwards. A zero-width window matches a single instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeWindow {
    start_ms: i64,
    end_ms: i64,
}

impl TimeWindow {
    /// Build a window from two bounds given in either order
    pub fn new(a_ms: i64, b_ms: i64) -> Self {
        Self {
            start_ms: a_ms.min(b_ms),
            end_ms: a_ms.max(b_ms),
        }
    }

    pub fn start_ms(&self) -> i64 {
        self.start_ms
    }

    pub fn end_ms(&self) -> i64 {
        self.end_ms
    }

    /// True iff `start <= position <= end`
    pub fn contains(&self, position_ms: i64) -> bool {
        self.start_ms <= position_ms && position_ms <= self.end_ms
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.start_ms, self.end_ms)
    }
}

/// Stable handle for a window added to a gate.
///
/// Unlike a position in the window list, a handle stays valid when other
/// windows are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct WindowId(Uuid);

impl WindowId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for WindowId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WindowId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A window together with its handle, as stored by the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowEntry {
    pub id: WindowId,
    pub window: TimeWindow,
}
