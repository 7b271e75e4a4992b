use crate::point::PointKind;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Per-step flags the engine consults on every pass.
///
/// Arming happens on the command task while workers read the flags
/// concurrently, so every transition is a single atomic exchange.
#[derive(Default)]
pub struct DebugMarkers {
    breakpoint: AtomicBool,
    skip: AtomicBool,
}

impl DebugMarkers {
    fn flag(&self, kind: PointKind) -> &AtomicBool {
        match kind {
            PointKind::Breakpoint => &self.breakpoint,
            PointKind::SkipPoint => &self.skip,
        }
    }

    pub fn is_armed(&self, kind: PointKind) -> bool {
        self.flag(kind).load(Ordering::Acquire)
    }

    /// Returns `false` when the marker was already set.
    pub(crate) fn try_arm(&self, kind: PointKind) -> bool {
        self.flag(kind)
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Returns `false` when the marker was not set.
    pub(crate) fn try_disarm(&self, kind: PointKind) -> bool {
        self.flag(kind)
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl fmt::Debug for DebugMarkers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugMarkers")
            .field("breakpoint", &self.is_armed(PointKind::Breakpoint))
            .field("skip", &self.is_armed(PointKind::SkipPoint))
            .finish()
    }
}
