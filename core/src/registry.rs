//! Book-keeping of armed debug points.
//!
//! The markers on each step are the source of truth the engine consults; the
//! registry remembers which user-visible point set them so events can report
//! it and a configuration reload can clear them all at once.

use crate::container::MediationConfig;
use crate::error::{DebugError, DebugResult};
use crate::locator::ContainerLocator;
use crate::path::resolve;
use crate::point::{DebugPoint, PointKind};
use crate::step::{Step, StepId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

struct ArmedEntry {
    point: Arc<DebugPoint>,
    step: Weak<Step>,
}

#[derive(Default)]
pub struct DebugPointRegistry {
    entries: RwLock<HashMap<(StepId, PointKind), ArmedEntry>>,
}

impl DebugPointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn target(config: &MediationConfig, point: &DebugPoint) -> DebugResult<Arc<Step>> {
        let root = point.container.locate(config)?;
        resolve(&root, &point.path).ok_or_else(|| DebugError::StepNotFound {
            key: point.key().to_string(),
            path: point.path.to_string(),
        })
    }

    /// Sets the marker addressed by `point`.
    pub fn arm(&self, config: &MediationConfig, point: DebugPoint) -> DebugResult<()> {
        let step = Self::target(config, &point)?;
        let mut entries = self.entries.write();

        if !step.markers().try_arm(point.kind) {
            return Err(DebugError::AlreadyArmed {
                kind: point.kind.as_str(),
                key: point.key().to_string(),
                path: point.path.to_string(),
            });
        }

        tracing::debug!(kind = %point.kind, point = %point.descriptor(), "armed");
        entries.insert(
            (step.id(), point.kind),
            ArmedEntry {
                point: Arc::new(point),
                step: Arc::downgrade(&step),
            },
        );
        Ok(())
    }

    /// Clears the marker addressed by `point`.
    pub fn disarm(&self, config: &MediationConfig, point: &DebugPoint) -> DebugResult<()> {
        let step = Self::target(config, point)?;
        let mut entries = self.entries.write();

        if !step.markers().try_disarm(point.kind) {
            return Err(DebugError::NotArmed {
                kind: point.kind.as_str(),
                key: point.key().to_string(),
                path: point.path.to_string(),
            });
        }

        tracing::debug!(kind = %point.kind, point = %point.descriptor(), "disarmed");
        entries.remove(&(step.id(), point.kind));
        Ok(())
    }

    /// The point that armed `kind` on `step`, if any.
    pub fn lookup(&self, step: StepId, kind: PointKind) -> Option<Arc<DebugPoint>> {
        self.entries
            .read()
            .get(&(step, kind))
            .map(|entry| Arc::clone(&entry.point))
    }

    pub fn points(&self) -> Vec<Arc<DebugPoint>> {
        self.entries
            .read()
            .values()
            .map(|entry| Arc::clone(&entry.point))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drops every armed point and clears the markers still reachable.
    pub fn invalidate(&self) {
        let mut entries = self.entries.write();
        for ((_, kind), entry) in entries.drain() {
            if let Some(step) = entry.step.upgrade() {
                step.markers().try_disarm(kind);
            }
        }
    }
}

impl std::fmt::Debug for DebugPointRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugPointRegistry")
            .field("armed", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::SequenceType;
    use crate::locator::{Container, NamedSequence};
    use crate::path::StepPath;
    use crate::property::MessageContext;
    use crate::step::{Mediator, StepResult};
    use async_trait::async_trait;

    struct Log;

    #[async_trait]
    impl Mediator for Log {
        fn label(&self) -> &str {
            "log"
        }

        async fn mediate(&self, _msg: &mut MessageContext) -> StepResult {
            StepResult::Next
        }
    }

    fn config() -> (MediationConfig, Arc<Step>) {
        let root = Step::composite("seq1", vec![Step::atomic(Log), Step::atomic(Log)]);
        (
            MediationConfig::new().with_sequence("seq1", root.clone()),
            root,
        )
    }

    fn point(kind: PointKind, name: &str, at: Vec<usize>) -> DebugPoint {
        DebugPoint::new(
            kind,
            Container::Sequence(NamedSequence {
                name: name.into(),
                sequence_type: SequenceType::Named,
            }),
            StepPath::new(at),
        )
    }

    #[test]
    fn arm_sets_marker_and_records_point() {
        let (config, root) = config();
        let registry = DebugPointRegistry::new();

        registry
            .arm(&config, point(PointKind::Breakpoint, "seq1", vec![1]))
            .unwrap();

        let step = root.child(1).unwrap();
        assert!(step.markers().is_armed(PointKind::Breakpoint));
        assert!(!step.markers().is_armed(PointKind::SkipPoint));
        let found = registry.lookup(step.id(), PointKind::Breakpoint).unwrap();
        assert_eq!(found.descriptor(), "NAMED seq1 1 ");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn arming_twice_is_rejected() {
        let (config, _root) = config();
        let registry = DebugPointRegistry::new();
        registry
            .arm(&config, point(PointKind::SkipPoint, "seq1", vec![0]))
            .unwrap();
        let err = registry
            .arm(&config, point(PointKind::SkipPoint, "seq1", vec![0]))
            .unwrap_err();
        assert!(matches!(err, DebugError::AlreadyArmed { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn disarm_of_unarmed_point_is_rejected() {
        let (config, _root) = config();
        let registry = DebugPointRegistry::new();
        let err = registry
            .disarm(&config, &point(PointKind::SkipPoint, "seq1", vec![0]))
            .unwrap_err();
        assert!(matches!(err, DebugError::NotArmed { .. }));
    }

    #[test]
    fn disarm_clears_marker() {
        let (config, root) = config();
        let registry = DebugPointRegistry::new();
        let bp = point(PointKind::Breakpoint, "seq1", vec![0]);
        registry.arm(&config, bp.clone()).unwrap();
        registry.disarm(&config, &bp).unwrap();
        assert!(!root.child(0).unwrap().markers().is_armed(PointKind::Breakpoint));
        assert!(registry.is_empty());
    }

    #[test]
    fn same_point_can_be_armed_again_after_disarm() {
        let (config, root) = config();
        let registry = DebugPointRegistry::new();
        let bp = point(PointKind::Breakpoint, "seq1", vec![1]);
        let step = root.child(1).unwrap();

        for _ in 0..2 {
            registry.arm(&config, bp.clone()).unwrap();
            assert!(step.markers().is_armed(PointKind::Breakpoint));
            assert_eq!(
                registry
                    .lookup(step.id(), PointKind::Breakpoint)
                    .map(|p| p.descriptor()),
                Some("NAMED seq1 1 ".to_string())
            );

            registry.disarm(&config, &bp).unwrap();
            assert!(!step.markers().is_armed(PointKind::Breakpoint));
            assert!(registry.lookup(step.id(), PointKind::Breakpoint).is_none());
        }

        registry.arm(&config, bp).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unresolvable_points_leave_state_untouched() {
        let (config, _root) = config();
        let registry = DebugPointRegistry::new();
        assert!(matches!(
            registry.arm(&config, point(PointKind::Breakpoint, "seq1", vec![7])),
            Err(DebugError::StepNotFound { .. })
        ));
        assert!(matches!(
            registry.arm(&config, point(PointKind::Breakpoint, "nope", vec![0])),
            Err(DebugError::ContainerNotFound { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn invalidate_clears_all_markers() {
        let (config, root) = config();
        let registry = DebugPointRegistry::new();
        registry
            .arm(&config, point(PointKind::Breakpoint, "seq1", vec![0]))
            .unwrap();
        registry
            .arm(&config, point(PointKind::SkipPoint, "seq1", vec![1]))
            .unwrap();
        assert_eq!(registry.points().len(), 2);

        registry.invalidate();

        assert!(registry.is_empty());
        assert!(!root.child(0).unwrap().markers().is_armed(PointKind::Breakpoint));
        assert!(!root.child(1).unwrap().markers().is_armed(PointKind::SkipPoint));
    }
}
