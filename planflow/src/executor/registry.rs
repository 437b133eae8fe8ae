//! Per-run arena of executors.

use super::{ExecutorPhase, StepExecutor};
use crate::core::{StepId, StepType};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};

/// Index of an executor in its run's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutorId(usize);

impl ExecutorId {
    /// Returns the arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ExecutorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Point-in-time view of one registered executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorSnapshot {
    /// Arena index.
    pub executor_id: ExecutorId,
    /// The step the executor runs.
    pub step_id: StepId,
    /// The step name.
    pub step_name: String,
    /// The step type.
    pub step_type: StepType,
    /// Lifecycle phase at snapshot time.
    pub phase: ExecutorPhase,
}

/// Arena indexing every executor created during a run.
///
/// Entries are weak: executors are owned by whoever created them (the caller
/// for a root, the parent's [`CompositeChildren`](super::CompositeChildren)
/// for children), and hold the run context that owns this registry. Lookups
/// return `None` once an executor has been dropped. Ids are append-only until
/// [`clear`](Self::clear).
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: RwLock<Vec<Weak<dyn StepExecutor>>>,
    by_step: DashMap<StepId, ExecutorId>,
}

impl ExecutorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next id, builds the executor with it and stores it.
    pub fn register<F>(&self, build: F) -> Arc<dyn StepExecutor>
    where
        F: FnOnce(ExecutorId) -> Arc<dyn StepExecutor>,
    {
        let executor = {
            let mut executors = self.executors.write();
            let id = ExecutorId(executors.len());
            let executor = build(id);
            executors.push(Arc::downgrade(&executor));
            executor
        };
        self.by_step.insert(executor.step().id(), executor.id());
        executor
    }

    /// Returns the executor at `id` if it is still alive.
    #[must_use]
    pub fn get(&self, id: ExecutorId) -> Option<Arc<dyn StepExecutor>> {
        self.executors.read().get(id.0).and_then(Weak::upgrade)
    }

    /// Returns the executor created for `step_id`, if any.
    #[must_use]
    pub fn find_by_step(&self, step_id: StepId) -> Option<Arc<dyn StepExecutor>> {
        let id = *self.by_step.get(&step_id)?;
        self.get(id)
    }

    /// Returns the number of executors registered so far, live or dropped.
    #[must_use]
    pub fn len(&self) -> usize {
        self.executors.read().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.executors.read().is_empty()
    }

    /// Describes every live executor, in creation order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ExecutorSnapshot> {
        self.executors
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .map(|e| ExecutorSnapshot {
                executor_id: e.id(),
                step_id: e.step().id(),
                step_name: e.step().name().to_string(),
                step_type: e.step().step_type(),
                phase: e.phase(),
            })
            .collect()
    }

    /// Counts live executors in the given phase.
    #[must_use]
    pub fn count_in_phase(&self, phase: ExecutorPhase) -> usize {
        self.executors
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|e| e.phase() == phase)
            .count()
    }

    /// Forgets every entry. Executors still held elsewhere stay alive.
    pub fn clear(&self) {
        self.executors.write().clear();
        self.by_step.clear();
    }
}

impl fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutionContext;
    use crate::executor::create_executor;
    use crate::plan::Step;
    use crate::testing::NoOpAction;

    #[tokio::test]
    async fn test_register_assigns_sequential_ids() {
        let ctx = Arc::new(ExecutionContext::new());
        let a = Arc::new(Step::leaf("a", NoOpAction));
        let b = Arc::new(Step::leaf("b", NoOpAction));

        let ea = create_executor(a.clone(), ctx.clone());
        let eb = create_executor(b.clone(), ctx.clone());

        assert_eq!(ea.id().index(), 0);
        assert_eq!(eb.id().index(), 1);
        assert_eq!(ea.id().to_string(), "#0");
        assert_eq!(ctx.registry().find_by_step(b.id()).map(|e| e.id()), Some(eb.id()));
        assert!(ctx.registry().find_by_step(StepId::new()).is_none());
    }

    #[tokio::test]
    async fn test_snapshot_and_clear() {
        let ctx = Arc::new(ExecutionContext::new());
        let step = Arc::new(Step::leaf("probe", NoOpAction));
        let executor = create_executor(step.clone(), ctx.clone());

        let snapshot = ctx.registry().snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].step_name, "probe");
        assert_eq!(snapshot[0].phase, ExecutorPhase::Created);
        assert_eq!(ctx.registry().count_in_phase(ExecutorPhase::Created), 1);

        executor.execute().unwrap();
        executor.wait_for_completion().await.unwrap();
        assert_eq!(ctx.registry().count_in_phase(ExecutorPhase::Finished), 1);

        ctx.registry().clear();
        assert!(ctx.registry().is_empty());
        assert!(ctx.registry().get(executor.id()).is_none());
    }

    #[tokio::test]
    async fn test_entries_do_not_keep_run_alive() {
        let ctx = Arc::new(ExecutionContext::new());
        let step = Arc::new(Step::parallel(
            "group",
            vec![Step::leaf("a", NoOpAction), Step::leaf("b", NoOpAction)],
        ));
        let executor = create_executor(step.clone(), ctx.clone());
        executor.execute().unwrap();
        executor.wait_for_completion().await.unwrap();

        assert_eq!(ctx.registry().len(), 3);
        assert!(ctx.registry().find_by_step(step.children()[1].id()).is_some());

        let run = Arc::downgrade(&ctx);
        let id = executor.id();
        drop(executor);
        assert!(ctx.registry().get(id).is_none());
        assert!(ctx.registry().snapshot().is_empty());

        drop(ctx);
        assert!(run.upgrade().is_none());
    }
}
