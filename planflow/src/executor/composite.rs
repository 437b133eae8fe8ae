//! Child bookkeeping shared by the composite executors.

use super::{create_executor, ExecutorId, StepExecutor};
use crate::context::ExecutionContext;
use crate::core::{CompletionState, CompletionStatus, StepId};
use crate::events::event_types;
use crate::plan::Step;
use crate::utils::now_utc;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::warn;

/// One child executor created by a composite step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildEntry {
    /// The child step.
    pub step_id: StepId,
    /// The child's executor in the run registry.
    pub executor_id: ExecutorId,
}

/// Ordered child executors of a composite step.
///
/// Children are appended in step order as they are created, so the list is
/// always a prefix of the declared children. The list owns the child
/// executors; the run registry only indexes them.
#[derive(Debug)]
pub struct CompositeChildren {
    context: Arc<ExecutionContext>,
    parent: Arc<Step>,
    executors: RwLock<Vec<Arc<dyn StepExecutor>>>,
}

impl CompositeChildren {
    /// Creates an empty child list for `parent`.
    #[must_use]
    pub fn new(parent: Arc<Step>, context: Arc<ExecutionContext>) -> Self {
        Self {
            context,
            parent,
            executors: RwLock::new(Vec::new()),
        }
    }

    /// Creates and records the executor for `child`.
    pub fn create_child_executor(&self, child: &Arc<Step>) -> Arc<dyn StepExecutor> {
        let executor = create_executor(Arc::clone(child), Arc::clone(&self.context));
        self.executors.write().push(Arc::clone(&executor));
        executor
    }

    /// Returns the recorded entries in step order.
    #[must_use]
    pub fn entries(&self) -> Vec<ChildEntry> {
        self.executors
            .read()
            .iter()
            .map(|executor| ChildEntry {
                step_id: executor.step().id(),
                executor_id: executor.id(),
            })
            .collect()
    }

    /// Returns the child executors in step order.
    #[must_use]
    pub fn executors(&self) -> Vec<(StepId, Arc<dyn StepExecutor>)> {
        self.executors
            .read()
            .iter()
            .map(|executor| (executor.step().id(), Arc::clone(executor)))
            .collect()
    }

    /// Number of children created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.executors.read().len()
    }

    /// Returns true if no child has been created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.executors.read().is_empty()
    }

    /// Creates and starts the child at `index`.
    ///
    /// Returns the executor even when `execute()` was refused; its wait then
    /// yields a not-started status.
    pub fn launch(&self, index: usize, child: &Arc<Step>) -> Arc<dyn StepExecutor> {
        let executor = self.create_child_executor(child);
        match executor.execute() {
            Ok(()) => self.emit_child(event_types::STEP_LAUNCHED, index, child, None),
            Err(err) => {
                self.emit_child(
                    event_types::STEP_NOT_STARTED,
                    index,
                    child,
                    Some(err.to_string()),
                );
            }
        }
        executor
    }

    /// Waits on the child at `index`.
    ///
    /// Errors are folded into a failed status so one misbehaving child cannot
    /// break the parent's join.
    pub async fn join(&self, index: usize, executor: &Arc<dyn StepExecutor>) -> CompletionStatus {
        let child = executor.step();
        self.emit_child(event_types::STEP_JOINING, index, child, None);
        match executor.wait_for_completion().await {
            Ok(status) => status,
            Err(err) => {
                warn!(
                    parent = %self.parent.name(),
                    step = %child.name(),
                    error = %err,
                    "child wait failed"
                );
                let mut status = CompletionStatus::not_started(child, &err.to_string());
                status.state = CompletionState::Failed;
                status.ended_at = Some(now_utc());
                status
            }
        }
    }

    /// Records that the child at `index` will never be launched.
    pub fn skip(&self, index: usize, child: &Step, reason: &str) -> CompletionStatus {
        self.emit_child(
            event_types::STEP_NOT_STARTED,
            index,
            child,
            Some(reason.to_string()),
        );
        CompletionStatus::not_started(child, reason)
    }

    fn emit_child(&self, event_type: &str, index: usize, child: &Step, reason: Option<String>) {
        let mut payload = serde_json::json!({
            "parent": self.parent.name(),
            "parent_id": self.parent.id().to_string(),
            "step": child.name(),
            "step_id": child.id().to_string(),
            "index": index,
        });
        if let Some(reason) = reason {
            payload["reason"] = serde_json::Value::String(reason);
        }
        self.context.emit(event_type, Some(payload));
    }
}
