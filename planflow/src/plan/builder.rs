//! Fluent construction of composite steps.

use super::{Plan, Step, StepAction};
use crate::core::{StepId, StepType};
use crate::errors::PlanValidationError;
use std::collections::HashMap;

/// Builder for a sequential or parallel step and its subtree.
///
/// ```
/// use planflow::plan::CompositeStepBuilder;
/// use planflow::testing::NoOpAction;
///
/// let step = CompositeStepBuilder::sequential("rollout")
///     .leaf("drain", NoOpAction)
///     .parallel_group("install", |group| {
///         group.leaf("host-1", NoOpAction).leaf("host-2", NoOpAction)
///     })
///     .leaf("undrain", NoOpAction)
///     .build_step();
///
/// assert_eq!(step.leaf_count(), 4);
/// ```
#[derive(Debug)]
pub struct CompositeStepBuilder {
    name: String,
    step_type: StepType,
    id: Option<StepId>,
    metadata: HashMap<String, serde_json::Value>,
    children: Vec<Step>,
}

impl CompositeStepBuilder {
    fn new(name: impl Into<String>, step_type: StepType) -> Self {
        Self {
            name: name.into(),
            step_type,
            id: None,
            metadata: HashMap::new(),
            children: Vec::new(),
        }
    }

    /// Starts a sequential step.
    pub fn sequential(name: impl Into<String>) -> Self {
        Self::new(name, StepType::Sequential)
    }

    /// Starts a parallel step.
    pub fn parallel(name: impl Into<String>) -> Self {
        Self::new(name, StepType::Parallel)
    }

    /// Sets the step id.
    #[must_use]
    pub fn with_id(mut self, id: StepId) -> Self {
        self.id = Some(id);
        self
    }

    /// Adds a metadata entry to the composite step.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Appends a leaf child.
    #[must_use]
    pub fn leaf(mut self, name: impl Into<String>, action: impl StepAction + 'static) -> Self {
        self.children.push(Step::leaf(name, action));
        self
    }

    /// Appends an already built child step.
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.children.push(step);
        self
    }

    /// Appends a nested sequential child built by `f`.
    #[must_use]
    pub fn sequential_group<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        let child = f(Self::sequential(name)).build_step();
        self.step(child)
    }

    /// Appends a nested parallel child built by `f`.
    #[must_use]
    pub fn parallel_group<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        let child = f(Self::parallel(name)).build_step();
        self.step(child)
    }

    /// Returns the number of direct children added so far.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Builds the composite step.
    #[must_use]
    pub fn build_step(self) -> Step {
        let mut step = if self.step_type == StepType::Parallel {
            Step::parallel(self.name, self.children)
        } else {
            Step::sequential(self.name, self.children)
        };
        if let Some(id) = self.id {
            step = step.with_id(id);
        }
        for (key, value) in self.metadata {
            step = step.with_metadata(key, value);
        }
        step
    }

    /// Builds a plan rooted at this step, named after it.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting plan fails validation.
    pub fn build_plan(self) -> Result<Plan, PlanValidationError> {
        let name = self.name.clone();
        Plan::new(name, self.build_step())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::NoOpAction;

    #[test]
    fn test_nested_groups() {
        let step = CompositeStepBuilder::parallel("fleet")
            .sequential_group("dc-1", |g| g.leaf("a", NoOpAction).leaf("b", NoOpAction))
            .sequential_group("dc-2", |g| g.leaf("c", NoOpAction))
            .with_metadata("owner", serde_json::json!("ops"))
            .build_step();

        assert_eq!(step.step_type(), StepType::Parallel);
        assert_eq!(step.children().len(), 2);
        assert_eq!(step.children()[0].step_type(), StepType::Sequential);
        assert_eq!(step.leaf_count(), 3);
        assert_eq!(step.metadata()["owner"], serde_json::json!("ops"));
    }

    #[test]
    fn test_build_plan_uses_root_name() {
        let id = StepId::new();
        let plan = CompositeStepBuilder::sequential("upgrade")
            .with_id(id)
            .leaf("only", NoOpAction)
            .build_plan()
            .unwrap();

        assert_eq!(plan.name(), "upgrade");
        assert_eq!(plan.root().id(), id);
    }

    #[test]
    fn test_empty_builder() {
        let builder = CompositeStepBuilder::parallel("nothing");
        assert_eq!(builder.child_count(), 0);
        assert!(builder.build_step().children().is_empty());
    }
}
