//! Validated plans.

use super::Step;
use crate::core::StepId;
use crate::errors::PlanValidationError;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// A named, validated step tree ready to be run.
#[derive(Debug, Clone)]
pub struct Plan {
    id: Uuid,
    name: String,
    root: Arc<Step>,
}

impl Plan {
    /// Creates a plan after validating the step tree.
    ///
    /// # Errors
    ///
    /// Returns an error if two steps share an id or the plan name is blank.
    pub fn new(name: impl Into<String>, root: Step) -> Result<Self, PlanValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PlanValidationError::new("Plan name cannot be empty"));
        }
        validate_unique_ids(&root)?;

        Ok(Self {
            id: crate::utils::generate_uuid_v7(),
            name,
            root: Arc::new(root),
        })
    }

    /// Returns the plan id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the plan name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the root step.
    #[must_use]
    pub fn root(&self) -> &Arc<Step> {
        &self.root
    }

    /// Number of leaf steps in the plan.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.root.leaf_count()
    }

    /// Finds a step by id.
    #[must_use]
    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.root.find(id)
    }
}

fn validate_unique_ids(root: &Step) -> Result<(), PlanValidationError> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for step in root.walk() {
        if !seen.insert(step.id()) && !duplicates.contains(&step.id()) {
            duplicates.push(step.id());
        }
    }

    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(PlanValidationError::new(format!(
            "Plan contains {} duplicated step id(s)",
            duplicates.len()
        ))
        .with_steps(duplicates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::NoOpAction;

    #[test]
    fn test_plan_creation() {
        let plan = Plan::new(
            "deploy",
            Step::parallel("root", vec![Step::leaf("a", NoOpAction), Step::leaf("b", NoOpAction)]),
        )
        .unwrap();

        assert_eq!(plan.name(), "deploy");
        assert_eq!(plan.leaf_count(), 2);
        assert_eq!(plan.id().get_version_num(), 7);

        let first = plan.root().children()[0].id();
        assert_eq!(plan.step(first).map(Step::name), Some("a"));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let id = StepId::new();
        let leaf = Step::leaf("a", NoOpAction).with_id(id);
        let err = Plan::new("dup", Step::sequential("root", vec![leaf.clone(), leaf])).unwrap_err();

        assert_eq!(err.steps, vec![id]);
        assert!(err.message.contains("duplicated"));
    }

    #[test]
    fn test_blank_name_rejected() {
        assert!(Plan::new("  ", Step::leaf("a", NoOpAction)).is_err());
    }
}
