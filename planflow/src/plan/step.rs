//! Step tree nodes.

use super::StepAction;
use crate::core::{StepId, StepType};
use std::collections::HashMap;
use std::sync::Arc;

/// What a step does: perform leaf work or group children.
#[derive(Debug, Clone)]
pub enum StepKind {
    /// Performs the wrapped action.
    Leaf(Arc<dyn StepAction>),
    /// Runs the children one after another.
    Sequential(Vec<Arc<Step>>),
    /// Runs the children concurrently and joins them.
    Parallel(Vec<Arc<Step>>),
}

/// A node in the plan tree.
///
/// Children order is significant: it is the launch order, the join order and
/// the order of child statuses in the composite completion status.
#[derive(Debug, Clone)]
pub struct Step {
    id: StepId,
    name: String,
    metadata: HashMap<String, serde_json::Value>,
    kind: StepKind,
}

impl Step {
    fn with_kind(name: impl Into<String>, kind: StepKind) -> Self {
        Self {
            id: StepId::new(),
            name: name.into(),
            metadata: HashMap::new(),
            kind,
        }
    }

    /// Creates a leaf step running `action`.
    pub fn leaf(name: impl Into<String>, action: impl StepAction + 'static) -> Self {
        Self::with_kind(name, StepKind::Leaf(Arc::new(action)))
    }

    /// Creates a leaf step from a shared action.
    pub fn leaf_shared(name: impl Into<String>, action: Arc<dyn StepAction>) -> Self {
        Self::with_kind(name, StepKind::Leaf(action))
    }

    /// Creates a sequential step. An empty child list is valid.
    pub fn sequential(name: impl Into<String>, children: Vec<Self>) -> Self {
        Self::with_kind(
            name,
            StepKind::Sequential(children.into_iter().map(Arc::new).collect()),
        )
    }

    /// Creates a parallel step. An empty child list is valid.
    pub fn parallel(name: impl Into<String>, children: Vec<Self>) -> Self {
        Self::with_kind(
            name,
            StepKind::Parallel(children.into_iter().map(Arc::new).collect()),
        )
    }

    /// Overrides the generated id.
    #[must_use]
    pub fn with_id(mut self, id: StepId) -> Self {
        self.id = id;
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns the step id.
    #[must_use]
    pub fn id(&self) -> StepId {
        self.id
    }

    /// Returns the step display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the metadata map.
    #[must_use]
    pub fn metadata(&self) -> &HashMap<String, serde_json::Value> {
        &self.metadata
    }

    /// Returns the step kind.
    #[must_use]
    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    /// Returns the step type tag.
    #[must_use]
    pub fn step_type(&self) -> StepType {
        match self.kind {
            StepKind::Leaf(_) => StepType::Leaf,
            StepKind::Sequential(_) => StepType::Sequential,
            StepKind::Parallel(_) => StepType::Parallel,
        }
    }

    /// Returns the ordered children. Leaves have none.
    #[must_use]
    pub fn children(&self) -> &[Arc<Self>] {
        match &self.kind {
            StepKind::Leaf(_) => &[],
            StepKind::Sequential(children) | StepKind::Parallel(children) => children.as_slice(),
        }
    }

    /// Returns every step of this subtree in pre-order, starting with `self`.
    #[must_use]
    pub fn walk(&self) -> Vec<&Self> {
        let mut out = vec![self];
        for child in self.children() {
            out.extend(child.walk());
        }
        out
    }

    /// Finds a step anywhere in this subtree.
    #[must_use]
    pub fn find(&self, id: StepId) -> Option<&Self> {
        if self.id == id {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find(id))
    }

    /// Number of steps in this subtree, including `self`.
    #[must_use]
    pub fn step_count(&self) -> usize {
        1 + self.children().iter().map(|c| c.step_count()).sum::<usize>()
    }

    /// Number of leaf steps in this subtree.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match &self.kind {
            StepKind::Leaf(_) => 1,
            _ => self.children().iter().map(|c| c.leaf_count()).sum(),
        }
    }

    /// Depth of this subtree. A lone leaf has depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self.children().iter().map(|c| c.depth()).max().unwrap_or(0)
    }
}
