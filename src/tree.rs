//! Path-addressed operations on the condition tree.
//!
//! Every operation takes the current tree by reference and returns a new
//! tree. The input is never touched, so an error leaves the caller holding
//! the prior tree exactly as it was.
//!
//! ```text
//! resolve(tree, [1, 0])
//!   root ── children[1] ── children[0]
//!            (must be a group to step into)
//! ```

use log::{debug, warn};

use crate::ast::{Combinator, GroupNode, NodeKind, Operator, Path, RuleNode, TreeNode};
use crate::error::TreeError;

/// Fields to shallow-merge into a node. Unset fields stay unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub field_ref: Option<String>,
    pub operator: Option<Operator>,
    pub value: Option<String>,
    pub combinator: Option<Combinator>,
    pub expanded: Option<bool>,
}

impl NodePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field_ref(mut self, field_ref: impl Into<String>) -> Self {
        self.field_ref = Some(field_ref.into());
        self
    }

    pub fn operator(mut self, operator: Operator) -> Self {
        self.operator = Some(operator);
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn combinator(mut self, combinator: Combinator) -> Self {
        self.combinator = Some(combinator);
        self
    }

    pub fn expanded(mut self, expanded: bool) -> Self {
        self.expanded = Some(expanded);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// First set field that does not exist on the given variant
    fn foreign_field(&self, kind: NodeKind) -> Option<&'static str> {
        match kind {
            NodeKind::Condition => {
                if self.combinator.is_some() {
                    Some("setting `combinator`")
                } else if self.expanded.is_some() {
                    Some("setting `expanded`")
                } else {
                    None
                }
            }
            NodeKind::Group => {
                if self.field_ref.is_some() {
                    Some("setting `fieldRef`")
                } else if self.operator.is_some() {
                    Some("setting `operator`")
                } else if self.value.is_some() {
                    Some("setting `value`")
                } else {
                    None
                }
            }
        }
    }
}

/// One editor interaction: an operation plus the path it targets
#[derive(Debug, Clone, PartialEq)]
pub enum TreeOp {
    AddCondition(Path),
    AddGroup(Path),
    Remove(Path),
    Update(Path, NodePatch),
    ToggleExpanded(Path),
}

impl TreeOp {
    pub fn apply(&self, tree: &TreeNode) -> Result<TreeNode, TreeError> {
        let result = match self {
            TreeOp::AddCondition(path) => add_condition(tree, path),
            TreeOp::AddGroup(path) => add_group(tree, path),
            TreeOp::Remove(path) => remove_node(tree, path),
            TreeOp::Update(path, patch) => update_node(tree, path, patch),
            TreeOp::ToggleExpanded(path) => toggle_expanded(tree, path),
        };
        match &result {
            Ok(_) => debug!("applied {:?}", self),
            Err(e) => warn!("refused {:?}: {}", self, e),
        }
        result
    }
}

/// Returns the node at `path`. The empty path is the root.
pub fn resolve<'a>(tree: &'a TreeNode, path: &[usize]) -> Result<&'a TreeNode, TreeError> {
    let mut current = tree;
    for &index in path {
        current = match current {
            TreeNode::Group(group) => group.children.get(index),
            TreeNode::Rule(_) => None,
        }
        .ok_or_else(|| TreeError::path(path))?;
    }
    Ok(current)
}

fn resolve_mut<'a>(tree: &'a mut TreeNode, path: &[usize]) -> Result<&'a mut TreeNode, TreeError> {
    let mut current = tree;
    for &index in path {
        current = match current {
            TreeNode::Group(group) => group.children.get_mut(index),
            TreeNode::Rule(_) => None,
        }
        .ok_or_else(|| TreeError::path(path))?;
    }
    Ok(current)
}

/// Appending into a leaf counts as walking past it, hence `Path`.
fn group_for_append<'a>(tree: &'a mut TreeNode, path: &[usize]) -> Result<&'a mut GroupNode, TreeError> {
    match resolve_mut(tree, path)? {
        TreeNode::Group(group) => Ok(group),
        TreeNode::Rule(_) => Err(TreeError::path(path)),
    }
}

/// Appends an empty condition (`=`, no field, no value) to the group at `path`.
pub fn add_condition(tree: &TreeNode, path: &[usize]) -> Result<TreeNode, TreeError> {
    let mut next = tree.clone();
    group_for_append(&mut next, path)?
        .children
        .push(RuleNode::default().into());
    Ok(next)
}

/// Appends an empty, expanded AND group to the group at `path`.
pub fn add_group(tree: &TreeNode, path: &[usize]) -> Result<TreeNode, TreeError> {
    let mut next = tree.clone();
    group_for_append(&mut next, path)?
        .children
        .push(GroupNode::default().into());
    Ok(next)
}

/// Removes the node at `path`; later siblings shift down by one.
/// The root cannot be removed.
pub fn remove_node(tree: &TreeNode, path: &[usize]) -> Result<TreeNode, TreeError> {
    let (&index, parent_path) = path.split_last().ok_or_else(|| TreeError::path(path))?;
    let mut next = tree.clone();
    let parent = resolve_mut(&mut next, parent_path).map_err(|_| TreeError::path(path))?;
    let parent = match parent {
        TreeNode::Group(parent) => parent,
        TreeNode::Rule(_) => return Err(TreeError::path(path)),
    };
    if index >= parent.children.len() {
        return Err(TreeError::path(path));
    }
    parent.children.remove(index);
    Ok(next)
}

/// Shallow-merges `patch` into the node at `path`.
///
/// Setting a field that the resolved variant does not have (e.g. `combinator`
/// on a condition) is a `TypeMismatch`, and nothing is applied.
pub fn update_node(tree: &TreeNode, path: &[usize], patch: &NodePatch) -> Result<TreeNode, TreeError> {
    let mut next = tree.clone();
    let node = resolve_mut(&mut next, path)?;
    let found = node.kind();
    if let Some(operation) = patch.foreign_field(found) {
        let expected = match found {
            NodeKind::Condition => NodeKind::Group,
            NodeKind::Group => NodeKind::Condition,
        };
        return Err(TreeError::TypeMismatch {
            path: Path::from(path),
            operation,
            expected,
            found,
        });
    }

    match node {
        TreeNode::Rule(rule) => {
            if let Some(field_ref) = &patch.field_ref {
                rule.field_ref = field_ref.clone();
            }
            if let Some(operator) = patch.operator {
                rule.operator = Some(operator);
            }
            if let Some(value) = &patch.value {
                rule.value = value.clone();
            }
        }
        TreeNode::Group(group) => {
            if let Some(combinator) = patch.combinator {
                group.combinator = combinator;
            }
            if let Some(expanded) = patch.expanded {
                group.expanded = expanded;
            }
        }
    }
    Ok(next)
}

/// Flips the `expanded` flag of the group at `path`.
pub fn toggle_expanded(tree: &TreeNode, path: &[usize]) -> Result<TreeNode, TreeError> {
    let mut next = tree.clone();
    match resolve_mut(&mut next, path)? {
        TreeNode::Group(group) => {
            group.expanded = !group.expanded;
            Ok(next)
        }
        TreeNode::Rule(_) => Err(TreeError::TypeMismatch {
            path: Path::from(path),
            operation: "toggling expansion",
            expected: NodeKind::Group,
            found: NodeKind::Condition,
        }),
    }
}
