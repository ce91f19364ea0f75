//! Structural predicates over condition trees, and the save-time checks
//! built from them.

use std::fmt;

use crate::ast::{Path, RuleNode, TreeNode};
use crate::document::ConditionFormData;
use crate::error::{ConditionLocation, ValidationError, ValidationErrors};

pub const GENERAL_NAME_MAX: usize = 200;
pub const SPECIFIC_NAME_MAX: usize = 100;

/// Why a condition is not complete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Incompleteness {
    MissingField,
    MissingOperator,
    MissingValue,
}

impl fmt::Display for Incompleteness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Incompleteness::MissingField => write!(f, "no field selected"),
            Incompleteness::MissingOperator => write!(f, "no operator selected"),
            Incompleteness::MissingValue => write!(f, "no value entered"),
        }
    }
}

/// What is wrong with a named condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationReason {
    MissingName,
    NameTooLong { max: usize },
    NoConditions,
    Incomplete { path: Path, reason: Incompleteness },
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationReason::MissingName => write!(f, "name is required"),
            ValidationReason::NameTooLong { max } => {
                write!(f, "name must be at most {} characters", max)
            }
            ValidationReason::NoConditions => write!(f, "at least one condition is required"),
            ValidationReason::Incomplete { path, reason } => {
                write!(f, "condition at {} is incomplete: {}", path, reason)
            }
        }
    }
}

/// True iff some reachable condition has a field selected.
///
/// Empty groups and conditions without a field do not count.
pub fn has_any_condition(tree: &TreeNode) -> bool {
    match tree {
        TreeNode::Rule(rule) => !rule.field_ref.trim().is_empty(),
        TreeNode::Group(group) => group.children.iter().any(has_any_condition),
    }
}

/// Completeness of a single condition
pub fn rule_incompleteness(rule: &RuleNode) -> Option<Incompleteness> {
    if rule.field_ref.trim().is_empty() {
        return Some(Incompleteness::MissingField);
    }
    let Some(operator) = rule.operator else {
        return Some(Incompleteness::MissingOperator);
    };
    if !operator.is_unary() && rule.value.trim().is_empty() {
        return Some(Incompleteness::MissingValue);
    }
    None
}

/// The first incomplete condition in depth-first order, with its path.
pub fn find_incomplete(tree: &TreeNode) -> Option<(Path, Incompleteness)> {
    fn walk(node: &TreeNode, path: &mut Vec<usize>) -> Option<(Path, Incompleteness)> {
        match node {
            TreeNode::Rule(rule) => rule_incompleteness(rule).map(|reason| (Path::from(path.as_slice()), reason)),
            TreeNode::Group(group) => {
                for (index, child) in group.children.iter().enumerate() {
                    path.push(index);
                    let found = walk(child, path);
                    path.pop();
                    if found.is_some() {
                        return found;
                    }
                }
                None
            }
        }
    }
    walk(tree, &mut Vec::new())
}

/// Reason the first incomplete condition fails, or `None` if every
/// condition is complete. A tree with no conditions at all is complete;
/// check [`has_any_condition`] separately.
pub fn first_incompleteness(tree: &TreeNode) -> Option<Incompleteness> {
    find_incomplete(tree).map(|(_, reason)| reason)
}

/// Save eligibility of one tree: non-empty and complete
pub fn validate_tree(tree: &TreeNode) -> Result<(), ValidationReason> {
    if !has_any_condition(tree) {
        return Err(ValidationReason::NoConditions);
    }
    match find_incomplete(tree) {
        Some((path, reason)) => Err(ValidationReason::Incomplete { path, reason }),
        None => Ok(()),
    }
}

pub fn validate_name(name: &str, max: usize) -> Result<(), ValidationReason> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationReason::MissingName);
    }
    if trimmed.chars().count() > max {
        return Err(ValidationReason::NameTooLong { max });
    }
    Ok(())
}

/// Checks the whole document and reports every problem found, general
/// condition first, then specific conditions in order.
pub fn validate_document(document: &ConditionFormData) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();
    let mut check = |location: &ConditionLocation, result: Result<(), ValidationReason>| {
        if let Err(reason) = result {
            errors.push(ValidationError {
                location: location.clone(),
                reason,
            });
        }
    };

    let general = ConditionLocation::General;
    check(&general, validate_name(&document.general_name, GENERAL_NAME_MAX));
    check(&general, validate_tree(&document.general_condition));

    for (index, specific) in document.specific_conditions.iter().enumerate() {
        let location = ConditionLocation::Specific {
            index,
            id: specific.id.clone(),
        };
        check(&location, validate_name(&specific.name, SPECIFIC_NAME_MAX));
        check(&location, validate_tree(&specific.condition));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}
