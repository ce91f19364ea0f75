//! The aggregate document: one general condition plus named specific ones.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::ast::{Combinator, GroupNode, Operator, RuleNode, TreeNode};
use crate::config::FieldCatalog;
use crate::error::EditError;
use crate::sql_compiler::generate_sql;
use crate::tree::TreeOp;

/// A named condition with a stable id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecificCondition {
    pub id: String,
    pub name: String,
    pub condition: TreeNode,
}

/// The unit of load and save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionFormData {
    pub general_name: String,
    pub general_condition: TreeNode,
    #[serde(default)]
    pub specific_conditions: Vec<SpecificCondition>,
}

impl ConditionFormData {
    pub fn new(general_name: impl Into<String>) -> Self {
        Self {
            general_name: general_name.into(),
            general_condition: TreeNode::empty_group(),
            specific_conditions: Vec::new(),
        }
    }

    /// The document a fresh backend starts with
    pub fn sample() -> Self {
        let single = |field: &str, op: Operator, value: &str| -> TreeNode {
            GroupNode::new(Combinator::And, vec![RuleNode::new(field, op, value).into()]).into()
        };
        Self {
            general_name: "User filter".to_string(),
            general_condition: single("1", Operator::Gte, "18"),
            specific_conditions: vec![
                SpecificCondition {
                    id: "1".to_string(),
                    name: "VIP".to_string(),
                    condition: single("3", Operator::Eq, "vip"),
                },
                SpecificCondition {
                    id: "2".to_string(),
                    name: "New employees".to_string(),
                    condition: single("6", Operator::Gte, "2024-01-01"),
                },
            ],
        }
    }

    /// Appends an unnamed specific condition with an empty tree and returns its index
    pub fn add_specific(&mut self, ids: &mut IdGenerator) -> usize {
        let id = ids.next_id();
        debug!("adding specific condition {}", id);
        self.specific_conditions.push(SpecificCondition {
            id,
            name: String::new(),
            condition: TreeNode::empty_group(),
        });
        self.specific_conditions.len() - 1
    }

    /// Callers confirm with the user before deleting.
    pub fn remove_specific(&mut self, index: usize) -> Option<SpecificCondition> {
        if index >= self.specific_conditions.len() {
            return None;
        }
        let removed = self.specific_conditions.remove(index);
        debug!("removed specific condition {}", removed.id);
        Some(removed)
    }

    pub fn specific_position(&self, id: &str) -> Option<usize> {
        self.specific_conditions.iter().position(|spec| spec.id == id)
    }

    /// Renders every condition of the document
    pub fn sql_report(&self, catalog: &FieldCatalog) -> SqlReport {
        SqlReport {
            general_name: self.general_name.clone(),
            general_sql: generate_sql(&self.general_condition, catalog),
            specific: self
                .specific_conditions
                .iter()
                .map(|spec| (spec.name.clone(), generate_sql(&spec.condition, catalog)))
                .collect(),
        }
    }
}

impl Default for ConditionFormData {
    fn default() -> Self {
        Self::new("")
    }
}

/// Generated SQL for a whole document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlReport {
    pub general_name: String,
    pub general_sql: String,
    /// `(name, sql)` per specific condition, in order
    pub specific: Vec<(String, String)>,
}

impl fmt::Display for SqlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "General ({}): {}", self.general_name, self.general_sql)?;
        for (index, (name, sql)) in self.specific.iter().enumerate() {
            writeln!(f, "Specific {} ({}): {}", index + 1, name, sql)?;
        }
        Ok(())
    }
}

/// Issues ids for new specific conditions.
///
/// Ids are the current Unix time in milliseconds, bumped past the previous
/// id when the clock has not moved (or moved backwards), so a generator
/// never hands out the same id twice.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts past every numeric id already in `document`
    pub fn seeded_from(document: &ConditionFormData) -> Self {
        let last = document
            .specific_conditions
            .iter()
            .filter_map(|spec| spec.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        Self { last }
    }

    pub fn next_id(&mut self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);
        self.last = now.max(self.last + 1);
        self.last.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    View,
    Edit,
}

/// A specific condition opened for viewing or editing.
///
/// Holds its own copy of the name and tree; the document only changes on
/// [`commit`](EditingSession::commit).
#[derive(Debug, Clone, PartialEq)]
pub struct EditingSession {
    pub mode: EditMode,
    pub index: usize,
    pub id: String,
    pub name: String,
    pub condition: TreeNode,
}

impl EditingSession {
    pub fn open(document: &ConditionFormData, index: usize, mode: EditMode) -> Result<Self, EditError> {
        let spec = document
            .specific_conditions
            .get(index)
            .ok_or(EditError::NoSuchCondition(index))?;
        Ok(Self {
            mode,
            index,
            id: spec.id.clone(),
            name: spec.name.clone(),
            condition: spec.condition.clone(),
        })
    }

    fn ensure_editable(&self) -> Result<(), EditError> {
        match self.mode {
            EditMode::Edit => Ok(()),
            EditMode::View => Err(EditError::ReadOnly),
        }
    }

    pub fn apply(&mut self, op: &TreeOp) -> Result<(), EditError> {
        self.ensure_editable()?;
        self.condition = op.apply(&self.condition)?;
        Ok(())
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), EditError> {
        self.ensure_editable()?;
        self.name = name.into();
        Ok(())
    }

    /// Writes name and tree back to the condition this session was opened on,
    /// found by id so removing other conditions in between is harmless.
    /// `Stale` only when that condition itself is gone.
    pub fn commit(&self, document: &mut ConditionFormData) -> Result<(), EditError> {
        self.ensure_editable()?;
        let position = document
            .specific_position(&self.id)
            .ok_or_else(|| EditError::Stale {
                index: self.index,
                id: self.id.clone(),
            })?;
        let spec = &mut document.specific_conditions[position];
        spec.name = self.name.clone();
        spec.condition = self.condition.clone();
        debug!("committed specific condition {}", self.id);
        Ok(())
    }
}
