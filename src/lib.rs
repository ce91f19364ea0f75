//! Visual condition builder core: nested AND/OR condition trees, their
//! SQL rendering, and the persisted document holding them.

pub mod ast;
pub mod config;
pub mod document;
pub mod error;
pub mod gateway;
pub mod session;
pub mod sql_compiler;
pub mod tree;
pub mod validation;

#[cfg(test)]
mod property_tests;

pub use ast::{Combinator, GroupNode, NodeKind, Operator, Path, RuleNode, TreeNode};
pub use config::{FieldCatalog, FieldDescriptor};
pub use document::{ConditionFormData, SpecificCondition};
pub use sql_compiler::generate_sql;
pub use validation::{first_incompleteness, has_any_condition, Incompleteness};
