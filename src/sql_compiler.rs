//! Translates condition trees into SQL.
//!
//! Two outputs are offered:
//!
//! - [`generate_sql`]: the live preview string. Total over any tree, never
//!   fails, renders values verbatim. Not safe to execute.
//! - [`SqlCompiler`]: a parameterized `SELECT` built with sea-query, for
//!   complete trees only.

use crate::ast::{Combinator, GroupNode, Operator, RuleNode, TreeNode};
use crate::config::FieldCatalog;
use crate::error::CompileError;
use crate::validation::{find_incomplete, Incompleteness};
use sea_query::{Asterisk, Cond, Condition, Expr, Iden, PostgresQueryBuilder, Query, SelectStatement, SimpleExpr, Values};

/// Renders `tree` as a SQL boolean expression.
///
/// Empty groups contribute nothing, a group with one contributing child
/// renders as that child, and only groups with two or more contributing
/// children are parenthesized.
pub fn generate_sql(tree: &TreeNode, catalog: &FieldCatalog) -> String {
    match tree {
        TreeNode::Rule(rule) => generate_rule(rule, catalog),
        TreeNode::Group(group) => generate_group(group, catalog),
    }
}

fn generate_group(group: &GroupNode, catalog: &FieldCatalog) -> String {
    let mut clauses: Vec<String> = group
        .children
        .iter()
        .map(|child| generate_sql(child, catalog))
        .filter(|sql| !sql.is_empty())
        .collect();

    match clauses.len() {
        0 => String::new(),
        1 => clauses.remove(0),
        _ => format!("({})", clauses.join(format!(" {} ", group.combinator).as_str())),
    }
}

fn generate_rule(rule: &RuleNode, catalog: &FieldCatalog) -> String {
    // Unknown ids are rendered as-is
    let column = catalog
        .column_name(&rule.field_ref)
        .unwrap_or(&rule.field_ref);
    let value = &rule.value;

    match rule.operator {
        Some(op) if op.is_unary() => format!("{} {}", column, op),
        // No escaping of quotes inside the pattern
        Some(Operator::Like) => format!("{} LIKE '%{}%'", column, value),
        Some(op) if op.takes_list() => format!("{} {} ({})", column, op, value),
        Some(op) => format!("{} {} '{}'", column, op, value),
        None => format!("{} '{}'", column, value),
    }
}

/// Column identifier wrapper
#[derive(Debug, Clone)]
pub struct ColumnName(pub String);

impl Iden for ColumnName {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        let _ = write!(s, "{}", self.0);
    }
}

/// Table identifier wrapper
#[derive(Debug, Clone)]
pub struct TableName(pub String);

impl Iden for TableName {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        let _ = write!(s, "{}", self.0);
    }
}

/// A compiled statement with its bound parameters
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub sql: String,
    pub values: Values,
}

/// Compiles complete trees into parameterized `SELECT` statements
pub struct SqlCompiler<'a> {
    catalog: &'a FieldCatalog,
    table: String,
}

impl<'a> SqlCompiler<'a> {
    pub fn new(catalog: &'a FieldCatalog, table: impl Into<String>) -> Self {
        Self {
            catalog,
            table: table.into(),
        }
    }

    /// `SELECT * FROM <table> [WHERE ...]`. An empty tree selects everything.
    pub fn compile(&self, tree: &TreeNode) -> Result<SelectStatement, CompileError> {
        let mut select = Query::select();
        select.column(Asterisk).from(TableName(self.table.clone()));
        if let Some(condition) = self.compile_condition(tree)? {
            select.cond_where(condition);
        }
        Ok(select)
    }

    /// Builds the statement for PostgreSQL with placeholders and bound values
    pub fn build(&self, tree: &TreeNode) -> Result<CompiledQuery, CompileError> {
        let (sql, values) = self.compile(tree)?.build(PostgresQueryBuilder);
        Ok(CompiledQuery { sql, values })
    }

    /// The WHERE condition alone, or `None` if the tree has no conditions
    pub fn compile_condition(&self, tree: &TreeNode) -> Result<Option<Condition>, CompileError> {
        if let Some((path, reason)) = find_incomplete(tree) {
            return Err(CompileError::Incomplete { path, reason });
        }
        self.compile_node(tree, &mut Vec::new())
    }

    fn compile_node(&self, node: &TreeNode, path: &mut Vec<usize>) -> Result<Option<Condition>, CompileError> {
        match node {
            TreeNode::Rule(rule) => {
                let expr = self.compile_rule(rule, path)?;
                Ok(Some(Cond::all().add(expr)))
            }
            TreeNode::Group(group) => {
                let mut children = Vec::new();
                for (index, child) in group.children.iter().enumerate() {
                    path.push(index);
                    let compiled = self.compile_node(child, path);
                    path.pop();
                    if let Some(condition) = compiled? {
                        children.push(condition);
                    }
                }
                if children.is_empty() {
                    return Ok(None);
                }
                let combined = match group.combinator {
                    Combinator::And => Cond::all(),
                    Combinator::Or => Cond::any(),
                };
                Ok(Some(children.into_iter().fold(combined, |acc, child| acc.add(child))))
            }
        }
    }

    fn compile_rule(&self, rule: &RuleNode, path: &[usize]) -> Result<SimpleExpr, CompileError> {
        let column = self
            .catalog
            .column_name(&rule.field_ref)
            .unwrap_or(&rule.field_ref)
            .to_string();
        let col = Expr::col(ColumnName(column));
        let value = rule.value.clone();

        // Completeness was checked up front
        let Some(op) = rule.operator else {
            return Err(CompileError::Incomplete {
                path: path.into(),
                reason: Incompleteness::MissingOperator,
            });
        };

        let expr = match op {
            Operator::Eq => col.eq(value),
            Operator::NotEq => col.ne(value),
            Operator::Gt => col.gt(value),
            Operator::Lt => col.lt(value),
            Operator::Gte => col.gte(value),
            Operator::Lte => col.lte(value),
            Operator::Like => col.like(format!("%{}%", value)),
            Operator::In => col.is_in(split_list(&value, path)?),
            Operator::NotIn => col.is_not_in(split_list(&value, path)?),
            Operator::IsNull => col.is_null(),
            Operator::IsNotNull => col.is_not_null(),
        };
        Ok(expr)
    }
}

/// Splits a raw `a, 'b', c` list into bound values, stripping single quotes
fn split_list(raw: &str, path: &[usize]) -> Result<Vec<String>, CompileError> {
    let items: Vec<String> = raw
        .split(',')
        .map(|item| item.trim().trim_matches('\'').trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();
    if items.is_empty() {
        return Err(CompileError::EmptyList { path: path.into() });
    }
    Ok(items)
}
