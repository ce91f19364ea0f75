//! The condition tree: leaf rules combined by AND/OR groups.

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownOperator;

/// A node of the condition tree, tagged by `kind` in its persisted form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TreeNode {
    /// A leaf comparing one field against one value
    #[serde(rename = "CONDITION")]
    Rule(RuleNode),
    /// An internal node combining its children
    #[serde(rename = "GROUP")]
    Group(GroupNode),
}

/// A leaf condition, e.g. `user_age >= '18'`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleNode {
    /// Id into the field catalog; empty until the user picks a field
    #[serde(default)]
    pub field_ref: String,
    /// `None` only while the operator picker has been cleared
    #[serde(default, with = "operator_symbol")]
    pub operator: Option<Operator>,
    #[serde(default)]
    pub value: String,
}

/// A group of conditions joined by one combinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNode {
    pub combinator: Combinator,
    /// Editor presentation state. Ignored by generation and validation.
    #[serde(default = "default_expanded")]
    pub expanded: bool,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

fn default_expanded() -> bool {
    true
}

/// Variant discriminant, used in error reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Condition,
    Group,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Condition => write!(f, "condition"),
            NodeKind::Group => write!(f, "group"),
        }
    }
}

impl TreeNode {
    /// An empty AND group, expanded. This is what every new tree starts as.
    pub fn empty_group() -> Self {
        TreeNode::Group(GroupNode::default())
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            TreeNode::Rule(_) => NodeKind::Condition,
            TreeNode::Group(_) => NodeKind::Group,
        }
    }

    pub fn as_rule(&self) -> Option<&RuleNode> {
        match self {
            TreeNode::Rule(rule) => Some(rule),
            TreeNode::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupNode> {
        match self {
            TreeNode::Group(group) => Some(group),
            TreeNode::Rule(_) => None,
        }
    }
}

impl Default for GroupNode {
    fn default() -> Self {
        Self {
            combinator: Combinator::And,
            expanded: true,
            children: Vec::new(),
        }
    }
}

impl GroupNode {
    pub fn new(combinator: Combinator, children: Vec<TreeNode>) -> Self {
        Self {
            combinator,
            expanded: true,
            children,
        }
    }
}

impl Default for RuleNode {
    /// A freshly added condition: no field, `=`, no value
    fn default() -> Self {
        Self {
            field_ref: String::new(),
            operator: Some(Operator::Eq),
            value: String::new(),
        }
    }
}

impl RuleNode {
    pub fn new(field_ref: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            field_ref: field_ref.into(),
            operator: Some(operator),
            value: value.into(),
        }
    }
}

impl From<RuleNode> for TreeNode {
    fn from(rule: RuleNode) -> Self {
        TreeNode::Rule(rule)
    }
}

impl From<GroupNode> for TreeNode {
    fn from(group: GroupNode) -> Self {
        TreeNode::Group(group)
    }
}

/// Logical combinator of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    pub fn keyword(self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for Combinator {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Combinator::And),
            "OR" => Ok(Combinator::Or),
            _ => Err(UnknownOperator(s.to_string())),
        }
    }
}

/// The closed set of comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,        // =
    NotEq,     // !=
    Gt,        // >
    Lt,        // <
    Gte,       // >=
    Lte,       // <=
    Like,      // LIKE
    In,        // IN
    NotIn,     // NOT IN
    IsNull,    // IS NULL
    IsNotNull, // IS NOT NULL
}

impl Operator {
    /// All operators, in the order editors list them
    pub const ALL: [Operator; 11] = [
        Operator::Eq,
        Operator::NotEq,
        Operator::Gt,
        Operator::Lt,
        Operator::Gte,
        Operator::Lte,
        Operator::Like,
        Operator::In,
        Operator::NotIn,
        Operator::IsNull,
        Operator::IsNotNull,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }

    /// Null checks take no value
    pub fn is_unary(self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    /// `IN` / `NOT IN` take a parenthesized list
    pub fn takes_list(self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_uppercase();
        Operator::ALL
            .into_iter()
            .find(|op| op.symbol() == normalized)
            .ok_or_else(|| UnknownOperator(s.to_string()))
    }
}

/// Operators persist as their SQL symbol; an empty string means "not chosen".
mod operator_symbol {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Operator;

    pub fn serialize<S: Serializer>(op: &Option<Operator>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(op.map(Operator::symbol).unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Operator>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        raw.parse().map(Some).map_err(serde::de::Error::custom)
    }
}

/// Child-index address of a node, from the root. The empty path is the root.
///
/// A path is only meaningful for the tree it was taken from: any structural
/// change that shifts sibling indices invalidates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<usize>);

impl Path {
    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Path(indices)
    }

    /// The parent path and the index within it; `None` for the root
    pub fn split_last(&self) -> Option<(Path, usize)> {
        self.0
            .split_last()
            .map(|(last, parent)| (Path(parent.to_vec()), *last))
    }
}

impl Deref for Path {
    type Target = [usize];

    fn deref(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for Path {
    fn from(indices: Vec<usize>) -> Self {
        Path(indices)
    }
}

impl From<&[usize]> for Path {
    fn from(indices: &[usize]) -> Self {
        Path(indices.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Path {
    fn from(indices: [usize; N]) -> Self {
        Path(indices.to_vec())
    }
}

impl fmt::Display for Path {
    /// `/` for the root, `/0/2` for the third child of the first child
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for index in &self.0 {
            write!(f, "/{}", index)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split('/')
            .filter(|segment| !segment.trim().is_empty())
            .map(|segment| segment.trim().parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map(Path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_symbols_round_trip() {
        for op in Operator::ALL {
            assert_eq!(op.symbol().parse::<Operator>().unwrap(), op);
        }
        assert_eq!("is  not null".parse::<Operator>().unwrap(), Operator::IsNotNull);
        assert!("BETWEEN".parse::<Operator>().is_err());
    }

    #[test]
    fn test_operator_families() {
        let unary: Vec<_> = Operator::ALL.into_iter().filter(|op| op.is_unary()).collect();
        assert_eq!(unary, vec![Operator::IsNull, Operator::IsNotNull]);
        assert!(Operator::NotIn.takes_list());
        assert!(!Operator::Like.takes_list());
    }

    #[test]
    fn test_path_display_and_parse() {
        assert_eq!(Path::root().to_string(), "/");
        assert_eq!(Path::from([0, 2]).to_string(), "/0/2");
        assert_eq!("/0/2".parse::<Path>().unwrap(), Path::from([0, 2]));
        assert_eq!("/".parse::<Path>().unwrap(), Path::root());
        assert!("/a".parse::<Path>().is_err());
    }

    #[test]
    fn test_path_split_last() {
        assert_eq!(Path::root().split_last(), None);
        assert_eq!(Path::from([1, 3]).split_last(), Some((Path::from([1]), 3)));
    }

    #[test]
    fn test_persisted_shape() {
        let tree = TreeNode::Group(GroupNode::new(
            Combinator::Or,
            vec![RuleNode::new("1", Operator::IsNotNull, "").into()],
        ));
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "kind": "GROUP",
                "combinator": "OR",
                "expanded": true,
                "children": [
                    { "kind": "CONDITION", "fieldRef": "1", "operator": "IS NOT NULL", "value": "" }
                ]
            })
        );
    }

    #[test]
    fn test_cleared_operator_deserializes_as_none() {
        let json = r#"{ "kind": "CONDITION", "fieldRef": "", "operator": "", "value": "" }"#;
        let node: TreeNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.as_rule().unwrap().operator, None);

        let bad = r#"{ "kind": "CONDITION", "fieldRef": "1", "operator": "~=", "value": "" }"#;
        assert!(serde_json::from_str::<TreeNode>(bad).is_err());
    }
}
