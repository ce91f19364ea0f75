//! Property tests over generated condition trees

use proptest::prelude::*;
use proptest::sample::Index;

use crate::ast::{Combinator, GroupNode, Operator, Path, RuleNode, TreeNode};
use crate::config::FieldCatalog;
use crate::document::{ConditionFormData, SpecificCondition};
use crate::sql_compiler::generate_sql;
use crate::tree::{add_condition, remove_node, resolve, update_node, NodePatch, TreeOp};
use crate::validation::{first_incompleteness, has_any_condition};

// ═══════════════════════════════════════════════════════════════════════════
// Strategy generators
// ═══════════════════════════════════════════════════════════════════════════

/// Catalog ids, unknown ids and the unset field
fn field_ref_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        (1..=10u8).prop_map(|id| id.to_string()),
        Just("legacy_code".to_string()),
    ]
}

fn operator_strategy() -> impl Strategy<Value = Operator> {
    prop::sample::select(Operator::ALL.to_vec())
}

fn combinator_strategy() -> impl Strategy<Value = Combinator> {
    prop_oneof![Just(Combinator::And), Just(Combinator::Or)]
}

fn rule_strategy() -> impl Strategy<Value = RuleNode> {
    (field_ref_strategy(), proptest::option::weighted(0.9, operator_strategy()), "[a-z0-9 ]{0,6}")
        .prop_map(|(field_ref, operator, value)| RuleNode {
            field_ref,
            operator,
            value,
        })
}

fn node_strategy() -> impl Strategy<Value = TreeNode> {
    rule_strategy()
        .prop_map(TreeNode::from)
        .prop_recursive(4, 48, 5, |inner| {
            (combinator_strategy(), any::<bool>(), prop::collection::vec(inner, 0..5)).prop_map(
                |(combinator, expanded, children)| {
                    TreeNode::Group(GroupNode {
                        combinator,
                        expanded,
                        children,
                    })
                },
            )
        })
}

/// Trees always have a group at the root
fn tree_strategy() -> impl Strategy<Value = TreeNode> {
    (combinator_strategy(), prop::collection::vec(node_strategy(), 0..5))
        .prop_map(|(combinator, children)| TreeNode::from(GroupNode::new(combinator, children)))
}

fn all_paths(tree: &TreeNode) -> Vec<Vec<usize>> {
    fn walk(node: &TreeNode, path: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        out.push(path.clone());
        if let TreeNode::Group(group) = node {
            for (index, child) in group.children.iter().enumerate() {
                path.push(index);
                walk(child, path, out);
                path.pop();
            }
        }
    }
    let mut out = Vec::new();
    walk(tree, &mut Vec::new(), &mut out);
    out
}

fn group_paths(tree: &TreeNode) -> Vec<Vec<usize>> {
    all_paths(tree)
        .into_iter()
        .filter(|path| matches!(resolve(tree, path), Ok(TreeNode::Group(_))))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// SQL generation
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn prop_empty_group_renders_nothing(combinator in combinator_strategy(), expanded in any::<bool>()) {
        let tree = TreeNode::Group(GroupNode { combinator, expanded, children: vec![] });
        prop_assert_eq!(generate_sql(&tree, &FieldCatalog::default()), "");
    }

    #[test]
    fn prop_singleton_group_is_its_child(combinator in combinator_strategy(), child in node_strategy()) {
        let catalog = FieldCatalog::default();
        let child_sql = generate_sql(&child, &catalog);
        prop_assume!(!child_sql.is_empty());
        let tree: TreeNode = GroupNode::new(combinator, vec![child]).into();
        prop_assert_eq!(generate_sql(&tree, &catalog), child_sql);
    }

    #[test]
    fn prop_group_joins_only_non_empty_children(tree in tree_strategy()) {
        let catalog = FieldCatalog::default();
        let group = tree.as_group().unwrap();
        let retained: Vec<String> = group
            .children
            .iter()
            .map(|child| generate_sql(child, &catalog))
            .filter(|sql| !sql.is_empty())
            .collect();
        let expected = match retained.len() {
            0 => String::new(),
            1 => retained[0].clone(),
            _ => format!("({})", retained.join(format!(" {} ", group.combinator).as_str())),
        };
        prop_assert_eq!(generate_sql(&tree, &catalog), expected);
    }

    #[test]
    fn prop_expanded_flag_does_not_affect_sql_or_validation(tree in tree_strategy(), pick in any::<Index>()) {
        let groups = group_paths(&tree);
        let path = &groups[pick.index(groups.len())];
        let toggled = TreeOp::ToggleExpanded(path.clone().into()).apply(&tree).unwrap();
        let catalog = FieldCatalog::default();
        prop_assert_eq!(generate_sql(&toggled, &catalog), generate_sql(&tree, &catalog));
        prop_assert_eq!(has_any_condition(&toggled), has_any_condition(&tree));
        prop_assert_eq!(first_incompleteness(&toggled), first_incompleteness(&tree));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tree operations
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn prop_operations_never_touch_their_input(tree in tree_strategy(), pick in any::<Index>(), which in 0..5u8) {
        let paths = all_paths(&tree);
        let path: Path = paths[pick.index(paths.len())].clone().into();
        let op = match which {
            0 => TreeOp::AddCondition(path),
            1 => TreeOp::AddGroup(path),
            2 => TreeOp::Remove(path),
            3 => TreeOp::Update(path, NodePatch::new().value("changed")),
            _ => TreeOp::ToggleExpanded(path),
        };
        let before = tree.clone();
        let _ = op.apply(&tree);
        prop_assert_eq!(tree, before);
    }

    #[test]
    fn prop_removed_path_resolves_to_next_sibling_or_fails(tree in tree_strategy(), pick in any::<Index>()) {
        let paths: Vec<_> = all_paths(&tree).into_iter().filter(|p| !p.is_empty()).collect();
        prop_assume!(!paths.is_empty());
        let path = &paths[pick.index(paths.len())];
        let next = remove_node(&tree, path).unwrap();

        let mut sibling = path.clone();
        if let Some(last) = sibling.last_mut() {
            *last += 1;
        }
        match resolve(&tree, &sibling) {
            Ok(shifted) => prop_assert_eq!(resolve(&next, path).unwrap(), shifted),
            Err(_) => prop_assert!(resolve(&next, path).is_err()),
        }
    }

    #[test]
    fn prop_adding_a_named_condition_makes_tree_non_empty(tree in tree_strategy(), pick in any::<Index>(), field in 1..=10u8) {
        let groups = group_paths(&tree);
        let path = &groups[pick.index(groups.len())];
        let with_rule = add_condition(&tree, path).unwrap();
        let appended = resolve(&with_rule, path).unwrap().as_group().unwrap().children.len() - 1;
        let mut rule_path = path.clone();
        rule_path.push(appended);

        let named = update_node(&with_rule, &rule_path, &NodePatch::new().field_ref(field.to_string())).unwrap();
        prop_assert!(has_any_condition(&named));
    }

    #[test]
    fn prop_out_of_range_paths_are_rejected(tree in tree_strategy(), extra in 0..3usize) {
        let len = tree.as_group().unwrap().children.len();
        let path = [len + extra];
        prop_assert!(resolve(&tree, &path).is_err());
        prop_assert!(remove_node(&tree, &path).is_err());
        prop_assert!(add_condition(&tree, &path).is_err());
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Persisted document
// ═══════════════════════════════════════════════════════════════════════════

fn document_strategy() -> impl Strategy<Value = ConditionFormData> {
    (
        "[A-Za-z ]{0,12}",
        tree_strategy(),
        prop::collection::vec(("[0-9]{1,13}", "[A-Za-z ]{0,12}", tree_strategy()), 0..4),
    )
        .prop_map(|(general_name, general_condition, specifics)| ConditionFormData {
            general_name,
            general_condition,
            specific_conditions: specifics
                .into_iter()
                .map(|(id, name, condition)| SpecificCondition { id, name, condition })
                .collect(),
        })
}

proptest! {
    #[test]
    fn prop_json_round_trip_preserves_sql(document in document_strategy()) {
        let json = serde_json::to_string(&document).unwrap();
        let restored: ConditionFormData = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(&restored, &document);

        let catalog = FieldCatalog::default();
        prop_assert_eq!(restored.sql_report(&catalog), document.sql_report(&catalog));
    }
}
