use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use condition_builder::ast::{Combinator, GroupNode, Operator, RuleNode, TreeNode};
use condition_builder::config::FieldCatalog;
use condition_builder::sql_compiler::{generate_sql, SqlCompiler};
use condition_builder::tree::{add_condition, update_node, NodePatch};
use condition_builder::validation::{first_incompleteness, has_any_condition};

// 构造一棵指定深度和宽度的条件树
fn build_tree(depth: usize, width: usize) -> TreeNode {
    const OPERATORS: [Operator; 5] = [Operator::Gte, Operator::Like, Operator::In, Operator::IsNull, Operator::Eq];
    let children = (0..width)
        .map(|i| {
            if depth > 1 && i % 2 == 1 {
                build_tree(depth - 1, width)
            } else {
                let op = OPERATORS[i % OPERATORS.len()];
                RuleNode::new(((i % 10) + 1).to_string(), op, format!("v{}", i)).into()
            }
        })
        .collect();
    let combinator = if depth % 2 == 0 { Combinator::Or } else { Combinator::And };
    GroupNode::new(combinator, children).into()
}

fn test_cases() -> Vec<(&'static str, TreeNode)> {
    vec![
        ("simple", build_tree(1, 1)),
        ("medium", build_tree(2, 4)),
        ("complex", build_tree(4, 6)),
    ]
}

// 基准测试：预览SQL生成
fn benchmark_generate_sql(c: &mut Criterion) {
    let catalog = FieldCatalog::default();
    let mut group = c.benchmark_group("generate_sql");

    for (name, tree) in test_cases() {
        group.bench_with_input(BenchmarkId::new("preview", name), &tree, |b, tree| {
            b.iter(|| black_box(generate_sql(black_box(tree), &catalog)))
        });
    }

    group.finish();
}

// 基准测试：参数化SQL编译
fn benchmark_compile(c: &mut Criterion) {
    let catalog = FieldCatalog::default();
    let compiler = SqlCompiler::new(&catalog, "users");
    let mut group = c.benchmark_group("compile");

    for (name, tree) in test_cases() {
        group.bench_with_input(BenchmarkId::new("parameterized", name), &tree, |b, tree| {
            b.iter(|| match compiler.build(black_box(tree)) {
                Ok(result) => black_box(result),
                Err(_) => panic!("编译失败"),
            })
        });
    }

    group.finish();
}

// 基准测试：校验
fn benchmark_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("validation");

    for (name, tree) in test_cases() {
        group.bench_with_input(BenchmarkId::new("validate", name), &tree, |b, tree| {
            b.iter(|| black_box((has_any_condition(tree), first_incompleteness(tree))))
        });
    }

    group.finish();
}

// 基准测试：写时复制的树修改
fn benchmark_tree_mutation(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_mutation");

    for (name, tree) in test_cases() {
        group.bench_with_input(BenchmarkId::new("add_then_update", name), &tree, |b, tree| {
            b.iter(|| {
                let next = add_condition(black_box(tree), &[]).expect("根节点是分组");
                let last = next.as_group().map(|g| g.children.len() - 1).unwrap_or(0);
                let patch = NodePatch::new().field_ref("1").value("42");
                black_box(update_node(&next, &[last], &patch).expect("路径有效"))
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_generate_sql,
    benchmark_compile,
    benchmark_validation,
    benchmark_tree_mutation
);
criterion_main!(benches);
