//! 交互式命令解析与树形渲染

use std::fmt::Write as _;

use condition_builder::ast::{Combinator, Operator, Path, TreeNode};
use condition_builder::config::FieldCatalog;
use condition_builder::tree::{NodePatch, TreeOp};

pub const HELP: &str = "\
commands:
  show                      显示当前文档
  sql                       生成所有条件的 SQL
  compile [table]           生成参数化 SQL (默认表 users)
  fields | ops              列出字段 / 运算符
  add-cond <path>           在分组下追加条件, 例如 add-cond /0
  add-group <path>          在分组下追加子分组
  rm <path>                 删除节点
  set <path> k=v ...        修改节点: field= op= value= combinator=
  toggle <path>             展开/折叠分组
  name <text>               修改名称
  spec add | view <n> | edit <n> | rm <n> | commit | close
  save | revert | reload
  help | quit

  tree commands act on the open specific condition if one is being edited,
  otherwise on the general condition";

#[derive(Debug, Clone, PartialEq)]
pub enum SpecCommand {
    Add,
    View(usize),
    Edit(usize),
    Remove(usize),
    Commit,
    Close,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Show,
    Sql,
    Compile(String),
    Fields,
    Operators,
    Tree(TreeOp),
    Name(String),
    Spec(SpecCommand),
    Save,
    Revert,
    Reload,
    Help,
    Quit,
}

/// 解析一行命令
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match word {
        "show" => Command::Show,
        "sql" => Command::Sql,
        "compile" => Command::Compile(if rest.is_empty() { "users".to_string() } else { rest.to_string() }),
        "fields" => Command::Fields,
        "ops" => Command::Operators,
        "add-cond" => Command::Tree(TreeOp::AddCondition(parse_path(rest)?)),
        "add-group" => Command::Tree(TreeOp::AddGroup(parse_path(rest)?)),
        "rm" => Command::Tree(TreeOp::Remove(parse_path(rest)?)),
        "toggle" => Command::Tree(TreeOp::ToggleExpanded(parse_path(rest)?)),
        "set" => {
            let (path, assignments) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let patch = parse_patch(assignments)?;
            Command::Tree(TreeOp::Update(parse_path(path)?, patch))
        }
        "name" => Command::Name(rest.to_string()),
        "spec" => Command::Spec(parse_spec(rest)?),
        "save" => Command::Save,
        "revert" => Command::Revert,
        "reload" => Command::Reload,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "" => return Err("empty command".to_string()),
        other => return Err(format!("unknown command: {}", other)),
    };
    Ok(command)
}

fn parse_path(raw: &str) -> Result<Path, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("missing path, e.g. / or /0/1".to_string());
    }
    raw.parse().map_err(|_| format!("invalid path: {}", raw))
}

fn parse_spec(rest: &str) -> Result<SpecCommand, String> {
    let (word, arg) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    // 用户看到的编号从1开始
    let index = || -> Result<usize, String> {
        match arg.trim().parse::<usize>() {
            Ok(n) if n >= 1 => Ok(n - 1),
            _ => Err(format!("expected a condition number, got {:?}", arg.trim())),
        }
    };
    match word {
        "add" => Ok(SpecCommand::Add),
        "view" => Ok(SpecCommand::View(index()?)),
        "edit" => Ok(SpecCommand::Edit(index()?)),
        "rm" => Ok(SpecCommand::Remove(index()?)),
        "commit" => Ok(SpecCommand::Commit),
        "close" => Ok(SpecCommand::Close),
        other => Err(format!("unknown spec command: {:?}", other)),
    }
}

/// `field=1 op=IS NOT NULL value=`: words without `=` continue the previous value
fn parse_patch(raw: &str) -> Result<NodePatch, String> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for word in raw.split_whitespace() {
        if let Some((key, value)) = word.split_once('=').filter(|(key, _)| is_patch_key(key)) {
            pairs.push((key.to_string(), value.to_string()));
        } else if let Some((_, value)) = pairs.last_mut() {
            if !value.is_empty() {
                value.push(' ');
            }
            value.push_str(word);
        } else {
            return Err(format!("expected key=value, got {:?}", word));
        }
    }
    if pairs.is_empty() {
        return Err("nothing to set".to_string());
    }

    let mut patch = NodePatch::new();
    for (key, value) in pairs {
        patch = match key.as_str() {
            "field" => patch.field_ref(value),
            "op" => patch.operator(value.parse::<Operator>().map_err(|e| e.to_string())?),
            "value" => patch.value(value),
            "combinator" => patch.combinator(value.parse::<Combinator>().map_err(|e| e.to_string())?),
            other => return Err(format!("unknown key: {}", other)),
        };
    }
    Ok(patch)
}

fn is_patch_key(key: &str) -> bool {
    matches!(key, "field" | "op" | "value" | "combinator")
}

/// 以缩进形式渲染条件树
pub fn render_tree(tree: &TreeNode, catalog: &FieldCatalog) -> String {
    fn walk(node: &TreeNode, path: &Path, depth: usize, catalog: &FieldCatalog, out: &mut String) {
        let indent = "  ".repeat(depth);
        match node {
            TreeNode::Rule(rule) => {
                let field = if rule.field_ref.is_empty() {
                    "<field?>".to_string()
                } else {
                    match catalog.display_label(&rule.field_ref) {
                        Some(label) => format!("{} ({})", label, rule.field_ref),
                        None => rule.field_ref.clone(),
                    }
                };
                let operator = rule.operator.map(Operator::symbol).unwrap_or("<op?>");
                let _ = writeln!(out, "{}{} {} {} {:?}", indent, path, field, operator, rule.value);
            }
            TreeNode::Group(group) => {
                if !group.expanded {
                    let _ = writeln!(
                        out,
                        "{}{} {} [+] ({} hidden)",
                        indent,
                        path,
                        group.combinator,
                        group.children.len()
                    );
                    return;
                }
                let _ = writeln!(out, "{}{} {} [-]", indent, path, group.combinator);
                for (index, child) in group.children.iter().enumerate() {
                    walk(child, &path.child(index), depth + 1, catalog, out);
                }
            }
        }
    }
    let mut out = String::new();
    walk(tree, &Path::root(), 0, catalog, &mut out);
    out
}
