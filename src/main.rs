mod shell;

use anyhow::{anyhow, Result};
use log::info;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use condition_builder::ast::Operator;
use condition_builder::config::FieldCatalog;
use condition_builder::document::EditMode;
use condition_builder::gateway::{InMemoryGateway, InMemoryGatewayConfig};
use condition_builder::session::{Session, SessionState, Workspace};
use condition_builder::sql_compiler::{generate_sql, SqlCompiler};
use shell::{parse_command, render_tree, Command, SpecCommand, HELP};

const DEFAULT_FIELDS_FILE: &str = "fields.json";

/// 加载字段目录，优先使用JSON配置，失败时使用默认配置
fn load_catalog(path: &str) -> FieldCatalog {
    match FieldCatalog::from_json_file(path) {
        Ok(catalog) => {
            println!("✅ 成功从JSON配置文件加载 {} 个字段: {}", catalog.len(), path);
            catalog
        }
        Err(e) => {
            println!("⚠️ 无法加载JSON配置文件 ({}), 使用默认配置", e);
            FieldCatalog::default()
        }
    }
}

fn initialize_logging() {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_millis()
        .target(env_logger::Target::Stderr)
        .init();
}

enum Flow {
    Continue,
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    initialize_logging();
    println!("--- Condition Builder: 条件树到 SQL ---");

    let fields_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_FIELDS_FILE.to_string());
    let catalog = load_catalog(&fields_path);

    let mut rl = DefaultEditor::new()?;
    let gateway = InMemoryGateway::with_sample(InMemoryGatewayConfig::default());
    println!("正在加载条件数据...");
    let mut session = Session::start(gateway).await;

    // 加载失败时提供重试
    while let SessionState::LoadFailed(e) = session.state() {
        println!("❌ 加载失败: {}", e);
        let answer = rl.readline("重试? (y/N) ")?;
        if !answer.trim().eq_ignore_ascii_case("y") {
            return Err(anyhow!("no document loaded"));
        }
        let _ = session.load().await;
    }

    println!("{}", HELP);
    loop {
        let line = match rl.readline("condition> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        if line.trim().is_empty() {
            continue;
        }
        rl.add_history_entry(line.as_str())?;

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("✗ {}", message);
                continue;
            }
        };
        match execute(&mut session, &catalog, &mut rl, command).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => println!("✗ {}", e),
        }
    }

    if session.workspace().is_some_and(Workspace::is_dirty) {
        println!("⚠️ 有未保存的修改已丢弃");
    }
    info!("bye");
    Ok(())
}

async fn execute(
    session: &mut Session<InMemoryGateway>,
    catalog: &FieldCatalog,
    rl: &mut DefaultEditor,
    command: Command,
) -> Result<Flow> {
    match command {
        Command::Save => {
            println!("正在保存...");
            session.save().await?;
            println!("✅ 保存成功");
            return Ok(Flow::Continue);
        }
        Command::Reload => {
            session.load().await?;
            println!("✅ 已重新加载");
            return Ok(Flow::Continue);
        }
        Command::Help => {
            println!("{}", HELP);
            return Ok(Flow::Continue);
        }
        Command::Quit => return Ok(Flow::Quit),
        _ => {}
    }

    let workspace = session
        .workspace_mut()
        .ok_or_else(|| anyhow!("no document loaded"))?;

    match command {
        Command::Show => show(workspace, catalog),
        Command::Sql => print!("{}", workspace.sql_report(catalog)),
        Command::Compile(table) => {
            let compiler = SqlCompiler::new(catalog, table);
            let tree = match workspace.editor() {
                Some(editor) => &editor.condition,
                None => &workspace.document().general_condition,
            };
            let compiled = compiler.build(tree)?;
            println!("{}", compiled.sql);
            println!("参数: {:?}", compiled.values);
        }
        Command::Fields => {
            for field in catalog.iter() {
                println!("  {:>4}  {:<16} {}", field.id, field.column_name, field.display_label);
            }
        }
        Command::Operators => {
            let symbols: Vec<_> = Operator::ALL.iter().map(|op| op.symbol()).collect();
            println!("  {}", symbols.join(" | "));
        }
        Command::Tree(op) => {
            if workspace.editor().is_some() {
                let editor = workspace.editor_mut()?;
                editor.apply(&op)?;
                println!("{}", generate_sql(&editor.condition, catalog));
            } else {
                workspace.apply_general(&op)?;
                println!("{}", generate_sql(&workspace.document().general_condition, catalog));
            }
        }
        Command::Name(name) => {
            if workspace.editor().is_some() {
                workspace.editor_mut()?.set_name(name)?;
            } else {
                workspace.set_general_name(name);
            }
        }
        Command::Spec(spec) => run_spec(workspace, catalog, rl, spec)?,
        Command::Revert => {
            workspace.revert();
            println!("已恢复到上次保存的版本");
        }
        Command::Save | Command::Reload | Command::Help | Command::Quit => {}
    }
    Ok(Flow::Continue)
}

fn run_spec(workspace: &mut Workspace, catalog: &FieldCatalog, rl: &mut DefaultEditor, spec: SpecCommand) -> Result<()> {
    match spec {
        SpecCommand::Add => {
            let index = workspace.add_specific()?;
            println!("已添加条件 #{}, 正在编辑", index + 1);
        }
        SpecCommand::View(index) | SpecCommand::Edit(index) => {
            let mode = if matches!(spec, SpecCommand::View(_)) { EditMode::View } else { EditMode::Edit };
            let editor = workspace.open_editor(index, mode)?;
            println!("#{} {} ({:?})", index + 1, editor.name, editor.mode);
            print!("{}", render_tree(&editor.condition, catalog));
        }
        SpecCommand::Remove(index) => {
            let answer = rl.readline("确定要删除这个条件吗? (y/N) ")?;
            if answer.trim().eq_ignore_ascii_case("y") {
                let removed = workspace.remove_specific(index)?;
                println!("已删除 {}", removed.name);
            }
        }
        SpecCommand::Commit => {
            workspace.commit_editor()?;
            println!("已应用修改");
        }
        SpecCommand::Close => {
            workspace.close_editor();
        }
    }
    Ok(())
}

fn show(workspace: &Workspace, catalog: &FieldCatalog) {
    let document = workspace.document();
    let marker = if workspace.is_dirty() { " *" } else { "" };
    println!("[通用条件] {}{}", document.general_name, marker);
    print!("{}", render_tree(&document.general_condition, catalog));
    for (index, spec) in document.specific_conditions.iter().enumerate() {
        println!("[条件 #{}] {} (id {})", index + 1, spec.name, spec.id);
        print!("{}", render_tree(&spec.condition, catalog));
    }
    if let Some(editor) = workspace.editor() {
        println!("[正在{}] #{} {}", if editor.mode == EditMode::Edit { "编辑" } else { "查看" }, editor.index + 1, editor.name);
        print!("{}", render_tree(&editor.condition, catalog));
    }
}
