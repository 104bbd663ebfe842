use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use toml::Value;
use workbench_core::config::{EffectiveConfig, project_config_path, resolve_config};
use workbench_core::geometry::Orientation;

use crate::output::OutputMode;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Show resolved or raw configuration
    Show(ShowArgs),
    /// Set a configuration key in project or user scope
    Set(SetArgs),
    /// Unset a configuration key in project or user scope
    Unset(UnsetArgs),
}

#[derive(Args, Debug)]
struct ShowArgs {
    /// Show raw project config only
    #[arg(long)]
    project: bool,
}

#[derive(Args, Debug)]
struct SetArgs {
    /// Scope to mutate
    #[arg(long, default_value = "project")]
    scope: ConfigScope,

    /// Dot path key (e.g. layout.padding, user.output)
    key: String,

    /// New value
    value: String,
}

#[derive(Args, Debug)]
struct UnsetArgs {
    /// Scope to mutate
    #[arg(long, default_value = "project")]
    scope: ConfigScope,

    /// Dot path key (e.g. layout.padding, user.output)
    key: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum ConfigScope {
    Project,
    User,
}

const fn scope_label(scope: ConfigScope) -> &'static str {
    match scope {
        ConfigScope::Project => "project",
        ConfigScope::User => "user",
    }
}

pub fn run_config(args: &ConfigArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    match &args.command {
        ConfigCommand::Show(show) => run_show(show, project_root, output),
        ConfigCommand::Set(set) => {
            let path = scope_path(set.scope, project_root)?;
            let mut value = load_toml_table(&path)?;
            apply_set(&mut value, set.scope, &set.key, &set.value)?;
            write_toml_table(&path, &value)?;
            render_mutation(output, "set", set.scope, &set.key)
        }
        ConfigCommand::Unset(unset) => {
            let path = scope_path(unset.scope, project_root)?;
            let mut value = load_toml_table(&path)?;
            apply_unset(&mut value, unset.scope, &unset.key)?;
            write_toml_table(&path, &value)?;
            render_mutation(output, "unset", unset.scope, &unset.key)
        }
    }
}

fn run_show(args: &ShowArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.project {
        let value = load_toml_table(&project_config_path(project_root))?;
        if output.is_json() {
            writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
        } else {
            write!(out, "{}", toml::to_string_pretty(&value)?)?;
        }
        return Ok(());
    }

    let effective = resolve_config(project_root, output.is_json())?;
    print_effective(&effective, output, &mut out)
}

fn scope_path(scope: ConfigScope, project_root: &Path) -> Result<PathBuf> {
    match scope {
        ConfigScope::Project => Ok(project_config_path(project_root)),
        ConfigScope::User => dirs::config_dir()
            .map(|dir| dir.join("workbench/config.toml"))
            .ok_or_else(|| anyhow!("Could not determine the user config directory")),
    }
}

fn apply_set(root: &mut Value, scope: ConfigScope, key: &str, raw: &str) -> Result<()> {
    let parsed = parse_value(scope, key, raw)?;
    let (section, leaf) = split_known_key(scope, key)?;

    let table = root
        .as_table_mut()
        .ok_or_else(|| anyhow!("Config root must be a TOML table"))?;
    let section_table = table
        .entry(section.to_string())
        .or_insert_with(|| Value::Table(toml::map::Map::new()))
        .as_table_mut()
        .ok_or_else(|| anyhow!("Section {section} must be a TOML table"))?;

    section_table.insert(leaf.to_string(), parsed);
    Ok(())
}

fn apply_unset(root: &mut Value, scope: ConfigScope, key: &str) -> Result<()> {
    let (section, leaf) = split_known_key(scope, key)?;
    let table = root
        .as_table_mut()
        .ok_or_else(|| anyhow!("Config root must be a TOML table"))?;

    let now_empty = table
        .get_mut(section)
        .and_then(Value::as_table_mut)
        .is_some_and(|section_table| {
            section_table.remove(leaf);
            section_table.is_empty()
        });
    if now_empty {
        table.remove(section);
    }
    Ok(())
}

fn split_known_key(scope: ConfigScope, key: &str) -> Result<(&str, &str)> {
    let (section, leaf) = key
        .split_once('.')
        .ok_or_else(|| anyhow!("Key must use section.key format"))?;

    let valid = match scope {
        ConfigScope::Project => matches!(
            (section, leaf),
            ("layout", "padding" | "orientation")
                | ("hierarchy", "hide_empty_views")
                | ("refresh", "poll_interval_ms")
        ),
        ConfigScope::User => matches!((section, leaf), ("user", "output")),
    };

    if valid {
        Ok((section, leaf))
    } else {
        bail!("Unsupported key `{key}` for {} scope", scope_label(scope));
    }
}

fn parse_value(scope: ConfigScope, key: &str, raw: &str) -> Result<Value> {
    let (section, leaf) = split_known_key(scope, key)?;

    match (section, leaf) {
        ("user", "output") => Ok(Value::String(raw.to_string())),
        ("layout", "orientation") => {
            let orientation: Orientation = raw.parse()?;
            Ok(Value::String(orientation.as_str().to_string()))
        }
        ("layout", "padding") => {
            let number: f64 = raw
                .parse()
                .with_context(|| format!("{key} expects a number"))?;
            if number <= 0.0 {
                bail!("{key} must be positive");
            }
            Ok(Value::Float(number))
        }
        ("refresh", "poll_interval_ms") => {
            let ms: i64 = raw
                .parse()
                .with_context(|| format!("{key} expects milliseconds"))?;
            Ok(Value::Integer(ms))
        }
        _ => {
            let value: bool = raw
                .parse()
                .with_context(|| format!("{key} expects true or false"))?;
            Ok(Value::Boolean(value))
        }
    }
}

fn load_toml_table(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Ok(Value::Table(toml::map::Map::new()));
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value =
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;

    if !value.is_table() {
        bail!("{} must contain a top-level TOML table", path.display());
    }
    Ok(value)
}

fn write_toml_table(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let serialized = toml::to_string_pretty(value)?;
    std::fs::write(path, serialized).with_context(|| format!("Failed to write {}", path.display()))
}

fn print_effective(value: &EffectiveConfig, output: OutputMode, w: &mut dyn Write) -> Result<()> {
    let layout = &value.project.layout;
    let hierarchy = &value.project.hierarchy;
    match output {
        OutputMode::Json => {
            writeln!(w, "{}", serde_json::to_string_pretty(value)?)?;
        }
        OutputMode::Text => {
            writeln!(w, "resolved_output={}", value.resolved_output)?;
            writeln!(w, "layout.padding={}", layout.padding)?;
            writeln!(w, "layout.orientation={}", layout.orientation)?;
            writeln!(
                w,
                "layout.item_size={}x{}",
                layout.item_size.width, layout.item_size.height
            )?;
            writeln!(
                w,
                "layout.view_size={}x{}",
                layout.view_size.width, layout.view_size.height
            )?;
            writeln!(w, "hierarchy.hide_empty_views={}", hierarchy.hide_empty_views)?;
            writeln!(w, "hierarchy.excluded_states={}", hierarchy.excluded_states.join(","))?;
            writeln!(w, "hierarchy.selected_views={}", hierarchy.selected_views.join(","))?;
            writeln!(
                w,
                "refresh.poll_interval_ms={}",
                value.project.refresh.poll_interval_ms
            )?;
            if let Some(out) = &value.user.output {
                writeln!(w, "user.output={out}")?;
            }
        }
        OutputMode::Pretty => {
            writeln!(w, "resolved_output = \"{}\"", value.resolved_output)?;
            writeln!(w)?;
            write!(w, "{}", toml::to_string_pretty(&value.project)?)?;
            if let Some(out) = &value.user.output {
                writeln!(w)?;
                writeln!(w, "[user]")?;
                writeln!(w, "output = \"{out}\"")?;
            }
        }
    }
    Ok(())
}

fn render_mutation(output: OutputMode, action: &str, scope: ConfigScope, key: &str) -> Result<()> {
    let scope = scope_label(scope);
    match output {
        OutputMode::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "ok": true,
                    "action": action,
                    "scope": scope,
                    "key": key,
                }))?
            );
        }
        OutputMode::Text => println!("ok=true action={action} scope={scope} key={key}"),
        OutputMode::Pretty => println!("{action} {key} in {scope} config"),
    }
    Ok(())
}
