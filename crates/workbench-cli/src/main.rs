#![forbid(unsafe_code)]

mod cmd;
mod output;
mod tui;

use clap::{CommandFactory, Parser, Subcommand};
use output::{OutputMode, resolve_output_mode};
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use workbench_core::config::load_user_config;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "wb: work-item hierarchy diagrams",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Diagram",
        about = "Lay out the hierarchy and print element geometry",
        after_help = "EXAMPLES:\n    # Geometry of every card\n    wb render project.json\n\n    # Vertical layout, closed tasks hidden\n    wb render project.json --orientation vertical --exclude-state Closed\n\n    # Emit machine-readable output\n    wb render project.json --json"
    )]
    Render(cmd::render::RenderArgs),

    #[command(
        next_help_heading = "Diagram",
        about = "Print the hierarchy as an ASCII tree",
        after_help = "EXAMPLES:\n    # Whole hierarchy\n    wb tree project.json\n\n    # Only the Tasks view, two levels deep\n    wb tree project.json --view Tasks --depth 2"
    )]
    Tree(cmd::tree::TreeArgs),

    #[command(
        next_help_heading = "Diagram",
        about = "Open the interactive diagram",
        after_help = "EXAMPLES:\n    # Browse and drag the diagram; the file is re-read when it changes\n    wb view project.json"
    )]
    View(tui::ViewArgs),

    #[command(
        next_help_heading = "Diagnostics",
        about = "List circular links",
        after_help = "EXAMPLES:\n    # All cycles\n    wb cycles project.json\n\n    # Would linking #12 under #40 close a loop?\n    wb cycles project.json --link Contains --check 40:12"
    )]
    Cycles(cmd::cycles::CyclesArgs),

    #[command(
        next_help_heading = "Configuration",
        about = "Show or change configuration",
        after_help = "EXAMPLES:\n    # Effective config\n    wb config show\n\n    # Tighter layout\n    wb config set layout.padding 30"
    )]
    Config(cmd::config::ConfigArgs),

    #[command(
        next_help_heading = "Configuration",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    wb completions bash > /etc/bash_completion.d/wb"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("WORKBENCH_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "workbench_core=debug,wb=debug,info"
        } else {
            "workbench_core=info,warn"
        })
    });

    let format = env::var("WORKBENCH_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    // Logs go to stderr so stdout stays parseable.
    let registry = tracing_subscriber::registry().with(filter);
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;
    let user = load_user_config()?;
    let output = resolve_output_mode(cli.format, cli.json, user.output.as_deref());

    match cli.command {
        Commands::Render(ref args) => cmd::render::run_render(args, output, &project_root),
        Commands::Tree(ref args) => cmd::tree::run_tree(args, output, &project_root),
        Commands::View(ref args) => tui::run_view(args, output, &project_root),
        Commands::Cycles(ref args) => cmd::cycles::run_cycles(args, output),
        Commands::Config(ref args) => cmd::config::run_config(args, &project_root, output),
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}
