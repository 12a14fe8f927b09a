//! # kiln CLI Entry Point
//!
//! Loads `build.rhai` (or the file given with `-f`), then runs either the recipe
//! named on the command line or the script's default goal.
//!
//! Exit status is 1 for any failure, including a failed compile. A failed link
//! is reported but does not change the exit status.

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use clap_complete::{Shell, generate};
use colored::*;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;

use kiln::config::CONFIG_FILE;
use kiln::process::{ProcessRunner, SystemRunner};
use kiln::script::BuildScript;
use kiln::ui;

#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Scriptable incremental build orchestrator", version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
struct Cli {
    /// Recipe to run (defaults to the script's default goal)
    goal: Option<String>,
    /// Build script to load instead of ./build.rhai
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,
    /// Print every compiler and linker command line
    #[arg(short, long)]
    verbose: bool,
    /// List the recipes defined by the script and exit
    #[arg(long)]
    list: bool,
    /// Generate a shell completion script
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,
}

/// Change into the directory holding `file` and return the name to load there.
fn enter_script_dir(file: &Path) -> Result<PathBuf> {
    let Some(name) = file.file_name() else {
        bail!("'{}' is not a file", file.display());
    };

    if let Some(dir) = file.parent()
        && !dir.as_os_str().is_empty()
    {
        std::env::set_current_dir(dir)
            .with_context(|| format!("Failed to enter directory {}", dir.display()))?;
    }
    Ok(PathBuf::from(name))
}

fn list_recipes(script: &BuildScript) {
    let ctx = script.context();
    if ctx.is_empty() {
        println!("{} No recipes defined.", "!".yellow());
        return;
    }

    let mut table = ui::Table::new(&["Recipe", "Depends on", "Default"]);
    for recipe in ctx.recipes() {
        let is_default = ctx.default_goal() == Some(recipe.name.as_str());
        table.add_row(vec![
            recipe.name.bold().green().to_string(),
            recipe.dependencies.join(", "),
            if is_default { "✓".to_string() } else { String::new() },
        ]);
    }
    table.print();

    if let Some(goal) = ctx.default_goal()
        && ctx.get(goal).is_none()
    {
        println!(
            "{} Default goal '{}' is not defined.",
            "⚠".yellow(),
            goal
        );
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Some(shell) = cli.completions {
        generate(shell, &mut Cli::command(), "kiln", &mut std::io::stdout());
        return Ok(());
    }

    let start_time = Instant::now();
    let script_path = match &cli.file {
        Some(file) => enter_script_dir(file)?,
        None => PathBuf::from(CONFIG_FILE),
    };

    if !script_path.exists() {
        bail!(
            "{} not found in current directory.\n\n💡 Tip: create one with a recipe, e.g. recipe(\"all\", || compile_files(find_files(\"src\", \".c\")));",
            script_path.display()
        );
    }

    let runner: Rc<dyn ProcessRunner> = Rc::new(SystemRunner::new(cli.verbose));
    let script = BuildScript::load(&script_path, runner)
        .with_context(|| format!("Failed to load {}", script_path.display()))?;

    if cli.list {
        list_recipes(&script);
        return Ok(());
    }

    match script.run_entry(cli.goal.as_deref())? {
        Some(goal) => println!(
            "{} '{}' finished in {:.2?}",
            "✓".green(),
            goal,
            start_time.elapsed()
        ),
        None => println!("{} No goal given and no default goal set.", "!".yellow()),
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("{} {:#}", "x".red(), err);
        std::process::exit(1);
    }
}
