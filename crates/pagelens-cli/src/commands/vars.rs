//! Vars command - inspect and change backend variables.

use std::fs;

use clap::Args;
use console::style;

use pagelens_core::BackendVariables;

use super::{config_path, create_layout_engine, load_config};

/// Arguments for the vars command.
#[derive(Args)]
pub struct VarsArgs {
    /// Print a single variable
    #[arg(long, value_name = "NAME")]
    get: Option<String>,

    /// Set a variable (repeatable); values are validated by the backend
    #[arg(long, value_name = "NAME=VALUE")]
    set: Vec<String>,

    /// Store the values given with --set in the config file
    #[arg(long, requires = "set")]
    save: bool,
}

pub async fn run(args: VarsArgs, explicit_config: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(explicit_config)?;
    let mut engine = create_layout_engine(&config)?;

    for assignment in &args.set {
        let (name, value) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Expected NAME=VALUE, got {:?}", assignment))?;
        engine.set_variable(name.trim(), value.trim())?;
        config
            .engine
            .variables
            .insert(name.trim().to_string(), value.trim().to_string());
    }

    if args.save {
        let path = config_path(explicit_config);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        config.save(&path)?;
        eprintln!(
            "{} Saved {} variable(s) to {}",
            style("✓").green(),
            args.set.len(),
            path.display()
        );
    }

    if let Some(name) = &args.get {
        let value = engine
            .variable(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown variable: {}", name))?;
        println!("{}", value);
        return Ok(());
    }

    for name in BackendVariables::NAMES {
        if let Some(value) = engine.variable(name) {
            println!("{:<28} {}", name, value);
        }
    }

    Ok(())
}
