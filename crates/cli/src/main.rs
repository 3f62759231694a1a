//! quarry - dependency resolver for Lua-declared build targets.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "quarry")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Project root directory
  #[arg(long, global = true, default_value = ".")]
  root: PathBuf,

  /// Macro file evaluated before every declaration file (repeatable)
  #[arg(long = "include", global = true, value_name = "FILE")]
  includes: Vec<String>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// List every target declared in the project
  Targets {
    /// Only list rules of this type
    #[arg(long = "type", value_name = "TYPE")]
    rule_type: Option<String>,
  },

  /// Print the dependency graph for a set of targets
  Graph {
    /// Targets in //base/path:name form
    #[arg(required = true)]
    targets: Vec<String>,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .without_time()
    .init();

  let cli = Cli::parse();
  let root = dunce::canonicalize(&cli.root)
    .with_context(|| format!("project root not found: {}", cli.root.display()))?;

  match cli.command {
    Commands::Targets { rule_type } => cmd::cmd_targets(&root, &cli.includes, rule_type.as_deref()),
    Commands::Graph { targets } => cmd::cmd_graph(&root, &cli.includes, &targets),
  }
}
