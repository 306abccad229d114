mod commands;
mod log;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{Project, main_commands};
use recipetree::{config::Config, recipe::RecipeSet};

/// Query the package graph of a recipe tree and the state of its checkouts
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Project directory holding recipes/, classes/ and config.yaml
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Set an environment variable
    #[arg(short = 'D', global = true, value_name = "VAR=VALUE")]
    defines: Vec<String>,

    /// Additional config file. Later files take precedence
    #[arg(short = 'c', global = true, value_name = "FILE")]
    config: Vec<PathBuf>,

    /// Resolve sandboxed variants
    #[arg(long, global = true, overrides_with = "no_sandbox")]
    sandbox: bool,

    /// Resolve unsandboxed variants
    #[arg(long, global = true, overrides_with = "sandbox")]
    no_sandbox: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List package dependencies
    Ls {
        /// Package path, all roots if omitted
        package: Option<String>,
        /// Include indirect dependencies
        #[arg(short, long)]
        all: bool,
        /// Show why indirect dependencies exist
        #[arg(short, long)]
        origin: bool,
        /// Descend to the leaves
        #[arg(short, long)]
        recursive: bool,
        /// Print full paths instead of a tree
        #[arg(short, long, conflicts_with = "direct")]
        prefixed: bool,
        /// Print the matched packages themselves
        #[arg(short, long)]
        direct: bool,
    },
    /// Print the meta environment of packages
    QueryMeta {
        #[arg(required = true)]
        packages: Vec<String>,
        /// Include all dependencies
        #[arg(short, long)]
        recursive: bool,
    },
    /// Print the SCMs of packages
    QueryScm {
        #[arg(required = true)]
        packages: Vec<String>,
        /// Include all dependencies
        #[arg(short, long)]
        recursive: bool,
        /// Output format for one SCM kind
        #[arg(short = 'f', long = "format", value_name = "KIND=FORMAT")]
        formats: Vec<String>,
        /// Replacement for attributes a SCM doesn't have
        #[arg(long)]
        default: Option<String>,
    },
    /// Print the files a package's recipe was read from
    QueryRecipe { package: String },
    /// Show the status of checkouts
    Status {
        /// Package paths, every root recursively if omitted
        packages: Vec<String>,
        /// Include all dependencies
        #[arg(short, long)]
        recursive: bool,
        /// Also show clean checkouts
        #[arg(long)]
        show_clean: bool,
        /// Print a table instead of status lines
        #[arg(long)]
        table: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("RECIPETREE_LOG", "warn"))
        .init();

    let args = Args::parse();

    let mut config =
        Config::load(&args.root, &args.config, &args.defines).context("Failed to load config")?;
    if args.sandbox {
        config.sandbox = true;
    } else if args.no_sandbox {
        config.sandbox = false;
    }

    let recipes = RecipeSet::load(&args.root)
        .with_context(|| format!("Failed to load recipes from {}", args.root.display()))?;
    let graph = recipes
        .generate_packages(&config.environment, config.sandbox)
        .context("Failed to resolve packages")?;

    let project = Project {
        root: args.root,
        config,
        graph,
    };

    main_commands(&project, args.command).await
}
