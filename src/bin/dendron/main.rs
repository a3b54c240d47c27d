//! Dendron CLI - neuronal morphology inspection tool.
//!
//! Usage: dendron [-d...] <COMMAND> <INPUT> [OUTPUT]
//!
//! Run `dendron --help` for available commands.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{ArgAction, Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use dendron::algo::{branch_order, branch_order_sparse, node_types, NodeType};
use dendron::io;
use dendron::load::{Loader, TreeRegistry, Viewer};
use dendron::tree::{Morphology, MorphologyTree};

#[derive(Parser)]
#[command(name = "dendron")]
#[command(author, version, about = "Neuronal morphology CLI", long_about = None)]
struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short = 'd', long = "debug", action = ArgAction::Count, global = true)]
    debug: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display per-tree statistics
    Info {
        /// Input morphology file
        input: PathBuf,

        /// Load flags: -r repair, -s show bounding boxes
        #[arg(short, long, allow_hyphen_values = true)]
        flags: Option<String>,
    },

    /// Print the branch order of every node
    Order {
        /// Input morphology file
        input: PathBuf,

        /// Use sparse matrix propagation instead of traversal
        #[arg(long)]
        sparse: bool,
    },

    /// Convert between morphology formats
    Convert {
        /// Input morphology file
        input: PathBuf,

        /// Output file (.mtr or .swc)
        output: PathBuf,
    },
}

/// Prints the bounding box of each loaded tree.
struct BoundsViewer;

impl Viewer for BoundsViewer {
    fn show(&self, morphology: &Morphology) {
        for tree in morphology.trees() {
            let (min, max) = tree.bounding_box();
            println!(
                "{}: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
                tree.name(),
                min.x,
                min.y,
                min.z,
                max.x,
                max.y,
                max.z
            );
        }
    }
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    // RUST_LOG wins over -d when set
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(filter);

    tracing_subscriber::registry().with(fmt_layer).init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info { input, flags } => cmd_info(&input, flags.as_deref())?,
        Commands::Order { input, sparse } => cmd_order(&input, sparse)?,
        Commands::Convert { input, output } => cmd_convert(&input, &output)?,
    }

    Ok(())
}

fn cmd_info(input: &Path, flags: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let loader = Loader::new().with_viewer(BoundsViewer);
    let outcome = loader.load(Some(input), flags)?;
    if outcome.is_empty() {
        println!("Nothing loaded from {}", input.display());
        return Ok(());
    }

    println!("File: {}", outcome.name);
    println!("Directory: {}", outcome.path.display());

    let mut registry = TreeRegistry::new();
    outcome.append_to(&mut registry);
    println!("Trees: {}", registry.len());

    for tree in registry.trees() {
        print_tree_info(tree)?;
    }

    Ok(())
}

fn print_tree_info(tree: &MorphologyTree) -> Result<(), Box<dyn std::error::Error>> {
    let types = node_types(tree);
    let order = branch_order(tree, &types)?;

    let branch_points = types.iter().filter(|t| t.is_branch_point()).count();
    let terminals = types.iter().filter(|&&t| t == NodeType::Terminal).count();
    let regions: Vec<&str> = tree.catalog().iter().map(|(_, name)| name).collect();

    println!("\n{}", tree.name());
    println!("  Nodes: {}", tree.num_nodes());
    println!("  Branch points: {}", branch_points);
    println!("  Terminals: {}", terminals);
    println!("  Regions: {}", regions.join(", "));
    println!("  Max branch order: {}", order.iter().max().copied().unwrap_or(0));

    Ok(())
}

fn cmd_order(input: &Path, sparse: bool) -> Result<(), Box<dyn std::error::Error>> {
    let morphology = io::load(input)?;

    for tree in morphology.trees() {
        let types = node_types(tree);
        let order = if sparse {
            branch_order_sparse(tree, &types)?
        } else {
            branch_order(tree, &types)?
        };

        for (node, value) in tree.node_ids().zip(order) {
            println!("{} {} {}", tree.name(), node.index() + 1, value);
        }
    }

    Ok(())
}

fn cmd_convert(input: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let morphology = io::load(input)?;

    println!(
        "Loaded: {} tree(s), {} nodes",
        morphology.num_trees(),
        morphology.trees().iter().map(|t| t.num_nodes()).sum::<usize>()
    );

    io::save(&morphology, output)?;
    println!("Saved: {} ({:.2?})", output.display(), start.elapsed());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_accept_hyphen_values() {
        let cli = Cli::try_parse_from(["dendron", "info", "cell.swc", "--flags", "-r -s"]).unwrap();
        match cli.command {
            Commands::Info { flags, .. } => assert_eq!(flags.as_deref(), Some("-r -s")),
            _ => panic!("expected info"),
        }
    }

    #[test]
    fn test_debug_count() {
        let cli = Cli::try_parse_from(["dendron", "-dd", "order", "cell.swc"]).unwrap();
        assert_eq!(cli.debug, 2);
    }
}
