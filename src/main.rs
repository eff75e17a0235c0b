use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, ensure, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;
use treeskel::{
    algebra, group, persist, Coordinator, Distribution, ProcessGroup, SkeletonConfig, Tree,
};

#[derive(Parser, Debug)]
#[command(name = "treeskel", about = "Distributed tree skeletons over segmented trees")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tag and flatten a generated tree, printing one segment per line.
    Flatten {
        /// Tree shape to generate.
        #[arg(long, value_enum, default_value_t = Shape::Balanced)]
        shape: Shape,
        /// Number of nodes (rounded down to odd).
        #[arg(long)]
        nodes: usize,
        /// Segment bound `m`.
        #[arg(long)]
        bound: usize,
        /// Also write the distribution over this many workers to `<output>.dist`.
        #[arg(long)]
        workers: Option<usize>,
        /// Output file (stdout if omitted).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run the stock skeletons on worker threads and check them against a sequential pass.
    Run {
        /// Tree shape to generate.
        #[arg(long, value_enum, default_value_t = Shape::Balanced)]
        shape: Shape,
        /// Number of nodes (rounded down to odd).
        #[arg(long)]
        nodes: usize,
        /// Segment bound `m` (default: ceil(nodes / workers)).
        #[arg(long)]
        bound: Option<usize>,
        /// Number of worker threads.
        #[arg(long, default_value_t = 4)]
        workers: usize,
        /// Cross-check the distribution fingerprint on every worker.
        #[arg(long)]
        verify: bool,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Shape {
    Balanced,
    LeftComb,
    RightComb,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Flatten {
            shape,
            nodes,
            bound,
            workers,
            output,
        } => run_flatten(shape, nodes, bound, workers, output)?,
        Commands::Run {
            shape,
            nodes,
            bound,
            workers,
            verify,
        } => run_skeletons(shape, nodes, bound, workers, verify)?,
    }

    Ok(())
}

fn build_tree(shape: Shape, nodes: usize) -> Tree<i64> {
    let value = |index: usize| index as i64 + 1;
    match shape {
        Shape::Balanced => Tree::balanced(nodes, value),
        Shape::LeftComb => Tree::left_comb(nodes, value),
        Shape::RightComb => Tree::right_comb(nodes, value),
    }
}

fn run_flatten(
    shape: Shape,
    nodes: usize,
    bound: usize,
    workers: Option<usize>,
    output: Option<PathBuf>,
) -> Result<()> {
    let tree = build_tree(shape, nodes);
    let ltree = tree
        .linearize(bound)
        .with_context(|| format!("failed to linearize {} nodes with bound {}", tree.size(), bound))?;
    info!(segments = ltree.len(), nodes = ltree.node_count(), "flattened");

    match &output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            persist::write_ltree(&ltree, BufWriter::new(file))?;
        }
        None => persist::write_ltree(&ltree, io::stdout().lock())?,
    }

    if let Some(workers) = workers {
        let distribution = Distribution::for_segments(&ltree.segment_sizes(), workers)?;
        match &output {
            Some(path) => {
                let dist_path = path.with_extension("dist");
                let file = File::create(&dist_path)
                    .with_context(|| format!("failed to create {}", dist_path.display()))?;
                persist::write_distribution(&distribution, BufWriter::new(file))?;
            }
            None => {
                let mut stdout = io::stdout().lock();
                writeln!(stdout)?;
                persist::write_distribution(&distribution, stdout)?;
            }
        }
    }
    Ok(())
}

/// Results computed by the distributed run, held by the root.
#[derive(Debug)]
struct Report {
    count: i64,
    total: i64,
    height: i64,
    sizes: Tree<i64>,
    depths: Tree<i64>,
}

fn run_skeletons(
    shape: Shape,
    nodes: usize,
    bound: Option<usize>,
    workers: usize,
    verify: bool,
) -> Result<()> {
    let tree = build_tree(shape, nodes);
    let mut config = SkeletonConfig::for_tree(tree.size(), workers).with_verification(verify);
    if let Some(bound) = bound {
        config = config.with_bound(bound);
    }
    config.validate().context("invalid run configuration")?;
    info!(
        nodes = tree.size(),
        bound = config.bound,
        workers = config.workers,
        "starting distributed run"
    );

    let outcomes = group::run_workers(config.workers, |group| -> treeskel::Result<Option<Report>> {
        let coordinator = Coordinator::new(group, config.clone())?;
        let held = group.is_root(coordinator.config().root).then_some(&tree);
        let shard = coordinator.load(held)?;

        let ones = coordinator.map(&shard, |_| 1i64, |_| 1i64)?;
        let zeros = coordinator.map(&shard, |_| 0i64, |_| 0i64)?;
        let count = coordinator.reduce(&ones, &algebra::sum())?;
        let total = coordinator.reduce(&shard, &algebra::sum())?;
        let height = coordinator.reduce(&zeros, &algebra::height())?;
        let sizes = coordinator.uacc(&ones, &algebra::sum())?;
        let depths = coordinator.dacc(&shard, &algebra::depth(), 0i64)?;
        let sizes = coordinator.collect(&sizes)?;
        let depths = coordinator.collect(&depths)?;

        match (count, total, height, sizes, depths) {
            (Some(count), Some(total), Some(height), Some(sizes), Some(depths)) => {
                Ok(Some(Report {
                    count,
                    total,
                    height,
                    sizes: sizes.rebuild()?,
                    depths: depths.rebuild()?,
                }))
            }
            _ => Ok(None),
        }
    });

    let mut report = None;
    for (rank, outcome) in outcomes.into_iter().enumerate() {
        let outcome = outcome.with_context(|| format!("worker {rank} failed"))?;
        if rank == config.root {
            report = outcome;
        }
    }
    let Some(report) = report else {
        bail!("root worker {} returned no results", config.root);
    };

    let add3 = |l: &i64, b: &i64, r: &i64| l + b + r;
    let ones = tree.map(&|_: &i64| 1i64, &|_: &i64| 1i64);
    ensure!(report.count == tree.size() as i64, "count mismatch: {}", report.count);
    ensure!(report.total == tree.reduce(&add3), "sum mismatch: {}", report.total);
    ensure!(report.height == tree.height() as i64, "height mismatch: {}", report.height);
    ensure!(report.sizes == ones.uacc(&add3), "subtree sizes differ from sequential pass");
    ensure!(
        report.depths == tree.dacc(0i64, &|c: &i64, _: &i64| c + 1, &|c: &i64, _: &i64| c + 1),
        "depths differ from sequential pass"
    );

    println!("nodes:   {}", report.count);
    println!("sum:     {}", report.total);
    println!("height:  {}", report.height);
    println!("root subtree size: {}", report.sizes.value());
    println!("all skeletons match the sequential reference");
    Ok(())
}
