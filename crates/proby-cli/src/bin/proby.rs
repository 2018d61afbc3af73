//! proby - command-line driver for the discrete Bayesian network engine
//!
//! Usage:
//!   proby alarm                                   # P(Burglary | both neighbours call)
//!   proby bag --data bags.csv --observe Flavor=true
//!   proby bag --data bags.csv --hidden --lines 5  # bags unobserved, Gibbs sampling
//!   proby infinite-bag --data bags.csv --concentration 2

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use csv::{ReaderBuilder, Trim};
use proby_core::scenarios::{self, BAG_COLUMN};
use proby_core::{
    BagOptions, BayesNetwork, CategoricalDistribution, ConditionalDirichletNode, ConvergenceConfig,
    DirichletNode, DirichletProcessParametersNode, NodeId, Record, SamplingConfig,
};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "proby")]
#[command(version)]
#[command(about = "Inference and learning on discrete Bayesian networks")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Seed of the sampler's random number generator
    #[arg(long, global = true, value_name = "SEED")]
    seed: Option<u64>,

    /// Print every node of the network before querying it
    #[arg(long, global = true)]
    dump: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Burglary alarm network with both neighbours calling
    Alarm {
        #[command(flatten)]
        sampling: SamplingArgs,
    },

    /// Candy bags: learn the bag tables from data and query a new bag
    Bag {
        /// CSV file with a header row; `Bag` plus boolean or integer attributes
        #[arg(short, long, value_name = "FILE")]
        data: PathBuf,

        /// Symmetric Dirichlet prior; 0 learns maximum-likelihood tables
        #[arg(long, default_value_t = 5.0)]
        alpha: f64,

        /// Load only the first N data rows
        #[arg(long, value_name = "N")]
        lines: Option<usize>,

        /// Treat the bag of every data row as unobserved
        #[arg(long)]
        hidden: bool,

        /// Attribute observed on the queried bag, as NAME=VALUE
        #[arg(long = "observe", value_name = "NAME=VALUE")]
        observations: Vec<String>,

        #[command(flatten)]
        sampling: SamplingArgs,
    },

    /// Bags drawn from a Dirichlet process: the number of bags is learned
    InfiniteBag {
        /// CSV file with a header row; a `Bag` column is ignored
        #[arg(short, long, value_name = "FILE")]
        data: PathBuf,

        /// Symmetric Dirichlet prior of every attribute table
        #[arg(long, default_value_t = 1.0)]
        alpha: f64,

        /// Concentration of the process; larger values open more bags
        #[arg(long, default_value_t = 1.0)]
        concentration: f64,

        /// Load only the first N data rows
        #[arg(long, value_name = "N")]
        lines: Option<usize>,

        #[command(flatten)]
        sampling: SamplingArgs,
    },
}

#[derive(Args, Clone, Copy)]
struct SamplingArgs {
    /// Sweeps discarded before collecting
    #[arg(long, default_value_t = 200)]
    burn_in: usize,

    /// Sweeps collected into the estimate
    #[arg(long, default_value_t = 800)]
    collect: usize,

    /// Sample in windows until successive estimates agree
    #[arg(long)]
    converge: bool,

    /// Largest per-value change accepted as converged
    #[arg(long, default_value_t = 1e-3)]
    threshold: f64,

    /// Sweeps per convergence window
    #[arg(long, default_value_t = 100)]
    window: usize,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = setup_logging(cli.verbose) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
    if let Err(e) = run(&cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set up logging")
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Alarm { sampling } => run_alarm(cli, sampling),
        Commands::Bag {
            data,
            alpha,
            lines,
            hidden,
            observations,
            sampling,
        } => {
            let records = read_records(data)?;
            let options = BagOptions {
                alpha: *alpha,
                fully_observed: !hidden,
                lines_of_evidence: *lines,
            };
            run_bag(cli, &records, &options, observations, sampling)
        }
        Commands::InfiniteBag {
            data,
            alpha,
            concentration,
            lines,
            sampling,
        } => {
            let mut records = read_records(data)?;
            if let Some(n) = lines {
                records.truncate(*n);
            }
            run_infinite_bag(cli, &records, *alpha, *concentration, sampling)
        }
    }
}

fn run_alarm(cli: &Cli, sampling: &SamplingArgs) -> Result<()> {
    let (mut net, nodes) = scenarios::alarm_network().context("failed to build the alarm network")?;
    prepare(cli, &mut net);

    let exact = net.enumerate(nodes.burglary)?;
    println!("Exact P(Burglary | JohnCalls, MaryCalls):");
    println!("{}", exact.display(net.domains()));

    let sampled = sample(&mut net, nodes.burglary, sampling)?;
    println!("Sampled P(Burglary | JohnCalls, MaryCalls):");
    println!("{}", sampled.display(net.domains()));
    Ok(())
}

fn run_bag(
    cli: &Cli,
    records: &[Record],
    options: &BagOptions,
    observations: &[String],
    sampling: &SamplingArgs,
) -> Result<()> {
    let mut net = scenarios::bag_network(records, options).context("failed to build the bag network")?;
    let loaded = options.lines_of_evidence.map_or(records.len(), |n| n.min(records.len()));
    info!(rows = loaded, alpha = options.alpha, "bag network built");

    if options.fully_observed {
        net.learn()?;
        print_bag_tables(&net)?;
    }
    let query = add_query_bag(&mut net, observations)?;
    prepare(cli, &mut net);

    let posterior = if options.fully_observed {
        net.enumerate(query)?
    } else {
        sample(&mut net, query, sampling)?
    };
    println!("P(Bag | observations):");
    println!("{}", posterior.display(net.domains()));
    Ok(())
}

fn run_infinite_bag(
    cli: &Cli,
    records: &[Record],
    alpha: f64,
    concentration: f64,
    sampling: &SamplingArgs,
) -> Result<()> {
    if records.is_empty() {
        bail!("no data rows to cluster");
    }
    let mut net = scenarios::infinite_bag_network(records, alpha, concentration)
        .context("failed to build the infinite bag network")?;
    prepare(cli, &mut net);

    let params = net.find_by_name::<DirichletProcessParametersNode>(&format!("{BAG_COLUMN}Parameters"))?;
    let first = net
        .get::<DirichletProcessParametersNode>(params)?
        .children
        .first()
        .copied()
        .context("the process has no indicators")?;

    let posterior = sample(&mut net, first, sampling)?;
    println!("Bag of the first row:");
    println!("{}", posterior.display(net.domains()));

    let process = net.get::<DirichletProcessParametersNode>(params)?;
    let occupied = process.counters.values().filter(|&&n| n > 0).count();
    println!(
        "{occupied} occupied bags out of {} opened",
        process.counters.len()
    );
    for (component, count) in &process.counters {
        println!("  {}: {count} rows", component.display(net.domains()));
    }
    Ok(())
}

/// Applies the global options to a freshly built network.
fn prepare(cli: &Cli, net: &mut BayesNetwork) {
    if let Some(seed) = cli.seed {
        net.reseed(seed);
    }
    if cli.dump {
        print!("{}", net.dump());
    }
}

fn sample(
    net: &mut BayesNetwork,
    query: NodeId,
    args: &SamplingArgs,
) -> Result<CategoricalDistribution> {
    if !args.converge {
        let config = SamplingConfig {
            burn_in: args.burn_in,
            collect: args.collect,
        };
        return Ok(net.sample_with(query, &config)?);
    }
    let config = ConvergenceConfig {
        burn_in: args.burn_in,
        window: args.window,
        threshold: args.threshold,
        ..ConvergenceConfig::default()
    };
    let result = net.sample_until_converged(query, &config)?;
    if result.converged {
        println!("Converged after {} sweeps", result.iterations);
    } else {
        println!(
            "Stopped after {} sweeps without converging (last change {:.2e})",
            result.iterations, result.last_delta
        );
    }
    Ok(result.distribution)
}

fn print_bag_tables(net: &BayesNetwork) -> Result<()> {
    let prior = net.find_by_name::<DirichletNode>(&format!("Probabilities{BAG_COLUMN}"))?;
    let table = &net.get::<DirichletNode>(prior)?.value;
    println!("Learned {}:", table.name());
    for (value, p) in table.iter() {
        println!("  {} = {p:.4}", net.domains().text(value));
    }
    for id in net.node_ids() {
        if let Ok(node) = net.get::<ConditionalDirichletNode>(id) {
            let cpt = &node.value;
            println!("Learned {}:", cpt.name());
            for (condition, row) in cpt.rows() {
                let cells: Vec<String> = row
                    .iter()
                    .map(|(v, p)| format!("{}={p:.4}", net.domains().text(v)))
                    .collect();
                println!(
                    "  {}={}: {}",
                    BAG_COLUMN,
                    net.domains().text(condition),
                    cells.join(" ")
                );
            }
        }
    }
    Ok(())
}

/// Adds a hidden bag drawn from the learned bag prior together with its
/// observed attributes; returns the bag node.
fn add_query_bag(net: &mut BayesNetwork, observations: &[String]) -> Result<NodeId> {
    let prior = net.find_by_name::<DirichletNode>(&format!("Probabilities{BAG_COLUMN}"))?;
    let bag = net.boolean(BAG_COLUMN, true)?;
    let query = net.add_categorical(bag, Some(prior))?;

    for observation in observations {
        let (name, text) = observation
            .split_once('=')
            .with_context(|| format!("expected NAME=VALUE, got '{observation}'"))?;
        let table_name = format!("Probabilities{name}{BAG_COLUMN}");
        let table = net
            .find_by_name::<ConditionalDirichletNode>(&table_name)
            .with_context(|| format!("no attribute '{name}' in the data"))?;
        let value = net.observe(name, text)?;
        let node = net.add_conditional_categorical(value, &[query], Some(table))?;
        net.set_evidence(node, true)?;
        debug!(attribute = name, value = text, "observed on the query bag");
    }
    Ok(query)
}

fn read_records(path: &Path) -> Result<Vec<Record>> {
    let file = fs::File::open(path).with_context(|| format!("failed to open '{}'", path.display()))?;
    parse_records(file).with_context(|| format!("failed to parse '{}'", path.display()))
}

/// Rows under a header row of column names. Empty cells are missing values.
fn parse_records<R: io::Read>(input: R) -> Result<Vec<Record>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(input);
    let columns = reader.headers().context("failed to read the header row")?.clone();

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let cells = result.with_context(|| format!("malformed data row {}", row + 1))?;
        let record: Record = columns
            .iter()
            .zip(cells.iter())
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(column, cell)| (column.to_string(), cell.to_string()))
            .collect();
        records.push(record);
    }
    Ok(records)
}
