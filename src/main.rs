use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser};
use lbtree::lb::{LbConfig, SequenceAnnotation, calculate_lb_values};
use lbtree::model::PhyloTreeBuilder;
use lbtree::newick::NewickParser;
use lbtree::parser::ByteParser;
use log::info;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lbtree", version)]
#[command(about = "Local branching index and ratio of phylogenetic trees", long_about = None)]
struct Cli {
    /// Newick file; the first tree in it is used
    tree: PathBuf,

    /// Config TOML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Decay constant for the LBI
    #[arg(long)]
    lbi_tau: Option<f64>,

    /// Decay constant for the LBR (defaults to a multiple of the LBI one)
    #[arg(long)]
    lbr_tau: Option<f64>,

    /// Weigh vertices by their multiplicity
    #[arg(long, action = ArgAction::SetTrue)]
    use_multiplicities: bool,

    /// Attach a dummy root above the root
    #[arg(long, action = ArgAction::SetTrue)]
    dummy_root: bool,

    /// Attach a dummy leaf below every leaf (implies --dummy-root)
    #[arg(long, action = ArgAction::SetTrue)]
    dummy_leaves: bool,

    /// Scale LBI values such that the maximum is 1
    #[arg(long, action = ArgAction::SetTrue)]
    normalize: bool,

    /// Never rescale branch lengths
    #[arg(long, action = ArgAction::SetTrue)]
    no_rescale: bool,

    /// Sequence lengths (comma-separated), used to rescale raw branch lengths
    #[arg(long, value_delimiter = ',')]
    sequence_lengths: Vec<usize>,

    /// JSON file mapping labels to multiplicities
    #[arg(long, value_name = "FILE")]
    multiplicities: Option<PathBuf>,

    /// Seed for labels generated for unlabelled vertices
    #[arg(long)]
    seed: Option<u64>,

    /// Output JSON file (stdout if not given)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    let annotation = load_annotation(&cli)?;

    let mut builder = PhyloTreeBuilder::new();
    if let Some(seed) = cli.seed {
        builder = builder.with_seed(seed);
    }
    let byte_parser = ByteParser::from_file(&cli.tree)
        .with_context(|| format!("Failed to read {}", cli.tree.display()))?;
    let tree = NewickParser::new(builder)
        .with_annotations()
        .into_iter(byte_parser)
        .next()
        .ok_or_else(|| anyhow!("No tree found in {}", cli.tree.display()))??;
    info!(
        "Parsed tree with {} vertices from {}",
        tree.num_vertices(),
        cli.tree.display()
    );

    let result = calculate_lb_values(&tree, &config, annotation.as_ref())?;
    let json = serde_json::to_string_pretty(&result)?;
    match &cli.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote results to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Reads the config file, if any, and applies command line overrides.
fn load_config(cli: &Cli) -> Result<LbConfig> {
    let mut config = match &cli.config {
        Some(path) => LbConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => LbConfig::default(),
    };

    if let Some(tau) = cli.lbi_tau {
        config.lbi_tau = tau;
    }
    if let Some(tau) = cli.lbr_tau {
        config.lbr_tau = Some(tau);
    }
    config.use_multiplicities |= cli.use_multiplicities;
    config.add_dummy_root |= cli.dummy_root || cli.dummy_leaves;
    config.add_dummy_leaves |= cli.dummy_leaves;
    config.normalize |= cli.normalize;
    if cli.no_rescale {
        config.rescale.enabled = false;
    }

    config.validate()?;
    Ok(config)
}

fn load_annotation(cli: &Cli) -> Result<Option<SequenceAnnotation>> {
    let multiplicities = match &cli.multiplicities {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let map: HashMap<String, f64> = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse multiplicities in {}", path.display()))?;
            Some(map)
        }
        None => None,
    };

    if cli.sequence_lengths.is_empty() && multiplicities.is_none() {
        return Ok(None);
    }
    Ok(Some(SequenceAnnotation {
        sequence_lengths: cli.sequence_lengths.clone(),
        multiplicities,
    }))
}
