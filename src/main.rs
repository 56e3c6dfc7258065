use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use dtree_rules::{
    compile, dump, predict, results, simulate, writer, CompilerConfig, DecisionTree, Strategy,
};

#[derive(Parser)]
#[command(name = "dtree-rules")]
#[command(about = "Compile a decision tree into switch range-match table entries", long_about = None)]
struct Cli {
    /// Path to a JSON compiler configuration (feature domains, table names)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Direct,
    Decomposed,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Direct => Strategy::Direct,
            StrategyArg::Decomposed => Strategy::Decomposed,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the tree into table_add commands
    Compile {
        /// Trained tree (JSON arrays)
        #[arg(short = 'i', long, value_name = "FILE")]
        tree: PathBuf,

        /// Output command file
        #[arg(short, long, value_name = "FILE", default_value = "s1-commands.txt")]
        out: PathBuf,

        #[arg(short, long, value_enum, default_value = "direct")]
        strategy: StrategyArg,

        /// Append compilation statistics to this CSV file
        #[arg(long, value_name = "FILE")]
        stats_csv: Option<PathBuf>,
    },

    /// Write a readable IF ... THEN listing of every leaf
    Dump {
        #[arg(short = 'i', long, value_name = "FILE")]
        tree: PathBuf,

        #[arg(short, long, value_name = "FILE", default_value = "tree.txt")]
        out: PathBuf,

        /// List minimized integer bounds instead of the raw split conditions
        #[arg(short, long)]
        minimized: bool,
    },

    /// Classify feature vectors with the tree
    Predict {
        #[arg(short = 'i', long, value_name = "FILE")]
        tree: PathBuf,

        /// Inline vectors, e.g. "[[91000,40]]"
        #[arg(long, conflicts_with = "csv")]
        values: Option<String>,

        /// CSV file whose last column is the expected class
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },

    /// Check that the compiled rules classify a CSV dataset exactly like the tree
    Verify {
        #[arg(short = 'i', long, value_name = "FILE")]
        tree: PathBuf,

        #[arg(long, value_name = "FILE")]
        csv: PathBuf,

        /// The CSV has no class column
        #[arg(long)]
        no_label: bool,

        #[arg(short, long, value_enum, default_value = "direct")]
        strategy: StrategyArg,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();

    if let Err(e) = run(cli) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = match &cli.config {
        Some(path) => {
            log::info!("Loading config from: {}", path.display());
            CompilerConfig::load(path)?
        }
        None => CompilerConfig::default(),
    };

    match cli.command {
        Commands::Compile { tree, out, strategy, stats_csv } => {
            let source = tree.display().to_string();
            let tree = DecisionTree::load(&tree, &config.features)?;
            let compilation = compile(&tree, &config, strategy.into())?;
            writer::write_rules_file(&out, &compilation.entries)?;

            results::print_summary_table(&source, &[compilation.summary.clone()]);
            if let Some(csv_path) = stats_csv {
                results::record_results(&source, &[compilation.summary], &csv_path)?;
            }
        }
        Commands::Dump { tree, out, minimized } => {
            let tree = DecisionTree::load(&tree, &config.features)?;
            dump::write_listing(&out, &tree, &config.features, minimized)?;
        }
        Commands::Predict { tree, values, csv } => {
            let tree = DecisionTree::load(&tree, &config.features)?;
            let samples = match (values, csv) {
                (_, Some(path)) => predict::load_samples_csv(path, true)?,
                (Some(text), None) => predict::parse_values_json(&text)?,
                (None, None) => return Err("either --values or --csv is required".into()),
            };
            let report = predict::predict_samples(&tree, &samples);
            for (sample, label) in samples.iter().zip(&report.predictions) {
                println!("{:?} => {}", sample.values, label);
            }
            if let Some(accuracy) = report.accuracy {
                println!("Score {:.6}", accuracy);
            }
        }
        Commands::Verify { tree, csv, no_label, strategy } => {
            let tree = DecisionTree::load(&tree, &config.features)?;
            let compilation = compile(&tree, &config, strategy.into())?;
            let samples = predict::load_samples_csv(&csv, !no_label)?;
            let report = simulate::verify(&tree, &config.features, &compilation.entries, &samples);

            for mismatch in report.mismatches.iter().take(5) {
                println!(
                    "[MISMATCH] Row {}: Features: {:?}, Tree: {}, Rules: {}",
                    mismatch.row + 1,
                    samples[mismatch.row].values,
                    mismatch.tree_label,
                    mismatch.rule_label.map_or_else(|| "miss".to_string(), |l| l.to_string())
                );
            }
            if report.mismatches.len() > 5 {
                println!("[MISMATCH] ... (further mismatches omitted)");
            }
            println!("[RESULT] Mismatches: {} / {}", report.mismatches.len(), report.checked);
            if !report.is_equivalent() {
                return Err(format!("{} of {} samples classified differently by the rules", report.mismatches.len(), report.checked).into());
            }
        }
    }
    Ok(())
}
