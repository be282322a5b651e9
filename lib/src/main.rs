use yieldsense::artifact::ModelArtifact;
use yieldsense::config::{PipelineConfig, PipelineConfigBuilder};
use yieldsense::pipeline::Pipeline;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "yieldsense",
    about = "Train and compare pass/fail classifiers on manufacturing sensor data",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clean, explore, balance, grid-search and persist the best model
    Run(RunArgs),
    /// Clean the data and write the exploration reports only
    Explore(RunArgs),
    /// Print the summary of a saved model artifact
    Inspect {
        /// Path to the artifact written by `run`
        #[arg(default_value = "best_model.bin")]
        path: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// Input CSV file
    #[arg(long)]
    input: Option<PathBuf>,
    /// Where to write the best model artifact
    #[arg(long)]
    model_path: Option<PathBuf>,
    /// Directory for CSV/JSON reports
    #[arg(long)]
    report_dir: Option<PathBuf>,
    /// Do not write any report files
    #[arg(long, default_value_t = false)]
    no_reports: bool,
    /// Seed for the split, SMOTE and the random forest
    #[arg(long)]
    seed: Option<u64>,
    /// Fraction of rows held out for testing
    #[arg(long)]
    test_size: Option<f64>,
    /// Oversample when minority/majority falls below this ratio
    #[arg(long)]
    threshold: Option<f64>,
}

impl RunArgs {
    fn into_config(self) -> Result<PipelineConfig> {
        let base = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        let mut builder = PipelineConfigBuilder::from_config(base);
        if let Some(input) = self.input {
            builder = builder.input(input);
        }
        if let Some(model_path) = self.model_path {
            builder = builder.model_path(model_path);
        }
        if self.no_reports {
            builder = builder.report_dir(None);
        } else if let Some(dir) = self.report_dir {
            builder = builder.report_dir(Some(dir));
        }
        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }
        if let Some(test_size) = self.test_size {
            builder = builder.test_size(test_size);
        }
        if let Some(threshold) = self.threshold {
            builder = builder.balance_threshold(threshold);
        }
        Ok(builder.build()?)
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run(args) => {
            let config = args.into_config()?;
            info!(input = %config.input.display(), seed = config.seed, "starting run");
            let outcome = Pipeline::new(config)?.run()?;

            print!("{}", outcome.summary.model_reports());
            println!("\n{}", outcome.summary);
        }
        Commands::Explore(args) => {
            let config = args.into_config()?;
            let (cleaned, exploration) = Pipeline::new(config)?.explore()?;
            println!(
                "{} rows, {} features kept, {} columns dropped, {} cells imputed",
                cleaned.report.n_rows,
                cleaned.dataset.n_features(),
                cleaned.report.n_dropped(),
                cleaned.report.imputed_cells
            );
            println!("class counts: {:?}", exploration.class_counts);
            for (name, corr) in &exploration.target_correlations {
                println!("  {:<24} {:+.4}", name, corr);
            }
        }
        Commands::Inspect { path } => {
            let artifact = ModelArtifact::load(&path)
                .with_context(|| format!("loading artifact {}", path.display()))?;
            println!("{}", artifact);
        }
    }

    Ok(())
}
