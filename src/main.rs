use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use product_vision::pipeline::services::color::PrimaryColorCatalog;
use product_vision::pipeline::services::image::analysis::AnalysisOrchestrator;
use product_vision::pipeline::services::jobs::{process_waiting_images, JobRunner, LocalImageStore};
use product_vision::pipeline::services::learning::{KnnTrainer, ModelRepository, TrainingLayout, TrainingOptions};
use product_vision::{AppError, ClassifierKind, Configuration};
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "product-vision")]
#[command(about = "Product photo classification and color matching")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML). Defaults to ./product-vision.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TrainArgs {
    /// Share of every class held out for evaluation
    #[arg(long, default_value_t = 0.2)]
    test_ratio: f64,

    /// Equalize class sizes before training
    #[arg(long)]
    balance: bool,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the position classifier
    TrainPosition(TrainArgs),
    /// Train the neutral background classifier
    TrainBackground(TrainArgs),
    /// Train the product-only classifier
    TrainProductOnly(TrainArgs),
    /// Move legacy lateral position folders into Side
    ReorganizeTrainingFolders {
        /// Report what would move without touching files
        #[arg(long)]
        dry_run: bool,
    },
    /// Analyze one image and print the result as JSON
    Analyze {
        file: PathBuf,
    },
    /// Classify every image under the image root not yet analyzed
    ProcessImages {
        /// Process at most this many waiting images
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Find the catalog color closest to a hex code
    MatchColor {
        hex: String,

        /// JSON array of primary colors
        #[arg(long)]
        palette: PathBuf,
    },
}

fn init_logging(level: Level) {
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    let configuration = match &cli.config {
        Some(path) => Configuration::load_from(path)?,
        None => Configuration::load()?,
    };
    init_logging(configuration.log_level()?);

    match cli.command {
        Commands::TrainPosition(args) => train(&configuration, ClassifierKind::Position, args).await,
        Commands::TrainBackground(args) => train(&configuration, ClassifierKind::Background, args).await,
        Commands::TrainProductOnly(args) => train(&configuration, ClassifierKind::ProductOnly, args).await,
        Commands::ReorganizeTrainingFolders { dry_run } => reorganize(&configuration, dry_run),
        Commands::Analyze { file } => analyze(&configuration, &file).await,
        Commands::ProcessImages { limit } => process_images(&configuration, limit).await,
        Commands::MatchColor { hex, palette } => match_color(&hex, &palette).await,
    }
}

async fn train(configuration: &Configuration, kind: ClassifierKind, args: TrainArgs) -> Result<(), AppError> {
    let trainer = KnnTrainer::new(kind, ModelRepository::new(&configuration.models_dir));
    let layout = TrainingLayout::new(&configuration.training_dir);
    let options = TrainingOptions {
        test_ratio: args.test_ratio,
        balance: args.balance,
        seed: args.seed,
        workers: configuration.extraction_workers,
    };

    let outcome = trainer.train_from_layout(&layout, &options).await?;
    info!(
        kind = %kind,
        accuracy = outcome.accuracy,
        train_count = outcome.train_count,
        test_count = outcome.test_count,
        path = %outcome.model_path.display(),
        "Training complete"
    );
    println!(
        "{kind}: accuracy {:.2}% ({} train / {} test) -> {}",
        outcome.accuracy * 100.0,
        outcome.train_count,
        outcome.test_count,
        outcome.model_path.display()
    );
    Ok(())
}

fn reorganize(configuration: &Configuration, dry_run: bool) -> Result<(), AppError> {
    let report = TrainingLayout::new(&configuration.training_dir).reorganize_position_folders(dry_run)?;
    for (from, to) in &report.moved {
        println!("{} -> {}", from.display(), to.display());
    }
    for dir in &report.removed_dirs {
        println!("removed {}", dir.display());
    }
    if dry_run {
        println!("dry run: {} image(s) would move", report.moved.len());
    }
    Ok(())
}

async fn analyze(configuration: &Configuration, file: &Path) -> Result<(), AppError> {
    let orchestrator = AnalysisOrchestrator::from_configuration(configuration)?;
    let bytes = tokio::fs::read(file).await?;
    let result = tokio::task::spawn_blocking(move || orchestrator.analyze(&bytes))
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "Analysis task failed");
            Default::default()
        });
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn process_images(configuration: &Configuration, limit: Option<usize>) -> Result<(), AppError> {
    let runner = JobRunner::new(
        Arc::new(LocalImageStore::new(&configuration.image_root)),
        AnalysisOrchestrator::from_configuration(configuration)?,
        Arc::new(PrimaryColorCatalog::new()),
    );
    let report = process_waiting_images(&runner, limit).await?;
    println!(
        "{} image(s) processed, {} failed, {} already completed",
        report.processed, report.failed, report.skipped
    );
    Ok(())
}

async fn match_color(hex: &str, palette: &Path) -> Result<(), AppError> {
    let catalog = PrimaryColorCatalog::from_json_slice(&tokio::fs::read(palette).await?)?;
    match catalog.closest_with_inheritance(hex) {
        Some(color) => {
            let name = catalog.full_name(&color.id).unwrap_or_else(|| color.name.clone());
            let hex_code = catalog.effective_hex(&color.id).unwrap_or_default();
            println!("{name} ({hex_code}) id={}", color.id);
        }
        None => println!("no match for {hex}"),
    }
    Ok(())
}
