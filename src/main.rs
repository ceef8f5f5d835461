use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use timeline_bench::{
    cli::{Cli, Command},
    config::Settings,
    db,
    error::Result,
    load, plot,
    record::CsvRecorder,
    seed,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::new()?;
    info!("Configuration loaded");

    match cli.command {
        Command::Seed(args) => {
            let options = args.to_options(&settings);
            let report = if options.dry_run {
                seed::dry_run(&options)?
            } else {
                let url = args.database_url.as_deref().unwrap_or(&settings.database_url);
                info!("Connecting to datastore...");
                let pool = db::create_pool(url, settings.database_max_connections).await?;
                db::run_migrations(&pool).await?;
                seed::run(&pool, &options).await?
            };
            info!("{}", report);
        }
        Command::Reset(args) => {
            let url = args.database_url.as_deref().unwrap_or(&settings.database_url);
            info!("Connecting to datastore...");
            let pool = db::create_pool(url, settings.database_max_connections).await?;
            db::run_migrations(&pool).await?;
            let report = seed::reset(&pool).await?;
            info!("Deleted {} entities in total", report.total());
        }
        Command::Bench(args) => {
            let config = args.to_config(&settings)?;
            let client = load::build_client(config.timeout)?;
            let mut recorder = CsvRecorder::open(args.out_path(&settings))?;
            let samples = load::run_scenario(&client, &config, &mut recorder).await?;
            let failed = samples.iter().filter(|s| s.failed).count();
            info!(
                "Recorded {} runs to {} ({} with failures)",
                samples.len(),
                recorder.path().display(),
                failed
            );
        }
        Command::Plot(args) => {
            let out_dir = args
                .out_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(&settings.out_dir));
            for scenario in args.selected() {
                info!("Plotting {}", scenario);
                plot::plot_scenario(&out_dir, scenario)?;
            }
        }
    }

    Ok(())
}
