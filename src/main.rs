use clap::{Parser, Subcommand};
use dining_catalog::catalog::Catalog;
use dining_catalog::generator::{self, DisabledGenerator};
use dining_catalog::{config, output, pipeline, server};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dining-catalog")]
#[command(about = "Dining hall food catalog service")]
#[command(long_about = "\
Dining hall food catalog service

Reads a CSV dataset of food items and serves them as JSON, together with an
image for each item.

Dataset columns (all optional, unknown columns ignored):

  name,diningHall,calories,image_path
  Pizza,Gordon,450,
  Caesar Salad,Four Lakes,220,photos/caesar.jpg

Image resolution (first available wins):
  1. images/<food>_<hall>.png already generated
  2. image_path, when the file exists and is an image
  3. a newly generated image, when image_path names a missing file
  4. a placeholder URL (or no image, per images.fallback)

Image generation needs OPENAI_API_KEY in the environment.

Run 'dining-catalog gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Path to config.toml (missing file means stock defaults)
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the catalog and serve it over HTTP
    Serve,
    /// Load the catalog once without generating images and print a report
    /// (row images are still copied into the images directory)
    Check,
    /// Generate an image for every food that doesn't have one yet
    GenerateImages,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => {
            let config = setup(&cli.config)?;
            let generator = generator::from_config(&config, config::api_key_from_env());
            let catalog = Arc::new(Catalog::new(config, generator));
            let runtime = tokio::runtime::Runtime::new()?;
            // The blocking HTTP client inside the generator must be dropped outside the runtime.
            runtime.block_on(server::serve(Arc::clone(&catalog)))?;
        }
        Command::Check => {
            let config = setup(&cli.config)?;
            println!("==> Checking {}", config.dataset.path.display());
            let generator = Arc::new(DisabledGenerator::new(
                &config.images.dir,
                "check never generates",
            ));
            let catalog = Catalog::new(config, generator);
            let (tx, rx) = std::sync::mpsc::channel();
            let stats = catalog.load(Some(tx))?;
            let events: Vec<_> = rx.into_iter().collect();
            output::print_check_output(&catalog.all(), &events, &stats);
            println!("==> Dataset is valid");
        }
        Command::GenerateImages => {
            let config = setup(&cli.config)?;
            let generator = generator::from_config(&config, config::api_key_from_env());
            if !generator.is_available() {
                return Err(
                    "image generation is unavailable: set OPENAI_API_KEY and generator.enabled"
                        .into(),
                );
            }
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for (i, event) in rx.into_iter().enumerate() {
                    println!("{}", output::format_generation_event(i + 1, &event));
                }
            });
            let result = pipeline::generate_all(&config, generator.as_ref(), Some(tx));
            printer.join().map_err(|_| "output thread panicked")?;
            output::print_generation_summary(&result?);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Initialize logging, load the config and make sure the images directory exists.
///
/// `RUST_LOG` overrides the default `info` filter.
fn setup(config_path: &Path) -> Result<config::ServiceConfig, Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = config::load_config(config_path)?;
    std::fs::create_dir_all(&config.images.dir)?;
    Ok(config)
}
