use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use typedrop::blob::FsBlobStore;
use typedrop::config::{self, SiteConfig};
use typedrop::generator::{AnthropicService, Orchestrator};
use typedrop::{output, pipeline};

/// Flags for commands that call the generative service.
#[derive(clap::Args, Clone)]
struct GenerateArgs {
    /// Anthropic API key (or set ANTHROPIC_API_KEY env var)
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Override the configured model
    #[arg(long)]
    model: Option<String>,
}

#[derive(Parser)]
#[command(name = "typedrop")]
#[command(about = "Daily TypeScript challenge generator and static site publisher")]
#[command(long_about = "\
Daily TypeScript challenge generator and static site publisher

Each run asks a model for one new challenge, appends it to the challenge
store, writes the exercise bundle, and re-renders the site from the store.

Site root layout:

  site/
  ├── typedrop.toml                # Config (optional, overrides defaults)
  ├── challenges.json              # Challenge store, oldest first
  ├── index.html                   # Landing page; card spliced between
  │                                #   <!-- CHALLENGE_START --> / <!-- CHALLENGE_END -->
  ├── archive.html                 # Regenerated every publish
  ├── archive/
  │   └── 2026-03-14/
  │       └── typed-retry-queue.html
  └── challenge-output/            # Exercise bundle of the latest run

Run 'typedrop gen-config' to generate a documented typedrop.toml.")]
#[command(version)]
struct Cli {
    /// Site root directory
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Config file (defaults to <root>/typedrop.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate today's challenge and append it to the store
    Generate(GenerateArgs),
    /// Re-render the site from the store
    Publish,
    /// Run the full pipeline: generate → publish
    Run(GenerateArgs),
    /// Validate store, templates and landing page without writing
    Check,
    /// Print a stock typedrop.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "typedrop=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Command::Generate(args) => {
            let config = resolve_config(&cli)?;
            let blobs = FsBlobStore::new(&cli.root);
            println!("==> Generating challenge");
            generate(&blobs, &config, args).await?;
        }
        Command::Publish => {
            let config = resolve_config(&cli)?;
            let blobs = FsBlobStore::new(&cli.root);
            println!("==> Publishing {}", cli.root.display());
            let outcome = pipeline::run_publish(&blobs, &config)?;
            output::print_publish_output(&outcome);
        }
        Command::Run(args) => {
            let config = resolve_config(&cli)?;
            let blobs = FsBlobStore::new(&cli.root);

            println!("==> Stage 1: Generating challenge");
            generate(&blobs, &config, args).await?;

            println!("==> Stage 2: Publishing {}", cli.root.display());
            let outcome = pipeline::run_publish(&blobs, &config)?;
            output::print_publish_output(&outcome);

            println!("==> Run complete");
        }
        Command::Check => {
            let config = resolve_config(&cli)?;
            let blobs = FsBlobStore::new(&cli.root);
            println!("==> Checking {}", cli.root.display());
            let report = pipeline::check(&blobs, &config)?;
            output::print_check_output(&report);
            println!("==> Site is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

async fn generate(
    blobs: &FsBlobStore,
    config: &SiteConfig,
    args: &GenerateArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut generator_config = config.generator.clone();
    if let Some(model) = &args.model {
        generator_config.model = model.clone();
    }
    let today = generator_config.timezone.today();
    let service = AnthropicService::new(args.api_key.clone(), generator_config.api_url.clone())?;
    let orchestrator = Orchestrator::new(service, generator_config);
    let outcome =
        pipeline::run_generate(blobs, config, &orchestrator, today, &mut rand::thread_rng())
            .await?;
    output::print_generate_output(&outcome);
    Ok(())
}

/// Explicit `--config` wins and must exist; otherwise `<root>/typedrop.toml` if present.
fn resolve_config(cli: &Cli) -> Result<SiteConfig, config::ConfigError> {
    match cli.config.as_deref() {
        Some(path) if !path.exists() => Err(config::ConfigError::Validation(format!(
            "config file {} does not exist",
            path.display()
        ))),
        Some(path) => config::load_config_file(path),
        None => config::load_config(Path::new(&cli.root)),
    }
}
