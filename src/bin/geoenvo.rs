//! geoenvo command line interface
//!
//! # Usage
//!
//! ```bash
//! # Resolve a GeoJSON geometry
//! echo '{"type":"Point","coordinates":[-122.76,37.774,-20]}' | geoenvo resolve
//!
//! # Resolve from a file with a configuration, writing Schema.org JSON-LD
//! geoenvo resolve --geometry site.json --config geoenvo.yaml --schema-org -o site.jsonld
//!
//! # Save the terrestrial attribute table for `attribute_table` in the config
//! geoenvo refresh-attributes --output /var/lib/geoenvo/wte_attribute_table.json
//! ```

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use geoenvo::config::CONFIG_ENV_VAR;
use geoenvo::sources::world_terrestrial_ecosystems::fetch_raster_attribute_table;
use geoenvo::{build_resolver, ConfigLoader, GeoEnvoConfig, SourceTransport};

#[derive(Parser)]
#[command(name = "geoenvo")]
#[command(version)]
#[command(about = "Resolve geometries to environmental classifications")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults are used when absent)
    #[arg(long, short, global = true, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a GeoJSON Point or Polygon
    Resolve {
        /// GeoJSON geometry file (reads stdin if not provided)
        #[arg(short, long)]
        geometry: Option<PathBuf>,

        /// Identifier echoed into the envelope
        #[arg(long)]
        identifier: Option<String>,

        /// Description echoed into the envelope
        #[arg(long)]
        description: Option<String>,

        /// Vocabulary to map into, overriding the configuration
        #[arg(long, conflicts_with = "no_vocabulary")]
        vocabulary: Option<String>,

        /// Skip vocabulary mapping
        #[arg(long)]
        no_vocabulary: bool,

        /// Emit Schema.org JSON-LD instead of the envelope
        #[arg(long)]
        schema_org: bool,

        /// Output file (writes stdout if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Download the terrestrial raster attribute table
    RefreshAttributes {
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the effective configuration
    ShowConfig,
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Resolve {
            geometry,
            identifier,
            description,
            vocabulary,
            no_vocabulary,
            schema_org,
            output,
        } => {
            cmd_resolve(
                cli.config,
                ResolveArgs {
                    geometry,
                    identifier,
                    description,
                    vocabulary,
                    no_vocabulary,
                    schema_org,
                    output,
                },
            )
            .await
        }
        Commands::RefreshAttributes { output } => cmd_refresh_attributes(cli.config, output).await,
        Commands::ShowConfig => cmd_show_config(cli.config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

struct ResolveArgs {
    geometry: Option<PathBuf>,
    identifier: Option<String>,
    description: Option<String>,
    vocabulary: Option<String>,
    no_vocabulary: bool,
    schema_org: bool,
    output: Option<PathBuf>,
}

async fn cmd_resolve(config: Option<PathBuf>, args: ResolveArgs) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let input = read_input(args.geometry)?;
    let geometry: serde_json::Value = serde_json::from_str(&input)
        .map_err(|e| anyhow::anyhow!("Input is not valid JSON: {}", e))?;

    let transport: Arc<dyn SourceTransport> = Arc::new(config.http.build_transport()?);
    let resolver = build_resolver(&config, transport)?;

    let mut options = config.resolve_options();
    if args.no_vocabulary {
        options.vocabulary = None;
    } else if let Some(vocabulary) = args.vocabulary {
        options.vocabulary = Some(vocabulary);
    }
    if let Some(identifier) = args.identifier {
        options = options.with_identifier(identifier);
    }
    if let Some(description) = args.description {
        options = options.with_description(description);
    }

    let resolution = resolver.resolve(&geometry, &options).await;
    if let Some(cause) = resolution.cause() {
        eprintln!("{}: {}", "warning".yellow().bold(), cause);
    }
    let envelope = resolution.into_envelope();

    let rendered = if args.schema_org {
        serde_json::to_string_pretty(&envelope.to_schema_org())?
    } else {
        envelope.to_json_string_pretty()?
    };

    match args.output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .map_err(|e| anyhow::anyhow!("Failed to write '{}': {}", path.display(), e))?;
            eprintln!(
                "{} {} environment(s) written to {}",
                "OK".green(),
                envelope.environment.len(),
                path.display()
            );
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

async fn cmd_refresh_attributes(config: Option<PathBuf>, output: PathBuf) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let transport = config.http.build_transport()?;
    let table = fetch_raster_attribute_table(&transport).await?;

    std::fs::write(&output, serde_json::to_string_pretty(&table)?)
        .map_err(|e| anyhow::anyhow!("Failed to write '{}': {}", output.display(), e))?;
    println!("{} Attribute table written to {}", "OK".green(), output.display());
    Ok(())
}

fn cmd_show_config(config: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(config)?;
    print!("{}", serde_yaml::to_string(&config)?);
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

fn load_config(path: Option<PathBuf>) -> anyhow::Result<GeoEnvoConfig> {
    let loader = match path {
        Some(path) => ConfigLoader::new(path),
        None => ConfigLoader::from_env(),
    };
    Ok(loader.load()?)
}

fn read_input(file: Option<PathBuf>) -> anyhow::Result<String> {
    match file {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Failed to read '{}': {}", path.display(), e)),
        _ => {
            if atty::is(atty::Stream::Stdin) {
                anyhow::bail!("No input provided. Use --geometry or pipe GeoJSON via stdin.");
            }
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| anyhow::anyhow!("Failed to read stdin: {}", e))?;
            Ok(buffer)
        }
    }
}
