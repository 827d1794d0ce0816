use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "nsmap")]
#[command(version = "0.1.0")]
#[command(about = "Inspect and exercise a class-path resolution registry", long_about = None)]
struct Cli {
    /// Manifest to load (default: $NSMAP_MANIFEST or ./autoload.json)
    #[arg(short, long, value_name = "PATH", global = true)]
    manifest: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve class names to files
    Resolve {
        /// Fully-qualified class names
        #[arg(value_name = "CLASS", required = true)]
        classes: Vec<String>,
    },

    /// Verify that every configured file and directory exists
    Check,

    /// Print the registry tables
    Dump {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List eager files in load order
    Files {
        /// Include each file once (reads it) after listing
        #[arg(long)]
        load: bool,
    },
}

fn main() -> Result<ExitCode> {
    env_logger::init();

    let cli = Cli::parse();
    let manifest = nsmap_registry::manifest_path(cli.manifest);
    log::info!("Using manifest {}", manifest.display());

    let ok = match cli.command {
        Commands::Resolve { classes } => nsmap_registry::resolve_classes(&manifest, &classes)?,
        Commands::Check => nsmap_registry::check_manifest(&manifest)?,
        Commands::Dump { json } => {
            nsmap_registry::dump_registry(&manifest, json)?;
            true
        }
        Commands::Files { load } => {
            let loaded = nsmap_registry::list_eager_files(&manifest, load)?;
            log::debug!("{} eager file(s) loaded", loaded);
            true
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
