//! fwpack CLI - Firmware packaging tool
//!
//! Commands:
//! - `fwpack bump` - Bump the firmware version in source and metadata
//! - `fwpack create` - Wrap metadata and an artifact into an FLFW package
//! - `fwpack sample` - Write an example metadata file
//! - `fwpack inspect` - Show what an FLFW package contains
//! - `fwpack extract` - Unpack an FLFW package the way the device does
//! - `fwpack build` - Run the post-build pipeline for a project
//! - `fwpack check-workflows` - Lint CI workflow files

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod build;
mod bump;
mod package;
mod workflow;

#[derive(Parser, Debug)]
#[command(name = "fwpack")]
#[command(author, version, about = "Build and inspect FLFW firmware packages", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bump FIRMWARE_VERSION in the firmware source and the metadata template
    Bump {
        /// Component to increment (major, minor, patch)
        kind: String,

        /// Project directory (default: current directory)
        #[arg(short, long)]
        project: Option<PathBuf>,
    },

    /// Create an FLFW package from a metadata file and a firmware artifact
    ///
    /// The metadata is normalized to the package schema before encoding. Missing
    /// sections and fields are added with empty values (`build_info.git_hash`
    /// becomes null), and numbers are re-serialized, so `"size_kb": 16` is
    /// stored as `16.0`.
    Create {
        /// Metadata JSON file (normalized before encoding)
        metadata: PathBuf,

        /// Firmware artifact (usually an Intel HEX file)
        artifact: PathBuf,

        /// Output package path
        output: PathBuf,
    },

    /// Write an example metadata file
    Sample {
        /// Output path
        #[arg(short, long, default_value = fwpack::SAMPLE_METADATA_FILE)]
        output: PathBuf,
    },

    /// Show the header, identity and device warnings of a package
    Inspect {
        /// Package file
        package: PathBuf,
    },

    /// Extract firmware.meta and firmware.hex from a package
    Extract {
        /// Package file
        package: PathBuf,

        /// Output directory
        output_dir: PathBuf,
    },

    /// Package the latest build output of a PlatformIO project
    Build {
        /// Project directory (default: current directory)
        #[arg(short, long)]
        project: Option<PathBuf>,

        /// PlatformIO environment; selects .pio/build/<env>
        #[arg(short, long, conflicts_with = "build_dir")]
        env: Option<String>,

        /// Build directory, relative to the project directory
        #[arg(short, long)]
        build_dir: Option<PathBuf>,
    },

    /// Check CI workflow files for common mistakes
    CheckWorkflows {
        /// Workflow directory
        #[arg(short, long, default_value = ".github/workflows")]
        dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::Bump { kind, project } => {
            bump::run(&kind, project)?;
        }
        Commands::Create {
            metadata,
            artifact,
            output,
        } => {
            package::create(&metadata, &artifact, &output)?;
        }
        Commands::Sample { output } => {
            package::sample(&output)?;
        }
        Commands::Inspect { package } => {
            package::inspect(&package)?;
        }
        Commands::Extract {
            package,
            output_dir,
        } => {
            package::extract(&package, &output_dir)?;
        }
        Commands::Build {
            project,
            env,
            build_dir,
        } => {
            build::run(project, env, build_dir)?;
        }
        Commands::CheckWorkflows { dir } => {
            workflow::run(&dir)?;
        }
    }

    Ok(())
}
