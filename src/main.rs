use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use bids_types::Participant;
use dcm2bids_core::{
    ConverterConfig, Dcm2niix, SystemCommandRunner, dcm2niix_version, load_dcm2niix_options,
};

#[derive(Parser)]
#[command(name = "dcm2bids-run")]
#[command(about = "Run dcm2niix into a BIDS dataset's temporary directory")]
struct Cli {
    /// Log level for the dcm2bids crates; takes precedence over RUST_LOG for those targets
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert DICOM directories with dcm2niix
    Convert {
        /// DICOM directories to convert, in order
        #[arg(short = 'd', long = "dicom-dir", required = true, num_args = 1..)]
        dicom_dirs: Vec<PathBuf>,
        /// Root of the BIDS dataset
        #[arg(short = 'o', long = "output-dir", default_value = ".")]
        bids_dir: PathBuf,
        /// Participant label (helper directory is used when omitted)
        #[arg(short, long)]
        participant: Option<String>,
        /// Session label
        #[arg(short, long, requires = "participant")]
        session: Option<String>,
        /// dcm2bids JSON configuration file (only `dcm2niixOptions` is read)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Options passed to dcm2niix, overriding the configuration file
        #[arg(long, allow_hyphen_values = true)]
        dcm2niix_options: Option<String>,
        /// Clean and rerun dcm2niix when previous output exists
        #[arg(long)]
        force_dcm2niix: bool,
    },
    /// Print the installed dcm2niix version
    Version,
}

/// Entry point for the dcm2bids runner.
///
/// # Environment Variables
/// - `DCM2NIIX_BIN`: dcm2niix binary to run (default: "dcm2niix" on PATH)
/// - `RUST_LOG`: additional tracing filter directives
fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(env_filter(&cli.log_level)?)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = ConverterConfig::default();
    if let Ok(bin) = std::env::var("DCM2NIIX_BIN") {
        config = config.with_binary_name(bin)?;
    }

    match cli.command {
        Commands::Convert {
            dicom_dirs,
            bids_dir,
            participant,
            session,
            config: config_file,
            dcm2niix_options,
            force_dcm2niix,
        } => {
            if let Some(path) = config_file {
                if let Some(options) = load_dcm2niix_options(&path)? {
                    config = config.with_default_options(options);
                }
            }

            let participant = participant
                .map(|name| Participant::new(name, session.as_deref()))
                .transpose()?;

            let mut runner = Dcm2niix::new(dicom_dirs, bids_dir, participant.as_ref(), &config);
            if let Some(options) = dcm2niix_options {
                runner = runner.with_options(options);
            }

            tracing::info!("dcm2niix output directory: {}", runner.output_dir().display());
            let status = runner.run(force_dcm2niix)?;

            for sidecar in runner.sidecar_files() {
                println!("{}", sidecar.display());
            }

            Ok(ExitCode::from(u8::try_from(status).unwrap_or(1)))
        }
        Commands::Version => {
            let version = dcm2niix_version(&SystemCommandRunner, &config)?;
            println!("{version}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// `RUST_LOG` directives plus `level` for the workspace crates, which replaces any
/// `RUST_LOG` directive for those same targets.
fn env_filter(level: &str) -> anyhow::Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive(format!("dcm2bids_core={level}").parse()?)
        .add_directive(format!("dcm2bids_run={level}").parse()?))
}
