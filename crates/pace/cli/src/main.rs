//! `eid-pace`: run PACE against an eID card in a PC/SC reader

use apdu_transport_pcsc::{ConnectStrategy, PcscConfig, PcscDeviceManager};
use clap::{Parser, Subcommand, ValueEnum};
use eid_pace::PasswordType;
use std::error::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use zeroize::Zeroizing;

mod commands;
mod esteid;
mod utils;

use commands::{pace_command, read_personal_data_command};
use utils::reader;

#[derive(Parser)]
#[command(version, about = "PACE handshake and secure messaging for eID cards")]
struct Cli {
    /// Optional reader name to use (will auto-detect if not specified)
    #[arg(short, long)]
    reader: Option<String>,

    /// Debug level output
    #[arg(short, long)]
    verbose: bool,

    /// Application to select before the handshake, in hex
    #[arg(long, default_value_t = hex::encode_upper(esteid::ESTEID_AID))]
    aid: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available readers
    List,

    /// Run the PACE handshake and report the result
    Pace {
        /// Password (CAN by default); omit to run in demonstration mode
        #[arg(long)]
        can: Option<String>,

        /// Which password is supplied
        #[arg(long, value_enum, default_value_t = PasswordKind::Can)]
        password_type: PasswordKind,
    },

    /// Read the EstEID personal data file over secure messaging
    ReadPersonalData {
        /// Password (CAN by default)
        #[arg(long, required = true)]
        can: String,

        /// Which password is supplied
        #[arg(long, value_enum, default_value_t = PasswordKind::Can)]
        password_type: PasswordKind,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PasswordKind {
    /// Card access number
    Can,
    /// PIN
    Pin,
    /// PIN unblocking key
    Puk,
}

impl From<PasswordKind> for PasswordType {
    fn from(kind: PasswordKind) -> Self {
        match kind {
            PasswordKind::Can => Self::Can,
            PasswordKind::Pin => Self::Pin,
            PasswordKind::Puk => Self::Puk,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let manager = PcscDeviceManager::new()?;

    if let Commands::List = cli.command {
        return reader::list_readers(&manager);
    }

    let aid = hex::decode(&cli.aid).map_err(|e| format!("Invalid AID '{}': {e}", cli.aid))?;

    let transport = manager.connect_strategy(
        ConnectStrategy::from_reader_name(cli.reader),
        PcscConfig::default(),
    )?;
    info!("Using reader: {}", transport.reader_name());

    match cli.command {
        Commands::List => {}
        Commands::Pace { can, password_type } => {
            let can = can.map(Zeroizing::new);
            pace_command(
                transport,
                &aid,
                can.as_ref().map(|can| can.as_bytes()),
                password_type.into(),
            )?;
        }
        Commands::ReadPersonalData { can, password_type } => {
            let can = Zeroizing::new(can);
            read_personal_data_command(transport, &aid, can.as_bytes(), password_type.into())?;
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    // RUST_LOG, when set, takes precedence over the verbosity flag
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(true)
        .init();
}
