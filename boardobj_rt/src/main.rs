//! # BOARDOBJ Runtime
//!
//! Loads the runtime configuration, registers the demonstration classes,
//! constructs groups from resident configuration tables, optionally serves
//! one host command against a memory-mapped surface file, and prints a
//! summary of every group.
//!
//! The process exit code is the command reply status on failure.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use boardobj::config::{ConfigError, ConfigLoader, LogLevel};
use boardobj::error::BoardObjError;
use boardobj::ids::ClassId;
use boardobj_rt::classes;
use boardobj_rt::config::{DEFAULT_SURFACE_SIZE, RuntimeConfig};
use boardobj_rt::dispatch::{BoardObjGrpCmd, TransferMode};
use boardobj_rt::runtime::Runtime;
use boardobj_rt::source::{BoardObjGrpSrc, ResidentTable};
use boardobj_surface::{MappedSurface, SurfaceError};
use clap::{Parser, ValueEnum};
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// BOARDOBJ runtime: board object groups over a shared surface
#[derive(Parser, Debug)]
#[command(name = "boardobj_rt")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Construct and query board object groups over a shared surface")]
struct Args {
    /// Runtime configuration TOML. Defaults apply when omitted.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Shared surface file; overrides `[surface].path`.
    #[arg(long, value_name = "FILE")]
    surface: Option<PathBuf>,

    /// Class to command, decimal or `0x`-prefixed hex.
    #[arg(long, value_parser = parse_class_id, requires = "cmd")]
    class: Option<u8>,

    /// Command to run against the surface.
    #[arg(long, value_enum, requires = "class")]
    cmd: Option<Cmd>,

    /// Enable verbose logging (DEBUG level), overriding `[shared].log_level`.
    #[arg(short, long)]
    verbose: bool,

    /// Output logs and the summary in JSON format.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Cmd {
    Set,
    GetStatus,
}

impl From<Cmd> for BoardObjGrpCmd {
    fn from(cmd: Cmd) -> Self {
        match cmd {
            Cmd::Set => Self::Set,
            Cmd::GetStatus => Self::GetStatus,
        }
    }
}

#[derive(Debug, Error)]
enum AppError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("surface: {0}")]
    Surface(#[from] SurfaceError),

    #[error("{0}")]
    Command(#[from] BoardObjError),

    #[error("cannot read resident table {path}: {source}")]
    ResidentIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("resident table {path} holds {actual}, configured for {expected}")]
    ResidentClass {
        path: PathBuf,
        expected: ClassId,
        actual: ClassId,
    },

    #[error("--cmd needs a surface (--surface or [surface].path)")]
    NoSurface,

    #[error("summary: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    fn exit_code(&self) -> i32 {
        match self {
            Self::Command(e) => i32::from(e.status()),
            _ => 1,
        }
    }
}

fn parse_class_id(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid class id '{s}': {e}"))
}

fn main() {
    let args = Args::parse();
    let config = load_config(&args);
    let log_level = config
        .as_ref()
        .map_or(LogLevel::default(), |c| c.shared.log_level);
    setup_tracing(&args, log_level);

    info!("BOARDOBJ runtime v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.map_err(AppError::from).and_then(|c| run(&args, c)) {
        error!("FATAL: {e}");
        process::exit(e.exit_code());
    }
}

fn load_config(args: &Args) -> Result<RuntimeConfig, ConfigError> {
    let config = match &args.config {
        Some(path) => RuntimeConfig::load(path)?,
        None => RuntimeConfig::with_service_name("boardobj-rt"),
    };
    config.validate()?;
    Ok(config)
}

fn run(args: &Args, config: RuntimeConfig) -> Result<(), AppError> {
    info!(
        "Config OK: service={}, scratch={}B, dmem={}B, policy={:?}",
        config.shared.service_name,
        config.runtime.scratch_size,
        config.runtime.dmem_budget,
        config.runtime.overwrite_policy,
    );

    let mode = if config.runtime.bulk_transfer {
        TransferMode::Bulk
    } else {
        TransferMode::PerEntry
    };
    let mut rt = Runtime::new(&config.runtime);
    classes::register_all(&mut rt, mode)?;

    for resident in &config.resident {
        self_init(&mut rt, ClassId(resident.class_id), &resident.path)?;
    }

    if let (Some(class), Some(cmd)) = (args.class, args.cmd) {
        let surface_path = args
            .surface
            .clone()
            .or_else(|| config.surface.as_ref().map(|s| s.path.clone()))
            .ok_or(AppError::NoSurface)?;
        let size = config.surface.as_ref().map_or(DEFAULT_SURFACE_SIZE, |s| s.size);
        let mut surface = if surface_path.exists() {
            MappedSurface::open(&surface_path)?
        } else {
            MappedSurface::create(&surface_path, size)?
        };

        let cmd = BoardObjGrpCmd::from(cmd);
        rt.dispatch(&mut surface, class, cmd as u8)?;
        surface.flush()?;
        info!("{cmd:?} on class {class:#04x} complete");
    }

    let summaries = rt.summaries();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for s in &summaries {
            let occupied: Vec<u16> = s.objects.iter().map(|o| o.grp_idx).collect();
            println!(
                "{} tier={} constructed={} obj_slots={} objects={:?}",
                s.class_id, s.tier, s.constructed, s.obj_slots, occupied
            );
        }
    }
    Ok(())
}

fn self_init(rt: &mut Runtime, class: ClassId, path: &Path) -> Result<(), AppError> {
    let bytes = fs::read(path).map_err(|source| AppError::ResidentIo {
        path: path.to_path_buf(),
        source,
    })?;
    let table = ResidentTable::parse(bytes)?;
    if table.class_id() != class {
        return Err(AppError::ResidentClass {
            path: path.to_path_buf(),
            expected: class,
            actual: table.class_id(),
        });
    }
    rt.self_init(&BoardObjGrpSrc::ResidentTable(table))?;
    info!("Resident table {} loaded for {class}", path.display());
    Ok(())
}

/// Default filter directive: `--verbose` wins over the configured level.
fn filter_directive(verbose: bool, configured: LogLevel) -> &'static str {
    if verbose {
        LogLevel::Debug.as_filter()
    } else {
        configured.as_filter()
    }
}

fn setup_tracing(args: &Args, configured: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(args.verbose, configured)));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
