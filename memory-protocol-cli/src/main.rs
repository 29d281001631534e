//! Memory Protocol CLI Application
//!
//! Embeds the memory protocol the way a media application would:
//! - Registers callbacks (an in-process buffer store, or a C library)
//! - Drives handles through open/read/write/seek/close
//! - Reports per-handle results as text or JSON

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use memory_protocol::{set_callbacks, DispatchMode, MemoryProtocol, UrlProtocol};
use std::path::PathBuf;

mod callbacks;
mod commands;
mod config;
mod host;
mod report;
mod store;

/// memio - Exercise the memory protocol backend
#[derive(Parser, Debug)]
#[command(name = "memio")]
#[command(about = "Drive the callback-backed memory protocol", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (memio.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// C library providing the protocol callbacks
    #[arg(long, value_name = "FILE", global = true)]
    library: Option<PathBuf>,

    #[command(flatten)]
    symbols: SymbolArgs,

    /// Capture callbacks per handle at open time
    #[arg(long, global = true)]
    snapshot: bool,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

/// Symbol name overrides for `--library`
#[derive(clap::Args, Debug, Default)]
struct SymbolArgs {
    /// Symbol of the open callback
    #[arg(long, value_name = "NAME", global = true)]
    open_symbol: Option<String>,

    /// Symbol of the read callback
    #[arg(long, value_name = "NAME", global = true)]
    read_symbol: Option<String>,

    /// Symbol of the write callback
    #[arg(long, value_name = "NAME", global = true)]
    write_symbol: Option<String>,

    /// Symbol of the seek callback
    #[arg(long, value_name = "NAME", global = true)]
    seek_symbol: Option<String>,

    /// Symbol of the close callback
    #[arg(long, value_name = "NAME", global = true)]
    close_symbol: Option<String>,

    /// Symbol receiving the handle accessor table
    #[arg(long, value_name = "NAME", global = true)]
    bind_symbol: Option<String>,
}

impl SymbolArgs {
    /// Override configured symbol names with those given on the command line
    fn apply(&self, names: &mut config::SymbolNames) {
        let overrides = [
            (&self.open_symbol, &mut names.open),
            (&self.read_symbol, &mut names.read),
            (&self.write_symbol, &mut names.write),
            (&self.seek_symbol, &mut names.seek),
            (&self.close_symbol, &mut names.close),
            (&self.bind_symbol, &mut names.bind),
        ];
        for (flag, name) in overrides {
            if let Some(flag) = flag {
                *name = flag.clone();
            }
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write files through the protocol and read them back
    Copy {
        /// Files to copy
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory for the read-back copies
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },
    /// Open identifiers read-only and report their size
    Probe {
        /// Identifiers such as memory:clip
        #[arg(required = true)]
        identifiers: Vec<String>,

        /// Load a file into the buffer store under its file name first
        #[arg(long, value_name = "FILE")]
        preload: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::info!("memio v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using memory protocol library v{}", memory_protocol::VERSION);

    let mut app_config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => config::AppConfig::default(),
    };
    if args.snapshot {
        app_config.protocol.dispatch = DispatchMode::SnapshotOnOpen;
    }
    if args.library.is_some() {
        app_config.callbacks.library = args.library.clone();
    }
    args.symbols.apply(&mut app_config.callbacks.symbols);

    let store = store::BufferStore::new();
    let mut foreign = None;
    match &app_config.callbacks.library {
        Some(path) => {
            let mut library = callbacks::ForeignCallbacks::load(path)?;
            if library.register(&app_config.callbacks.symbols)? == 0 {
                bail!("No callback symbols found in {:?}", path);
            }
            foreign = Some(library);
        }
        None => {
            log::debug!("Using in-process buffer store");
            set_callbacks(store.callbacks());
        }
    }

    let protocol = MemoryProtocol::with_global_registry(app_config.protocol.clone());
    log::debug!(
        "Protocol '{}' (whitelist '{}', {:?} dispatch)",
        protocol.name(),
        protocol.default_whitelist(),
        app_config.protocol.dispatch
    );

    let output = match &args.command {
        Command::Copy { inputs, output_dir } => {
            let reports = commands::copy_files(&protocol, inputs, output_dir.as_deref())?;
            let failed = reports.iter().filter(|r| !r.verified).count();
            let text = if args.json {
                report::to_json(&reports)?
            } else {
                report::copy_text(&reports)
            };
            if failed > 0 {
                log::error!("{} of {} files failed verification", failed, reports.len());
            }
            text
        }
        Command::Probe {
            identifiers,
            preload,
        } => {
            if foreign.is_some() && !preload.is_empty() {
                log::warn!("--preload has no effect with a callback library");
            }
            for path in preload {
                commands::preload(&store, path)?;
            }
            let reports = commands::probe(&protocol, identifiers);
            if args.json {
                report::to_json(&reports)?
            } else {
                report::probe_text(&reports)
            }
        }
    };

    if !args.quiet {
        print!("{}", output);
    }

    if foreign.is_none() {
        log::info!("Buffer store holds {} buffer(s)", store.len());
    }
    drop(foreign);
    memory_protocol::clear_callbacks();
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
