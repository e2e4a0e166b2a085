//! tactile host runner: drives the touch dispatcher from a Linux
//! touchscreen.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use std::sync::atomic::Ordering;
use std::time::SystemTime;

use clap::Parser;
use log::{LevelFilter, Log, Metadata, Record};

use tactile::manager::{TouchManager, list_touch_devices};

#[derive(Parser)]
#[command(name = "tactile", version, about = "Touch widget dispatcher for Linux touchscreens")]
struct Cli {
    /// TOML configuration file
    #[arg(default_value = "/etc/tactile/tactile.toml")]
    config: PathBuf,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print the multi-touch devices found and exit
    #[arg(short, long)]
    list_devices: bool,
}

/// Writes crate log records to stderr and, if configured, appends them to
/// a file.
struct TactileLogger {
    level: LevelFilter,
    sink: Option<Mutex<File>>,
}

impl Log for TactileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with("tactile") && metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let stamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let line = format!(
            "{stamp} {:<5} {}: {}\n",
            record.level(),
            record.target(),
            record.args()
        );

        eprint!("{line}");
        if let Some(sink) = &self.sink {
            if let Ok(mut file) = sink.lock() {
                let _ = file.write_all(line.as_bytes());
            }
        }
    }

    fn flush(&self) {
        if let Some(sink) = &self.sink {
            if let Ok(mut file) = sink.lock() {
                let _ = file.flush();
            }
        }
    }
}

/// Pick the level (command line wins over the config file) and install
/// the logger.
fn init_logging(manager: &TouchManager, verbose: u8) -> Result<(), log::SetLoggerError> {
    let level = match verbose {
        0 => manager
            .config_log_level()
            .parse()
            .unwrap_or(LevelFilter::Info),
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let sink = manager.config_log_file().and_then(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| eprintln!("Warning: log file '{path}' unavailable: {e}"))
            .ok()
            .map(Mutex::new)
    });

    log::set_boxed_logger(Box::new(TactileLogger { level, sink }))?;
    log::set_max_level(level);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.list_devices {
        return list_touch_devices();
    }

    // the config decides the log level, so it is loaded before logging starts
    let mut manager = match TouchManager::new(&cli.config) {
        Ok(manager) => manager,
        Err(e) => {
            eprintln!("Error: {e}\nRun `tactile --list-devices` to find the touchscreen USB ID.");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&manager, cli.verbose) {
        eprintln!("Error: cannot install logger: {e}");
        return ExitCode::FAILURE;
    }

    let running = manager.running_flag();
    if let Err(e) = ctrlc::set_handler(move || running.store(false, Ordering::Relaxed)) {
        log::error!("Cannot install Ctrl-C handler: {e}");
        return ExitCode::FAILURE;
    }

    log::info!("Configuration: {}", cli.config.display());
    match manager.start() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
