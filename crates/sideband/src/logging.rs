use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Install the global subscriber.
///
/// `demux` writes remote progress and errors to stderr, so with `log_file`
/// set the logs go there instead and stderr carries only sideband text.
/// On stderr each line also names its module target so it stands apart
/// from remote text.
pub fn init_logging(
    format: LogFormat,
    level: LogLevel,
    log_file: Option<&Path>,
) -> io::Result<()> {
    let to_file = log_file.is_some();
    let builder = tracing_subscriber::fmt()
        .with_writer(log_writer(log_file)?)
        .with_max_level(level.as_filter())
        .with_ansi(false)
        .with_target(!to_file);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
    Ok(())
}

/// Appends to `path` when given, otherwise stderr.
fn log_writer(path: Option<&Path>) -> io::Result<BoxMakeWriter> {
    match path {
        Some(path) => Ok(BoxMakeWriter::new(Mutex::new(open_log_file(path)?))),
        None => Ok(BoxMakeWriter::new(io::stderr)),
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
