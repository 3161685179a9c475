//! Logger setup: `env_logger` writing to stderr, optionally teed to a file.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use log::LevelFilter;

/// Writes everything to stderr and, ANSI codes stripped, to a log file.
struct Tee {
    file: Option<File>,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        if let Some(file) = self.file.as_mut() {
            file.write_all(&strip_ansi_escapes::strip(buf))?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

/// Install the global logger.
///
/// `--quiet` keeps warnings and errors, `--verbose` adds debug messages with
/// timestamps. Other crates only log warnings unless `RUST_LOG` says
/// otherwise.
pub(crate) fn init(quiet: bool, verbose: bool, logfile: Option<&Path>) -> io::Result<()> {
    let level = if verbose {
        LevelFilter::Debug
    } else if quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    let file = logfile.map(File::create).transpose()?;

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(LevelFilter::Warn)
        .filter_module("card_stash", level)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(Tee { file })))
        .format(move |buf, record| {
            if verbose {
                writeln!(
                    buf,
                    "[{} {:<5} {}] {}",
                    chrono::Local::now().format("%H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    record.args()
                )
            } else {
                writeln!(buf, "{}", record.args())
            }
        });
    builder
        .try_init()
        .map_err(|e| io::Error::other(e.to_string()))
}
