use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// `RUST_LOG` wins; otherwise only our own crates at the `-v` level
fn filter_for(verbose: u8) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ryouri={}", level_for(verbose))))
}

pub fn log_file_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ryouri")
        .join("ryouri.log")
}

/// Log to a file; the terminal belongs to the UI while it runs
pub fn init_file(verbose: u8) -> Result<PathBuf> {
    let path = log_file_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .with_env_filter(filter_for(verbose))
        .init();

    Ok(path)
}

/// Log to stderr, keeping stdout for the reply
pub fn init_stderr(verbose: u8) {
    // Quiet unless asked: `ask` output is meant to be piped
    let filter = if verbose == 0 && std::env::var("RUST_LOG").is_err() {
        EnvFilter::new("ryouri=warn")
    } else {
        filter_for(verbose.saturating_sub(1))
    };

    tracing_subscriber::fmt()
        .compact()
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}
