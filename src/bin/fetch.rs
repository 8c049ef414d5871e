//! SpecVault Fetch Binary
//!
//! Downloads a published archive build into a local directory via wget.

use std::path::Path;
use std::process::{Command, Stdio};

use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

/// Published archive builds.
#[derive(ValueEnum, Clone, Copy, Debug)]
enum Release {
    /// First public build
    V01,
    /// Later build with additional surveys
    V02,
}

impl Release {
    fn file_name(&self) -> &'static str {
        match self {
            Release::V01 => "specvault_v01.svlt",
            Release::V02 => "specvault_v02.svlt",
        }
    }
}

/// SpecVault Fetch
#[derive(Parser, Debug)]
#[command(name = "specvault-fetch")]
#[command(about = "Download a published SpecVault archive build")]
#[command(version)]
struct Args {
    /// Archive release to download
    #[arg(short, long, value_enum, default_value = "v01")]
    release: Release,

    /// Directory the archive is written into
    #[arg(short, long, default_value = "./")]
    out_dir: String,
}

const BASE_URL: &str = "https://archive.specvault.io/builds";

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,specvault=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = Args::parse();

    tracing::info!("SpecVault Fetch v{}", specvault::VERSION);

    if !wget_available() {
        tracing::error!("wget not found on PATH; install it and retry");
        std::process::exit(1);
    }

    let file_name = args.release.file_name();
    let url = format!("{}/{}", BASE_URL, file_name);
    tracing::info!("Downloading {}", url);

    // --continue resumes a partial file instead of restarting it
    let status = Command::new("wget")
        .arg("--continue")
        .arg("--directory-prefix")
        .arg(&args.out_dir)
        .arg(&url)
        .status();

    match status {
        Ok(code) if code.success() => {
            let dest = Path::new(&args.out_dir).join(file_name);
            tracing::info!("Archive ready at {}", dest.display());
        }
        Ok(code) => {
            tracing::error!("wget exited with {}", code);
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("Failed to spawn wget: {}", e);
            std::process::exit(1);
        }
    }
}

/// Whether wget is on PATH.
fn wget_available() -> bool {
    Command::new("wget")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
