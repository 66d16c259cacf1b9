/// Wirestate — Snapshot Inspector
///
/// Verifies snapshot files against the configured app key: checksum first,
/// then shape. One PASS/FAIL line per file; exits non-zero on any failure.
///
/// Usage: wirestate-inspect [--config <wirestate.toml>] <snapshot.json>...

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use wirestate_kernel::hashing::Checksum;
use wirestate_kernel::invariants::try_validate_snapshot;
use wirestate_runtime::config::WireConfig;
use wirestate_runtime::error::EngineError;
use wirestate_runtime::snapshot_codec::read_snapshot_file;

struct Args {
    config: Option<PathBuf>,
    files: Vec<PathBuf>,
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut config = None;
    let mut files = Vec::new();
    while let Some(arg) = raw.next() {
        if arg == "--config" {
            let path = raw.next().ok_or("--config needs a path")?;
            config = Some(PathBuf::from(path));
        } else {
            files.push(PathBuf::from(arg));
        }
    }
    if files.is_empty() {
        return Err("usage: wirestate-inspect [--config <file>] <snapshot.json>...".into());
    }
    Ok(Args { config, files })
}

fn load_config(path: Option<&Path>) -> Result<WireConfig, EngineError> {
    let mut config = match path {
        Some(path) => WireConfig::load(path)?,
        None => WireConfig::default(),
    };
    config.apply_env_overrides()?;
    Ok(config)
}

fn inspect(checksum: &Checksum, file: &Path) -> Result<String, EngineError> {
    let snapshot = read_snapshot_file(file)?;
    checksum.verify(&snapshot)?;
    try_validate_snapshot(&snapshot)?;
    Ok(format!(
        "{} ({} properties)",
        snapshot.name().unwrap_or_default(),
        snapshot.data.len()
    ))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config: {err}");
            return ExitCode::from(2);
        }
    };
    let checksum = match config.app_key() {
        Ok(key) => Checksum::new(key),
        Err(err) => {
            eprintln!("config: {err}");
            return ExitCode::from(2);
        }
    };

    println!("wirestate-inspect (protocol v{})", wirestate_kernel::PROTOCOL_VERSION);
    let total = args.files.len();
    let mut passed = 0;
    for file in &args.files {
        match inspect(&checksum, file) {
            Ok(summary) => {
                passed += 1;
                println!("  [PASS] {}: {}", file.display(), summary);
            }
            Err(err) => {
                tracing::debug!(file = %file.display(), error = ?err, "inspection failed");
                println!("  [FAIL] {}: {}", file.display(), err);
            }
        }
    }

    println!();
    println!("Results: {}/{} passed", passed, total);
    if passed == total {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
