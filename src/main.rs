//! Command line entry point: load two label volumes and a session directory,
//! report what was restored, and write the session (with fresh overlays) back.
//!
//! ```text
//! glomeralign-cli <session-dir> <volume-a.npy> <volume-b.npy> [--preview <z>]
//! ```

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    use glomeralign::AppConfig;

    let config = AppConfig::load_from_default_path().unwrap_or_default();
    env_logger::Builder::new()
        .filter_level(config.preferences.log_level.to_level_filter())
        .parse_default_env()
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match cli::Args::parse(&args).and_then(|args| cli::run(&config, &args)) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(cli::CliError::Usage(message)) => {
            eprintln!("{message}");
            eprintln!("{}", cli::USAGE);
            std::process::ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use glomeralign::data::npy;
    use glomeralign::format::{self, FormatError, preview};
    use glomeralign::{AppConfig, MatchEngine, Side};

    pub const USAGE: &str =
        "usage: glomeralign-cli <session-dir> <volume-a.npy> <volume-b.npy> [--preview <z>]";

    #[derive(Debug, thiserror::Error)]
    pub enum CliError {
        #[error("{0}")]
        Usage(String),
        #[error(transparent)]
        Format(#[from] FormatError),
    }

    #[derive(Debug, PartialEq, Eq)]
    pub struct Args {
        pub session_dir: PathBuf,
        pub volume_a: PathBuf,
        pub volume_b: PathBuf,
        /// Slice to render as PNG previews
        pub preview: Option<usize>,
    }

    impl Args {
        pub fn parse(args: &[String]) -> Result<Self, CliError> {
            let mut positional = Vec::new();
            let mut preview = None;
            let mut iter = args.iter();
            while let Some(arg) = iter.next() {
                match arg.as_str() {
                    "--preview" => {
                        let z = iter
                            .next()
                            .ok_or_else(|| CliError::Usage("--preview needs a slice".into()))?;
                        preview = Some(z.parse().map_err(|_| {
                            CliError::Usage(format!("invalid slice index '{z}'"))
                        })?);
                    }
                    "-h" | "--help" => return Err(CliError::Usage(String::new())),
                    _ => positional.push(PathBuf::from(arg)),
                }
            }

            let [session_dir, volume_a, volume_b]: [PathBuf; 3] =
                positional.try_into().map_err(|p: Vec<PathBuf>| {
                    CliError::Usage(format!("expected 3 paths, got {}", p.len()))
                })?;
            Ok(Self {
                session_dir,
                volume_a,
                volume_b,
                preview,
            })
        }
    }

    pub fn run(config: &AppConfig, args: &Args) -> Result<(), CliError> {
        let mut engine = MatchEngine::with_options(config.engine_options());
        for (side, path) in [(Side::A, &args.volume_a), (Side::B, &args.volume_b)] {
            let volume = npy::read_label_volume(path)?;
            println!(
                "Volume {}: {:?}, {} structures",
                side,
                volume.shape(),
                volume.label_count()
            );
            engine.replace_volume(side, Arc::new(volume));
        }

        let dir = &args.session_dir;
        if dir.join(glomeralign::constants::MATCHES_FILENAME).is_file() {
            let report = format::load_session(&mut engine, dir)?;
            println!("Loaded {} matches", report.matches_loaded);
            for row in &report.skipped {
                println!("  skipped {row}");
            }
            for warning in &report.warnings {
                println!("  warning: {}", warning.message);
            }
        } else {
            println!("No match table in {}, starting a new session", dir.display());
        }

        let saved = format::save_session(&engine, dir)?;
        println!(
            "Saved {} matches to {} ({} files)",
            saved.matches_saved,
            dir.display(),
            saved.files_created.len()
        );

        if let Some(z) = args.preview {
            write_previews(&engine, dir, z)?;
        }
        Ok(())
    }

    fn write_previews(engine: &MatchEngine, dir: &Path, z: usize) -> Result<(), CliError> {
        for side in Side::ALL {
            let Some(overlay) = engine.overlay(side) else {
                continue;
            };
            let path = dir.join(format!("preview_{}_z{}.png", side.suffix(), z));
            preview::write_slice_png(overlay, z, &path)?;
            println!("Preview {}: {}", side, path.display());
        }
        Ok(())
    }

}
