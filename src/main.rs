//! hdcont - Kindle HD container dumper

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use hdcont::container::DEFAULT_IMAGE_DIR;
use hdcont::{Container, WalkOptions, walk};

#[derive(Parser)]
#[command(name = "hdcont")]
#[command(version, about = "Dump the images from a Kindle AZW6 HD container file", long_about = None)]
#[command(after_help = "EXAMPLES:
    hdcont book.azw6               Dump metadata, extract images to ./azw6_images
    hdcont -o out book.res         Extract images into out/
    hdcont --list-only book.azw6   Dump metadata and record map only")]
struct Cli {
    /// Kindle HD container (.azw6 or .res)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Directory for extracted images [default: azw6_images next to INPUT]
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Print the dump without extracting images
    #[arg(short, long)]
    list_only: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    println!("hdcont v{}", env!("CARGO_PKG_VERSION"));

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> hdcont::Result<()> {
    check_container_path(&cli.input)?;
    let data = std::fs::read(&cli.input)?;
    let container = Container::open(&data)?;

    let options = WalkOptions {
        output_dir: cli
            .output_dir
            .clone()
            .unwrap_or_else(|| default_output_dir(&cli.input)),
        extract: !cli.list_only,
    };

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let result = walk(&container, &options, &mut out);
    out.flush()?;

    let summary = result?;
    log::info!(
        "{} records, {} images extracted to {}",
        summary.record_count,
        summary.images.len(),
        options.output_dir.display()
    );
    Ok(())
}

/// Only `.azw6` and `.res` files are accepted, in any letter case.
fn check_container_path(path: &Path) -> hdcont::Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("azw6" | "res") => Ok(()),
        _ => Err(hdcont::Error::NotAContainerFile(path.to_path_buf())),
    }
}

fn default_output_dir(input: &Path) -> PathBuf {
    input
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(DEFAULT_IMAGE_DIR)
}
