//! flatvol Shell Binary
//!
//! Interactive command loop over a single volume.

use std::io::{self, BufRead, Write};

use clap::Parser;
use flatvol::command::{Command, Outcome, HELP_TEXT};
use flatvol::config::{
    SyncStrategy, DEFAULT_BLOCK_COUNT, DEFAULT_BLOCK_SIZE, DEFAULT_MAX_CONTAINERS,
    DEFAULT_MAX_FILES_PER_CONTAINER,
};
use flatvol::namespace::Listing;
use flatvol::{Config, StorageEngine, Usage};
use tracing_subscriber::{fmt, EnvFilter};

/// flatvol Shell
#[derive(Parser, Debug)]
#[command(name = "flatvol-shell")]
#[command(about = "Interactive shell for a simulated block storage volume")]
#[command(version)]
struct Args {
    /// Data directory (holds volume.img)
    #[arg(short, long, default_value = "./flatvol_data")]
    data_dir: String,

    /// Number of blocks in the pool
    #[arg(short = 'b', long, default_value_t = DEFAULT_BLOCK_COUNT)]
    block_count: u32,

    /// Block size in bytes
    #[arg(short = 's', long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: u32,

    /// Maximum files per directory
    #[arg(long, default_value_t = DEFAULT_MAX_FILES_PER_CONTAINER)]
    max_files: usize,

    /// Maximum number of directories
    #[arg(long, default_value_t = DEFAULT_MAX_CONTAINERS)]
    max_dirs: usize,

    /// Skip fsync when saving the image
    #[arg(long)]
    no_sync: bool,
}

fn main() {
    // Initialize tracing/logging (stderr, so stdout stays the interactive stream)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,flatvol=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("flatvol shell v{}", flatvol::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);

    // Build config from args
    let sync_strategy = if args.no_sync {
        SyncStrategy::OsBuffered
    } else {
        SyncStrategy::EverySave
    };
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .block_count(args.block_count)
        .block_size(args.block_size)
        .max_files_per_container(args.max_files)
        .max_containers(args.max_dirs)
        .sync_strategy(sync_strategy)
        .build();

    // Open engine
    let mut engine = match StorageEngine::open(config) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open volume: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&mut engine) {
        tracing::error!("Shell I/O error: {}", e);
    }

    if let Err(e) = engine.close() {
        tracing::error!("Failed to save volume on exit: {}", e);
        std::process::exit(1);
    }
}

/// Read-parse-execute loop until `exit` or end of input
fn run(engine: &mut StorageEngine) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    writeln!(stdout, "Welcome to the CLI File System!")?;
    writeln!(stdout, "{}", HELP_TEXT)?;

    let mut line = String::new();
    loop {
        write!(stdout, "\n{}> ", engine.current())?;
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            writeln!(stdout)?;
            return Ok(());
        }

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("Error [{}]: {}", e.kind(), e);
                continue;
            }
        };

        match engine.execute(command) {
            Ok(Outcome::Exit) => return Ok(()),
            Ok(outcome) => render(&mut stdout, outcome)?,
            Err(e) => eprintln!("Error [{}]: {}", e.kind(), e),
        }
    }
}

fn render(out: &mut impl Write, outcome: Outcome) -> io::Result<()> {
    match outcome {
        Outcome::Done(message) => writeln!(out, "{}", message),
        Outcome::Content(content) => {
            writeln!(out, "File content:")?;
            writeln!(out, "{}", String::from_utf8_lossy(&content))
        }
        Outcome::Listing(listing) => render_listing(out, &listing),
        Outcome::Usage(usage) => render_usage(out, &usage),
        Outcome::Directory(name) => writeln!(out, "{}", name),
        Outcome::Help => writeln!(out, "{}", HELP_TEXT),
        Outcome::Exit => Ok(()),
    }
}

fn render_listing(out: &mut impl Write, listing: &Listing) -> io::Result<()> {
    writeln!(out, "Directory: {}", listing.container)?;
    for file in &listing.files {
        writeln!(
            out,
            "- {} [{}] {}/{} bytes",
            file.name, file.permissions, file.len, file.declared_size
        )?;
    }
    for child in &listing.children {
        writeln!(out, "> {}", child)?;
    }
    Ok(())
}

fn render_usage(out: &mut impl Write, usage: &Usage) -> io::Result<()> {
    writeln!(
        out,
        "Blocks: {} used, {} free, {} total ({} bytes each)",
        usage.used_blocks(),
        usage.free_blocks,
        usage.total_blocks,
        usage.block_size
    )?;
    writeln!(
        out,
        "Directories: {}, files: {}",
        usage.containers, usage.files
    )
}
