//! c0 compiler CLI
//!
//! `c0c -i <source> [-o <object>] [--verbose]`
//!
//! Exit code 0 on success, 1 on any compile or I/O error. When `-o` is
//! omitted the program is still fully compiled but the object bytes are
//! discarded (a syntax and type check). `--verbose` logs per-function
//! instruction listings and an annotated hex dump of the object file to
//! stderr at debug level.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::debug;

#[derive(Parser)]
#[command(name = "c0c")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "c0 compiler - compile c0 source to a navm object file", long_about = None)]
struct Cli {
    /// Input c0 source file
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Output object file (omit to compile without writing anything)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Log instruction listings and an annotated object dump to stderr
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let source = match fs::read_to_string(&cli.input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading {}: {}", cli.input.display(), e);
            process::exit(1);
        }
    };

    let program = match c0c::compile_source(&source) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let bytes = if cli.verbose {
        for func in program.functions.iter().filter(|f| !f.body.is_empty()) {
            debug!("compiled:\n{func}");
        }
        let (bytes, notes) = program.to_bytes_annotated();
        for note in &notes {
            debug!("{note}");
        }
        bytes
    } else {
        program.to_bytes()
    };

    match &cli.output {
        Some(path) => {
            if let Err(e) = fs::write(path, &bytes) {
                eprintln!("Error writing {}: {}", path.display(), e);
                process::exit(1);
            }
            println!("Compiled {} -> {}", cli.input.display(), path.display());
        }
        None => {
            println!(
                "Compiled {} ({} object bytes, discarded)",
                cli.input.display(),
                bytes.len()
            );
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();
}
