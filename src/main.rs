use std::env;
use std::io;
use std::path::PathBuf;
use std::process;

use sustainfix::batch::{self, Dispatch};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: sustainfix <file-or-directory>...");
        eprintln!("       sustainfix --no-pause <file-or-directory>...");
        process::exit(1);
    }

    let mut pause = true;
    let mut paths: Vec<PathBuf> = Vec::new();
    for arg in &args[1..] {
        if arg == "--no-pause" {
            pause = false;
        } else {
            paths.push(PathBuf::from(arg));
        }
    }

    if paths.is_empty() {
        eprintln!("Usage: sustainfix <file-or-directory>...");
        process::exit(1);
    }

    // Log level comes from RUST_LOG when set.
    let _logger = flexi_logger::Logger::try_with_env_or_str("info")
        .and_then(|logger| logger.start());

    let dispatch = Dispatch::standard();
    let report = batch::run(&paths, &dispatch);

    println!(
        "Done: {} of {} files processed successfully.",
        report.succeeded, report.processed
    );
    for (path, err) in &report.failures {
        eprintln!("  FAILED {}: {}", path.display(), err);
    }

    if pause {
        println!("Press ENTER to exit.");
        let mut line = String::new();
        let _ = io::stdin().read_line(&mut line);
    }

    if !report.failures.is_empty() {
        process::exit(1);
    }
}
