use clap::{CommandFactory, Parser};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use teach_portal::config::LoggingConfig;
use teach_portal::logging;
use teach_portal::merge::{self, SUPPORTED_EXTENSIONS};

/// Merge every text document under a directory into one file
#[derive(Parser, Debug)]
#[command(name = "merge-docs", version, about)]
struct Args {
    /// Directory to scan recursively
    dir: Option<PathBuf>,

    /// Output file (default: merged-docs-<unix_millis>.txt)
    output: Option<PathBuf>,
}

fn print_usage() {
    let _ = Args::command().print_help();
    println!();
    println!("Examples:");
    println!("  merge-docs ./public/ai-apps");
    println!("  merge-docs ./src merged-output.txt");
    println!();
    println!("Supported file types:");
    println!("{}", SUPPORTED_EXTENSIONS.join(", "));
}

fn main() -> ExitCode {
    let _guard = logging::init(&LoggingConfig {
        level: "warn".to_string(),
        log_dir: None,
    });
    let args = Args::parse();

    let Some(dir) = args.dir else {
        print_usage();
        return ExitCode::SUCCESS;
    };
    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(merge::default_output_name()));

    if !dir.exists() {
        eprintln!("Error: directory does not exist - {}", dir.display());
        return ExitCode::FAILURE;
    }
    if !dir.is_dir() {
        eprintln!("Error: path is not a directory - {}", dir.display());
        return ExitCode::FAILURE;
    }

    println!("Scanning: {}", dir.display());
    let generated_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let report = match merge::merge_directory(&dir, &generated_at) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: failed to scan {}: {e}", dir.display());
            return ExitCode::FAILURE;
        }
    };

    if report.is_empty() {
        println!("Warning: no supported document files found");
        return ExitCode::SUCCESS;
    }

    println!("Found {} files", report.files.len());
    for file in &report.files {
        match &file.error {
            None => println!("  ✓ {}", file.relative_path),
            Some(e) => println!("  ✗ {} - {e}", file.relative_path),
        }
    }

    if let Err(e) = fs::write(&output, &report.content) {
        eprintln!("Error: failed to write {}: {e}", output.display());
        return ExitCode::FAILURE;
    }

    let written = fs::canonicalize(&output).unwrap_or(output);
    println!();
    println!("Merge complete");
    println!("Output: {}", written.display());
    println!("Size: {:.2} KB", report.content.len() as f64 / 1024.0);
    println!(
        "Succeeded: {}, failed: {}",
        report.succeeded(),
        report.failed()
    );
    ExitCode::SUCCESS
}
