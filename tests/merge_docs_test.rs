use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn merge_docs(args: &[&Path], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_merge-docs"))
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("failed to run merge-docs")
}

#[test]
fn test_two_file_scenario() {
    let temp_dir = TempDir::new().unwrap();
    let docs = temp_dir.path().join("docs");
    fs::create_dir(&docs).unwrap();
    fs::write(docs.join("a.md"), "hello").unwrap();
    fs::write(docs.join("b.txt"), "world").unwrap();
    let output_path = temp_dir.path().join("merged.txt");

    let output = merge_docs(&[&docs, &output_path], temp_dir.path());
    assert!(output.status.success(), "{output:?}");

    let merged = fs::read_to_string(&output_path).unwrap();
    assert!(merged.contains("1. a.md\n2. b.txt\n"));
    assert!(merged.contains("File 1: a.md"));
    assert!(merged.contains("File 2: b.txt"));

    let hello = merged.find("hello").unwrap();
    let world = merged.find("world").unwrap();
    assert!(hello < world);

    let summary = &merged[world..];
    assert!(summary.contains("Succeeded: 2 files"));
    assert!(summary.contains("Failed: 0 files"));
}

#[test]
fn test_default_output_name() {
    let temp_dir = TempDir::new().unwrap();
    let docs = temp_dir.path().join("docs");
    fs::create_dir(&docs).unwrap();
    fs::write(docs.join("notes.md"), "# notes\n").unwrap();

    let output = merge_docs(&[&docs], temp_dir.path());
    assert!(output.status.success());

    let produced: Vec<String> = fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("merged-docs-") && name.ends_with(".txt"))
        .collect();
    assert_eq!(produced.len(), 1);
}

#[test]
fn test_no_arguments_prints_usage() {
    let temp_dir = TempDir::new().unwrap();
    let output = merge_docs(&[], temp_dir.path());
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Supported file types"));
    assert!(stdout.contains("md, html"));
}

#[test]
fn test_missing_directory_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = merge_docs(&[&temp_dir.path().join("nope")], temp_dir.path());
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_file_instead_of_directory_fails() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("a.txt");
    fs::write(&file, "x").unwrap();

    let output = merge_docs(&[&file], temp_dir.path());
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_no_supported_files_is_a_warning() {
    let temp_dir = TempDir::new().unwrap();
    let docs = temp_dir.path().join("images");
    fs::create_dir(&docs).unwrap();
    fs::write(docs.join("a.png"), [0u8]).unwrap();

    let output = merge_docs(&[&docs], temp_dir.path());
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("no supported document files"));

    let leftovers = fs::read_dir(temp_dir.path())
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .file_name()
                .to_string_lossy()
                .starts_with("merged-docs-")
        })
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn test_unwritable_output_fails() {
    let temp_dir = TempDir::new().unwrap();
    let docs = temp_dir.path().join("docs");
    fs::create_dir(&docs).unwrap();
    fs::write(docs.join("a.md"), "hello").unwrap();

    let output_path = temp_dir.path().join("missing-dir").join("out.txt");
    let output = merge_docs(&[&docs, &output_path], temp_dir.path());
    assert_eq!(output.status.code(), Some(1));
}
