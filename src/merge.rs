//! Merge a directory of text documents into one file with a table of
//! contents and per-file separators.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Extensions (lowercase, without the dot) that get merged. Files without
/// an extension are merged too.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "txt", "md", "html", "htm", "css", "js", "ts", "tsx", "jsx", "json", "xml", "yaml", "yml",
    "sql", "py", "java", "c", "cpp", "h", "cs", "go", "rs", "rb", "php", "sh", "bat", "ps1", "vue",
    "svelte", "astro", "mdx", "csv", "log", "ini", "conf", "env", "gitignore", "dockerfile",
    "makefile",
];

const SKIPPED_DIRS: &[&str] = &["node_modules", ".git"];

const BANNER_WIDTH: usize = 80;
const TOC_RULE_WIDTH: usize = 40;

pub fn is_supported(path: &Path) -> bool {
    match path.extension() {
        None => true,
        Some(ext) => {
            let ext = ext.to_string_lossy().to_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        }
    }
}

fn is_skipped_dir(name: &str) -> bool {
    SKIPPED_DIRS.contains(&name) || name.starts_with('.')
}

/// All supported files under `dir`, depth first in sorted name order
pub fn collect_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_into(dir, &mut files)?;
    Ok(files)
}

fn collect_into(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<_>>()?;
    entries.sort();

    for path in entries {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        // follows symlinks
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Skipping {:?}: {}", path, e);
                continue;
            }
        };

        if metadata.is_dir() {
            if is_skipped_dir(&name) {
                debug!("Skipping directory {:?}", path);
                continue;
            }
            collect_into(&path, files)?;
        } else if is_supported(&path) {
            files.push(path);
        }
    }
    Ok(())
}

/// `path` relative to `base`, always joined with `/`
pub fn relative_display(path: &Path, base: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Default output name `merged-docs-<unix_millis>.txt`
pub fn default_output_name() -> String {
    format!("merged-docs-{}.txt", chrono::Utc::now().timestamp_millis())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub relative_path: String,
    /// Read error message, if the file could not be read
    pub error: Option<String>,
}

/// The merged text plus what happened to each file
#[derive(Debug, Clone)]
pub struct MergeReport {
    pub source_dir: PathBuf,
    pub content: String,
    pub files: Vec<FileOutcome>,
}

impl MergeReport {
    pub fn succeeded(&self) -> usize {
        self.files.iter().filter(|f| f.error.is_none()).count()
    }

    pub fn failed(&self) -> usize {
        self.files.len() - self.succeeded()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn separator(out: &mut String, index: usize, relative_path: &str) {
    let line = "=".repeat(BANNER_WIDTH);
    let _ = write!(out, "\n{line}\nFile {}: {relative_path}\n{line}\n\n", index + 1);
}

/// Merge every supported file under `dir`.
///
/// `generated_at` is printed in the header as given. Unreadable files are
/// recorded as failures and do not stop the merge. An empty report means
/// no supported files were found.
pub fn merge_directory(dir: &Path, generated_at: &str) -> io::Result<MergeReport> {
    let metadata = fs::metadata(dir)?;
    if !metadata.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("not a directory: {}", dir.display()),
        ));
    }

    let source_dir = fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
    let paths = collect_files(dir)?;
    let mut report = MergeReport {
        source_dir: source_dir.clone(),
        content: String::new(),
        files: Vec::with_capacity(paths.len()),
    };
    if paths.is_empty() {
        return Ok(report);
    }

    let banner = "#".repeat(BANNER_WIDTH);
    let out = &mut report.content;
    let _ = write!(
        out,
        "{banner}\n#\n#  Merged documents\n#  Generated: {generated_at}\n#  Source: {}\n#  Files: {}\n#\n{banner}\n\n",
        source_dir.display(),
        paths.len()
    );

    out.push_str("Table of contents\n");
    out.push_str(&"─".repeat(TOC_RULE_WIDTH));
    out.push('\n');
    let relative_paths: Vec<String> = paths.iter().map(|p| relative_display(p, dir)).collect();
    for (index, relative_path) in relative_paths.iter().enumerate() {
        let _ = writeln!(out, "{}. {relative_path}", index + 1);
    }
    out.push('\n');

    for (index, (path, relative_path)) in paths.iter().zip(relative_paths).enumerate() {
        separator(out, index, &relative_path);
        match fs::read(path) {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                out.push_str(&text);
                if !text.ends_with('\n') {
                    out.push('\n');
                }
                report.files.push(FileOutcome {
                    relative_path,
                    error: None,
                });
            }
            Err(e) => {
                warn!("Failed to read {:?}: {}", path, e);
                let _ = writeln!(out, "[read error: {e}]");
                report.files.push(FileOutcome {
                    relative_path,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    let (succeeded, failed) = (report.succeeded(), report.failed());
    let _ = write!(
        report.content,
        "\n{banner}\n#  Merge complete\n#  Succeeded: {succeeded} files\n#  Failed: {failed} files\n{banner}\n"
    );
    Ok(report)
}
