//! Filtered directory scanner
//!
//! Walks a directory tree, prunes ignored directories early and collects
//! files with the requested extensions in a stable (sorted) order.

use crate::error::{OpsError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use walkdir::{DirEntry, WalkDir};

/// Metadata for a single file entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path to the file (root joined with the relative path)
    pub path: PathBuf,
    /// Relative path from the scan root
    pub relative_path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Modification time
    pub modified: SystemTime,
}

impl FileEntry {
    /// Create a FileEntry from a path
    pub fn from_path(path: &Path, root: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path).map_err(|e| OpsError::io(path, e))?;

        let relative_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();

        Ok(FileEntry {
            path: path.to_path_buf(),
            relative_path,
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        })
    }

    /// Get file extension
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }
}

/// Result of a directory scan
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Root path that was scanned
    pub root: PathBuf,
    /// Matching files, sorted by path
    pub files: Vec<FileEntry>,
    /// Number of directories skipped by ignore patterns
    pub pruned_dirs: usize,
    /// Scan duration
    pub scan_duration: std::time::Duration,
    /// Any errors encountered during scan
    pub errors: Vec<String>,
}

/// Configuration for directory scanning
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Extensions to collect, without the dot (empty = all files)
    pub extensions: Vec<String>,
    /// Ignore patterns: globs (containing `*`, `?` or `[`) match file and
    /// directory names, plain names match any path component
    pub ignore_patterns: Vec<String>,
    /// Include hidden files
    pub include_hidden: bool,
    /// Maximum depth (None = unlimited)
    pub max_depth: Option<usize>,
    /// Follow symbolic links
    pub follow_symlinks: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: Vec::new(),
            ignore_patterns: Vec::new(),
            include_hidden: true,
            max_depth: None,
            follow_symlinks: false,
        }
    }
}

impl ScanConfig {
    /// Scan configuration collecting files with one extension
    pub fn with_extension(ext: &str) -> Self {
        Self {
            extensions: vec![ext.trim_start_matches('.').to_string()],
            ..Default::default()
        }
    }
}

/// Directory scanner with ignore-pattern pruning
pub struct Scanner {
    config: ScanConfig,
    glob_matcher: GlobSet,
    plain_names: Vec<String>,
}

impl Scanner {
    /// Create a new scanner with the given configuration
    pub fn new(config: ScanConfig) -> Result<Self> {
        let (globs, plain_names): (Vec<String>, Vec<String>) = config
            .ignore_patterns
            .iter()
            .cloned()
            .partition(|p| is_glob(p));

        let glob_matcher = Self::build_globset(&globs)?;

        Ok(Self {
            config,
            glob_matcher,
            plain_names,
        })
    }

    /// Build a GlobSet from patterns
    fn build_globset(patterns: &[String]) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                OpsError::config(format!("Invalid glob pattern '{}': {}", pattern, e))
            })?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| OpsError::config(format!("Failed to build glob set: {}", e)))
    }

    /// Check whether a path (relative to the scan root) is ignored
    pub fn is_ignored(&self, relative: &Path) -> bool {
        if let Some(name) = relative.file_name() {
            if self.glob_matcher.is_match(Path::new(name)) {
                return true;
            }
        }

        relative.components().any(|c| match c {
            Component::Normal(part) => {
                let part = part.to_string_lossy();
                self.plain_names.iter().any(|p| *p == part)
            }
            _ => false,
        })
    }

    /// Scan a directory and return matching files
    pub fn scan(&self, root: &Path) -> Result<ScanResult> {
        let start_time = std::time::Instant::now();

        if !root.exists() {
            return Err(OpsError::NotFound(root.to_path_buf()));
        }

        let mut walker = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();

        if let Some(max_depth) = self.config.max_depth {
            walker = walker.max_depth(max_depth);
        }

        let mut files = Vec::new();
        let mut errors = Vec::new();
        let mut pruned_dirs = 0usize;

        let mut it = walker.into_iter();
        while let Some(entry) = it.next() {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    errors.push(err.to_string());
                    continue;
                }
            };

            // The root itself is never filtered
            if entry.depth() == 0 {
                continue;
            }

            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());

            if entry.file_type().is_dir() {
                if self.is_ignored(relative) || (!self.config.include_hidden && is_hidden(&entry)) {
                    pruned_dirs += 1;
                    it.skip_current_dir();
                }
                continue;
            }

            if !self.config.include_hidden && is_hidden(&entry) {
                continue;
            }
            if !self.extension_matches(entry.path()) || self.is_ignored(relative) {
                continue;
            }

            match FileEntry::from_path(entry.path(), root) {
                Ok(file) => files.push(file),
                Err(e) => errors.push(e.to_string()),
            }
        }

        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        Ok(ScanResult {
            root: root.to_path_buf(),
            files,
            pruned_dirs,
            scan_duration: start_time.elapsed(),
            errors,
        })
    }

    fn extension_matches(&self, path: &Path) -> bool {
        if self.config.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.config.extensions.iter().any(|want| want == ext))
            .unwrap_or(false)
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();

        File::create(dir.path().join("app.py"))
            .unwrap()
            .write_all(b"x = 1\n")
            .unwrap();
        File::create(dir.path().join("notes.txt"))
            .unwrap()
            .write_all(b"notes")
            .unwrap();

        std::fs::create_dir_all(dir.path().join("pkg/__pycache__")).unwrap();
        File::create(dir.path().join("pkg/mod.py")).unwrap();
        File::create(dir.path().join("pkg/__pycache__/mod.cpython-311.pyc")).unwrap();
        File::create(dir.path().join("pkg/__pycache__/stale.py")).unwrap();

        std::fs::create_dir_all(dir.path().join(".venv/lib")).unwrap();
        File::create(dir.path().join(".venv/lib/site.py")).unwrap();

        dir
    }

    #[test]
    fn test_scanner_extension_filter() {
        let dir = create_test_dir();
        let scanner = Scanner::new(ScanConfig::with_extension("py")).unwrap();

        let result = scanner.scan(dir.path()).unwrap();
        let names: Vec<_> = result
            .files
            .iter()
            .map(|f| f.relative_path.to_string_lossy().to_string())
            .collect();

        assert!(names.contains(&"app.py".to_string()));
        assert!(!names.iter().any(|n| n.ends_with(".txt")));
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_scanner_prunes_ignored_dirs() {
        let dir = create_test_dir();
        let config = ScanConfig {
            ignore_patterns: vec!["__pycache__".into(), ".venv".into(), "*.pyc".into()],
            ..ScanConfig::with_extension("py")
        };
        let scanner = Scanner::new(config).unwrap();

        let result = scanner.scan(dir.path()).unwrap();
        let names: Vec<_> = result
            .files
            .iter()
            .map(|f| f.relative_path.to_string_lossy().replace('\\', "/"))
            .collect();

        assert_eq!(names, vec!["app.py".to_string(), "pkg/mod.py".to_string()]);
        assert_eq!(result.pruned_dirs, 2);
    }

    #[test]
    fn test_plain_pattern_matches_whole_component() {
        let scanner = Scanner::new(ScanConfig {
            ignore_patterns: vec!["venv".into()],
            ..Default::default()
        })
        .unwrap();

        assert!(scanner.is_ignored(Path::new("venv/lib/a.py")));
        assert!(!scanner.is_ignored(Path::new("my_venv_tools.py")));
    }

    #[test]
    fn test_missing_root() {
        let scanner = Scanner::new(ScanConfig::default()).unwrap();
        let err = scanner.scan(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, OpsError::NotFound(_)));
    }
}
