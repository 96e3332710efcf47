//! Multi-document find and replace.
//!
//! Two scopes are supported: every opened document, and the files found under a list of
//! directories. Each document is bound in turn to the hidden surface so the operation never
//! disturbs what the visible views show. Files that were not open are loaded silently and
//! closed again once processed; a replace that changed a file saves it immediately.

use crate::buffer::BufferId;
use crate::coordinator::DocumentCoordinator;
use crate::error::FindError;
use crate::guard::OperationGuard;
use crate::search::{CompiledSearch, FindOptions, MatchRecord};
use crate::surface::{SurfaceHandle, SurfaceId, TextSurface};
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// What to do with each document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    /// Only count matches.
    Count,
    /// Collect a [`MatchRecord`] per match.
    FindAll,
    /// Replace every match.
    ReplaceAll,
}

fn glob(pattern: &str) -> Result<Glob, FindError> {
    GlobBuilder::new(pattern)
        .case_insensitive(true)
        .literal_separator(false)
        .build()
        .map_err(|e| FindError::InvalidFilter {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

fn glob_set(patterns: &[&str]) -> Result<Option<GlobSet>, FindError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(glob(pattern)?);
    }
    builder
        .build()
        .map(Some)
        .map_err(|e| FindError::InvalidFilter {
            pattern: patterns.join(" "),
            message: e.to_string(),
        })
}

/// File name filter.
///
/// Entries are separated by whitespace or `;`:
///
/// - `*.rs` includes matching file names (no inclusion entry means every file)
/// - `!*.min.js` excludes matching file names
/// - `!\target` skips a directory directly under a searched root
/// - `!+\.git` skips a directory at any depth
///
/// Matching is case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
    top_level_dirs: Option<GlobSet>,
    any_level_dirs: Option<GlobSet>,
}

impl FileFilter {
    /// Parse a filter string.
    pub fn parse(filter: &str) -> Result<Self, FindError> {
        let mut include = Vec::new();
        let mut exclude = Vec::new();
        let mut top_level_dirs = Vec::new();
        let mut any_level_dirs = Vec::new();
        for entry in filter
            .split(|c: char| c == ';' || c.is_whitespace())
            .filter(|e| !e.is_empty())
        {
            if let Some(dir) = entry
                .strip_prefix("!+\\")
                .or_else(|| entry.strip_prefix("!+/"))
            {
                any_level_dirs.push(dir);
            } else if let Some(dir) = entry
                .strip_prefix("!\\")
                .or_else(|| entry.strip_prefix("!/"))
            {
                top_level_dirs.push(dir);
            } else if let Some(name) = entry.strip_prefix('!') {
                exclude.push(name);
            } else {
                include.push(entry);
            }
        }
        Ok(Self {
            include: glob_set(&include)?,
            exclude: glob_set(&exclude)?,
            top_level_dirs: glob_set(&top_level_dirs)?,
            any_level_dirs: glob_set(&any_level_dirs)?,
        })
    }

    /// Returns `true` if a file called `name` passes the filter.
    pub fn matches_file(&self, name: &str) -> bool {
        let included = self.include.as_ref().is_none_or(|set| set.is_match(name));
        let excluded = self.exclude.as_ref().is_some_and(|set| set.is_match(name));
        included && !excluded
    }

    /// Returns `true` if a directory called `name`, `depth` levels below a root, is skipped.
    pub fn excludes_dir(&self, name: &str, depth: usize) -> bool {
        let top = depth == 1 && self.top_level_dirs.as_ref().is_some_and(|s| s.is_match(name));
        top || self.any_level_dirs.as_ref().is_some_and(|s| s.is_match(name))
    }
}

/// Where a directory search looks.
#[derive(Debug, Clone)]
pub struct DirectoryScope {
    /// Root directories, searched in order.
    pub directories: Vec<PathBuf>,
    /// File name filter.
    pub filter: FileFilter,
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Also descend into hidden directories (names starting with `.`).
    pub include_hidden: bool,
}

impl DirectoryScope {
    /// Scope over `;`-separated `directories` with `filter`, recursive, hidden directories
    /// skipped.
    pub fn new(directories: &str, filter: &str) -> Result<Self, FindError> {
        Ok(Self {
            directories: directories
                .split(';')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(PathBuf::from)
                .collect(),
            filter: FileFilter::parse(filter)?,
            recursive: true,
            include_hidden: false,
        })
    }

    /// Set recursion.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Set hidden directory inclusion.
    pub fn include_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }
}

/// Files selected by a [`DirectoryScope`], plus directories that could not be read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enumeration {
    /// Matching files in search order.
    pub files: Vec<PathBuf>,
    /// Directories (or entries) that failed, with the reason.
    pub errors: Vec<(PathBuf, String)>,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// List the files of `scope` depth-first. Within a directory, subdirectories come before
/// files and entries are ordered by name. A failing root is recorded and skipped.
pub fn enumerate_files(scope: &DirectoryScope) -> Enumeration {
    let mut result = Enumeration::default();
    for root in &scope.directories {
        if !root.is_dir() {
            log::debug!("skipping '{}': not a directory", root.display());
            result
                .errors
                .push((root.clone(), "not a directory".to_string()));
            continue;
        }
        let max_depth = if scope.recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by(|a, b| {
                b.file_type()
                    .is_dir()
                    .cmp(&a.file_type().is_dir())
                    .then_with(|| a.file_name().cmp(b.file_name()))
            })
            .into_iter()
            .filter_entry(|e| {
                // The root itself is never filtered.
                if e.depth() == 0 || !e.file_type().is_dir() {
                    return true;
                }
                let name = e.file_name().to_string_lossy();
                (scope.include_hidden || !is_hidden(e)) && !scope.filter.excludes_dir(&name, e.depth())
            });
        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file()
                        && scope
                            .filter
                            .matches_file(&entry.file_name().to_string_lossy())
                    {
                        result.files.push(entry.into_path());
                    }
                }
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                    log::debug!("enumeration error under '{}': {err}", root.display());
                    result.errors.push((path, err.to_string()));
                }
            }
        }
    }
    result
}

/// Progress sink and cancellation source of a multi-document run.
pub trait FindProgress {
    /// Document `index` (zero-based) of `total` is about to be processed.
    fn file_started(&mut self, _index: usize, _total: usize, _path: Option<&Path>) {}

    /// Periodic report: `done` documents processed, `hits` matches so far.
    fn report(&mut self, _done: usize, _total: usize, _hits: usize) {}

    /// Polled before each document is opened.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Progress sink that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl FindProgress for NoProgress {}

/// Number of documents between two progress reports: one per document for small runs, one
/// per percent from 200 documents up.
pub fn progress_granularity(total: usize) -> usize {
    if total >= 200 { total / 100 } else { 1 }
}

/// Outcome of a multi-document run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileRunReport {
    /// Matches (or replacements) over all documents.
    pub total: usize,
    /// Documents with at least one hit, with their count. Untitled documents carry their title.
    pub per_file: Vec<(PathBuf, usize)>,
    /// Match records, for [`FileOperation::FindAll`].
    pub results: Vec<MatchRecord>,
    /// Files written by a replace.
    pub saved: Vec<PathBuf>,
    /// Files that could not be opened, were read-only for a replace, or failed to save.
    pub skipped: Vec<PathBuf>,
    /// Directory enumeration failures.
    pub dir_errors: Vec<(PathBuf, String)>,
    /// The run stopped early on request.
    pub cancelled: bool,
}

enum Target<'a> {
    Buffer(BufferId),
    File(&'a Path),
}

impl DocumentCoordinator {
    /// Count, collect or replace matches in every opened document: main view tabs first, then
    /// secondary view tabs, clones once. Read-only documents are skipped by a replace. Changed
    /// documents are not saved.
    pub fn run_in_opened(
        &mut self,
        options: &FindOptions,
        operation: FileOperation,
    ) -> Result<FileRunReport, FindError> {
        let search = CompiledSearch::new(options)?;
        let targets: Vec<BufferId> = self.opened_buffers();
        let targets: Vec<Target<'_>> = targets.into_iter().map(Target::Buffer).collect();
        Ok(self.run_on_targets(&targets, &search, operation, &mut NoProgress))
    }

    /// Count or collect matches in the files of `scope`.
    pub fn find_in_files(
        &mut self,
        scope: &DirectoryScope,
        options: &FindOptions,
        collect: bool,
        progress: &mut dyn FindProgress,
    ) -> Result<FileRunReport, FindError> {
        let search = CompiledSearch::new(options)?;
        let operation = if collect {
            FileOperation::FindAll
        } else {
            FileOperation::Count
        };
        Ok(self.run_in_directories(scope, &search, operation, progress))
    }

    /// Replace every match in the files of `scope`, saving each changed file.
    ///
    /// Refused with [`FindError::AlreadyRunning`] while another replace-in-files is in
    /// progress. A malformed pattern aborts before any file is touched.
    pub fn replace_in_files(
        &mut self,
        scope: &DirectoryScope,
        options: &FindOptions,
        progress: &mut dyn FindProgress,
    ) -> Result<FileRunReport, FindError> {
        let guard = self.replace_in_files_guard.clone();
        let Some(_token) = guard.try_enter() else {
            return Err(FindError::AlreadyRunning);
        };
        let search = CompiledSearch::new(options)?;
        Ok(self.run_in_directories(scope, &search, FileOperation::ReplaceAll, progress))
    }

    /// The guard serializing replace-in-files runs.
    pub fn replace_in_files_guard(&self) -> &OperationGuard {
        &self.replace_in_files_guard
    }

    fn run_in_directories(
        &mut self,
        scope: &DirectoryScope,
        search: &CompiledSearch,
        operation: FileOperation,
        progress: &mut dyn FindProgress,
    ) -> FileRunReport {
        let enumeration = enumerate_files(scope);
        let targets: Vec<Target<'_>> = enumeration
            .files
            .iter()
            .map(|p| Target::File(p.as_path()))
            .collect();
        let mut report = self.run_on_targets(&targets, search, operation, progress);
        report.dir_errors = enumeration.errors;
        report
    }

    fn run_on_targets(
        &mut self,
        targets: &[Target<'_>],
        search: &CompiledSearch,
        operation: FileOperation,
        progress: &mut dyn FindProgress,
    ) -> FileRunReport {
        let mut report = FileRunReport::default();
        let granularity = progress_granularity(targets.len());
        let previous_hidden = self.hidden;

        for (index, target) in targets.iter().enumerate() {
            if progress.is_cancelled() {
                log::info!("multi-document run cancelled before document {index}");
                report.cancelled = true;
                break;
            }
            let path = match target {
                Target::File(path) => Some(*path),
                Target::Buffer(_) => None,
            };
            progress.file_started(index, targets.len(), path);

            let (id, opened_here) = match target {
                Target::Buffer(id) => (*id, false),
                Target::File(path) => match self.store.find_by_path(path) {
                    Some(id) => (id, false),
                    None => match self.store.load(path) {
                        Ok(id) => (id, true),
                        Err(err) => {
                            log::warn!("skipping '{}': {err}", path.display());
                            report.skipped.push(path.to_path_buf());
                            continue;
                        }
                    },
                },
            };

            self.process_document(id, path, search, operation, &mut report);

            if opened_here {
                self.bind_hidden(previous_hidden);
                self.store.close(id);
            }
            if (index + 1) % granularity == 0 {
                progress.report(index + 1, targets.len(), report.total);
            }
        }

        self.bind_hidden(previous_hidden);
        report
    }

    fn process_document(
        &mut self,
        id: BufferId,
        path: Option<&Path>,
        search: &CompiledSearch,
        operation: FileOperation,
        report: &mut FileRunReport,
    ) {
        let Some(buffer) = self.store.get(id) else {
            return;
        };
        let name = buffer
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(buffer.title()));
        let file_path = buffer.path().map(Path::to_path_buf);
        if operation == FileOperation::ReplaceAll && buffer.is_read_only() {
            log::debug!("skipping read-only '{}'", name.display());
            report.skipped.push(name);
            return;
        }

        self.bind_hidden(Some(id));
        let Some(buffer) = self.store.get_mut(id) else {
            return;
        };
        let mut surface = SurfaceHandle::new(&mut buffer.doc, SurfaceId::Hidden);
        let hits = match operation {
            FileOperation::Count => search.count(&surface.text()),
            FileOperation::FindAll => {
                let records = search.collect(&surface, file_path.as_deref());
                let hits = records.len();
                report.results.extend(records);
                hits
            }
            FileOperation::ReplaceAll => search.replace_all(&mut surface),
        };
        if hits == 0 {
            return;
        }
        report.total += hits;
        report.per_file.push((name.clone(), hits));

        if operation == FileOperation::ReplaceAll && path.is_some() {
            match self.store.save(id, None) {
                Ok(()) => report.saved.push(name),
                Err(err) => {
                    log::warn!("could not save '{}': {err}", name.display());
                    report.skipped.push(name);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_syntax() {
        let filter = FileFilter::parse("*.rs *.TOML; !build.rs !\\target !+\\.git").unwrap();
        assert!(filter.matches_file("main.rs"));
        assert!(filter.matches_file("Cargo.toml"));
        assert!(!filter.matches_file("build.rs"));
        assert!(!filter.matches_file("notes.md"));
        assert!(filter.excludes_dir("target", 1));
        assert!(!filter.excludes_dir("target", 2));
        assert!(filter.excludes_dir(".git", 3));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = FileFilter::parse("").unwrap();
        assert!(filter.matches_file("anything.bin"));
    }

    #[test]
    fn bad_glob_is_reported() {
        assert!(matches!(
            FileFilter::parse("a[b"),
            Err(FindError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn granularity() {
        assert_eq!(progress_granularity(5), 1);
        assert_eq!(progress_granularity(199), 1);
        assert_eq!(progress_granularity(250), 2);
    }

    #[test]
    fn enumeration_order_and_hidden_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("sub/deeper")).unwrap();
        std::fs::create_dir_all(root.join(".hidden")).unwrap();
        for file in ["b.txt", "a.txt", "sub/c.txt", "sub/deeper/d.txt", ".hidden/e.txt"] {
            std::fs::write(root.join(file), "x").unwrap();
        }
        let scope = DirectoryScope::new(&root.display().to_string(), "*.txt").unwrap();
        let names: Vec<String> = enumerate_files(&scope)
            .files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, ["sub/deeper/d.txt", "sub/c.txt", "a.txt", "b.txt"]);

        let flat = scope.clone().recursive(false);
        assert_eq!(enumerate_files(&flat).files.len(), 2);
        let all = scope.include_hidden(true);
        assert_eq!(enumerate_files(&all).files.len(), 5);
    }

    #[test]
    fn missing_directory_does_not_stop_the_others() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        let dirs = format!("{};{}", dir.path().join("nope").display(), dir.path().display());
        let result = enumerate_files(&DirectoryScope::new(&dirs, "").unwrap());
        assert_eq!(result.files.len(), 1);
        assert_eq!(result.errors.len(), 1);
    }
}
