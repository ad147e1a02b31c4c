//! Directory traversal with gitignore support.
//!
//! Uses the `ignore` crate to walk directories while respecting
//! .gitignore, .git/info/exclude, global gitignore, and .codestyleignore,
//! and turns the matching source files into [`SnippetRecord`]s.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use thiserror::Error;
use tracing::{debug, warn};

use crate::batch::SnippetRecord;

/// Name of the project-local ignore file.
pub const IGNORE_FILE: &str = ".codestyleignore";

/// Errors that can occur during directory walking.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where a snippet's identifier comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentifierSource {
    /// Name of the directory holding the file, e.g. `alice` for
    /// `alice/Main.java`. Files directly under the root use the root's name.
    #[default]
    ParentDir,
    /// Path relative to the walk root.
    Path,
    /// File name without its extension.
    Stem,
}

impl IdentifierSource {
    fn identify(self, root: &Path, path: &Path) -> String {
        let relative = path.strip_prefix(root).unwrap_or(path);
        match self {
            IdentifierSource::ParentDir => path
                .parent()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            IdentifierSource::Path => relative.to_string_lossy().replace('\\', "/"),
            IdentifierSource::Stem => path
                .file_stem()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }
}

/// Options for directory walking.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Maximum depth to recurse (None = unlimited).
    pub max_depth: Option<usize>,
    /// Follow symbolic links.
    pub follow_symlinks: bool,
    /// Include hidden files and directories.
    pub include_hidden: bool,
    /// Respect .gitignore patterns.
    pub respect_gitignore: bool,
    /// Additional ignore file paths.
    pub custom_ignores: Vec<PathBuf>,
    /// File extensions to collect, without the dot. Matched case-insensitively.
    pub extensions: Vec<String>,
    pub identifier: IdentifierSource,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            follow_symlinks: false,
            include_hidden: false,
            respect_gitignore: true,
            custom_ignores: Vec::new(),
            extensions: vec!["java".to_string()],
            identifier: IdentifierSource::default(),
        }
    }
}

impl WalkOptions {
    /// Create options that include hidden files.
    pub fn with_hidden() -> Self {
        Self {
            include_hidden: true,
            ..Default::default()
        }
    }

    /// Set maximum depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    pub fn identifier(mut self, source: IdentifierSource) -> Self {
        self.identifier = source;
        self
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(ext))
            })
    }
}

/// Entry from directory walk.
#[derive(Debug, Clone)]
pub struct WalkEntry {
    /// Path to the entry.
    pub path: PathBuf,
    /// Depth from root (root = 0).
    pub depth: usize,
    /// Whether this is a file or directory.
    pub is_file: bool,
}

/// Walk a directory tree, yielding entries.
///
/// Respects .gitignore and .codestyleignore patterns automatically.
///
/// # Examples
///
/// ```no_run
/// use codestyle::walker::walk;
/// use std::path::Path;
///
/// for entry in walk(Path::new(".")).flatten() {
///     println!("{}", entry.path.display());
/// }
/// ```
pub fn walk(root: &Path) -> Box<dyn Iterator<Item = Result<WalkEntry, WalkError>>> {
    walk_with_options(root, &WalkOptions::default())
}

/// Walk a directory tree with custom options.
pub fn walk_with_options(
    root: &Path,
    options: &WalkOptions,
) -> Box<dyn Iterator<Item = Result<WalkEntry, WalkError>>> {
    let root = root.to_path_buf();

    if !root.exists() {
        return Box::new(std::iter::once(Err(WalkError::NotFound { path: root })));
    }

    let mut builder = WalkBuilder::new(&root);

    builder
        .hidden(!options.include_hidden)
        .git_ignore(options.respect_gitignore)
        .git_global(options.respect_gitignore)
        .git_exclude(options.respect_gitignore)
        .follow_links(options.follow_symlinks)
        .add_custom_ignore_filename(IGNORE_FILE);

    if let Some(depth) = options.max_depth {
        builder.max_depth(Some(depth));
    }

    for ignore_path in &options.custom_ignores {
        if ignore_path.exists() {
            if let Some(err) = builder.add_ignore(ignore_path) {
                warn!(path = %ignore_path.display(), "bad ignore file: {err}");
            }
        }
    }

    Box::new(builder.build().filter_map(|result| match result {
        Ok(entry) => Some(Ok(WalkEntry {
            path: entry.path().to_path_buf(),
            depth: entry.depth(),
            is_file: entry.file_type().is_some_and(|ft| ft.is_file()),
        })),
        Err(err) => convert_error(err),
    }))
}

fn convert_error(err: ignore::Error) -> Option<Result<WalkEntry, WalkError>> {
    match err {
        ignore::Error::WithPath { path, err } => match *err {
            ignore::Error::Io(source) => Some(Err(io_error(path, source))),
            _ => None,
        },
        ignore::Error::WithDepth { err, .. } => convert_error(*err),
        ignore::Error::Io(source) => Some(Err(io_error(PathBuf::from("<walk error>"), source))),
        // Ignore-file syntax errors and loops are not fatal.
        _ => None,
    }
}

fn io_error(path: PathBuf, source: std::io::Error) -> WalkError {
    if source.kind() == std::io::ErrorKind::PermissionDenied {
        WalkError::PermissionDenied { path }
    } else {
        WalkError::Io { path, source }
    }
}

/// Read every matching file under `root` into a snippet record.
///
/// Files are visited in sorted path order, so indices are stable across runs.
/// A file that cannot be read as UTF-8 text is skipped with a warning; only
/// a missing root or a failing directory read is an error.
pub fn collect_snippets(
    root: &Path,
    options: &WalkOptions,
) -> Result<Vec<SnippetRecord>, WalkError> {
    if root.is_file() {
        let base = root.parent().unwrap_or(root);
        return Ok(read_snippet(base, root, options.identifier)
            .map(|(identifier, text)| SnippetRecord::new(identifier, text, 0))
            .into_iter()
            .collect());
    }

    let mut paths = Vec::new();
    for entry in walk_with_options(root, options) {
        let entry = entry?;
        if entry.is_file && options.matches_extension(&entry.path) {
            paths.push(entry.path);
        }
    }
    paths.sort();
    debug!(root = %root.display(), files = paths.len(), "collected source files");

    let records = paths
        .iter()
        .filter_map(|path| read_snippet(root, path, options.identifier))
        .enumerate()
        .map(|(index, (identifier, text))| SnippetRecord::new(identifier, text, index))
        .collect();
    Ok(records)
}

fn read_snippet(root: &Path, path: &Path, source: IdentifierSource) -> Option<(String, String)> {
    match std::fs::read_to_string(path) {
        Ok(text) => Some((source.identify(root, path), text)),
        Err(err) => {
            warn!(path = %path.display(), "skipping unreadable file: {err}");
            None
        }
    }
}
