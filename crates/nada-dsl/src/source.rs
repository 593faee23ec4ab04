//! Call-site tracking for graph nodes.

use std::{
    collections::HashMap,
    env, fmt, fs,
    panic::Location,
    path::{Path, PathBuf},
    sync::{Arc, LazyLock, PoisonError, RwLock},
};

use nada_mir::SourceRef;
use tracing::trace;

/// The user call site that created a node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct SourceLocation {
    path: &'static str,
    line: u32,
    offset: u32,
    length: u32,
}

impl SourceLocation {
    /// Records `caller`, resolving the span of its line through `cache`.
    ///
    /// If the file cannot be read, the offset and length are zero.
    pub fn capture(caller: &'static Location<'static>, cache: &SourceCache) -> Self {
        let path = caller.file();
        let line = caller.line();
        let (offset, length) = cache
            .get(path)
            .and_then(|text| line_span(&text, line))
            .unwrap_or((0, 0));
        Self {
            path,
            line,
            offset,
            length,
        }
    }

    /// The path of the source file, as the compiler saw it.
    pub fn path(&self) -> &'static str {
        self.path
    }

    /// The base name of the source file.
    pub fn file(&self) -> &'static str {
        Path::new(self.path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(self.path)
    }

    /// The 1-based line number.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// The byte offset of the start of the line.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// The byte length of the line.
    pub fn length(&self) -> u32 {
        self.length
    }

    pub(crate) fn to_source_ref(self) -> SourceRef {
        SourceRef {
            file: self.file().to_owned(),
            lineno: self.line,
            offset: self.offset,
            length: self.length,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.line)
    }
}

/// Returns the byte offset and length of 1-based line `line` in `text`.
fn line_span(text: &str, line: u32) -> Option<(u32, u32)> {
    let index = usize::try_from(line.checked_sub(1)?).ok()?;
    let mut offset = 0usize;
    for (i, l) in text.split_inclusive('\n').enumerate() {
        if i == index {
            let content = l.strip_suffix('\n').unwrap_or(l);
            let content = content.strip_suffix('\r').unwrap_or(content);
            return Some((u32::try_from(offset).ok()?, u32::try_from(content.len()).ok()?));
        }
        offset = offset.checked_add(l.len())?;
    }
    None
}

static SHARED: LazyLock<Arc<SourceCache>> = LazyLock::new(|| Arc::new(SourceCache::new()));

/// Source text of the files that created nodes, keyed by path.
///
/// Each file is read at most once. Entries are never replaced, so a cache can
/// be shared by any number of concurrent compilations.
#[derive(Debug, Default)]
pub struct SourceCache {
    files: RwLock<HashMap<&'static str, Option<Arc<str>>>>,
}

impl SourceCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache used by [`Context::new`][crate::Context::new].
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED)
    }

    /// Returns the text of `path`, reading it on first use.
    ///
    /// Returns `None` if the file could not be read.
    pub fn get(&self, path: &'static str) -> Option<Arc<str>> {
        if let Some(entry) = self
            .files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            return entry.clone();
        }
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        files
            .entry(path)
            .or_insert_with(|| {
                let text = read_source(path);
                trace!(path, found = text.is_some(), "cached source file");
                text
            })
            .clone()
    }

    /// Returns the text of `path` only if it has already been read.
    pub fn cached(&self, path: &str) -> Option<Arc<str>> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
            .flatten()
    }
}

/// Reads `path`, trying it as given and then relative to each ancestor of
/// the working directory.
fn read_source(path: &str) -> Option<Arc<str>> {
    let path = Path::new(path);
    if let Ok(text) = fs::read_to_string(path) {
        return Some(text.into());
    }
    if path.is_absolute() {
        return None;
    }
    let cwd = env::current_dir().ok()?;
    cwd.ancestors()
        .map(|dir| -> PathBuf { dir.join(path) })
        .find_map(|candidate| fs::read_to_string(candidate).ok())
        .map(Into::into)
}
