extern crate alloc;

use alloc::{collections::BTreeMap, string::String};
use core::fmt;

use serde_derive::{Deserialize, Serialize};

/// An error for a source range that doesn't exist.
#[derive(Debug, thiserror::Error)]
#[error("range error")]
pub struct RangeError;

/// The location in user source that produced an operation.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    /// The base name of the source file.
    pub file: String,
    /// The 1-based line number.
    pub lineno: u32,
    /// The byte offset of the start of the line.
    pub offset: u32,
    /// The length of the line in bytes, excluding the line terminator.
    pub length: u32,
}

impl SourceRef {
    /// Retrieves the text this reference covers from `files`.
    ///
    /// Fails if the file is missing or the range does not fall on
    /// UTF-8 boundaries inside it.
    pub fn text<'a>(&self, files: &'a BTreeMap<String, String>) -> Result<&'a str, RangeError> {
        let text = files.get(&self.file).ok_or(RangeError)?;
        let start = usize::try_from(self.offset).map_err(|_| RangeError)?;
        let len = usize::try_from(self.length).map_err(|_| RangeError)?;
        let end = start.checked_add(len).ok_or(RangeError)?;
        text.get(start..end).ok_or(RangeError)
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.lineno)
    }
}
