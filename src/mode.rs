//! Folder open modes

use serde::Serialize;
use std::fmt;

/// Access mode a folder is opened in.
///
/// For IMAP, [`OpenMode::ReadOnly`] is an `EXAMINE` and
/// [`OpenMode::ReadWrite`] is a `SELECT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

impl OpenMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "read-only",
            Self::ReadWrite => "read-write",
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
