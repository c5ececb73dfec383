//! Error types for mailbox-session

use crate::config::Protocol;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Error while acquiring connection with the {protocol} store: {source}")]
    Connection {
        protocol: Protocol,
        #[source]
        source: Box<Error>,
    },

    #[error("Error while opening folder [{folder}]: {source}")]
    FolderOpen {
        folder: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Error while closing mailbox folder {folder}: {source}")]
    FolderClose {
        folder: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Session is disconnected")]
    Disconnected,

    #[error("Folder did not report itself open")]
    NotOpen,

    #[error("IMAP error: {0}")]
    Imap(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

impl Error {
    pub(crate) fn folder_open(folder: &str, source: Self) -> Self {
        Self::FolderOpen {
            folder: folder.to_string(),
            source: Box::new(source),
        }
    }

    pub(crate) fn folder_close(folder: &str, source: Self) -> Self {
        Self::FolderClose {
            folder: folder.to_string(),
            source: Box::new(source),
        }
    }

    /// The folder an open or close failure refers to.
    #[must_use]
    pub fn folder_name(&self) -> Option<&str> {
        match self {
            Self::FolderOpen { folder, .. } | Self::FolderClose { folder, .. } => Some(folder),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
