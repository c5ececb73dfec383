//! Mail store capability traits
//!
//! [`FolderSession`](crate::FolderSession) only ever talks to the
//! remote store through these traits. [`ImapConnector`](crate::ImapConnector)
//! is the network implementation; tests substitute in-memory doubles.

use crate::config::{Credentials, SessionConfig};
use crate::error::Result;
use crate::mode::OpenMode;
use std::future::Future;

/// Opens connections to a mail store.
pub trait Connector {
    type Store: MailStore;

    /// Connect to the store, authenticating with `credentials` when
    /// given and anonymously otherwise.
    fn connect(
        &self,
        config: &SessionConfig,
        credentials: Option<Credentials<'_>>,
    ) -> impl Future<Output = Result<Self::Store>> + Send;
}

/// An established connection to a mail store.
pub trait MailStore: Send {
    type Folder: MailFolder + Send;

    /// Obtain a closed handle to the folder called `name`.
    fn folder(&mut self, name: &str) -> impl Future<Output = Result<Self::Folder>> + Send;

    /// Open `folder` in `mode`.
    fn open_folder(
        &mut self,
        folder: &mut Self::Folder,
        mode: OpenMode,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Close `folder`, permanently removing deleted messages if
    /// `expunge` is set.
    fn close_folder(
        &mut self,
        folder: &mut Self::Folder,
        expunge: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Close the connection itself.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Names of all folders in the store. Does not change which folder
    /// is open.
    fn list_folders(&mut self) -> impl Future<Output = Result<Vec<String>>> + Send;
}

/// Status queries on a folder handle.
pub trait MailFolder {
    fn name(&self) -> &str;

    fn is_open(&self) -> bool;

    /// Mode the folder is open in, `None` while closed.
    fn mode(&self) -> Option<OpenMode>;
}
