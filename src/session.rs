//! Folder session over a single mail store connection
//!
//! A [`FolderSession`] keeps at most one folder open on its store. All
//! folder operations and teardown run under one session-wide lock, so
//! the "inspect current folder, maybe close it, open the requested one"
//! sequence is atomic with respect to other callers.

use crate::config::{Protocol, SessionConfig};
use crate::error::{Error, Result};
use crate::mode::OpenMode;
use crate::store::{Connector, MailFolder, MailStore};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Exclusive access to the folder returned by
/// [`FolderSession::get_folder`].
///
/// The session lock is held while the guard is alive; drop it before
/// calling the session again.
pub type FolderGuard<'a, F> = MappedMutexGuard<'a, F>;

/// Observable lifecycle state of a [`FolderSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    ConnectedNoFolder,
    ConnectedFolderOpen,
    Disconnected,
}

/// A connection to a mail store with at most one open folder.
pub struct FolderSession<S: MailStore> {
    protocol: Protocol,
    inner: Mutex<Inner<S>>,
}

struct Inner<S: MailStore> {
    /// `None` once disconnected.
    store: Option<S>,
    folder: Option<S::Folder>,
}

impl<S: MailStore> FolderSession<S> {
    /// Connect to the store described by `config`.
    ///
    /// Credentials are only used when both username and password are
    /// set; otherwise the store is connected anonymously. There is no
    /// retry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] wrapping the connector's failure.
    pub async fn connect<C>(connector: &C, config: &SessionConfig) -> Result<Self>
    where
        C: Connector<Store = S> + Sync,
    {
        let credentials = config.credentials();
        debug!(
            protocol = %config.protocol,
            host = %config.host,
            port = config.port,
            anonymous = credentials.is_none(),
            "Connecting to mail store"
        );

        let store = connector
            .connect(config, credentials)
            .await
            .map_err(|e| Error::Connection {
                protocol: config.protocol,
                source: Box::new(e),
            })?;

        info!(
            "Connected to {} store at {}:{}",
            config.protocol, config.host, config.port
        );
        Ok(Self {
            protocol: config.protocol,
            inner: Mutex::new(Inner {
                store: Some(store),
                folder: None,
            }),
        })
    }

    #[must_use]
    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Open the folder `name` in `mode` and return exclusive access to it.
    ///
    /// If the tracked folder already has this name (compared
    /// case-insensitively), this mode, and is still open, it is returned
    /// without any store I/O. Otherwise the tracked folder is closed
    /// without expunging and the requested one is opened in its place.
    ///
    /// # Errors
    ///
    /// - [`Error::FolderClose`] naming the previous folder if it could not
    ///   be closed; the requested folder is then not opened.
    /// - [`Error::FolderOpen`] naming `name` if it could not be opened.
    /// - [`Error::Disconnected`] after [`FolderSession::disconnect`].
    ///
    /// # Deadlocks
    ///
    /// The returned guard holds the session lock. Calling any method of
    /// this session from the same task while the guard is alive never
    /// completes; drop the guard first.
    pub async fn get_folder(
        &self,
        name: &str,
        mode: OpenMode,
    ) -> Result<FolderGuard<'_, S::Folder>> {
        let mut inner = self.inner.lock().await;
        inner.select(name, mode).await?;

        MutexGuard::try_map(inner, |inner| inner.folder.as_mut().filter(|f| f.is_open()))
            .map_err(|_| Error::folder_open(name, Error::NotOpen))
    }

    /// Names of all folders in the store.
    ///
    /// # Errors
    ///
    /// Returns the store's failure, or [`Error::Disconnected`] after
    /// [`FolderSession::disconnect`].
    pub async fn list_folders(&self) -> Result<Vec<String>> {
        let mut inner = self.inner.lock().await;
        let store = inner.store.as_mut().ok_or(Error::Disconnected)?;
        store.list_folders().await
    }

    /// Close the tracked folder if it is open.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FolderClose`] naming the folder if the store
    /// fails to close it, or [`Error::Disconnected`] after
    /// [`FolderSession::disconnect`].
    pub async fn close_folder(&self, expunge: bool) -> Result<()> {
        self.inner.lock().await.close_folder(expunge).await
    }

    /// Close the tracked folder, then the store.
    ///
    /// Both steps are always attempted. Failures are logged and
    /// discarded. Calling this again once disconnected does nothing.
    pub async fn disconnect(&self) {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        let Some(store) = inner.store.as_mut() else {
            debug!("Session already disconnected");
            return;
        };

        if let Some(folder) = inner.folder.as_mut()
            && let Err(e) = close_if_open(store, folder, false).await
        {
            warn!("Error closing mailbox folder when disconnecting: {e}");
        }

        if let Err(e) = store.close().await {
            warn!("Error closing {} store when disconnecting: {e}", self.protocol);
        }

        inner.folder = None;
        inner.store = None;
        info!("Disconnected from {} store", self.protocol);
    }

    pub async fn state(&self) -> SessionState {
        let inner = self.inner.lock().await;
        if inner.store.is_none() {
            SessionState::Disconnected
        } else if inner.folder.as_ref().is_some_and(MailFolder::is_open) {
            SessionState::ConnectedFolderOpen
        } else {
            SessionState::ConnectedNoFolder
        }
    }
}

impl<S: MailStore> Inner<S> {
    async fn select(&mut self, name: &str, mode: OpenMode) -> Result<()> {
        let store = self.store.as_mut().ok_or(Error::Disconnected)?;

        if let Some(current) = self.folder.as_mut() {
            if current.is_open() && current.mode() == Some(mode) && same_folder(current.name(), name)
            {
                debug!(folder = name, %mode, "Reusing open folder");
                return Ok(());
            }
            close_if_open(store, current, false).await?;
        }

        let mut folder = store
            .folder(name)
            .await
            .map_err(|e| Error::folder_open(name, e))?;
        store
            .open_folder(&mut folder, mode)
            .await
            .map_err(|e| Error::folder_open(name, e))?;

        debug!(folder = name, %mode, "Opened folder");
        self.folder = Some(folder);
        Ok(())
    }

    async fn close_folder(&mut self, expunge: bool) -> Result<()> {
        let store = self.store.as_mut().ok_or(Error::Disconnected)?;
        match self.folder.as_mut() {
            Some(folder) => close_if_open(store, folder, expunge).await,
            None => Ok(()),
        }
    }
}

async fn close_if_open<S: MailStore>(
    store: &mut S,
    folder: &mut S::Folder,
    expunge: bool,
) -> Result<()> {
    if !folder.is_open() {
        return Ok(());
    }
    store
        .close_folder(folder, expunge)
        .await
        .map_err(|e| Error::folder_close(folder.name(), e))?;
    debug!(folder = folder.name(), expunge, "Closed folder");
    Ok(())
}

/// Case-insensitive folder name comparison.
fn same_folder(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}
