//! Single-connection mail store session
//!
//! A [`FolderSession`] owns one connection to a mail store and keeps at
//! most one folder open on it. Asking for the folder that is already
//! open, in the same mode, costs no I/O; asking for another folder or
//! mode closes the current one (without expunging) before opening the
//! next. Folder operations and teardown are serialized by a single
//! session lock.
//!
//! The store itself sits behind the [`Connector`] / [`MailStore`] /
//! [`MailFolder`] traits. [`ImapConnector`] implements them over
//! `async-imap` with STARTTLS or implicit TLS.
//!
//! ```no_run
//! use mailbox_session::{FolderSession, ImapConnector, OpenMode, SessionConfig};
//!
//! # async fn run() -> mailbox_session::Result<()> {
//! let config = SessionConfig::from_env()?;
//! let session = FolderSession::connect(&ImapConnector, &config).await?;
//!
//! let inbox = session.get_folder("INBOX", OpenMode::ReadOnly).await?;
//! println!("{} messages", inbox.status().exists);
//! drop(inbox);
//!
//! session.disconnect().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod imap;
mod mode;
mod session;
mod store;

pub use config::{Credentials, Protocol, SessionConfig};
pub use error::{Error, Result};
pub use imap::{FolderStatus, ImapConnector, ImapFolder, ImapSession, ImapStore};
pub use mode::OpenMode;
pub use session::{FolderGuard, FolderSession, SessionState};
pub use store::{Connector, MailFolder, MailStore};
