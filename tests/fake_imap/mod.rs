//! Fake IMAP server for integration testing
//!
//! This module provides an in-process IMAP server that speaks enough
//! of the protocol to test `FolderSession` over `ImapConnector`
//! end-to-end:
//!
//! TCP -> greeting -> STARTTLS -> TLS handshake -> LOGIN -> commands -> LOGOUT
//!
//! or, for implicit TLS, TCP -> TLS handshake -> greeting -> ...
//!
//! ## Module layout
//!
//! - `server` -- TCP listener, TLS setup, and connection dispatch
//! - `handlers/` -- one file per IMAP command (SELECT, CLOSE, etc.)
//! - `mailbox` -- test data model (folders, emails, builder)
//! - `io` -- shared write helpers

#![allow(dead_code)]


pub use mailbox::MailboxBuilder;
pub use server::FakeImapServer;
