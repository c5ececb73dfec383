//! IMAP mail store over `async-imap`
//!
//! [`ImapConnector`] opens a TLS-wrapped IMAP session (STARTTLS for
//! [`Protocol::Imap`], implicit TLS for [`Protocol::Imaps`]) and hands
//! it to a [`FolderSession`](crate::FolderSession) as an [`ImapStore`].
//!
//! Store properties read from [`SessionConfig::properties`]:
//! - `tls.verify`: `false` accepts any server certificate (default `true`)
//! - `tls.server_name`: TLS server name, defaults to the host
//! - `auth.anonymous.trace`: trace sent with SASL ANONYMOUS

use crate::config::{Credentials, Protocol, SessionConfig};
use crate::error::{Error, Result};
use crate::mode::OpenMode;
use crate::store::{Connector, MailFolder, MailStore};
use async_imap::Session;
use async_imap::types::Mailbox;
use futures::StreamExt;
use rustls::pki_types::ServerName;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::{debug, info, warn};

/// A TLS-wrapped IMAP session.
pub type ImapSession = Session<Compat<TlsStream<TcpStream>>>;

const TLS_VERIFY: &str = "tls.verify";
const TLS_SERVER_NAME: &str = "tls.server_name";
const ANONYMOUS_TRACE: &str = "auth.anonymous.trace";
const KNOWN_PROPERTIES: [&str; 3] = [TLS_VERIFY, TLS_SERVER_NAME, ANONYMOUS_TRACE];

/// Connects [`ImapStore`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImapConnector;

impl Connector for ImapConnector {
    type Store = ImapStore;

    async fn connect(
        &self,
        config: &SessionConfig,
        credentials: Option<Credentials<'_>>,
    ) -> Result<ImapStore> {
        for key in config
            .properties
            .keys()
            .filter(|key| !KNOWN_PROPERTIES.contains(&key.as_str()))
        {
            debug!(property = %key, "Ignoring unrecognised store property");
        }

        let mut session =
            with_timeout(config.connection_timeout, open_session(config, credentials)).await?;

        let command_timeout = config.command_timeout();
        let unselect = with_timeout(command_timeout, async {
            session
                .capabilities()
                .await
                .map(|caps| caps.has_str("UNSELECT"))
                .map_err(|e| Error::Imap(format!("CAPABILITY failed: {e}")))
        })
        .await?;

        info!("Connected to IMAP server");
        Ok(ImapStore {
            session: Some(session),
            unselect,
            command_timeout,
        })
    }
}

/// An authenticated IMAP session.
pub struct ImapStore {
    /// `None` once logged out.
    session: Option<ImapSession>,
    /// Server advertises UNSELECT (RFC 3691).
    unselect: bool,
    command_timeout: Option<Duration>,
}

impl ImapStore {
    #[must_use]
    pub const fn supports_unselect(&self) -> bool {
        self.unselect
    }

    fn session(&mut self) -> Result<&mut ImapSession> {
        self.session.as_mut().ok_or(Error::Disconnected)
    }

    /// Drop the session when a command was cut off by its timeout. The
    /// reply may still be in flight, so nothing further can be sent on
    /// this connection.
    fn check_timeout<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(Error::Timeout(limit)) = &result {
            warn!("IMAP command timed out after {limit:?}, abandoning the connection");
            self.session = None;
        }
        result
    }
}

impl MailStore for ImapStore {
    type Folder = ImapFolder;

    async fn folder(&mut self, name: &str) -> Result<ImapFolder> {
        self.session()?;
        Ok(ImapFolder {
            name: name.to_string(),
            mode: None,
            status: FolderStatus::default(),
        })
    }

    async fn open_folder(&mut self, folder: &mut ImapFolder, mode: OpenMode) -> Result<()> {
        let timeout = self.command_timeout;
        let session = self.session()?;
        let name = folder.name.as_str();

        let opened = with_timeout(timeout, async {
            let selected = match mode {
                OpenMode::ReadOnly => session.examine(name).await,
                OpenMode::ReadWrite => session.select(name).await,
            };
            selected.map_err(|e| Error::Imap(format!("Failed to {} {name}: {e}", verb(mode))))
        })
        .await;
        let mailbox = self.check_timeout(opened)?;

        folder.status = FolderStatus::from(&mailbox);
        folder.mode = Some(mode);
        debug!(folder = %folder.name, exists = folder.status.exists, "{} completed", verb(mode));
        Ok(())
    }

    async fn close_folder(&mut self, folder: &mut ImapFolder, expunge: bool) -> Result<()> {
        let timeout = self.command_timeout;
        let unselect = self.unselect;
        let session = self.session()?;
        let name = folder.name.as_str();
        let read_only = folder.mode == Some(OpenMode::ReadOnly);

        if expunge && read_only {
            warn!(folder = name, "Folder is read-only, nothing will be expunged");
        }

        // Fallback for servers without UNSELECT: EXAMINE, then CLOSE.
        let fallback = !expunge && !unselect && !read_only;
        let mut examined = false;

        let closed = with_timeout(timeout, async {
            let closed = if expunge || (read_only && !unselect) {
                // CLOSE never expunges a read-only folder.
                session.close().await
            } else if unselect {
                session.run_command_and_check_ok("UNSELECT").await
            } else {
                // Re-open read-only so the CLOSE below does not expunge.
                match session.examine(name).await {
                    Ok(_) => {
                        examined = true;
                        session.close().await
                    }
                    Err(e) => Err(e),
                }
            };
            closed.map_err(|e| Error::Imap(format!("Failed to close {name}: {e}")))
        })
        .await;

        folder.mode = match &closed {
            Ok(()) | Err(Error::Timeout(_)) => None,
            // The server still has the folder selected, now read-only.
            Err(_) if examined => Some(OpenMode::ReadOnly),
            // A failed EXAMINE leaves no folder selected (RFC 3501 6.3.1).
            Err(_) if fallback => None,
            Err(_) => folder.mode,
        };
        self.check_timeout(closed)
    }

    async fn close(&mut self) -> Result<()> {
        let timeout = self.command_timeout;
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        with_timeout(timeout, async {
            session
                .logout()
                .await
                .map_err(|e| Error::Imap(format!("Logout failed: {e}")))
        })
        .await?;

        info!("Logged out of IMAP server");
        Ok(())
    }

    async fn list_folders(&mut self) -> Result<Vec<String>> {
        let timeout = self.command_timeout;
        let session = self.session()?;

        let listed = with_timeout(timeout, async {
            let mut folder_stream = session
                .list(Some(""), Some("*"))
                .await
                .map_err(|e| Error::Imap(format!("List folders failed: {e}")))?;

            let mut names = Vec::new();
            while let Some(item) = folder_stream.next().await {
                match item {
                    Ok(name) => names.push(name.name().to_string()),
                    Err(e) => warn!("Skipping unreadable LIST response: {e}"),
                }
            }
            Ok::<_, Error>(names)
        })
        .await;
        self.check_timeout(listed)
    }
}

/// Handle to an IMAP mailbox.
#[derive(Debug, Clone)]
pub struct ImapFolder {
    name: String,
    mode: Option<OpenMode>,
    status: FolderStatus,
}

impl ImapFolder {
    /// Status reported by the server when the folder was last opened.
    #[must_use]
    pub const fn status(&self) -> &FolderStatus {
        &self.status
    }
}

impl MailFolder for ImapFolder {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_open(&self) -> bool {
        self.mode.is_some()
    }

    fn mode(&self) -> Option<OpenMode> {
        self.mode
    }
}

/// Mailbox metadata from a SELECT or EXAMINE response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FolderStatus {
    pub exists: u32,
    pub recent: u32,
    /// Sequence number of the first unseen message.
    pub unseen: Option<u32>,
    pub uid_validity: Option<u32>,
    pub uid_next: Option<u32>,
}

impl From<&Mailbox> for FolderStatus {
    fn from(mailbox: &Mailbox) -> Self {
        Self {
            exists: mailbox.exists,
            recent: mailbox.recent,
            unseen: mailbox.unseen,
            uid_validity: mailbox.uid_validity,
            uid_next: mailbox.uid_next,
        }
    }
}

const fn verb(mode: OpenMode) -> &'static str {
    match mode {
        OpenMode::ReadOnly => "EXAMINE",
        OpenMode::ReadWrite => "SELECT",
    }
}

async fn with_timeout<T>(
    limit: Option<Duration>,
    operation: impl Future<Output = Result<T>>,
) -> Result<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, operation)
            .await
            .map_err(|_| Error::Timeout(limit))?,
        None => operation.await,
    }
}

/// Open a TLS-wrapped IMAP session and authenticate it.
///
/// Connects to `config.host:config.port` via TCP, issues STARTTLS for
/// plain IMAP, performs the TLS handshake, then logs in with
/// `credentials` or authenticates anonymously.
async fn open_session(
    config: &SessionConfig,
    credentials: Option<Credentials<'_>>,
) -> Result<ImapSession> {
    let addr = format!("{}:{}", config.host, config.port);
    debug!("Connecting to IMAP server at {}", addr);

    let connector = tls_connector(config)?;
    let server_name = config
        .property(TLS_SERVER_NAME)
        .unwrap_or(&config.host)
        .to_string();
    let server_name = ServerName::try_from(server_name)
        .map_err(|e| Error::Tls(format!("Invalid server name: {e}")))?;

    let mut tcp_stream = TcpStream::connect(&addr).await?;
    if config.protocol == Protocol::Imap {
        tcp_stream = starttls(tcp_stream).await?;
    }

    let tls_stream = connector
        .connect(server_name, tcp_stream)
        .await
        .map_err(|e| Error::Tls(e.to_string()))?;
    let tls_client = async_imap::Client::new(tls_stream.compat());

    match credentials {
        Some(credentials) => tls_client
            .login(credentials.username, credentials.password)
            .await
            .map_err(|(e, _)| Error::Imap(format!("Login failed: {e}"))),
        None => {
            let trace = config.property(ANONYMOUS_TRACE).unwrap_or_default();
            tls_client
                .authenticate("ANONYMOUS", Anonymous(trace.to_string()))
                .await
                .map_err(|(e, _)| Error::Imap(format!("Anonymous authentication failed: {e}")))
        }
    }
}

/// Issue STARTTLS on a plain connection and return the raw stream,
/// ready for the TLS handshake.
async fn starttls(tcp_stream: TcpStream) -> Result<TcpStream> {
    let mut client = async_imap::Client::new(tcp_stream.compat());
    client
        .run_command_and_check_ok("STARTTLS", None)
        .await
        .map_err(|e| Error::Tls(format!("STARTTLS failed: {e}")))?;
    Ok(client.into_inner().into_inner())
}

/// Build the TLS connector, verifying against the webpki roots unless
/// `tls.verify` is `false`.
fn tls_connector(config: &SessionConfig) -> Result<TlsConnector> {
    let verify = match config.property(TLS_VERIFY) {
        Some(value) => value
            .parse::<bool>()
            .map_err(|e| Error::Config(format!("Invalid {TLS_VERIFY}: {e}")))?,
        None => true,
    };

    let builder =
        rustls::ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()
            .map_err(|e| Error::Tls(e.to_string()))?;

    let tls_config = if verify {
        let root_store = rustls::RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        builder
            .with_root_certificates(root_store)
            .with_no_client_auth()
    } else {
        warn!("TLS certificate verification is disabled");
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate))
            .with_no_client_auth()
    };
    Ok(TlsConnector::from(Arc::new(tls_config)))
}

/// SASL ANONYMOUS (RFC 4505): the only response is the trace string.
struct Anonymous(String);

impl async_imap::Authenticator for Anonymous {
    type Response = String;

    fn process(&mut self, _challenge: &[u8]) -> Self::Response {
        self.0.clone()
    }
}

/// Installed when `tls.verify=false`: local IMAP bridges and test
/// servers present self-signed certificates that no root store vouches
/// for. Handshake signatures are not checked either.
#[derive(Debug)]
struct AcceptAnyCertificate;

impl rustls::client::danger::ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
